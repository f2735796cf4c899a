#![no_main]

use libfuzzer_sys::fuzz_target;
use rotascope::{DeobfuscationEngine, EngineConfig};

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    let engine = DeobfuscationEngine::new(EngineConfig::default());
    let _ = engine.process_source(source);
    let _ = engine.process_document(source);
});
