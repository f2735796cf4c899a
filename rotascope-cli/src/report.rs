use std::path::Path;

use rotascope::{deobfuscation::EventKind, DeobfuscationResult};
use serde::Serialize;

/// JSON report of one run.
#[derive(Debug, Serialize)]
pub struct DeobfuscationReport {
    pub file: String,
    pub loader: Option<String>,
    pub table_len: usize,
    pub decoder: Option<String>,
    pub offset: Option<i64>,
    pub iterations: usize,
    pub reached_fixed_point: bool,
    pub time_ms: u128,
    pub output_bytes: usize,
    pub stats: StatsReport,
}

#[derive(Debug, Serialize)]
pub struct StatsReport {
    pub strings_decoded: usize,
    pub constants_folded: usize,
    pub references_inlined: usize,
    pub properties_normalized: usize,
    pub declarations_removed: usize,
    pub guards_removed: usize,
}

impl StatsReport {
    fn from_result(result: &DeobfuscationResult) -> Self {
        let count = |kind| result.events.count_kind(kind);
        Self {
            strings_decoded: count(EventKind::StringDecoded),
            constants_folded: count(EventKind::ConstantFolded),
            references_inlined: count(EventKind::ReferenceInlined),
            properties_normalized: count(EventKind::PropertyNormalized),
            declarations_removed: count(EventKind::DeclarationRemoved),
            guards_removed: count(EventKind::GuardRemoved),
        }
    }
}

pub fn build_report(path: &Path, code: &str, result: &DeobfuscationResult) -> DeobfuscationReport {
    DeobfuscationReport {
        file: path.display().to_string(),
        loader: result.loader.clone(),
        table_len: result.table_len,
        decoder: result.decoder.as_ref().map(|d| d.name().to_string()),
        offset: result.decoder.as_ref().map(|d| d.offset()),
        iterations: result.iterations,
        reached_fixed_point: result.reached_fixed_point,
        time_ms: result.total_time.as_millis(),
        output_bytes: code.len(),
        stats: StatsReport::from_result(result),
    }
}

#[cfg(test)]
mod tests {
    use rotascope::{DeobfuscationEngine, EngineConfig};

    use super::*;

    #[test]
    fn test_report_serializes() -> anyhow::Result<()> {
        let engine = DeobfuscationEngine::new(EngineConfig::default());
        let (code, result) = engine.process_source("var a = 1 + 1; f(a);")?;

        let report = build_report(Path::new("in.js"), &code, &result);
        assert_eq!(report.stats.constants_folded, 1);
        assert_eq!(report.stats.declarations_removed, 1);
        assert!(report.loader.is_none());

        let json: serde_json::Value = serde_json::to_value(&report)?;
        assert_eq!(json["file"], "in.js");
        assert_eq!(json["stats"]["references_inlined"], 1);
        assert_eq!(json["decoder"], serde_json::Value::Null);
        Ok(())
    }
}
