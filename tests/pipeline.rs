//! End-to-end pipeline tests through the public API.
//!
//! Every test feeds a document or bare script through [`DeobfuscationEngine`]
//! and checks the rendered output, so parsing, discovery, the rewrite loop,
//! cleanup and rendering are all exercised together.

use rotascope::{
    deobfuscation::{CleanupConfig, EventKind},
    DeobfuscationEngine, EngineConfig, Error, Result,
};

/// Loader `A` returning `['x', 'y']`, decoder `B` with offset 5.
const STRING_TABLE: &str = r#"
function A() {
    var d = ['x', 'y'];
    A = function () { return d; };
    return A();
}
function B(e, f) {
    var c = A();
    return B = function (g, h) {
        g = g - 5;
        var i = c[g];
        return i;
    }, B(e, f);
}
"#;

fn obfuscated(body: &str) -> String {
    format!("{STRING_TABLE}{body}\n")
}

fn run(source: &str) -> Result<String> {
    let engine = DeobfuscationEngine::default();
    let (code, _) = engine.process_source(source)?;
    Ok(code)
}

#[test]
fn test_decodes_table_entries() -> Result<()> {
    let engine = DeobfuscationEngine::default();
    let (code, result) = engine.process_source(&obfuscated("console.log(B(5), B(6));"))?;

    assert!(code.contains(r#"console.log("x", "y");"#), "{code}");
    assert_eq!(result.loader.as_deref(), Some("A"));
    assert_eq!(result.table_len, 2);
    assert_eq!(result.decoder.as_ref().map(|d| d.name()), Some("B"));
    assert_eq!(result.decoder.as_ref().map(|d| d.offset()), Some(5));
    assert_eq!(result.strings_decoded(), 2);
    assert!(result.reached_fixed_point);
    Ok(())
}

#[test]
fn test_output_is_a_fixed_point() -> Result<()> {
    let first = run(&obfuscated("var k = B; console[k(6)](k(0x2 + 0x3));"))?;
    assert!(first.contains(r#"console.y("x");"#), "{first}");

    let engine = DeobfuscationEngine::default();
    let (second, result) = engine.process_source(&first)?;
    assert_eq!(first, second);
    assert_eq!(result.iterations, 1);
    assert!(result.reached_fixed_point);
    assert!(result.events.is_empty(), "{}", result.events);
    Ok(())
}

#[test]
fn test_out_of_range_calls_are_left_alone() -> Result<()> {
    let code = run(&obfuscated("f(B(99)); g(B(4));"))?;

    assert!(code.contains("f(B(99));"), "{code}");
    assert!(code.contains("g(B(4));"), "{code}");
    Ok(())
}

#[test]
fn test_decoder_alias_is_resolved_and_removed() -> Result<()> {
    let engine = DeobfuscationEngine::default();
    let (code, result) = engine.process_source(&obfuscated("var k = B; f(k(5));"))?;

    assert!(code.contains(r#"f("x");"#), "{code}");
    assert!(!code.contains("var k"), "{code}");
    assert_eq!(result.strings_decoded(), 1);
    assert!(result.events.has(EventKind::DeclarationRemoved));
    Ok(())
}

#[test]
fn test_constants_are_inlined_then_removed() -> Result<()> {
    assert_eq!(run("var z = 7; use(z);")?, "use(7);\n");
    assert_eq!(
        run("var a = 1; var b = a + 1; var c = b * 2; f(c);")?,
        "f(4);\n"
    );
    Ok(())
}

#[test]
fn test_binding_read_twice_is_inlined_at_both_sites() -> Result<()> {
    let engine = DeobfuscationEngine::default();
    let (code, result) = engine.process_source("var s = 'ab'; left(s); right(s);")?;

    assert_eq!(code, "left('ab');\nright('ab');\n");
    assert_eq!(result.events.count_kind(EventKind::ReferenceInlined), 2);
    assert_eq!(result.events.count_kind(EventKind::DeclarationRemoved), 1);
    Ok(())
}

#[test]
fn test_reads_inside_earlier_functions_are_inlined() -> Result<()> {
    let code = run("function hi() { show(greeting); }\nvar greeting = \"x\";\nhi();")?;

    assert_eq!(code, "function hi() {\n    show(\"x\");\n}\nhi();\n");
    Ok(())
}

#[test]
fn test_property_access_normalization() -> Result<()> {
    let code = run(r#"obj["go"](); obj["1go"]();"#)?;

    assert!(code.contains("obj.go();"), "{code}");
    assert!(code.contains(r#"obj["1go"]();"#), "{code}");
    Ok(())
}

#[test]
fn test_cleanup_removes_dead_functions_and_guards() -> Result<()> {
    let source = "function dead() { return 1; }\n\
                  function live() { return 2; }\n\
                  (function () { while (true) {} })();\n\
                  live();";

    let engine = DeobfuscationEngine::default();
    let (code, result) = engine.process_source(source)?;
    assert_eq!(code, "function live() {\n    return 2;\n}\nlive();\n");
    assert_eq!(result.events.count_kind(EventKind::GuardRemoved), 1);
    assert_eq!(result.events.count_kind(EventKind::DeclarationRemoved), 1);

    let config = EngineConfig::default().with_cleanup(CleanupConfig::disabled());
    let (kept, _) = DeobfuscationEngine::new(config).process_source(source)?;
    assert!(kept.contains("function dead()"), "{kept}");
    assert!(kept.contains("while (true)"), "{kept}");
    Ok(())
}

#[test]
fn test_rewrite_loop_terminates() -> Result<()> {
    let config = EngineConfig::default().with_max_iterations(10);
    let engine = DeobfuscationEngine::new(config);
    let (_, result) =
        engine.process_source(&obfuscated("var n = 6; var m = n - 1; h(B(m), B(n));"))?;

    assert!(result.iterations <= 10);
    assert!(result.reached_fixed_point);
    assert_eq!(result.strings_decoded(), 2);
    Ok(())
}

#[test]
fn test_document_extraction() -> Result<()> {
    let document = format!(
        "<html><head><script src=\"_0x.js\"></script></head>\
         <body><script>{}var _0xflag = B(6); show(_0xflag);</script></body></html>",
        STRING_TABLE
    );

    let engine = DeobfuscationEngine::default();
    let (code, _) = engine.process_document(&document)?;
    assert!(code.contains(r#"show("y");"#), "{code}");
    Ok(())
}

#[test]
fn test_missing_script_is_reported() {
    let engine = DeobfuscationEngine::new(EngineConfig::default().with_marker("_0xdead"));
    let result = engine.process_document("<script>var plain = 1;</script>");

    assert!(matches!(result, Err(Error::ScriptNotFound { marker }) if marker == "_0xdead"));
}

#[test]
fn test_parse_failure_carries_location() {
    let engine = DeobfuscationEngine::default();
    let Err(Error::Parse(failure)) = engine.process_source("var ok = 1;\nvar = ;\n") else {
        panic!("expected a parse failure");
    };

    assert_eq!(failure.line(), 2);
    assert!(!failure.excerpt().is_empty());
}
