use std::{fs, path::Path};

use anyhow::{bail, Context};
use rotascope::{DeobfuscationEngine, EngineConfig};

use crate::{
    app::Cli,
    link::{is_absolute_host_path, viewer_link},
    output::print_stats,
    report::build_report,
};

pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let Some(viewer_host_path) = cli.viewer_host_path.as_deref().filter(|p| !p.is_empty()) else {
        bail!(
            "VIEWER_HOST_PATH is not set. Pass --viewer-host-path or export the absolute path of the AST viewer page."
        );
    };
    if !is_absolute_host_path(viewer_host_path) {
        log::warn!(
            "VIEWER_HOST_PATH '{viewer_host_path}' is not absolute, the printed link may not open"
        );
    }

    let input = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read input: {}", cli.input.display()))?;

    let engine = DeobfuscationEngine::new(build_config(cli));
    let (code, result) = if cli.raw {
        engine.process_source(&input)
    } else {
        engine.process_document(&input)
    }
    .with_context(|| format!("deobfuscation failed: {}", cli.input.display()))?;

    log::info!("Deobfuscation complete: {result}");

    if cli.stats {
        print_stats(&result);
    }

    if let Some(report_file) = &cli.report {
        write_report(report_file, &cli.input, &code, &result)?;
    }

    println!("{}", viewer_link(viewer_host_path, &code));
    Ok(())
}

fn build_config(cli: &Cli) -> EngineConfig {
    let mut config = EngineConfig::default().with_marker(cli.marker.as_str());
    if let Some(iters) = cli.max_iterations {
        config = config.with_max_iterations(iters);
    }
    config
}

fn write_report(
    report_file: &Path,
    input: &Path,
    code: &str,
    result: &rotascope::DeobfuscationResult,
) -> anyhow::Result<()> {
    let report = build_report(input, code, result);
    let json = serde_json::to_string_pretty(&report)?;
    fs::write(report_file, json)
        .with_context(|| format!("failed to write report: {}", report_file.display()))?;
    eprintln!("Report written to {}", report_file.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn test_build_config() {
        let cli = Cli::try_parse_from([
            "rotascope",
            "page.html",
            "--marker",
            "_0xbeef",
            "--max-iterations",
            "3",
        ])
        .expect("valid arguments");
        let config = build_config(&cli);
        assert_eq!(config.marker, "_0xbeef");
        assert_eq!(config.max_iterations, 3);
    }

    #[test]
    fn test_missing_viewer_path_is_an_error() {
        let cli = Cli::try_parse_from(["rotascope", "page.html", "--viewer-host-path", ""])
            .expect("valid arguments");
        let err = run(&cli).expect_err("empty viewer path must fail");
        assert!(err.to_string().contains("VIEWER_HOST_PATH"));
    }
}
