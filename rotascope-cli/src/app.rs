use std::path::PathBuf;

use clap::Parser;
use rotascope::script::DEFAULT_MARKER;

/// rotascope - recover scripts hidden behind rotation-indexed string tables
///
/// Deobfuscates the first inline script of an HTML page that contains the
/// marker, and prints a `file://` link that opens the result in the AST viewer.
#[derive(Debug, Parser)]
#[command(name = "rotascope", version, about, long_about = None)]
pub struct Cli {
    /// Path to the HTML document (or bare script with --raw).
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Host-visible path of the AST viewer page the printed link points to.
    #[arg(long, env = "VIEWER_HOST_PATH", value_name = "PATH")]
    pub viewer_host_path: Option<String>,

    /// Treat the input as a bare script instead of an HTML document.
    #[arg(long)]
    pub raw: bool,

    /// Substring that identifies the obfuscated inline script.
    #[arg(long, value_name = "TEXT", default_value = DEFAULT_MARKER)]
    pub marker: String,

    /// Maximum number of rewrite-loop iterations.
    #[arg(long, value_name = "N")]
    pub max_iterations: Option<usize>,

    /// Print a table of rewrites by kind to stderr.
    #[arg(long)]
    pub stats: bool,

    /// Write a JSON report of the run to FILE.
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["rotascope", "page.html", "--viewer-host-path", "/srv/viewer.html"])
            .expect("valid arguments");
        assert_eq!(cli.marker, "_0x");
        assert!(!cli.raw);
        assert_eq!(cli.max_iterations, None);
        assert_eq!(cli.viewer_host_path.as_deref(), Some("/srv/viewer.html"));
    }

    #[test]
    fn test_input_is_required() {
        assert!(Cli::try_parse_from(["rotascope"]).is_err());
    }
}
