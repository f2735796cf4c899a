use thiserror::Error;

use crate::script::ParseFailure;

/// The generic Error type, which covers every failure this library can report.
///
/// Only failures that abort a whole run are modelled here. Local failures inside
/// the rewrite loop (a decoder call whose argument is not statically known, an
/// index outside the string table, a loader or decoder shape that was never found)
/// are not errors: the affected node is simply left as it was.
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::ScriptNotFound`] - No inline script carried the deobfuscation marker
/// - [`Error::Parse`] - The target script is not syntactically valid
///
/// ## I/O and External Errors
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::Render`] - The code generator failed to serialize the tree
///
/// # Examples
///
/// ```rust
/// use rotascope::{DeobfuscationEngine, EngineConfig, Error};
///
/// let engine = DeobfuscationEngine::new(EngineConfig::default());
/// match engine.process_document("<html><script>var a = 1;</script></html>") {
///     Ok((code, _)) => println!("{code}"),
///     Err(Error::ScriptNotFound { marker }) => eprintln!("no script containing {marker}"),
///     Err(Error::Parse(failure)) => eprintln!("{failure}\n{}", failure.excerpt()),
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// No inline script in the document contained the marker substring.
    ///
    /// Scripts referenced through a `src` attribute are never considered, only
    /// inline script bodies.
    #[error("could not find an inline script containing `{marker}`")]
    ScriptNotFound {
        /// The marker that was searched for
        marker: String,
    },

    /// The target script could not be parsed.
    ///
    /// The failure carries the parser message, the 1-based line and column,
    /// and an excerpt of the surrounding source for diagnostics.
    #[error("{0}")]
    Parse(ParseFailure),

    /// The code generator failed to write the tree back to text.
    #[error("failed to render script: {0}")]
    Render(std::io::Error),

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur while reading input documents.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}

impl Error {
    /// Returns the parse failure if this error is [`Error::Parse`].
    #[must_use]
    pub fn as_parse_failure(&self) -> Option<&ParseFailure> {
        match self {
            Error::Parse(failure) => Some(failure),
            _ => None,
        }
    }
}
