//! Serialization of the tree back to text.
//!
//! Rendering never emits comments. The same renderer is used for the final
//! output and for the change detection inside the rewrite loop, so two trees
//! compare equal exactly when they would print identically.

use swc_core::{
    common::{sync::Lrc, SourceMap},
    ecma::{
        ast::Script,
        codegen::{text_writer::JsWriter, Config, Emitter},
        transforms::base::fixer::fixer,
        visit::VisitMutWith,
    },
};

use crate::{Error, Result};

/// Renders a script to source text without comments.
///
/// # Errors
///
/// Returns [`Error::Render`] if the code generator fails, or [`Error::Error`] if
/// the generated bytes are not valid UTF-8.
pub fn to_code(source_map: &Lrc<SourceMap>, script: &Script) -> Result<String> {
    let mut buf = Vec::new();
    {
        let writer = JsWriter::new(source_map.clone(), "\n", &mut buf, None);
        let mut emitter = Emitter {
            cfg: Config::default(),
            cm: source_map.clone(),
            comments: None,
            wr: writer,
        };
        emitter.emit_script(script).map_err(Error::Render)?;
    }

    String::from_utf8(buf).map_err(|e| Error::Error(format!("generated code is not UTF-8: {e}")))
}

/// Inserts the parentheses that rewritten subtrees need to keep their
/// precedence when printed, e.g. `(-5) ** 2` after inlining `-5` as a base.
///
/// Must run inside the script's hygiene globals.
pub fn fix_parens(script: &mut Script) {
    script.visit_mut_with(&mut fixer(None));
}

/// Turns rendered code into its final, canonically styled form.
///
/// The engine hands the rendered tree to a formatter as the very last step.
/// Implementations must not change the meaning of the code.
pub trait Formatter: Send + Sync {
    /// Formats `code`.
    ///
    /// # Errors
    ///
    /// Returns an error if the code cannot be formatted.
    fn format(&self, code: String) -> Result<String>;
}

/// The default formatter.
///
/// The code generator already produces consistently indented output, so this
/// only normalizes line endings, strips trailing whitespace and guarantees a
/// single trailing newline.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn format(&self, code: String) -> Result<String> {
        let mut out = String::with_capacity(code.len() + 1);
        for line in code.lines() {
            out.push_str(line.trim_end());
            out.push('\n');
        }

        while out.ends_with("\n\n") {
            out.pop();
        }

        Ok(out)
    }
}
