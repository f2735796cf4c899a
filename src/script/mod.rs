//! Script handling at the boundary of the rewriting core.
//!
//! Everything the rewrite engine needs from the outside world lives here:
//!
//! - [`extract`] locates the obfuscated inline script inside a host document
//! - [`parse`](mod@parse) turns text into a tree, or a [`ParseFailure`] with location context
//! - [`render`] serializes the tree without comments and applies a [`Formatter`]
//!
//! [`JsScript`] ties these together. It owns the source map, the hygiene globals
//! and the tree of one script, and applies scope resolution right after parsing so
//! that every identifier carries the syntax context of the binding it refers to.

pub mod extract;
pub mod parse;
pub mod render;

pub use extract::{find_target_script, inline_scripts, DEFAULT_MARKER};
pub use parse::{ExcerptLine, ParseFailure, SourceExcerpt};
pub use render::{CanonicalFormatter, Formatter};

use swc_core::{
    common::{sync::Lrc, Globals, Mark, SourceMap, SyntaxContext, GLOBALS},
    ecma::{ast::Script, transforms::base::resolver, visit::VisitMutWith},
};

use crate::Result;

/// Environment shared by everything that runs against a [`JsScript`].
#[derive(Clone, Copy)]
pub struct ScriptEnv<'a> {
    /// Source map the script was parsed into
    pub source_map: &'a Lrc<SourceMap>,
    /// Syntax context carried by identifiers that resolve to no binding (globals)
    pub unresolved_ctxt: SyntaxContext,
}

/// A parsed, scope-resolved script.
///
/// # Example
///
/// ```rust
/// use rotascope::script::JsScript;
///
/// let script = JsScript::parse("var answer = 42;")?;
/// assert_eq!(script.ast().body.len(), 1);
/// # Ok::<(), rotascope::Error>(())
/// ```
pub struct JsScript {
    source_map: Lrc<SourceMap>,
    globals: Globals,
    ast: Script,
    unresolved_ctxt: SyntaxContext,
}

impl JsScript {
    /// Parses `source` and resolves the scope of every identifier.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Parse`] if the source is not a valid script.
    pub fn parse(source: &str) -> Result<Self> {
        let source_map: Lrc<SourceMap> = Lrc::default();
        let globals = Globals::new();

        let (ast, unresolved_ctxt) = GLOBALS.set(&globals, || -> Result<_> {
            let mut ast = parse::parse_script(&source_map, source)?;

            let unresolved_mark = Mark::new();
            let top_level_mark = Mark::new();
            ast.visit_mut_with(&mut resolver(unresolved_mark, top_level_mark, false));

            Ok((ast, SyntaxContext::empty().apply_mark(unresolved_mark)))
        })?;

        Ok(Self {
            source_map,
            globals,
            ast,
            unresolved_ctxt,
        })
    }

    /// The script tree.
    #[must_use]
    pub fn ast(&self) -> &Script {
        &self.ast
    }

    /// The source map the script was parsed into.
    #[must_use]
    pub fn source_map(&self) -> &Lrc<SourceMap> {
        &self.source_map
    }

    /// Syntax context of identifiers that do not resolve to any binding.
    #[must_use]
    pub fn unresolved_ctxt(&self) -> SyntaxContext {
        self.unresolved_ctxt
    }

    /// Runs `f` with mutable access to the tree, inside this script's hygiene globals.
    pub fn enter<R>(&mut self, f: impl FnOnce(&mut Script, ScriptEnv<'_>) -> R) -> R {
        let env = ScriptEnv {
            source_map: &self.source_map,
            unresolved_ctxt: self.unresolved_ctxt,
        };
        let ast = &mut self.ast;
        GLOBALS.set(&self.globals, || f(ast, env))
    }

    /// Renders the current tree without comments.
    ///
    /// # Errors
    ///
    /// Returns an error if code generation fails.
    pub fn render(&self) -> Result<String> {
        render::to_code(&self.source_map, &self.ast)
    }
}
