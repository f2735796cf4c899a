//! Main deobfuscation engine.
//!
//! The [`DeobfuscationEngine`] is the main entry point for deobfuscating
//! scripts. It orchestrates extraction, discovery of the string table and its
//! decoder, the fixed-point rewrite loop, final cleanup and rendering.

use std::time::Instant;

use log::{debug, info, warn};
use swc_core::ecma::ast::Script;

use crate::{
    deobfuscation::{
        changes::EventLog,
        config::EngineConfig,
        detection::{find_decoder, find_loader},
        pass::ScriptPass,
        passes::{
            AliasInliningPass, ConstantFoldingPass, DeadCodeEliminationPass,
            DecoderCallResolutionPass, PropertyAccessNormalizationPass,
        },
        result::DeobfuscationResult,
        state::PipelineState,
    },
    script::{find_target_script, render, CanonicalFormatter, Formatter, JsScript, ScriptEnv},
    Error, Result,
};

/// Main deobfuscation engine.
///
/// The engine runs the complete pipeline:
///
/// 1. **Extraction**: Find the first inline script containing the marker
/// 2. **Parsing**: Build the tree and resolve scopes
/// 3. **Rewrite loop**: Until an iteration changes nothing (or the iteration
///    bound is hit): discover the loader and decoder if still missing, then run
///    every enabled rewrite pass in order
/// 4. **Cleanup**: Remove dead declarations and guard stubs, once
/// 5. **Rendering**: Print without comments and apply the formatter
///
/// # APIs
///
/// - [`process_document`](Self::process_document) - HTML document in, code out
/// - [`process_source`](Self::process_source) - Bare script in, code out
/// - [`process_script`](Self::process_script) - Rewrites an already parsed script
///
/// # Example
///
/// ```rust
/// use rotascope::deobfuscation::{DeobfuscationEngine, EngineConfig};
///
/// let engine = DeobfuscationEngine::new(EngineConfig::default());
/// let (code, result) = engine.process_source("var a = 1 + 2; use(a);")?;
///
/// assert_eq!(code, "use(3);\n");
/// println!("{}", result.summary());
/// # Ok::<(), rotascope::Error>(())
/// ```
pub struct DeobfuscationEngine {
    /// Configuration.
    config: EngineConfig,
    /// Rewrite passes, in the order they run on every iteration.
    rewrite_passes: Vec<Box<dyn ScriptPass>>,
    /// Runs once after the loop.
    cleanup_pass: DeadCodeEliminationPass,
    /// Applied to the rendered output.
    formatter: Box<dyn Formatter>,
}

impl Default for DeobfuscationEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl DeobfuscationEngine {
    /// Creates a new engine with the given configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Engine configuration controlling the iteration bound,
    ///   enabled passes and cleanup.
    ///
    /// # Returns
    ///
    /// A new `DeobfuscationEngine` using the [`CanonicalFormatter`].
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let mut rewrite_passes: Vec<Box<dyn ScriptPass>> = Vec::new();
        if config.enable_decoder_resolution {
            rewrite_passes.push(Box::new(DecoderCallResolutionPass::new()));
        }
        if config.enable_constant_folding {
            rewrite_passes.push(Box::new(ConstantFoldingPass::new()));
        }
        if config.enable_inlining {
            rewrite_passes.push(Box::new(AliasInliningPass::new()));
        }
        if config.enable_property_normalization {
            rewrite_passes.push(Box::new(PropertyAccessNormalizationPass::new()));
        }

        let cleanup_pass = DeadCodeEliminationPass::with_config(config.cleanup.clone());

        Self {
            config,
            rewrite_passes,
            cleanup_pass,
            formatter: Box::new(CanonicalFormatter),
        }
    }

    /// Replaces the formatter applied to the rendered output.
    #[must_use]
    pub fn with_formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Names of the rewrite passes, in execution order.
    #[must_use]
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.rewrite_passes.iter().map(|pass| pass.name()).collect()
    }

    /// Extracts the target script from `document` and deobfuscates it.
    ///
    /// # Arguments
    ///
    /// * `document` - An HTML document with the obfuscated inline script.
    ///
    /// # Returns
    ///
    /// The formatted code and a [`DeobfuscationResult`] describing the run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ScriptNotFound`] if no inline script contains the
    /// configured marker, [`Error::Parse`] if the script does not parse, or a
    /// rendering or formatting error.
    pub fn process_document(&self, document: &str) -> Result<(String, DeobfuscationResult)> {
        let source = find_target_script(document, &self.config.marker).ok_or_else(|| {
            Error::ScriptNotFound {
                marker: self.config.marker.clone(),
            }
        })?;
        info!("Found target script tag, proceeding with parsing...");

        self.process_source(source)
    }

    /// Deobfuscates a bare script.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if `source` does not parse, or a rendering or
    /// formatting error.
    pub fn process_source(&self, source: &str) -> Result<(String, DeobfuscationResult)> {
        let mut script = JsScript::parse(source)?;
        let result = self.process_script(&mut script)?;
        let code = self.formatter.format(script.render()?)?;

        Ok((code, result))
    }

    /// Runs the rewrite loop and the cleanup pass over a parsed script.
    ///
    /// The script is rewritten in place; render it afterwards to obtain the
    /// code. No formatter is applied here.
    ///
    /// # Errors
    ///
    /// Returns an error if the intermediate rendering used for change detection
    /// fails.
    pub fn process_script(&self, script: &mut JsScript) -> Result<DeobfuscationResult> {
        let start = Instant::now();
        info!("Starting deobfuscation passes...");

        let (events, state) = script.enter(|ast, env| self.run_pipeline(ast, env))?;

        let mut result = DeobfuscationResult::new(events)
            .with_timing(start.elapsed(), state.iterations());
        result.reached_fixed_point = !state.changed();
        result.loader = state.loader().map(|loader| loader.name.clone());
        result.table_len = state.table().map_or(0, |table| table.len());
        result.decoder = state.decoder().cloned();

        debug!("{}", result.summary());
        Ok(result)
    }

    fn run_pipeline(
        &self,
        ast: &mut Script,
        env: ScriptEnv<'_>,
    ) -> Result<(EventLog, PipelineState)> {
        let events = EventLog::new();
        let mut state = PipelineState::new();

        loop {
            let before = render::to_code(env.source_map, ast)?;

            if !state.decoder_found() {
                Self::discover(ast, &mut state);
            }

            let snapshot = state.snapshot(env.unresolved_ctxt);
            for pass in &self.rewrite_passes {
                if !pass.should_run(&snapshot) {
                    continue;
                }
                let pass_events = pass.run(ast, &snapshot);
                debug!("{}: {}", pass.name(), pass_events.summary());
                events.merge(&pass_events);
            }

            let after = render::to_code(env.source_map, ast)?;
            let changed = before != after;
            state.complete_iteration(changed);
            info!(
                "Pass {} completed. Changes detected: {changed}",
                state.iterations()
            );

            if !changed {
                break;
            }
            if state.iterations() >= self.config.max_iterations {
                warn!(
                    "Stopping after {} iterations without reaching a fixed point",
                    state.iterations()
                );
                break;
            }
        }

        match (state.loader(), state.decoder()) {
            (Some(loader), None) => warn!(
                "Found string array loader {} but no decoder; decoder calls left in place",
                loader.name
            ),
            (None, _) => info!("No string array loader found"),
            _ => {}
        }

        let snapshot = state.snapshot(env.unresolved_ctxt);
        if self.cleanup_pass.should_run(&snapshot) {
            info!("Performing final dead code removal pass...");
            let cleanup = self.cleanup_pass.run(ast, &snapshot);
            debug!("{}: {}", self.cleanup_pass.name(), cleanup.summary());
            events.merge(&cleanup);
        }

        render::fix_parens(ast);
        Ok((events, state))
    }

    /// Looks for the loader (until latched) and then the decoder.
    fn discover(ast: &Script, state: &mut PipelineState) {
        if state.loader().is_none() {
            if let Some(loader) = find_loader(ast) {
                info!(
                    "Found string array loader: {} (length: {})",
                    loader.name,
                    loader.table.len()
                );
                state.latch_loader(loader);
            }
        }

        let Some(loader_name) = state.loader().map(|loader| loader.name.clone()) else {
            return;
        };
        if let Some(decoder) = find_decoder(ast, &loader_name) {
            info!(
                "Found decoder: {}, Offset: {}",
                decoder.name(),
                decoder.offset()
            );
            state.latch_decoder(decoder);
        }
    }
}
