//! Pipeline state carried across rewrite-loop iterations.
//!
//! [`PipelineState`] is owned by the engine for the duration of one run. Its
//! discovery fields (the loader with its string table, and the decoder) are
//! latched: once set they never change for the rest of the run.
//!
//! Passes never see the pipeline state directly. At the start of every
//! iteration the engine takes an [`IterationState`] snapshot, which is all a
//! pass gets besides the tree.

use log::warn;
use swc_core::common::SyntaxContext;

use crate::deobfuscation::detection::{DecoderInfo, LoaderShape, StringTable};

/// Run-wide state of the rewrite loop.
#[derive(Debug, Default)]
pub struct PipelineState {
    loader: Option<LoaderShape>,
    decoder: Option<DecoderInfo>,
    iterations: usize,
    changed: bool,
}

impl PipelineState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The latched loader, if found.
    #[must_use]
    pub fn loader(&self) -> Option<&LoaderShape> {
        self.loader.as_ref()
    }

    /// The latched decoder, if found.
    #[must_use]
    pub fn decoder(&self) -> Option<&DecoderInfo> {
        self.decoder.as_ref()
    }

    /// The captured string table, if the loader was found.
    #[must_use]
    pub fn table(&self) -> Option<&StringTable> {
        self.loader.as_ref().map(|loader| &loader.table)
    }

    /// Returns `true` once both the loader and the decoder are latched.
    #[must_use]
    pub fn decoder_found(&self) -> bool {
        self.loader.is_some() && self.decoder.is_some()
    }

    /// Latches the loader. Later calls are ignored.
    pub fn latch_loader(&mut self, loader: LoaderShape) {
        if self.loader.is_none() {
            self.loader = Some(loader);
        } else {
            warn!("Ignoring second loader `{}`; table already captured", loader.name);
        }
    }

    /// Latches the decoder. Later calls are ignored.
    pub fn latch_decoder(&mut self, decoder: DecoderInfo) {
        if self.decoder.is_none() {
            self.decoder = Some(decoder);
        } else {
            warn!("Ignoring second decoder `{}`", decoder.name());
        }
    }

    /// Number of completed iterations.
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Whether the last completed iteration changed the tree.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Records the end of an iteration.
    pub fn complete_iteration(&mut self, changed: bool) {
        self.iterations += 1;
        self.changed = changed;
    }

    /// Takes the snapshot handed to passes for the next iteration.
    #[must_use]
    pub fn snapshot(&self, unresolved_ctxt: SyntaxContext) -> IterationState<'_> {
        let decoder = match (&self.loader, &self.decoder) {
            (Some(loader), Some(info)) => Some(DecoderContext {
                info,
                table: &loader.table,
            }),
            _ => None,
        };

        IterationState {
            iteration: self.iterations + 1,
            decoder,
            unresolved_ctxt,
        }
    }
}

/// The decoder and the table it indexes.
#[derive(Debug, Clone, Copy)]
pub struct DecoderContext<'a> {
    /// Decoder name and offset
    pub info: &'a DecoderInfo,
    /// String table captured from the loader
    pub table: &'a StringTable,
}

/// Read-only state handed to every pass of one iteration.
#[derive(Debug, Clone, Copy)]
pub struct IterationState<'a> {
    /// 1-based iteration number
    pub iteration: usize,
    /// Present once the decoder has been found
    pub decoder: Option<DecoderContext<'a>>,
    /// Syntax context of identifiers that resolve to globals
    pub unresolved_ctxt: SyntaxContext,
}

impl<'a> IterationState<'a> {
    /// Creates a snapshot without decoder information.
    #[must_use]
    pub fn without_decoder(iteration: usize, unresolved_ctxt: SyntaxContext) -> Self {
        Self {
            iteration,
            decoder: None,
            unresolved_ctxt,
        }
    }
}
