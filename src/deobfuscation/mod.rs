//! Deobfuscation of rotation-indexed string-table scripts.
//!
//! Obfuscators of this family move every string literal into an array returned
//! by a self-replacing *loader* function, and read entries back only through a
//! *decoder* that subtracts a constant offset from its argument. Call sites are
//! further hidden behind aliases of the decoder and hex-like arithmetic.
//! This module undoes that by rewriting the tree until nothing changes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     Deobfuscation Pipeline                       │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  Input: JsScript (parsed, scope-resolved)                        │
//! │           │                                                      │
//! │           ▼                                                      │
//! │  ┌────────────────────────────────────────────────────────────┐  │
//! │  │                 Rewrite Loop (bounded)                     │  │
//! │  │  Discovery (until found): loader → string table            │  │
//! │  │                           decoder → offset                 │  │
//! │  │  Passes, in order:                                         │  │
//! │  │  • Decoder call resolution                                 │  │
//! │  │  • Constant folding                                        │  │
//! │  │  • Alias inlining                                          │  │
//! │  │  • Property access normalization                           │  │
//! │  │  Repeat while the rendered script changes                  │  │
//! │  └──────────────────────────┬─────────────────────────────────┘  │
//! │                             ▼                                    │
//! │  ┌────────────────────────────────────────────────────────────┐  │
//! │  │  Dead code elimination (once)                              │  │
//! │  └──────────────────────────┬─────────────────────────────────┘  │
//! │                             ▼                                    │
//! │  Output: rewritten tree + DeobfuscationResult                    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Components
//!
//! - [`DeobfuscationEngine`] owns the pass list and runs the pipeline
//! - [`detection`] recognizes the loader and decoder shapes
//! - [`BindingTable`] answers "is this constant, and who reads it" for one
//!   snapshot of the tree
//! - [`Evaluator`] computes values of expressions without running them
//! - [`DecoderAliasResolver`] decides whether a callee is the decoder
//! - [`passes`] holds the rewrites themselves
//! - [`EventLog`] records every rewrite for the final [`DeobfuscationResult`]
//!
//! # Usage
//!
//! ```rust
//! use rotascope::deobfuscation::{DeobfuscationEngine, EngineConfig};
//!
//! let config = EngineConfig::default().with_max_iterations(5);
//! let engine = DeobfuscationEngine::new(config);
//!
//! let (code, result) = engine.process_source(r#"var s = "a" + "b"; f(s["length"]);"#)?;
//! assert_eq!(code, "f(2);\n");
//! assert!(result.reached_fixed_point);
//! # Ok::<(), rotascope::Error>(())
//! ```

mod alias;
mod bindings;
mod changes;
mod config;
pub mod detection;
mod engine;
mod evaluate;
mod pass;
pub mod passes;
mod result;
mod state;

pub use alias::DecoderAliasResolver;
pub use bindings::{is_inlinable_literal, Binding, BindingKind, BindingTable};
pub use changes::{Event, EventBuilder, EventKind, EventLog};
pub use config::{CleanupConfig, EngineConfig, DEFAULT_MAX_ITERATIONS};
pub use detection::{DecoderInfo, LoaderShape, ShapeMatch, StringTable};
pub use engine::DeobfuscationEngine;
pub use evaluate::{Evaluation, Evaluator, JsValue};
pub use pass::ScriptPass;
pub use result::DeobfuscationResult;
pub use state::{DecoderContext, IterationState, PipelineState};
