// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]

//! # rotascope
//!
//! Recovers readable JavaScript from scripts hidden behind rotation-indexed
//! string-table obfuscation, the scheme where every string literal lives in an
//! array behind a self-replacing loader, and is only ever read through a
//! decoder call such as `_0x2b(0x1a3)`.
//!
//! The core is a bounded, fixed-point AST rewriting engine: it recognizes the
//! loader and decoder, replaces decoder calls with the strings they return,
//! folds constants, inlines literal aliases and normalizes property access until
//! an iteration changes nothing, then removes the dead scaffolding.
//!
//! ## Features
//!
//! - **Shape-based discovery** - Finds the string table and decoder offset from
//!   the structure of the code, not from identifier names
//! - **Scope-aware rewriting** - Every identifier is resolved to its binding, so
//!   shadowed names are never confused with the decoder or its aliases
//! - **Static evaluation** - ECMAScript semantics for arithmetic, string
//!   operations and a whitelist of pure built-ins, without running any code
//! - **Bounded** - The rewrite loop stops at a fixed point or after a
//!   configurable number of iterations, whichever comes first
//!
//! ## Quick Start
//!
//! ```rust
//! use rotascope::{DeobfuscationEngine, EngineConfig};
//!
//! let document = r#"<html><script>
//!     function _0xa() {
//!         var d = ['hello', 'log'];
//!         _0xa = function () { return d; };
//!         return _0xa();
//!     }
//!     function _0xb(e, f) {
//!         var c = _0xa();
//!         return _0xb = function (g, h) {
//!             g = g - 0x10;
//!             var i = c[g];
//!             return i;
//!         }, _0xb(e, f);
//!     }
//!     console[_0xb(0x11)](_0xb(0x10));
//! </script></html>"#;
//!
//! let engine = DeobfuscationEngine::new(EngineConfig::default());
//! let (code, result) = engine.process_document(document)?;
//!
//! assert!(code.contains(r#"console.log("hello");"#));
//! assert_eq!(result.strings_decoded(), 2);
//! # Ok::<(), rotascope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`script`] - Extraction of the target script from a document, parsing with
//!   scope resolution, rendering and formatting
//! - [`deobfuscation`] - Discovery, bindings, static evaluation, the rewrite
//!   passes and the [`DeobfuscationEngine`] that runs them
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, Error>`](Result). A parse failure
//! carries the location and an excerpt of the surrounding source:
//!
//! ```rust
//! use rotascope::{script::JsScript, Error};
//!
//! match JsScript::parse("var _0x1 = ;") {
//!     Err(Error::Parse(failure)) => {
//!         assert_eq!(failure.line(), 1);
//!         eprintln!("{failure}\n{}", failure.excerpt());
//!     }
//!     other => panic!("expected a parse failure, got {:?}", other.err()),
//! }
//! ```
//!
//! Nothing that happens inside the rewrite loop is an error. A decoder call that
//! cannot be resolved, or a script without any string table, is left as is.

pub(crate) mod error;

pub mod deobfuscation;
pub mod script;

/// `rotascope` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
///
/// # Examples
///
/// ```rust
/// use rotascope::{script::JsScript, Result};
///
/// fn statement_count(source: &str) -> Result<usize> {
///     Ok(JsScript::parse(source)?.ast().body.len())
/// }
/// # assert_eq!(statement_count("a(); b();").unwrap(), 2);
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `rotascope` Error type
///
/// The main error type for all operations in this crate.
pub use error::Error;

/// Main entry point for deobfuscation.
///
/// See [`deobfuscation::DeobfuscationEngine`] for the pipeline it runs.
pub use deobfuscation::{DeobfuscationEngine, DeobfuscationResult, EngineConfig};

pub use script::{JsScript, ParseFailure};
