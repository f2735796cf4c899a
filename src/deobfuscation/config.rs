//! Configuration for the deobfuscation engine.
//!
//! This module provides configuration types for controlling the rewrite
//! pipeline: the iteration bound, the marker used to find the target script,
//! pass selection and final cleanup.

use crate::script::DEFAULT_MARKER;

/// Default bound on rewrite-loop iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Configuration for the deobfuscation engine.
///
/// Every pass is enabled by default. Disabling a pass removes it from the
/// rewrite loop; the remaining passes still run in their fixed order.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum iterations of the rewrite loop (default: 10).
    pub max_iterations: usize,

    /// Substring identifying the obfuscated inline script (default: `_0x`).
    pub marker: String,

    /// Enable decoder call resolution.
    pub enable_decoder_resolution: bool,

    /// Enable constant folding.
    pub enable_constant_folding: bool,

    /// Enable inlining of constant bindings with literal initializers.
    pub enable_inlining: bool,

    /// Enable rewriting of `obj["name"]` to `obj.name`.
    pub enable_property_normalization: bool,

    /// Final cleanup configuration.
    pub cleanup: CleanupConfig,
}

/// Configuration for the cleanup pass that runs once after the rewrite loop.
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// Remove variable declarators and function declarations nothing refers to.
    pub remove_unreferenced: bool,

    /// Remove anti-analysis guard stubs: IIFEs whose body starts with a
    /// `while` loop.
    pub remove_guard_stubs: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            remove_unreferenced: true,
            remove_guard_stubs: true,
        }
    }
}

impl CleanupConfig {
    /// Creates a new cleanup configuration with all options enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration with all cleanup disabled.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            remove_unreferenced: false,
            remove_guard_stubs: false,
        }
    }

    /// Returns true if any cleanup is enabled.
    #[must_use]
    pub fn any_enabled(&self) -> bool {
        self.remove_unreferenced || self.remove_guard_stubs
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            marker: DEFAULT_MARKER.to_string(),
            enable_decoder_resolution: true,
            enable_constant_folding: true,
            enable_inlining: true,
            enable_property_normalization: true,
            cleanup: CleanupConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Creates a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of iterations.
    ///
    /// # Arguments
    ///
    /// * `max` - The maximum number of rewrite-loop iterations.
    ///
    /// # Returns
    ///
    /// The modified configuration (builder pattern).
    #[must_use]
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Sets the marker that identifies the target script.
    #[must_use]
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Selects which rewrite passes run.
    ///
    /// # Arguments
    ///
    /// * `decoder_resolution` - Replace decoder calls with table entries.
    /// * `constant_folding` - Fold statically known expressions.
    /// * `inlining` - Inline constant literal bindings.
    /// * `property_normalization` - Rewrite computed access to dot access.
    #[must_use]
    pub fn with_passes(
        mut self,
        decoder_resolution: bool,
        constant_folding: bool,
        inlining: bool,
        property_normalization: bool,
    ) -> Self {
        self.enable_decoder_resolution = decoder_resolution;
        self.enable_constant_folding = constant_folding;
        self.enable_inlining = inlining;
        self.enable_property_normalization = property_normalization;
        self
    }

    /// Sets the cleanup configuration.
    #[must_use]
    pub fn with_cleanup(mut self, cleanup: CleanupConfig) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Returns true if every rewrite pass is enabled.
    #[must_use]
    pub fn all_passes_enabled(&self) -> bool {
        self.enable_decoder_resolution
            && self.enable_constant_folding
            && self.enable_inlining
            && self.enable_property_normalization
    }
}
