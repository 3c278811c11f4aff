//! Configuration for ObjectMapper
//!
//! Provides a builder pattern for configuring the object mapper.

/// Default maximum nesting depth for relations
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Configuration for the object mapper
#[derive(Debug, Clone)]
pub struct MapperConfig {
    /// Maximum relation depth for projection and hydration (default: 32)
    pub max_depth: usize,
    /// Whether a single failing field aborts the whole call (default: false)
    pub strict: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            strict: false,
        }
    }
}

impl MapperConfig {
    /// Create a new configuration builder
    pub fn builder() -> MapperConfigBuilder {
        MapperConfigBuilder::new()
    }
}

/// Builder for MapperConfig
#[derive(Debug)]
pub struct MapperConfigBuilder {
    max_depth: usize,
    strict: bool,
}

impl Default for MapperConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MapperConfigBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            strict: false,
        }
    }

    /// Set the maximum relation depth (default: 32)
    ///
    /// The top-level object is depth 0; a depth of 0 disables nested
    /// relations entirely.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Enable or disable strict mode (default: false)
    pub fn strict(mut self, enabled: bool) -> Self {
        self.strict = enabled;
        self
    }

    /// Build the configuration
    pub fn build(self) -> MapperConfig {
        MapperConfig {
            max_depth: self.max_depth,
            strict: self.strict,
        }
    }
}
