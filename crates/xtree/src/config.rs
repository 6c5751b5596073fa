//! Parser configuration

#[cfg(feature = "serde")]
use serde::Serialize;

/// Configuration for a single parse
///
/// `trim_whitespace` is interpreted by the tree builder. The namespace and
/// entity flags are handed to the token-level reader as-is, and the limits
/// are enforced there too.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Config {
    /// Trim leading/trailing whitespace from element values on end tags
    pub trim_whitespace: bool,
    /// Report local names and strip `xmlns` declarations
    pub process_namespaces: bool,
    /// Report prefix mappings (only with `process_namespaces`)
    pub report_namespace_prefixes: bool,
    /// Load `SYSTEM` entities from the file system
    pub resolve_external_entities: bool,
    /// Maximum element nesting depth (0 means unlimited)
    pub max_depth: u16,
    /// Maximum input size in bytes (0 means unlimited)
    pub max_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trim_whitespace: true,
            process_namespaces: false,
            report_namespace_prefixes: false,
            resolve_external_entities: false,
            max_depth: 256,
            max_size: 10 * 1024 * 1024, // 10 MB default
        }
    }
}

impl Config {
    /// Default settings with both limits lifted
    pub const fn unlimited() -> Self {
        Self {
            trim_whitespace: true,
            process_namespaces: false,
            report_namespace_prefixes: false,
            resolve_external_entities: false,
            max_depth: 0,
            max_size: 0,
        }
    }

    pub const fn with_trim_whitespace(mut self, trim: bool) -> Self {
        self.trim_whitespace = trim;
        self
    }

    pub const fn with_process_namespaces(mut self, enabled: bool) -> Self {
        self.process_namespaces = enabled;
        self
    }

    pub const fn with_report_namespace_prefixes(mut self, enabled: bool) -> Self {
        self.report_namespace_prefixes = enabled;
        self
    }

    pub const fn with_resolve_external_entities(mut self, enabled: bool) -> Self {
        self.resolve_external_entities = enabled;
        self
    }

    pub const fn with_max_depth(mut self, max_depth: u16) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub const fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }
}
