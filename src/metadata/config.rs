//! Decoder configuration.

/// Controls how strictly a tables stream is decoded and how deep nested-type chains may go.
///
/// # Examples
///
/// ```rust
/// use cilmeta::metadata::config::MetadataConfig;
///
/// let config = MetadataConfig::strict();
/// assert!(!config.allow_unknown_tables);
/// assert_eq!(config.max_nesting_depth, 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataConfig {
    /// Accept valid-mask bits that name no defined table.
    ///
    /// Their row counts are consumed from the header; since their row layout is unknown the
    /// bytes after the known tables are carried along as opaque trailing data.
    pub allow_unknown_tables: bool,

    /// Reject a non-zero reserved header field and major versions other than 1 or 2.
    pub strict_header: bool,

    /// Maximum depth of nested-type chains before traversal reports a recursion limit
    pub max_nesting_depth: usize,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            allow_unknown_tables: true,
            strict_header: false,
            max_nesting_depth: 64,
        }
    }
}

impl MetadataConfig {
    /// Rejects everything outside of the published format
    #[must_use]
    pub fn strict() -> Self {
        Self {
            allow_unknown_tables: false,
            strict_header: true,
            max_nesting_depth: 64,
        }
    }

    /// Accepts any header that can be laid out, same as the default
    #[must_use]
    pub fn lenient() -> Self {
        Self::default()
    }
}
