//! Configuration for archive reading.

/// Limits applied while reading untrusted archive input.
///
/// Archive headers are attacker-controlled: they can declare absurd name
/// lengths, nest compression filters arbitrarily deep, or carry oversized
/// extended metadata. `ReadConfig` bounds all of that up front.
///
/// # Examples
///
/// ```
/// use arcread_core::ReadConfig;
///
/// // Secure defaults
/// let config = ReadConfig::default();
///
/// // Customize for specific needs
/// let custom = ReadConfig {
///     max_filter_depth: 2,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct ReadConfig {
    /// Maximum number of nested compression filters resolved during open.
    pub max_filter_depth: usize,

    /// Maximum length of an entry name in bytes.
    pub max_name_len: usize,

    /// Maximum size of per-entry extended metadata (PAX records, zip
    /// extra fields) in bytes.
    pub max_meta_len: usize,
}

impl Default for ReadConfig {
    /// Creates a `ReadConfig` with conservative defaults.
    ///
    /// Default values:
    /// - `max_filter_depth`: 4 (covers every chain seen in practice,
    ///   e.g. `.tar.gz.xz` is depth 2)
    /// - `max_name_len`: 4096
    /// - `max_meta_len`: 1 MiB
    fn default() -> Self {
        Self {
            max_filter_depth: 4,
            max_name_len: 4096,
            max_meta_len: 1024 * 1024,
        }
    }
}

impl ReadConfig {
    /// Creates a permissive configuration for trusted archives.
    ///
    /// Raises every limit well past what legitimate archives use. Only
    /// for input from trusted sources.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            max_filter_depth: 16,
            max_name_len: 64 * 1024,
            max_meta_len: 64 * 1024 * 1024,
        }
    }
}
