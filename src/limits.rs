//! Resource limits enforced by the reader on every length-bearing
//! operation.

/// Resource ceilings consulted by the reader. See spec §5 for the profile
/// numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Reject a top-level message longer than this many bytes.
    pub max_message_size: usize,
    /// Reject nested records deeper than this.
    pub max_depth: usize,
    /// Reject a string field longer than this many bytes.
    pub max_string_length: usize,
    /// Reject a byte-sequence field longer than this many bytes.
    pub max_bytes_length: usize,
    /// Reject a sequence with more than this many elements.
    pub max_array_length: usize,
    /// Reject a map with more than this many entries.
    pub max_map_size: usize,
    /// If true, string fields are validated as well-formed UTF-8.
    pub validate_utf8: bool,
    /// If true, an unknown field number fails decoding instead of being
    /// skipped.
    pub strict_unknown_fields: bool,
}

impl Limits {
    /// Secure profile: tight ceilings for untrusted input.
    pub const fn secure() -> Self {
        Limits {
            max_message_size: 1 << 20,      // 1 MiB
            max_depth: 32,
            max_string_length: 1 << 20,     // 1 MiB
            max_bytes_length: 10 << 20,     // 10 MiB
            max_array_length: 10_000,
            max_map_size: 10_000,
            validate_utf8: true,
            strict_unknown_fields: false,
        }
    }

    /// Permissive "default" profile for trusted pipelines.
    pub const fn default_profile() -> Self {
        Limits {
            max_message_size: 64 << 20,     // 64 MiB
            max_depth: 100,
            max_string_length: 10 << 20,    // 10 MiB
            max_bytes_length: 100 << 20,    // 100 MiB
            max_array_length: 1_000_000,
            max_map_size: 1_000_000,
            validate_utf8: true,
            strict_unknown_fields: false,
        }
    }

    /// Same ceilings as [`Limits::secure`], with `strict_unknown_fields`
    /// enabled. spec §6 lists "strict" among the named limits profiles
    /// without defining its numbers; this crate treats it as the secure
    /// profile made stricter about unknown fields (see DESIGN.md).
    pub const fn strict() -> Self {
        let mut limits = Limits::secure();
        limits.strict_unknown_fields = true;
        limits
    }

    /// Same ceilings as [`Limits::default_profile`]. Disabling
    /// determinism is an encoder-side concern (see
    /// [`crate::EncodeOptions`]); this profile exists only to name the
    /// limits a throughput-oriented pipeline would otherwise pick, which
    /// match the permissive defaults.
    pub const fn fast() -> Self {
        Limits::default_profile()
    }
}

impl Default for Limits {
    fn default() -> Self {
        Limits::secure()
    }
}
