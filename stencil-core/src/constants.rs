//! Constants and limits for the pack and printf languages

/// Default line length for MIME quoted-printable output (`M`)
pub const MIME_DEFAULT_LINE_LENGTH: usize = 72;

/// Default number of input bytes per line for `u` and `m`
pub const BASE64_DEFAULT_LINE_BYTES: usize = 45;

/// Upper bound on input bytes per UU-encoded line
pub const UU_MAX_LINE_BYTES: usize = 63;

/// Default precision for `%e`, `%f` and `%g`
pub const DEFAULT_FLOAT_PRECISION: usize = 6;

/// Fixed repeats with a count up to this value are unrolled at build time
pub const DEFAULT_UNROLL_LIMIT: usize = 4;

/// Templates shorter than this (in bytes) skip loop recovery
pub const LOOP_RECOVERY_MIN_TEMPLATE_LEN: usize = 64;

/// Minimum number of unrolled directives a repeated run must cover to be rewritten
pub const LOOP_RECOVERY_MIN_UNROLLED: usize = 16;

/// Longest repeating unit (in directives) loop recovery searches for
pub const LOOP_RECOVERY_MAX_UNIT: usize = 32;

/// Entries retained by each process-wide program cache
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Size in bytes of a native pointer for `p` and `P`
pub const POINTER_SIZE: usize = 8;

/// Largest codepoint accepted by `U` (extended six-byte UTF-8 form)
pub const MAX_UTF8_CODEPOINT: u64 = 0x7FFF_FFFF;

/// Byte order of a multi-byte directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// Most significant byte first
    Big,
    /// Least significant byte first
    Little,
}

impl ByteOrder {
    /// Byte order of the host
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }
}
