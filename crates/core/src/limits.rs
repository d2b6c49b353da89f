//! Size constants referenced by more than one crate.

/// Default slots per MAL bucket, `2^16`.
pub const DEFAULT_BUCKET_LEN: u64 = 1 << 16;

/// Default directory size: max addressable slots is
/// `DEFAULT_BUCKET_LEN * DEFAULT_DIRECTORY_LEN`.
pub const DEFAULT_DIRECTORY_LEN: u64 = 1 << 20;

/// Maximum payload length for a single record (`L <= 2^16 - 1`).
pub const MAX_RECORD_LEN: usize = u16::MAX as usize;

/// Default RPC listen port.
pub const DEFAULT_PORT: u16 = 9090;
