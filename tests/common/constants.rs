//! Shared constants for end-to-end tests

/// Admin key configured on every test server
pub const TEST_ADMIN_KEY: &str = "test-admin-key";

/// Per-file upload ceiling configured on every test server (small, so the
/// oversized-upload path is cheap to exercise)
pub const TEST_MAX_FILE_SIZE: u64 = 64 * 1024;

/// Request timeout for the test client
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// A tiny payload with an MP3 magic prefix, accepted by the blob adapter
pub const AUDIO_BYTES: &[u8] = &[0x49, 0x44, 0x33, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

/// A tiny payload with a JPEG magic prefix
pub const IMAGE_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];
