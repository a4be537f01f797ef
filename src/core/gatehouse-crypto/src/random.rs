//! Random secrets, drawn from the operating system's CSPRNG.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{rngs::OsRng, RngCore};

/// Returns `len` random bytes.
pub fn generate_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Encodes `byte_len` random bytes as unpadded URL-safe base64, for use
/// as an application secret in configuration files or the environment.
pub fn generate_token(byte_len: usize) -> String {
    URL_SAFE_NO_PAD.encode(generate_bytes(byte_len))
}
