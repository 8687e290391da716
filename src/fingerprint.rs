use base64::{engine::general_purpose::STANDARD, Engine};
use sha2::{Digest, Sha256};

/// SHA-256 over the base64 (standard alphabet, padded) encoding of `content`,
/// rendered as lowercase hex.
///
/// Hashing the encoded form instead of the raw bytes keeps the digests
/// comparable with logs produced by earlier mirror runs.
pub fn fingerprint(content: &[u8]) -> String {
    let encoded = STANDARD.encode(content);
    hex::encode(Sha256::digest(encoded.as_bytes()))
}
