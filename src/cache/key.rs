use sha2::{Digest, Sha256};

/// Deterministic cache key for a request descriptor.
///
/// Parameter order matters: the same parameters in a different order give a
/// different key.
pub fn cache_key(base_url: &str, path: &str, query: &[(String, String)]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(base_url.as_bytes());
    hasher.update([0u8]);
    hasher.update(path.as_bytes());
    for (k, v) in query {
        hasher.update([0u8]);
        hasher.update(k.as_bytes());
        hasher.update([b'=']);
        hasher.update(v.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// SHA-256 hex digest of a stored value.
pub fn checksum(value: &[u8]) -> String {
    format!("{:x}", Sha256::digest(value))
}
