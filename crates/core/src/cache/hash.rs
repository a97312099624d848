//! Request identity hashing for cache entry keys.

use sha2::{Digest, Sha256};

/// Compute the entry key for a request identity (method + URL).
///
/// The method is expected to be upper case already; the URL should be the
/// serialized absolute URL so equivalent spellings share a key.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
