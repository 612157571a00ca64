//! Request identity key generation.

use sha2::{Digest, Sha256};

use super::entry::CacheRequest;

/// Compute the identity key of a request: method plus fragment-free URL.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Identity key of a [`CacheRequest`].
pub fn request_key(request: &CacheRequest) -> String {
    compute_request_key(&request.method, request.url.as_str())
}
