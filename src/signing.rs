use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "X-Signature-SHA256";

type HmacSha256 = Hmac<Sha256>;

/// Compute the hex HMAC-SHA256 of `body` keyed by `secret`.
///
/// `body` must be the exact bytes placed in the request; signing a
/// re-serialized copy breaks verification on the receiver.
pub fn sign(body: &[u8], secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Value of the signature header for an endpoint, if it has a secret.
/// An empty secret counts as none.
pub(crate) fn signature_header_value(body: &[u8], secret: Option<&str>) -> Option<String> {
    secret
        .filter(|secret| !secret.is_empty())
        .map(|secret| format!("sha256={}", sign(body, secret)))
}
