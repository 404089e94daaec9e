//! Request signing for Last.fm's authenticated API.
//!
//! Every write call carries an `api_sig` parameter: the MD5 of all other
//! parameters (minus `format`), sorted by name and concatenated as
//! `name` + `value`, followed by the shared secret.

use md5::{Digest, Md5};

/// Parameters that never take part in the signature.
const UNSIGNED_PARAMS: [&str; 2] = ["api_sig", "format"];

/// Compute the `api_sig` value for a set of request parameters.
///
/// The order in which `params` is supplied does not matter; entries are sorted
/// by key (byte order) before hashing.
///
/// # Examples
///
/// ```rust
/// use csv_scrobbler::signature::sign;
///
/// let a = sign(&[("method", "track.scrobble"), ("api_key", "k")], "secret");
/// let b = sign(&[("api_key", "k"), ("method", "track.scrobble")], "secret");
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 32);
/// ```
pub fn sign(params: &[(&str, &str)], secret: &str) -> String {
    let mut entries: Vec<&(&str, &str)> = params
        .iter()
        .filter(|(key, _)| !UNSIGNED_PARAMS.contains(key))
        .collect();
    entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    let mut payload = String::new();
    for (key, value) in entries {
        payload.push_str(key);
        payload.push_str(value);
    }
    payload.push_str(secret);

    log::debug!(
        "Signing parameters: {}",
        params
            .iter()
            .map(|(k, _)| *k)
            .collect::<Vec<_>>()
            .join(", ")
    );

    md5_hex(&payload)
}

/// Lowercase hex MD5 of a string.
pub fn md5_hex(input: &str) -> String {
    format!("{:x}", Md5::digest(input.as_bytes()))
}

/// Token sent to `auth.getMobileSession`: `md5(username + md5(password))`.
pub fn auth_token(username: &str, password: &str) -> String {
    md5_hex(&format!("{username}{}", md5_hex(password)))
}
