//! HMAC-MD5 keyed hash shared by the HNAP wire encodings

use hmac::{Hmac, Mac};
use md5::Md5;

type HmacMd5 = Hmac<Md5>;

/// HMAC-MD5 of `message` keyed by `key`, as 32 upper-case hex characters
pub fn keyed_hash(key: &str, message: &str) -> String {
    // HMAC accepts keys of any length
    let mut mac = HmacMd5::new_from_slice(key.as_bytes()).expect("HMAC accepts any key length");
    mac.update(message.as_bytes());
    hex::encode_upper(mac.finalize().into_bytes())
}

/// PrivateKey for an HNAP session: `keyed_hash(PublicKey + password, Challenge)`
pub fn derive_private_key(public_key: &str, password: &str, challenge: &str) -> String {
    keyed_hash(&format!("{public_key}{password}"), challenge)
}

/// One-time login password: `keyed_hash(PrivateKey, Challenge)`
pub fn derive_login_password(private_key: &str, challenge: &str) -> String {
    keyed_hash(private_key, challenge)
}
