//! Request signing for the Tuya cloud API
//!
//! sign = HEX_UPPER(HMAC-SHA256(key = secret, message = client_id + access_token + t))
//!
//! `access_token` is empty for the bootstrap token-grant call.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::TuyaError;

pub const SIGN_METHOD: &str = "HMAC-SHA256";

type HmacSha256 = Hmac<Sha256>;

/// Upper-case hex HMAC-SHA256 of `message` under `key`
pub fn calc_sign(message: &str, key: &str) -> Result<String, TuyaError> {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes()).map_err(|e| TuyaError::Signing {
        reason: e.to_string(),
    })?;
    mac.update(message.as_bytes());
    Ok(hex::encode_upper(mac.finalize().into_bytes()))
}

/// Build the string-to-sign for one request
pub fn sign_payload(client_id: &str, access_token: &str, t: i64) -> String {
    format!("{}{}{}", client_id, access_token, t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc4231_case_2() {
        // RFC 4231 test case 2
        assert_eq!(
            calc_sign("what do ya want for nothing?", "Jefe").unwrap(),
            "5BDCC146BF60754E6A042426089575C75A003F089D2739839DEC58B964EC3843"
        );
    }

    #[test]
    fn test_sign_is_upper_hex() {
        let sign = calc_sign("client1234", "secret").unwrap();
        assert_eq!(sign.len(), 64);
        assert!(sign
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[test]
    fn test_sign_depends_on_token() {
        let bootstrap = calc_sign(&sign_payload("cid", "", 1700000000000), "secret").unwrap();
        let with_token = calc_sign(&sign_payload("cid", "T1", 1700000000000), "secret").unwrap();
        assert_ne!(bootstrap, with_token);
    }

    #[test]
    fn test_empty_and_long_keys_accepted() {
        assert!(calc_sign("cid42", "").is_ok());
        let long_key = "k".repeat(200);
        let sign = calc_sign("cid42", &long_key).unwrap();
        assert_eq!(sign.len(), 64);
    }

    #[test]
    fn test_sign_payload_layout() {
        assert_eq!(sign_payload("cid", "", 42), "cid42");
        assert_eq!(sign_payload("cid", "T1", 42), "cidT142");
    }
}
