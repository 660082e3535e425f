//! Request authentication for the legacy envelope protocol
//!
//! Two schemes are in use, selected per profile:
//!
//! * `checksum = md5(body ‖ salt)`
//! * `mic = md5(body)`, `mac = md5(hex(mic) ‖ salt)`
//!
//! The mac is computed over the ASCII hex string of the mic, not over the raw
//! digest bytes. All digests are sent lowercase hex-encoded as query
//! parameters.

use std::collections::BTreeMap;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::error::{HafasError, Result};
use crate::profile::Profile;

/// Shared secret used to authenticate legacy requests
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "encoding", content = "value", rename_all = "lowercase")]
pub enum Salt {
    /// Raw bytes
    Bytes(Vec<u8>),
    /// UTF-8 text, used as its bytes
    Text(String),
    /// Hex-encoded bytes
    Hex(String),
}

impl std::fmt::Debug for Salt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = match self {
            Self::Bytes(_) => "Bytes",
            Self::Text(_) => "Text",
            Self::Hex(_) => "Hex",
        };
        write!(f, "Salt::{variant}([REDACTED])")
    }
}

impl Salt {
    /// The salt as bytes
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a hex salt cannot be decoded.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Self::Bytes(bytes) => Ok(bytes.clone()),
            Self::Text(text) => Ok(text.as_bytes().to_vec()),
            Self::Hex(hex_str) => hex::decode(hex_str)
                .map_err(|e| HafasError::Configuration(format!("profile salt is not valid hex: {e}"))),
        }
    }
}

/// Authentication query parameters; each is present only if its scheme is enabled
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthParams {
    /// `md5(body ‖ salt)`
    pub checksum: Option<String>,
    /// `md5(body)`
    pub mic: Option<String>,
    /// `md5(hex(mic) ‖ salt)`
    pub mac: Option<String>,
}

impl AuthParams {
    /// Insert the present parameters into a query map
    pub fn apply_to(self, query: &mut BTreeMap<String, String>) {
        let pairs = [
            ("checksum", self.checksum),
            ("mic", self.mic),
            ("mac", self.mac),
        ];
        for (key, value) in pairs {
            if let Some(value) = value {
                query.insert(key.to_string(), value);
            }
        }
    }
}

fn md5_hex(parts: &[&[u8]]) -> String {
    let mut hasher = Md5::new();
    for part in parts {
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}

/// `hex(md5(body ‖ salt))`
#[must_use]
pub fn checksum(body: &[u8], salt: &[u8]) -> String {
    md5_hex(&[body, salt])
}

/// `hex(md5(body))`
#[must_use]
pub fn mic(body: &[u8]) -> String {
    md5_hex(&[body])
}

/// `hex(md5(mic_hex ‖ salt))` where `mic_hex` is the ASCII hex mic
#[must_use]
pub fn mac(mic_hex: &str, salt: &[u8]) -> String {
    md5_hex(&[mic_hex.as_bytes(), salt])
}

/// Compute the authentication parameters a profile asks for
///
/// # Errors
///
/// Returns a configuration error if a scheme is enabled and the profile's
/// salt is missing or cannot be decoded. No hashing happens in that case.
pub fn authenticate(profile: &dyn Profile, body: &[u8]) -> Result<AuthParams> {
    let add_checksum = profile.add_checksum();
    let add_mic_mac = profile.add_mic_mac();
    if !add_checksum && !add_mic_mac {
        return Ok(AuthParams::default());
    }

    let salt = profile
        .salt()
        .ok_or_else(|| {
            HafasError::Configuration(
                "profile.salt must be set when checksum or mic/mac is enabled".to_string(),
            )
        })?
        .to_bytes()?;

    let mut params = AuthParams::default();
    if add_checksum {
        params.checksum = Some(checksum(body, &salt));
    }
    if add_mic_mac {
        let mic = mic(body);
        params.mac = Some(mac(&mic, &salt));
        params.mic = Some(mic);
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::profile::ProfileConfig;

    // md5("abc")
    const MD5_ABC: &str = "900150983cd24fb0d6963f7d28e17f72";
    // md5("900150983cd24fb0d6963f7d28e17f72s")
    const MAC_ABC_S: &str = "1ea092f903b9910ab8fb52db9c61ddbc";
    // md5("abcs")
    const CHECKSUM_ABC_S: &str = "e5c639ea4b3706aac469718248bb0299";

    fn profile(salt: Option<Salt>, add_checksum: bool, add_mic_mac: bool) -> ProfileConfig {
        ProfileConfig {
            salt,
            add_checksum,
            add_mic_mac,
            ..ProfileConfig::for_testing("https://example.com/mgate.exe")
        }
    }

    #[test]
    fn test_mic_is_plain_md5() {
        assert_eq!(mic(b"abc"), MD5_ABC);
    }

    #[test]
    fn test_mac_hashes_hex_string_of_mic() {
        let mic_hex = mic(b"abc");
        let mac_value = mac(&mic_hex, b"s");

        assert_eq!(mac_value, MAC_ABC_S);

        let raw_digest = hex::decode(MD5_ABC).unwrap();
        let over_raw = md5_hex(&[raw_digest.as_slice(), b"s".as_slice()]);
        assert_ne!(mac_value, over_raw);
    }

    #[test]
    fn test_checksum_appends_salt() {
        assert_eq!(checksum(b"ab", b"c"), MD5_ABC);
        assert_eq!(checksum(b"abc", b""), MD5_ABC);
        assert_eq!(checksum(b"abc", b"s"), CHECKSUM_ABC_S);
    }

    #[test]
    fn test_authenticate_checksum_only() {
        let p = profile(Some(Salt::Text("c".to_string())), true, false);
        let params = authenticate(&p, b"ab").unwrap();
        assert_eq!(params.checksum.as_deref(), Some(MD5_ABC));
        assert!(params.mic.is_none());
        assert!(params.mac.is_none());
    }

    #[test]
    fn test_authenticate_mic_mac() {
        let p = profile(Some(Salt::Text("s".to_string())), false, true);
        let params = authenticate(&p, b"abc").unwrap();
        assert!(params.checksum.is_none());
        assert_eq!(params.mic.as_deref(), Some(MD5_ABC));
        assert_eq!(params.mac.as_deref(), Some(MAC_ABC_S));
    }

    #[test]
    fn test_salt_encodings_agree() {
        let text = Salt::Text("s".to_string()).to_bytes().unwrap();
        let bytes = Salt::Bytes(vec![b's']).to_bytes().unwrap();
        let hexed = Salt::Hex("73".to_string()).to_bytes().unwrap();
        assert_eq!(text, bytes);
        assert_eq!(text, hexed);
    }

    #[test]
    fn test_invalid_hex_salt_is_configuration_error() {
        let p = profile(Some(Salt::Hex("zz".to_string())), true, false);
        assert!(authenticate(&p, b"abc").unwrap_err().is_configuration());
    }

    #[test]
    fn test_missing_salt_is_configuration_error() {
        let p = profile(None, false, true);
        assert!(authenticate(&p, b"abc").unwrap_err().is_configuration());
    }

    #[test]
    fn test_no_scheme_needs_no_salt() {
        let p = profile(None, false, false);
        assert_eq!(authenticate(&p, b"abc").unwrap(), AuthParams::default());
    }

    #[test]
    fn test_apply_to_query() {
        let mut query = BTreeMap::new();
        query.insert("lang".to_string(), "de".to_string());
        AuthParams {
            checksum: None,
            mic: Some("a".to_string()),
            mac: Some("b".to_string()),
        }
        .apply_to(&mut query);
        assert_eq!(query.len(), 3);
        assert_eq!(query["mic"], "a");
        assert_eq!(query["mac"], "b");
        assert!(!query.contains_key("checksum"));
    }

    #[test]
    fn test_salt_debug_is_redacted() {
        let debug = format!("{:?}", Salt::Text("secret".to_string()));
        assert!(!debug.contains("secret"));
    }

    proptest! {
        #[test]
        fn checksum_is_deterministic(body in proptest::collection::vec(any::<u8>(), 0..256),
                                     salt in proptest::collection::vec(any::<u8>(), 0..32)) {
            let first = checksum(&body, &salt);
            prop_assert_eq!(&first, &checksum(&body, &salt));
            prop_assert_eq!(first.len(), 32);

            let mut joined = body.clone();
            joined.extend_from_slice(&salt);
            prop_assert_eq!(first, mic(&joined));
        }
    }
}
