//! The canonical session record — one schema for authenticated-session
//! material regardless of which client originally produced it.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use tether_crypto::AuthKey;

use crate::errors::{CorruptError, SessionError};

/// Current canonical schema version. Records with any other version are
/// rejected on read.
pub const LATEST_VERSION: i32 = 1;

/// Everything needed to resume an authenticated session.
///
/// Logically immutable once created, except for [`expires`](Self::expires)
/// refresh. The canonical on-disk bytes are the JSON serialization of this
/// struct, key material base64-encoded.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Schema tag; must equal [`LATEST_VERSION`].
    pub version: i32,
    /// Which data center the session authenticates against.
    pub dc_id: i32,
    /// The 256-byte shared secret. Never logged, never rendered.
    #[serde(with = "base64_array")]
    pub auth_key: [u8; 256],
    /// SHA-1(auth_key)[12..20] — indexes the key without exposing it.
    #[serde(with = "base64_array")]
    pub auth_key_id: [u8; 8],
    /// Endpoint for `dc_id`.
    pub server_address: String,
    pub port: u16,
    /// Unix expiry timestamp; `None` = non-expiring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,
}

impl SessionRecord {
    /// Build a record from raw key material, deriving the fingerprint.
    pub fn new(dc_id: i32, auth_key: [u8; 256], server_address: impl Into<String>, port: u16) -> Self {
        Self {
            version: LATEST_VERSION,
            dc_id,
            auth_key,
            auth_key_id: AuthKey::from_bytes(auth_key).key_id(),
            server_address: server_address.into(),
            port,
            expires: None,
        }
    }

    /// Consistency check run on every load path. A mismatched fingerprint or
    /// schema version fails loudly rather than being silently accepted.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.version != LATEST_VERSION {
            return Err(SessionError::Corrupt(CorruptError::Version { found: self.version }));
        }
        if AuthKey::from_bytes(self.auth_key).key_id() != self.auth_key_id {
            return Err(SessionError::Corrupt(CorruptError::AuthKeyId));
        }
        Ok(())
    }

    /// Whether the record has an expiry in the past.
    pub fn is_expired(&self, now: i64) -> bool {
        matches!(self.expires, Some(t) if t <= now)
    }

    /// Canonical on-disk bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SessionError> {
        serde_json::to_vec(self).map_err(|e| SessionError::decode("canonical", e.to_string()))
    }

    /// Parse canonical bytes and run [`validate`](Self::validate).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SessionError> {
        let record: Self = serde_json::from_slice(bytes)
            .map_err(|e| SessionError::decode("canonical", e.to_string()))?;
        record.validate()?;
        Ok(record)
    }

    /// Export as a portable session string — a compact reversible text
    /// encoding for transferring the session without filesystem access.
    pub fn encode_string(&self) -> Result<String, SessionError> {
        Ok(URL_SAFE_NO_PAD.encode(self.to_bytes()?))
    }

    /// Reverse [`encode_string`](Self::encode_string).
    pub fn decode_string(input: &str) -> Result<Self, SessionError> {
        let trimmed = input.trim().trim_end_matches('=');
        let raw = URL_SAFE_NO_PAD
            .decode(trimmed.as_bytes())
            .map_err(|e| SessionError::decode("string", format!("invalid base64: {e}")))?;
        Self::from_bytes(&raw)
    }
}

impl fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRecord")
            .field("version", &self.version)
            .field("dc_id", &self.dc_id)
            .field("auth_key_id", &u64::from_le_bytes(self.auth_key_id))
            .field("server_address", &self.server_address)
            .field("port", &self.port)
            .field("expires", &self.expires)
            .finish()
    }
}

/// Serde adapter: fixed-size byte arrays as standard base64 strings.
mod base64_array {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S, const N: usize>(bytes: &[u8; N], ser: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        ser.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D, const N: usize>(de: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(de)?;
        let raw = STANDARD
            .decode(text.as_bytes())
            .map_err(serde::de::Error::custom)?;
        raw.try_into()
            .map_err(|v: Vec<u8>| serde::de::Error::custom(format!("expected {N} bytes, got {}", v.len())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SessionRecord {
        let key: [u8; 256] = std::array::from_fn(|i| (i + 1) as u8);
        SessionRecord::new(2, key, "149.154.167.51", 443)
    }

    #[test]
    fn fingerprint_is_derived() {
        let record = sample();
        assert_eq!(record.auth_key_id, AuthKey::from_bytes(record.auth_key).key_id());
        assert!(record.validate().is_ok());
    }

    #[test]
    fn string_codec_round_trips_bit_identically() {
        let record = sample();
        let encoded = record.encode_string().unwrap();
        let decoded = SessionRecord::decode_string(&encoded).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.to_bytes().unwrap(), record.to_bytes().unwrap());
    }

    #[test]
    fn version_mismatch_is_corrupt_not_decode() {
        let mut record = sample();
        record.version = 7;
        let bytes = serde_json::to_vec(&record).unwrap();
        match SessionRecord::from_bytes(&bytes) {
            Err(SessionError::Corrupt(CorruptError::Version { found: 7 })) => {}
            other => panic!("expected version corruption, got {other:?}"),
        }
    }

    #[test]
    fn key_id_mismatch_is_rejected() {
        let mut record = sample();
        record.auth_key_id = [0; 8];
        let bytes = serde_json::to_vec(&record).unwrap();
        match SessionRecord::from_bytes(&bytes) {
            Err(SessionError::Corrupt(CorruptError::AuthKeyId)) => {}
            other => panic!("expected key id corruption, got {other:?}"),
        }
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(
            SessionRecord::decode_string("not!!base64"),
            Err(SessionError::Decode { format: "string", .. })
        ));
        assert!(matches!(
            SessionRecord::from_bytes(b"{ not json"),
            Err(SessionError::Decode { format: "canonical", .. })
        ));
    }

    #[test]
    fn debug_never_shows_key_material() {
        let record = sample();
        let rendered = format!("{record:?}");
        assert!(!rendered.contains("auth_key:"));
        let key_b64 = base64::engine::general_purpose::STANDARD.encode(record.auth_key);
        assert!(!rendered.contains(&key_b64[..16]));
    }

    #[test]
    fn expiry_refresh() {
        let mut record = sample();
        assert!(!record.is_expired(i64::MAX));
        record.expires = Some(100);
        assert!(record.is_expired(100));
        assert!(!record.is_expired(99));
    }
}
