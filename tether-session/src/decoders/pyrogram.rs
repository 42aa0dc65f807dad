//! Pyrogram string-session decoder.
//!
//! Pyrogram exports URL-safe base64 (padding stripped) over a big-endian
//! packed struct. Two layouts exist, told apart by decoded length:
//!
//! ```text
//! legacy  (263 bytes): dc u8 | test u8 | auth_key [256] | user_id u32 | bot u8
//! current (271 bytes): dc u8 | api_id u32 | test u8 | auth_key [256] | user_id u64 | bot u8
//! ```

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use super::Reader;
use crate::dc::{DC_PORT, dc_address};
use crate::errors::SessionError;
use crate::record::SessionRecord;

const FORMAT: &str = "pyrogram";

const LEGACY_LEN: usize = 263;
const CURRENT_LEN: usize = 271;

pub fn decode(input: &str) -> Result<SessionRecord, SessionError> {
    let trimmed = input.trim().trim_end_matches('=');
    let raw = URL_SAFE_NO_PAD
        .decode(trimmed.as_bytes())
        .map_err(|e| SessionError::decode(FORMAT, format!("invalid base64: {e}")))?;

    let mut r = Reader::new(&raw, FORMAT);
    let (dc_id, test_mode) = match raw.len() {
        LEGACY_LEN => {
            let dc = r.u8("dc id")? as i32;
            (dc, r.flag("test-mode flag")?)
        }
        CURRENT_LEN => {
            let dc = r.u8("dc id")? as i32;
            let _api_id = r.u32("api id")?;
            (dc, r.flag("test-mode flag")?)
        }
        n => {
            return Err(SessionError::decode(
                FORMAT,
                format!("unsupported packed layout of {n} bytes"),
            ));
        }
    };

    let auth_key = r.array::<256>("auth key")?;

    // The trailing identity fields are not part of the canonical record but
    // must still be present and well-formed.
    if raw.len() == LEGACY_LEN {
        r.u32("user id")?;
    } else {
        r.u64("user id")?;
    }
    r.flag("bot flag")?;

    let addr = dc_address(dc_id, test_mode)
        .ok_or_else(|| SessionError::decode(FORMAT, format!("unknown dc id {dc_id}")))?;
    Ok(SessionRecord::new(dc_id, auth_key, addr, DC_PORT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::LATEST_VERSION;

    fn sample_key() -> [u8; 256] {
        std::array::from_fn(|i| (i * 3 % 256) as u8)
    }

    fn pack_current(dc: u8, test: u8) -> String {
        let mut raw = Vec::with_capacity(CURRENT_LEN);
        raw.push(dc);
        raw.extend(12345u32.to_be_bytes());
        raw.push(test);
        raw.extend(sample_key());
        raw.extend(987654321u64.to_be_bytes());
        raw.push(0);
        URL_SAFE_NO_PAD.encode(raw)
    }

    fn pack_legacy(dc: u8) -> String {
        let mut raw = Vec::with_capacity(LEGACY_LEN);
        raw.push(dc);
        raw.push(0);
        raw.extend(sample_key());
        raw.extend(4242u32.to_be_bytes());
        raw.push(1);
        URL_SAFE_NO_PAD.encode(raw)
    }

    #[test]
    fn current_layout() {
        let record = decode(&pack_current(2, 0)).unwrap();
        assert_eq!(record.version, LATEST_VERSION);
        assert_eq!(record.dc_id, 2);
        assert_eq!(record.auth_key, sample_key());
        assert_eq!(record.server_address, "149.154.167.51");
        assert_eq!(record.port, 443);
        assert_eq!(
            record.auth_key_id,
            tether_crypto::AuthKey::from_bytes(sample_key()).key_id()
        );
    }

    #[test]
    fn legacy_layout() {
        let record = decode(&pack_legacy(4)).unwrap();
        assert_eq!(record.dc_id, 4);
        assert_eq!(record.auth_key, sample_key());
        assert_eq!(record.server_address, "149.154.167.91");
    }

    #[test]
    fn test_mode_selects_test_endpoints() {
        let record = decode(&pack_current(2, 1)).unwrap();
        assert_eq!(record.server_address, "149.154.167.40");
    }

    #[test]
    fn unsupported_layout_is_rejected() {
        let blob = URL_SAFE_NO_PAD.encode([0u8; 100]);
        assert!(matches!(
            decode(&blob),
            Err(SessionError::Decode { format: "pyrogram", .. })
        ));
    }

    #[test]
    fn corrupted_test_flag_is_rejected_not_defaulted() {
        let mut raw = Vec::with_capacity(CURRENT_LEN);
        raw.push(2u8);
        raw.extend(12345u32.to_be_bytes());
        raw.push(0xCC); // not a boolean
        raw.extend(sample_key());
        raw.extend(1u64.to_be_bytes());
        raw.push(0);
        let err = decode(&URL_SAFE_NO_PAD.encode(raw)).unwrap_err();
        assert!(err.to_string().contains("test-mode flag"));
    }

    #[test]
    fn unknown_dc_is_rejected() {
        assert!(decode(&pack_legacy(9)).unwrap_err().to_string().contains("unknown dc"));
    }

    #[test]
    fn not_base64_is_rejected() {
        assert!(matches!(
            decode("@@definitely not base64@@"),
            Err(SessionError::Decode { format: "pyrogram", .. })
        ));
    }
}
