//! Telegram Desktop `tdata` decoder.
//!
//! Layout of a profile directory, as far as session import is concerned:
//!
//! - `key_datas` — TDF container holding the salt, the local key sealed
//!   under a passcode-derived key, and a sealed index of account slots.
//! - one data file per account, named by an MD5-derived file key with an
//!   `s` suffix, holding the sealed MTP authorization (main DC id plus the
//!   per-DC auth keys).
//!
//! TDF containers are `TDF$` magic, little-endian version, payload, and a
//! 16-byte MD5 trailer over payload + length + version + magic.

use std::path::Path;

use tether_crypto::{LOCAL_KEY_LEN, create_local_key, decrypt_local, md5};

use super::Reader;
use crate::dc::{DC_PORT, dc_address};
use crate::errors::SessionError;
use crate::record::SessionRecord;

const FORMAT: &str = "tdesktop";

const TDF_MAGIC: &[u8; 4] = b"TDF$";

/// Settings block id carrying the MTP authorization payload.
const DBI_MTP_AUTHORIZATION: u32 = 0x4b;

/// What to do when a `tdata` directory holds more than one account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AccountPolicy {
    /// Use the account with the lowest slot index. Deterministic, and what
    /// Telegram Desktop itself treats as the primary account.
    #[default]
    First,
    /// Use the n-th account, ordered by slot index.
    Nth(usize),
    /// Refuse to guess: error out when more than one account exists.
    Strict,
}

/// Decode the selected account of a `tdata` directory into a canonical
/// record. `passcode` is the local passcode, empty when none is set.
pub fn decode(dir: &Path, passcode: &[u8], policy: AccountPolicy) -> Result<SessionRecord, SessionError> {
    if !dir.exists() {
        return Err(SessionError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no tdata directory at {}", dir.display()),
        )));
    }
    let key_file = dir.join("key_datas");
    if !key_file.exists() {
        return Err(SessionError::NoAccounts);
    }

    let body = read_tdf(&key_file)?;
    let mut stream = Reader::new(&body, FORMAT);
    let salt = stream.qt_bytes("salt")?;
    let key_sealed = stream.qt_bytes("sealed local key")?;
    let info_sealed = stream.qt_bytes("sealed account info")?;

    let passcode_key = create_local_key(passcode, &salt);
    let key_inner = decrypt_local(&key_sealed, &passcode_key)
        .map_err(|e| SessionError::decode(FORMAT, format!("cannot unseal local key (wrong passcode?): {e}")))?;
    if key_inner.len() < LOCAL_KEY_LEN {
        return Err(SessionError::decode(FORMAT, "local key blob too short"));
    }
    let mut local_key = [0u8; LOCAL_KEY_LEN];
    local_key.copy_from_slice(&key_inner[..LOCAL_KEY_LEN]);

    let info = decrypt_local(&info_sealed, &local_key)
        .map_err(|e| SessionError::decode(FORMAT, format!("cannot unseal account info: {e}")))?;
    let mut info_stream = Reader::new(&info, FORMAT);
    let count = info_stream.i32("account count")?;
    if count < 0 {
        return Err(SessionError::decode(FORMAT, format!("negative account count {count}")));
    }
    let mut indexes = (0..count)
        .map(|_| info_stream.i32("account index"))
        .collect::<Result<Vec<_>, _>>()?;
    indexes.sort_unstable();
    indexes.dedup();
    if indexes.is_empty() {
        return Err(SessionError::NoAccounts);
    }

    let index = match policy {
        AccountPolicy::First => indexes[0],
        AccountPolicy::Nth(n) => *indexes.get(n).ok_or_else(|| {
            SessionError::decode(FORMAT, format!("account #{n} requested, only {} present", indexes.len()))
        })?,
        AccountPolicy::Strict if indexes.len() > 1 => {
            return Err(SessionError::AmbiguousAccounts(indexes.len()));
        }
        AccountPolicy::Strict => indexes[0],
    };
    if indexes.len() > 1 {
        log::info!("[tdesktop] {} accounts present, importing slot {index}", indexes.len());
    }

    let auth = read_account(dir, &local_key, index)?;
    let addr = dc_address(auth.main_dc, false)
        .ok_or_else(|| SessionError::decode(FORMAT, format!("unknown dc id {}", auth.main_dc)))?;
    Ok(SessionRecord::new(auth.main_dc, auth.key, addr, DC_PORT))
}

struct MtpAuth {
    main_dc: i32,
    key: [u8; 256],
}

fn read_account(dir: &Path, local_key: &[u8; LOCAL_KEY_LEN], index: i32) -> Result<MtpAuth, SessionError> {
    let path = dir.join(format!("{}s", file_key(&account_data_name(index))));
    if !path.exists() {
        return Err(SessionError::decode(FORMAT, format!("account data file missing for slot {index}")));
    }
    let body = read_tdf(&path)?;
    let mut stream = Reader::new(&body, FORMAT);
    let sealed = stream.qt_bytes("sealed account data")?;
    let data = decrypt_local(&sealed, local_key)
        .map_err(|e| SessionError::decode(FORMAT, format!("cannot unseal account data: {e}")))?;

    let mut s = Reader::new(&data, FORMAT);
    let block = s.u32("settings block id")?;
    if block != DBI_MTP_AUTHORIZATION {
        return Err(SessionError::decode(FORMAT, format!("unexpected settings block {block:#x}")));
    }
    parse_mtp_authorization(&s.qt_bytes("mtp authorization")?)
}

fn parse_mtp_authorization(blob: &[u8]) -> Result<MtpAuth, SessionError> {
    let mut s = Reader::new(blob, FORMAT);
    let legacy_user = s.i32("legacy user id")?;
    let legacy_dc = s.i32("legacy main dc id")?;
    let main_dc = if legacy_user == -1 && legacy_dc == -1 {
        let _user_id = s.u64("user id")?;
        s.i32("main dc id")?
    } else {
        legacy_dc
    };

    let count = s.u32("key count")?;
    for _ in 0..count {
        let dc = s.i32("key dc id")?;
        let key = s.array::<256>("auth key")?;
        if dc == main_dc {
            return Ok(MtpAuth { main_dc, key });
        }
    }
    Err(SessionError::decode(FORMAT, format!("no auth key for main dc {main_dc}")))
}

/// `"data"` for the primary slot, `"data#N"` (1-based, from the second
/// slot on) for the rest — Telegram Desktop's composed data name.
fn account_data_name(index: i32) -> String {
    if index > 0 {
        format!("data#{}", index + 1)
    } else {
        "data".to_string()
    }
}

/// File stem for a composed data name: first 8 bytes of its MD5 as a
/// little-endian value, written as 16 uppercase hex digits low nibble first.
/// `file_key("data")` is the well-known `D877F783D5D3EF8C`.
fn file_key(name: &str) -> String {
    let digest = md5!(name.as_bytes());
    let mut val = u64::from_le_bytes(digest[..8].try_into().unwrap());
    let mut out = String::with_capacity(16);
    for _ in 0..16 {
        out.push(char::from_digit((val & 0xF) as u32, 16).unwrap().to_ascii_uppercase());
        val >>= 4;
    }
    out
}

fn read_tdf(path: &Path) -> Result<Vec<u8>, SessionError> {
    let bytes = std::fs::read(path)?;
    if bytes.len() < 24 || bytes[..4] != TDF_MAGIC[..] {
        return Err(SessionError::decode(FORMAT, format!("{} is not a TDF container", path.display())));
    }
    let version = &bytes[4..8];
    let body = &bytes[8..bytes.len() - 16];
    let trailer = &bytes[bytes.len() - 16..];
    let expected = md5!(body, &(body.len() as u32).to_le_bytes(), version, TDF_MAGIC);
    if trailer != expected {
        return Err(SessionError::decode(FORMAT, format!("{} has a bad TDF checksum", path.display())));
    }
    Ok(body.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_crypto::encrypt_local;

    fn write_tdf(path: &Path, body: &[u8]) {
        let version = 4_010_001u32.to_le_bytes();
        let mut out = Vec::from(*TDF_MAGIC);
        out.extend(version);
        out.extend(body);
        out.extend(md5!(body, &(body.len() as u32).to_le_bytes(), &version, TDF_MAGIC));
        std::fs::write(path, out).unwrap();
    }

    fn qt_put_bytes(buf: &mut Vec<u8>, data: &[u8]) {
        buf.extend((data.len() as u32).to_be_bytes());
        buf.extend(data);
    }

    fn sample_key() -> [u8; 256] {
        std::array::from_fn(|i| (i * 11 % 256) as u8)
    }

    /// Build a synthetic tdata directory with the given account slots, all
    /// sharing one auth key on `main_dc`.
    fn make_tdata(dir: &Path, slots: &[i32], main_dc: i32, passcode: &[u8]) {
        let salt = [0x33u8; 32];
        let passcode_key = create_local_key(passcode, &salt);
        let local_key: [u8; 256] = std::array::from_fn(|i| (i * 7 % 251) as u8);

        let mut body = Vec::new();
        qt_put_bytes(&mut body, &salt);
        qt_put_bytes(&mut body, &encrypt_local(&local_key, &passcode_key));
        let mut info = Vec::new();
        info.extend((slots.len() as i32).to_be_bytes());
        for slot in slots {
            info.extend(slot.to_be_bytes());
        }
        qt_put_bytes(&mut body, &encrypt_local(&info, &local_key));
        write_tdf(&dir.join("key_datas"), &body);

        for &slot in slots {
            let mut mtp = Vec::new();
            mtp.extend((-1i32).to_be_bytes());
            mtp.extend((-1i32).to_be_bytes());
            mtp.extend(777_000u64.to_be_bytes());
            mtp.extend(main_dc.to_be_bytes());
            mtp.extend(2u32.to_be_bytes());
            // A key for another DC first, to prove selection by main dc.
            mtp.extend((main_dc + 1).to_be_bytes());
            mtp.extend([0xEEu8; 256]);
            mtp.extend(main_dc.to_be_bytes());
            mtp.extend(sample_key());

            let mut inner = Vec::new();
            inner.extend(DBI_MTP_AUTHORIZATION.to_be_bytes());
            qt_put_bytes(&mut inner, &mtp);

            let mut account_body = Vec::new();
            qt_put_bytes(&mut account_body, &encrypt_local(&inner, &local_key));
            write_tdf(&dir.join(format!("{}s", file_key(&account_data_name(slot)))), &account_body);
        }
    }

    #[test]
    fn file_key_matches_known_tdesktop_name() {
        assert_eq!(file_key("data"), "D877F783D5D3EF8C");
    }

    #[test]
    fn single_account_import() {
        let dir = tempfile::tempdir().unwrap();
        make_tdata(dir.path(), &[0], 2, b"");
        let record = decode(dir.path(), b"", AccountPolicy::First).unwrap();
        assert_eq!(record.dc_id, 2);
        assert_eq!(record.auth_key, sample_key());
        assert_eq!(record.server_address, "149.154.167.51");
    }

    #[test]
    fn passcode_protected_profile() {
        let dir = tempfile::tempdir().unwrap();
        make_tdata(dir.path(), &[0], 1, b"hunter2");
        let record = decode(dir.path(), b"hunter2", AccountPolicy::First).unwrap();
        assert_eq!(record.dc_id, 1);

        let err = decode(dir.path(), b"wrong", AccountPolicy::First).unwrap_err();
        assert!(err.to_string().contains("unseal local key"));
    }

    #[test]
    fn empty_directory_means_no_accounts() {
        let dir = tempfile::tempdir().unwrap();
        let err = decode(dir.path(), b"", AccountPolicy::First).unwrap_err();
        assert!(matches!(err, SessionError::NoAccounts));
        assert!(err.to_string().contains("no accounts found"));
    }

    #[test]
    fn missing_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("never-created");
        match decode(&gone, b"", AccountPolicy::First) {
            Err(SessionError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected a not-found error, got {other:?}"),
        }
    }

    #[test]
    fn zero_slots_means_no_accounts() {
        let dir = tempfile::tempdir().unwrap();
        make_tdata(dir.path(), &[], 2, b"");
        assert!(matches!(
            decode(dir.path(), b"", AccountPolicy::First),
            Err(SessionError::NoAccounts)
        ));
    }

    #[test]
    fn multiple_accounts_first_picks_lowest_slot() {
        let dir = tempfile::tempdir().unwrap();
        make_tdata(dir.path(), &[1, 0], 3, b"");
        let record = decode(dir.path(), b"", AccountPolicy::First).unwrap();
        assert_eq!(record.dc_id, 3);
    }

    #[test]
    fn multiple_accounts_strict_refuses() {
        let dir = tempfile::tempdir().unwrap();
        make_tdata(dir.path(), &[0, 1], 2, b"");
        assert!(matches!(
            decode(dir.path(), b"", AccountPolicy::Strict),
            Err(SessionError::AmbiguousAccounts(2))
        ));
    }

    #[test]
    fn nth_policy_selects_by_order() {
        let dir = tempfile::tempdir().unwrap();
        make_tdata(dir.path(), &[0, 1], 2, b"");
        assert!(decode(dir.path(), b"", AccountPolicy::Nth(1)).is_ok());
        assert!(decode(dir.path(), b"", AccountPolicy::Nth(5)).is_err());
    }

    #[test]
    fn corrupted_trailer_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        make_tdata(dir.path(), &[0], 2, b"");
        let key_file = dir.path().join("key_datas");
        let mut bytes = std::fs::read(&key_file).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        std::fs::write(&key_file, bytes).unwrap();
        let err = decode(dir.path(), b"", AccountPolicy::First).unwrap_err();
        assert!(err.to_string().contains("TDF checksum"));
    }
}
