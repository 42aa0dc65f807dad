//! Telegram Desktop local-storage encryption.
//!
//! `tdata` files are protected with a 256-byte "local key". The key itself is
//! sealed under a passcode-derived key (PBKDF2-HMAC-SHA512); individual blobs
//! are encrypted with AES-256-IGE using the legacy SHA-1 key schedule, with a
//! 16-byte SHA-1 prefix acting as both message key and integrity check.

use crate::{aes, sha1, sha512};
use sha2::Sha512;

/// Byte length of a Telegram Desktop local key.
pub const LOCAL_KEY_LEN: usize = 256;

/// Failures while unsealing a locally-encrypted blob.
#[derive(Clone, Debug, PartialEq)]
pub enum LocalKeyError {
    /// Blob shorter than message key + one cipher block.
    Truncated,
    /// Ciphertext not a multiple of the block size.
    Misaligned,
    /// SHA-1 of the plaintext does not match the message key
    /// (wrong key, wrong passcode, or corrupted file).
    ChecksumMismatch,
    /// The embedded length prefix is out of bounds.
    BadLength,
}

impl std::fmt::Display for LocalKeyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Truncated        => write!(f, "encrypted blob is truncated"),
            Self::Misaligned       => write!(f, "ciphertext length is not block-aligned"),
            Self::ChecksumMismatch => write!(f, "plaintext checksum mismatch (wrong key or corrupted data)"),
            Self::BadLength        => write!(f, "embedded length prefix is out of bounds"),
        }
    }
}

impl std::error::Error for LocalKeyError {}

/// Derive the passcode key that seals the local key.
///
/// An empty passcode uses a single PBKDF2 iteration (Telegram Desktop does
/// the same: the derivation only hardens non-empty passcodes).
pub fn create_local_key(passcode: &[u8], salt: &[u8]) -> [u8; LOCAL_KEY_LEN] {
    let iterations = if passcode.is_empty() { 1 } else { 100_000 };
    let hash = sha512!(salt, passcode, salt);
    let mut key = [0u8; LOCAL_KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha512>(&hash, salt, iterations, &mut key);
    key
}

// Legacy MTProto v1 key schedule, offset 8 as used for local storage.
fn prepare_aes_oldmtp(key: &[u8; LOCAL_KEY_LEN], msg_key: &[u8; 16]) -> ([u8; 32], [u8; 32]) {
    const X: usize = 8;
    let a = sha1!(msg_key, &key[X..X + 32]);
    let b = sha1!(&key[32 + X..32 + X + 16], msg_key, &key[48 + X..48 + X + 16]);
    let c = sha1!(&key[64 + X..64 + X + 32], msg_key);
    let d = sha1!(msg_key, &key[96 + X..96 + X + 32]);

    let mut aes_key = [0u8; 32];
    aes_key[..8].copy_from_slice(&a[..8]);
    aes_key[8..20].copy_from_slice(&b[8..20]);
    aes_key[20..].copy_from_slice(&c[4..16]);

    let mut aes_iv = [0u8; 32];
    aes_iv[..12].copy_from_slice(&a[8..20]);
    aes_iv[12..20].copy_from_slice(&b[..8]);
    aes_iv[20..24].copy_from_slice(&c[16..20]);
    aes_iv[24..].copy_from_slice(&d[..8]);

    (aes_key, aes_iv)
}

/// Unseal a locally-encrypted blob: `msg_key(16) || AES-IGE ciphertext`.
///
/// Returns the payload with the internal length prefix stripped.
pub fn decrypt_local(encrypted: &[u8], key: &[u8; LOCAL_KEY_LEN]) -> Result<Vec<u8>, LocalKeyError> {
    if encrypted.len() < 32 {
        return Err(LocalKeyError::Truncated);
    }
    let (msg_key, ciphertext) = encrypted.split_at(16);
    if ciphertext.len() % 16 != 0 {
        return Err(LocalKeyError::Misaligned);
    }
    let msg_key: [u8; 16] = msg_key.try_into().unwrap();

    let (aes_key, aes_iv) = prepare_aes_oldmtp(key, &msg_key);
    let mut plain = ciphertext.to_vec();
    aes::ige_decrypt(&mut plain, &aes_key, &aes_iv);

    if sha1!(&plain)[..16] != msg_key {
        return Err(LocalKeyError::ChecksumMismatch);
    }
    let len = u32::from_le_bytes(plain[..4].try_into().unwrap()) as usize;
    if len < 4 || len > plain.len() {
        return Err(LocalKeyError::BadLength);
    }
    plain.truncate(len);
    plain.drain(..4);
    Ok(plain)
}

/// Seal `data` the way Telegram Desktop does — the inverse of
/// [`decrypt_local`]. Padding is zeroed rather than randomized; the length
/// prefix makes the two indistinguishable to the reader.
pub fn encrypt_local(data: &[u8], key: &[u8; LOCAL_KEY_LEN]) -> Vec<u8> {
    let full = 4 + data.len();
    let padded = (full + 15) & !15;

    let mut plain = Vec::with_capacity(padded);
    plain.extend_from_slice(&(full as u32).to_le_bytes());
    plain.extend_from_slice(data);
    plain.resize(padded, 0);

    let sha = sha1!(&plain);
    let msg_key: [u8; 16] = sha[..16].try_into().unwrap();

    let (aes_key, aes_iv) = prepare_aes_oldmtp(key, &msg_key);
    aes::ige_encrypt(&mut plain, &aes_key, &aes_iv);

    let mut out = Vec::with_capacity(16 + plain.len());
    out.extend_from_slice(&msg_key);
    out.extend_from_slice(&plain);
    out
}
