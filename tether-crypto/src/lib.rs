//! Cryptographic primitives for Telegram session import.
//!
//! Provides:
//! - AES-256-IGE encryption/decryption
//! - SHA-1 / SHA-512 / MD5 hash macros
//! - `AuthKey` — 256-byte session key with derived fingerprint
//! - Telegram Desktop local-storage sealing (PBKDF2 local key + legacy
//!   SHA-1 key schedule)

#![deny(unsafe_code)]

pub mod aes;
mod auth_key;
mod local;
mod sha;

pub use auth_key::AuthKey;
pub use local::{
    LOCAL_KEY_LEN, LocalKeyError, create_local_key, decrypt_local, encrypt_local,
};
