//! Telegram `AuthKey` — 256-byte shared secret plus its derived fingerprint.

use crate::sha1;

/// A Telegram authorization key (256 bytes) with its pre-computed identifier.
///
/// The raw key bytes are deliberately kept out of `Debug` output; only the
/// 8-byte fingerprint is ever rendered.
#[derive(Clone)]
pub struct AuthKey {
    pub(crate) data: [u8; 256],
    pub(crate) key_id: [u8; 8],
}

impl AuthKey {
    /// Construct from the raw 256-byte key material.
    pub fn from_bytes(data: [u8; 256]) -> Self {
        let sha = sha1!(&data);
        let mut key_id = [0u8; 8];
        key_id.copy_from_slice(&sha[12..20]);
        Self { data, key_id }
    }

    /// Return the raw 256-byte representation.
    pub fn to_bytes(&self) -> [u8; 256] { self.data }

    /// The 8-byte key identifier (SHA-1(key)[12..20]).
    pub fn key_id(&self) -> [u8; 8] { self.key_id }
}

impl std::fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthKey(id={})", u64::from_le_bytes(self.key_id))
    }
}

impl PartialEq for AuthKey {
    fn eq(&self, other: &Self) -> bool { self.key_id == other.key_id }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_id_is_sha1_tail() {
        let key = [0x7Fu8; 256];
        let sha = sha1!(&key);
        assert_eq!(AuthKey::from_bytes(key).key_id(), sha[12..20]);
    }

    #[test]
    fn debug_hides_key_material() {
        let mut key = [0u8; 256];
        key[0] = 0xAB;
        let rendered = format!("{:?}", AuthKey::from_bytes(key));
        assert!(rendered.starts_with("AuthKey(id="));
        assert!(!rendered.contains("AB"));
    }
}
