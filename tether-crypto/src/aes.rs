//! AES-256-IGE — the block mode Telegram uses for local storage and MTProto.
//!
//! IGE chains both the previous ciphertext and the previous plaintext block;
//! the 32-byte IV carries the two initial chaining values.

use ::aes::Aes256;
use ::aes::cipher::generic_array::GenericArray;
use ::aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};

/// Encrypt `buffer` in place. Length must be a multiple of 16.
pub fn ige_encrypt(buffer: &mut [u8], key: &[u8; 32], iv: &[u8; 32]) {
    debug_assert_eq!(buffer.len() % 16, 0);
    let cipher = Aes256::new(GenericArray::from_slice(key));

    let mut prev_cipher: [u8; 16] = iv[..16].try_into().unwrap();
    let mut prev_plain:  [u8; 16] = iv[16..].try_into().unwrap();

    for chunk in buffer.chunks_exact_mut(16) {
        let plain: [u8; 16] = chunk.try_into().unwrap();
        let mut block = GenericArray::clone_from_slice(chunk);
        for (b, p) in block.iter_mut().zip(prev_cipher.iter()) {
            *b ^= p;
        }
        cipher.encrypt_block(&mut block);
        for (c, (b, p)) in chunk.iter_mut().zip(block.iter().zip(prev_plain.iter())) {
            *c = b ^ p;
        }
        prev_cipher.copy_from_slice(chunk);
        prev_plain = plain;
    }
}

/// Decrypt `buffer` in place. Length must be a multiple of 16.
pub fn ige_decrypt(buffer: &mut [u8], key: &[u8; 32], iv: &[u8; 32]) {
    debug_assert_eq!(buffer.len() % 16, 0);
    let cipher = Aes256::new(GenericArray::from_slice(key));

    let mut prev_cipher: [u8; 16] = iv[..16].try_into().unwrap();
    let mut prev_plain:  [u8; 16] = iv[16..].try_into().unwrap();

    for chunk in buffer.chunks_exact_mut(16) {
        let encrypted: [u8; 16] = chunk.try_into().unwrap();
        let mut block = GenericArray::clone_from_slice(chunk);
        for (b, p) in block.iter_mut().zip(prev_plain.iter()) {
            *b ^= p;
        }
        cipher.decrypt_block(&mut block);
        for (c, (b, p)) in chunk.iter_mut().zip(block.iter().zip(prev_cipher.iter())) {
            *c = b ^ p;
        }
        prev_cipher = encrypted;
        prev_plain.copy_from_slice(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let key = [0x11u8; 32];
        let iv: [u8; 32] = std::array::from_fn(|i| i as u8);
        let original: Vec<u8> = (0u8..64).collect();

        let mut buf = original.clone();
        ige_encrypt(&mut buf, &key, &iv);
        assert_ne!(buf, original);
        ige_decrypt(&mut buf, &key, &iv);
        assert_eq!(buf, original);
    }

    #[test]
    fn chaining_differs_per_block() {
        // Identical plaintext blocks must not produce identical ciphertext.
        let key = [0x42u8; 32];
        let iv = [0x24u8; 32];
        let mut buf = [0xAAu8; 32];
        ige_encrypt(&mut buf, &key, &iv);
        assert_ne!(buf[..16], buf[16..]);
    }
}
