/// Calculate the SHA-1 hash of one or more byte slices concatenated.
#[macro_export]
macro_rules! sha1 {
    ( $( $x:expr ),+ ) => {{
        use sha1::{Digest, Sha1};
        let mut h = Sha1::new();
        $( h.update($x); )+
        let out: [u8; 20] = h.finalize().into();
        out
    }};
}

/// Calculate the SHA-512 hash of one or more byte slices concatenated.
#[macro_export]
macro_rules! sha512 {
    ( $( $x:expr ),+ ) => {{
        use sha2::{Digest, Sha512};
        let mut h = Sha512::new();
        $( h.update($x); )+
        let out: [u8; 64] = h.finalize().into();
        out
    }};
}

/// Calculate the MD5 digest of one or more byte slices concatenated.
///
/// Telegram Desktop uses MD5 only for file integrity trailers and file-name
/// keys, never for anything security-sensitive. Callers must depend on the
/// `md-5` crate themselves; the expansion names it directly.
#[macro_export]
macro_rules! md5 {
    ( $( $x:expr ),+ ) => {{
        use md5::{Digest, Md5};
        let mut h = Md5::new();
        $( h.update($x); )+
        let out: [u8; 16] = h.finalize().into();
        out
    }};
}

#[cfg(test)]
mod tests {
    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn known_digests() {
        assert_eq!(hex(&sha1!(b"abc")), "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(hex(&md5!(b"abc")), "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(
            hex(&sha512!(b"abc")),
            "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a\
             2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f"
        );
    }

    #[test]
    fn multiple_inputs_concatenate() {
        assert_eq!(sha1!(b"ab", b"c"), sha1!(b"abc"));
        assert_eq!(md5!(b"a", b"b", b"c"), md5!(b"abc"));
    }
}
