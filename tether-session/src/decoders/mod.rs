//! Format decoders — stateless transforms from foreign credential material
//! to the canonical [`SessionRecord`].
//!
//! Each decoder owns exactly one format. Dispatch is keyed by
//! [`SessionKind`], so supporting a new format means adding a variant and an
//! arm here, not touching callers. Decoders never open the durable store,
//! never retry, and never fall back to a different format.

use std::path::Path;

use crate::errors::SessionError;
use crate::record::SessionRecord;

pub mod pyrogram;
pub mod tdesktop;
pub mod telethon;

pub use tdesktop::AccountPolicy;

/// Which credential format a session is loaded from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionKind {
    /// The canonical session table itself — no conversion.
    Native,
    /// tether's own portable string encoding.
    StringSession,
    /// A Telethon (Python) string session.
    Telethon,
    /// A Pyrogram (Python) string session.
    Pyrogram,
    /// A Telegram Desktop `tdata` profile directory.
    TDesktop,
}

impl SessionKind {
    /// Formats that go through a decoder rather than the session table.
    pub fn is_foreign(self) -> bool {
        !matches!(self, Self::Native)
    }
}

/// Run the decoder registered for `kind` over `source`.
///
/// For string formats `source` is the session string itself; for
/// [`SessionKind::TDesktop`] it is the path of the `tdata` directory.
pub fn decode(
    kind: SessionKind,
    source: &str,
    passcode: &[u8],
    policy: AccountPolicy,
) -> Result<SessionRecord, SessionError> {
    match kind {
        SessionKind::StringSession => SessionRecord::decode_string(source),
        SessionKind::Telethon      => telethon::decode(source),
        SessionKind::Pyrogram      => pyrogram::decode(source),
        SessionKind::TDesktop      => tdesktop::decode(Path::new(source), passcode, policy),
        SessionKind::Native        => Err(SessionError::decode(
            "native",
            "native sessions are read from the session table, not decoded",
        )),
    }
}

// ─── Shared field reader ──────────────────────────────────────────────────────

/// Big-endian cursor over a decoded blob. Every accessor names the field it
/// is reading so a truncation error points at the exact spot.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    format: &'static str,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8], format: &'static str) -> Self {
        Self { buf, pos: 0, format }
    }

    fn take(&mut self, n: usize, field: &str) -> Result<&'a [u8], SessionError> {
        if self.pos + n > self.buf.len() {
            return Err(SessionError::decode(self.format, format!("truncated at {field}")));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn u8(&mut self, field: &str) -> Result<u8, SessionError> {
        Ok(self.take(1, field)?[0])
    }

    /// A strict boolean byte: anything but 0 or 1 is a malformed header.
    pub fn flag(&mut self, field: &str) -> Result<bool, SessionError> {
        match self.u8(field)? {
            0 => Ok(false),
            1 => Ok(true),
            b => Err(SessionError::decode(self.format, format!("invalid {field} byte {b:#04x}"))),
        }
    }

    pub fn u16(&mut self, field: &str) -> Result<u16, SessionError> {
        Ok(u16::from_be_bytes(self.take(2, field)?.try_into().unwrap()))
    }

    pub fn u32(&mut self, field: &str) -> Result<u32, SessionError> {
        Ok(u32::from_be_bytes(self.take(4, field)?.try_into().unwrap()))
    }

    pub fn i32(&mut self, field: &str) -> Result<i32, SessionError> {
        Ok(i32::from_be_bytes(self.take(4, field)?.try_into().unwrap()))
    }

    pub fn u64(&mut self, field: &str) -> Result<u64, SessionError> {
        Ok(u64::from_be_bytes(self.take(8, field)?.try_into().unwrap()))
    }

    pub fn array<const N: usize>(&mut self, field: &str) -> Result<[u8; N], SessionError> {
        Ok(self.take(N, field)?.try_into().unwrap())
    }

    /// Qt-serialized byte array: u32 length prefix, `0xFFFF_FFFF` meaning a
    /// null (empty) array.
    pub fn qt_bytes(&mut self, field: &str) -> Result<Vec<u8>, SessionError> {
        let len = self.u32(field)?;
        if len == u32::MAX {
            return Ok(Vec::new());
        }
        Ok(self.take(len as usize, field)?.to_vec())
    }
}
