//! Telethon string-session decoder.
//!
//! A Telethon session string is an ASCII version character (only `'1'` has
//! ever shipped) followed by URL-safe base64 of a big-endian struct:
//!
//! ```text
//! dc u8 | ip [4 or 16] | port u16 | auth_key [256]
//! ```
//!
//! Unlike Pyrogram, the endpoint is embedded, so no DC table lookup happens.

use std::net::{Ipv4Addr, Ipv6Addr};

use base64::Engine as _;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};

use super::Reader;
use crate::errors::SessionError;
use crate::record::SessionRecord;

const FORMAT: &str = "telethon";

const IPV4_LEN: usize = 263;
const IPV6_LEN: usize = 275;

pub fn decode(input: &str) -> Result<SessionRecord, SessionError> {
    let input = input.trim();
    let Some(rest) = input.strip_prefix('1') else {
        return Err(SessionError::decode(
            FORMAT,
            format!("unsupported session string version {:?}", input.chars().next()),
        ));
    };

    let raw = URL_SAFE
        .decode(rest.as_bytes())
        .or_else(|_| URL_SAFE_NO_PAD.decode(rest.trim_end_matches('=').as_bytes()))
        .map_err(|e| SessionError::decode(FORMAT, format!("invalid base64: {e}")))?;

    let mut r = Reader::new(&raw, FORMAT);
    let dc_id = r.u8("dc id")? as i32;
    let server_address = match raw.len() {
        IPV4_LEN => Ipv4Addr::from(r.array::<4>("ip address")?).to_string(),
        IPV6_LEN => Ipv6Addr::from(r.array::<16>("ip address")?).to_string(),
        n => {
            return Err(SessionError::decode(
                FORMAT,
                format!("unsupported packed layout of {n} bytes"),
            ));
        }
    };
    let port = r.u16("port")?;
    let auth_key = r.array::<256>("auth key")?;

    Ok(SessionRecord::new(dc_id, auth_key, server_address, port))
}
