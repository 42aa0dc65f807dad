//! # tether-session
//!
//! Session normalization for Telegram clients: credential material from
//! Pyrogram, Telethon, Telegram Desktop or tether's own portable string
//! encoding, converted into one versioned canonical record.
//!
//! - [`SessionRecord`] — the canonical schema (auth key + fingerprint, DC,
//!   endpoint, optional expiry), serialized as versioned JSON.
//! - [`decoders`] — one stateless decoder per foreign format.
//! - [`SessionLoader`] — name + format selector in, canonical bytes (or a
//!   deferred, inspectable error) out; also opens the backing
//!   [`tether_store::Storage`] for the session.

#![deny(unsafe_code)]

pub mod decoders;
mod dc;
mod errors;
mod loader;
mod record;

pub use decoders::{AccountPolicy, SessionKind};
pub use errors::{CorruptError, SessionError};
pub use loader::{DEFAULT_SESSION_DIR, SessionLoader, SessionOpts};
pub use record::{LATEST_VERSION, SessionRecord};
