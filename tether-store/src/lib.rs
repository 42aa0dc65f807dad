//! # tether-store
//!
//! Durable storage for a Telegram client: one canonical session row plus the
//! peer table (id → access hash / kind / username), fronted by a TTL cache.
//!
//! - Peer reads are cache-first; a durable hit repopulates the cache, and an
//!   expired entry is re-fetched rather than served stale.
//! - Writes to the same peer id are serialized in arrival order; writes to
//!   different ids proceed concurrently and never block unrelated cache reads.
//! - An in-memory mode trades durability (and username lookups) for zero
//!   filesystem footprint.

#![deny(unsafe_code)]

mod cache;
mod db;
mod error;

pub use cache::TtlCache;
pub use db::SessionRow;
pub use error::StoreError;

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ─── Peer model ───────────────────────────────────────────────────────────────

/// What kind of peer a record describes. Integer codes match the on-disk
/// schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeerKind {
    User    = 1,
    Chat    = 2,
    Channel = 3,
}

impl PeerKind {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::User),
            2 => Some(Self::Chat),
            3 => Some(Self::Channel),
            _ => None,
        }
    }

    /// Users and channels cannot be addressed without their access hash;
    /// basic group chats need none.
    pub fn requires_access_hash(self) -> bool {
        !matches!(self, Self::Chat)
    }
}

/// A stored peer record. Mutable over time: usernames get reassigned and
/// access hashes change when a newer reference is resolved, so rows are
/// upserted, never versioned.
#[derive(Clone, Debug, PartialEq)]
pub struct Peer {
    pub id: i64,
    pub access_hash: Option<i64>,
    pub kind: PeerKind,
    pub username: Option<String>,
}

/// The dispatch-facing view of a peer: everything a protocol call needs to
/// address it.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedPeer {
    pub kind: PeerKind,
    pub access_hash: Option<i64>,
    pub username: Option<String>,
}

// ─── Options ──────────────────────────────────────────────────────────────────

/// Tuning knobs for [`Storage`]. The defaults match long-running client use.
#[derive(Clone, Debug)]
pub struct StorageOpts {
    /// How long a cached peer stays valid. Default 6 hours.
    pub cache_ttl: Duration,
    /// How often the cache sweeper reclaims expired entries. Default 24 hours.
    pub sweep_interval: Duration,
    /// Ceiling on concurrently open SQLite connections. Default 100.
    pub max_connections: usize,
}

impl Default for StorageOpts {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(6 * 60 * 60),
            sweep_interval: Duration::from_secs(24 * 60 * 60),
            max_connections: 100,
        }
    }
}

// ─── Storage ──────────────────────────────────────────────────────────────────

/// Peer store plus session table over one backing file.
///
/// Construct once per session file and share by reference; all methods take
/// `&self` and are safe under concurrent use.
pub struct Storage {
    db: Option<db::SessionDb>,
    peers: TtlCache<i64, Peer>,
    write_locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
    durable_reads: AtomicU64,
}

impl Storage {
    /// Open (or create) the durable store at `path`.
    pub fn open(path: impl AsRef<Path>, opts: StorageOpts) -> Result<Self, StoreError> {
        let db = db::SessionDb::open(path.as_ref(), opts.max_connections)?;
        Ok(Self {
            db: Some(db),
            peers: TtlCache::new(opts.cache_ttl, opts.sweep_interval),
            write_locks: Mutex::new(HashMap::new()),
            durable_reads: AtomicU64::new(0),
        })
    }

    /// Cache-only store: nothing survives a restart and
    /// [`get_peer_by_username`](Self::get_peer_by_username) is unavailable.
    pub fn in_memory(opts: StorageOpts) -> Self {
        log::info!("[store] in-memory mode, peers will not persist across restarts");
        Self {
            db: None,
            peers: TtlCache::new(opts.cache_ttl, opts.sweep_interval),
            write_locks: Mutex::new(HashMap::new()),
            durable_reads: AtomicU64::new(0),
        }
    }

    /// Whether a durable table backs this store.
    pub fn is_durable(&self) -> bool {
        self.db.is_some()
    }

    // The lock table grows with distinct peer ids; entries are two words
    // each and ids repeat heavily in practice.
    fn write_lock(&self, id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.write_locks.lock().unwrap();
        locks.entry(id).or_default().clone()
    }

    /// Upsert a peer. Cache and durable row are updated under a per-id lock,
    /// so concurrent puts to one id land in arrival order while puts to
    /// other ids proceed in parallel.
    pub fn put_peer(&self, peer: Peer) -> Result<(), StoreError> {
        let lock = self.write_lock(peer.id);
        let _guard = lock.lock().unwrap();
        self.peers.insert(peer.id, peer.clone());
        if let Some(db) = &self.db {
            db.put_peer(&peer)?;
        }
        Ok(())
    }

    /// Cache-first lookup; a durable hit repopulates the cache.
    pub fn get_peer(&self, id: i64) -> Result<Option<Peer>, StoreError> {
        if let Some(peer) = self.peers.get(&id) {
            return Ok(Some(peer));
        }
        let Some(db) = &self.db else { return Ok(None) };
        // Repopulation holds the same per-id lock as put_peer, so a stale
        // durable read can never clobber a concurrent put's cache entry.
        let lock = self.write_lock(id);
        let _guard = lock.lock().unwrap();
        if let Some(peer) = self.peers.get(&id) {
            return Ok(Some(peer));
        }
        self.durable_reads.fetch_add(1, Ordering::Relaxed);
        match db.get_peer(id)? {
            Some(peer) => {
                self.peers.insert(id, peer.clone());
                Ok(Some(peer))
            }
            None => Ok(None),
        }
    }

    /// Bulk lookup: cache hits are collected first, misses fetched in one
    /// query. Unknown ids are skipped; order follows the input.
    pub fn get_peers(&self, ids: &[i64]) -> Result<Vec<Peer>, StoreError> {
        let mut found: HashMap<i64, Peer> = HashMap::new();
        let mut misses = Vec::new();
        for &id in ids {
            match self.peers.get(&id) {
                Some(peer) => {
                    found.insert(id, peer);
                }
                None => misses.push(id),
            }
        }
        if !misses.is_empty() {
            if let Some(db) = &self.db {
                self.durable_reads.fetch_add(1, Ordering::Relaxed);
                for peer in db.get_peers(&misses)? {
                    let lock = self.write_lock(peer.id);
                    let _guard = lock.lock().unwrap();
                    // An entry that appeared since the bulk read came from a
                    // put and is fresher than what the table returned.
                    match self.peers.get(&peer.id) {
                        Some(fresher) => {
                            found.insert(peer.id, fresher);
                        }
                        None => {
                            self.peers.insert(peer.id, peer.clone());
                            found.insert(peer.id, peer);
                        }
                    }
                }
            }
        }
        Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
    }

    /// Durable-only username lookup. Usernames get reassigned, so the result
    /// is best-effort and may be stale; it is deliberately never cached.
    pub fn get_peer_by_username(&self, username: &str) -> Result<Option<Peer>, StoreError> {
        match &self.db {
            Some(db) => db.get_peer_by_username(username),
            None => Err(StoreError::Unsupported("username lookups need the durable peer table")),
        }
    }

    /// Resolve a peer id into addressing metadata. A user or channel stored
    /// without its access hash cannot be addressed and resolves to `None`.
    pub fn resolve_peer(&self, id: i64) -> Result<Option<ResolvedPeer>, StoreError> {
        Ok(self.get_peer(id)?.and_then(|peer| {
            if peer.kind.requires_access_hash() && peer.access_hash.is_none() {
                log::debug!("[store] peer {id} has no access hash, cannot be addressed");
                return None;
            }
            Some(ResolvedPeer {
                kind: peer.kind,
                access_hash: peer.access_hash,
                username: peer.username,
            })
        }))
    }

    /// Upsert the canonical session row.
    pub fn save_session(&self, version: i32, data: &[u8]) -> Result<(), StoreError> {
        match &self.db {
            Some(db) => db.save_session(version, data),
            None => Err(StoreError::Unsupported("session rows need the durable table")),
        }
    }

    /// Read the stored canonical session row, if any.
    pub fn session(&self) -> Result<Option<SessionRow>, StoreError> {
        match &self.db {
            Some(db) => db.session(),
            None => Err(StoreError::Unsupported("session rows need the durable table")),
        }
    }

    #[cfg(test)]
    fn durable_read_count(&self) -> u64 {
        self.durable_reads.load(Ordering::Relaxed)
    }
}
