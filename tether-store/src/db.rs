//! Durable SQLite tables (session row + peers) behind a bounded
//! connection pool.
//!
//! Schema creation is idempotent; opening the same file twice never resets
//! existing rows. The pool opens connections lazily up to a fixed ceiling
//! and blocks (never drops) when exhausted.

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use crate::error::StoreError;
use crate::{Peer, PeerKind};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS sessions (
        version INTEGER PRIMARY KEY,
        data    BLOB NOT NULL
    );
    CREATE TABLE IF NOT EXISTS peers (
        id          INTEGER PRIMARY KEY,
        access_hash INTEGER,
        kind        INTEGER NOT NULL,
        username    TEXT
    );
    CREATE INDEX IF NOT EXISTS peers_username ON peers (username);
";

/// Ids per `IN (…)` query; SQLite's lowest historical bind-variable limit
/// is 999.
const BULK_QUERY_CHUNK: usize = 500;

/// The single stored canonical session row.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionRow {
    pub version: i32,
    pub data: Vec<u8>,
}

// ─── Connection pool ──────────────────────────────────────────────────────────

struct PoolState {
    free: Vec<Connection>,
    open: usize,
}

struct Pool {
    path: PathBuf,
    state: Mutex<PoolState>,
    available: Condvar,
    max: usize,
}

struct PooledConn<'a> {
    conn: Option<Connection>,
    pool: &'a Pool,
}

impl Deref for PooledConn<'_> {
    type Target = Connection;
    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection taken")
    }
}

impl Drop for PooledConn<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.state.lock().unwrap().free.push(conn);
            self.pool.available.notify_one();
        }
    }
}

impl Pool {
    fn open(path: &Path, max: usize) -> Result<Self, StoreError> {
        let conn = Self::connect(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(PoolState { free: vec![conn], open: 1 }),
            available: Condvar::new(),
            max: max.max(1),
        })
    }

    fn connect(path: &Path) -> Result<Connection, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(conn)
    }

    /// Check out a connection, opening a new one while under the ceiling and
    /// blocking until one is returned once at it.
    fn get(&self) -> Result<PooledConn<'_>, StoreError> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(conn) = state.free.pop() {
                return Ok(PooledConn { conn: Some(conn), pool: self });
            }
            if state.open < self.max {
                state.open += 1;
                drop(state);
                return match Self::connect(&self.path) {
                    Ok(conn) => Ok(PooledConn { conn: Some(conn), pool: self }),
                    Err(e) => {
                        self.state.lock().unwrap().open -= 1;
                        self.available.notify_one();
                        Err(e)
                    }
                };
            }
            state = self.available.wait(state).unwrap();
        }
    }
}

// ─── Typed table access ───────────────────────────────────────────────────────

pub(crate) struct SessionDb {
    pool: Pool,
}

impl SessionDb {
    pub fn open(path: &Path, max_connections: usize) -> Result<Self, StoreError> {
        log::info!("[store] opening {}", path.display());
        Ok(Self { pool: Pool::open(path, max_connections)? })
    }

    pub fn save_session(&self, version: i32, data: &[u8]) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT OR REPLACE INTO sessions (version, data) VALUES (?1, ?2)",
            params![version, data],
        )?;
        Ok(())
    }

    pub fn session(&self) -> Result<Option<SessionRow>, StoreError> {
        let conn = self.pool.get()?;
        let row = conn
            .query_row(
                "SELECT version, data FROM sessions ORDER BY version DESC LIMIT 1",
                [],
                |row| Ok(SessionRow { version: row.get(0)?, data: row.get(1)? }),
            )
            .optional()?;
        Ok(row)
    }

    pub fn put_peer(&self, peer: &Peer) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT OR REPLACE INTO peers (id, access_hash, kind, username)
             VALUES (?1, ?2, ?3, ?4)",
            params![peer.id, peer.access_hash, peer.kind.code(), peer.username],
        )?;
        Ok(())
    }

    pub fn get_peer(&self, id: i64) -> Result<Option<Peer>, StoreError> {
        let conn = self.pool.get()?;
        let peer = conn
            .query_row(
                "SELECT id, access_hash, kind, username FROM peers WHERE id = ?1",
                [id],
                peer_from_row,
            )
            .optional()?;
        Ok(peer)
    }

    pub fn get_peers(&self, ids: &[i64]) -> Result<Vec<Peer>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.pool.get()?;
        let mut peers = Vec::new();
        // Chunked to stay clear of SQLite's bind-variable ceiling.
        for chunk in ids.chunks(BULK_QUERY_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(",");
            let sql = format!(
                "SELECT id, access_hash, kind, username FROM peers WHERE id IN ({placeholders})"
            );
            let mut stmt = conn.prepare(&sql)?;
            for row in stmt.query_map(params_from_iter(chunk.iter()), peer_from_row)? {
                peers.push(row?);
            }
        }
        Ok(peers)
    }

    pub fn get_peer_by_username(&self, username: &str) -> Result<Option<Peer>, StoreError> {
        let conn = self.pool.get()?;
        let peer = conn
            .query_row(
                "SELECT id, access_hash, kind, username FROM peers WHERE username = ?1 LIMIT 1",
                [username],
                peer_from_row,
            )
            .optional()?;
        Ok(peer)
    }
}

fn peer_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Peer> {
    let code: i32 = row.get(2)?;
    let kind = PeerKind::from_code(code).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Integer,
            format!("unknown peer kind {code}").into(),
        )
    })?;
    Ok(Peer {
        id: row.get(0)?,
        access_hash: row.get(1)?,
        kind,
        username: row.get(3)?,
    })
}
