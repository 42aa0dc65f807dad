//! Session loader — resolves a logical session name plus a format selector
//! into canonical session bytes, eagerly, at construction time.
//!
//! Resolution happens exactly once; the outcome (bytes or error) is captured
//! in the loader and handed back on every accessor call. Construction never
//! fails outright, so call sites can read the name/path fields first and
//! check the error whenever convenient.

use std::path::{Path, PathBuf};

use tether_store::{Storage, StorageOpts};

use crate::decoders::{self, AccountPolicy, SessionKind};
use crate::errors::{CorruptError, SessionError};
use crate::record::LATEST_VERSION;

/// Default directory for session files.
pub const DEFAULT_SESSION_DIR: &str = "./sessions";

/// Optional overrides for [`SessionLoader`].
#[derive(Clone, Debug, Default)]
pub struct SessionOpts {
    /// Foreign credential material — the session string, or the `tdata`
    /// directory path for [`SessionKind::TDesktop`]. Defaults to the session
    /// name itself, matching the classic calling convention where the name
    /// doubles as the input.
    pub source: Option<String>,
    /// Override the on-disk identity (file stem). Default `{name}_telegram`.
    pub session_name: Option<String>,
    /// Override the storage directory. Default [`DEFAULT_SESSION_DIR`].
    pub session_path: Option<PathBuf>,
    /// Local passcode for TDesktop profiles; empty when none is set.
    pub passcode: Vec<u8>,
    /// Multi-account selection for TDesktop profiles.
    pub account_policy: AccountPolicy,
    /// Tuning for the backing store.
    pub storage: StorageOpts,
}

/// A resolved session: logical name, on-disk location, and the canonical
/// bytes (or the error that produced them).
pub struct SessionLoader {
    name: String,
    file_name: String,
    path: PathBuf,
    kind: SessionKind,
    storage: Option<Storage>,
    resolved: Result<Vec<u8>, SessionError>,
}

impl SessionLoader {
    /// Resolve `name` with default options.
    pub fn new(name: &str, kind: SessionKind) -> Self {
        Self::with_opts(name, kind, SessionOpts::default())
    }

    /// Resolve `name`, honoring overrides.
    pub fn with_opts(name: &str, kind: SessionKind, opts: SessionOpts) -> Self {
        let name = if name.is_empty() && kind == SessionKind::Native {
            "new_session".to_string()
        } else {
            name.to_string()
        };
        let file_name = opts
            .session_name
            .clone()
            .unwrap_or_else(|| format!("{name}_telegram"));
        let path = opts
            .session_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_DIR));
        let source = opts.source.clone().unwrap_or_else(|| name.clone());

        log::info!("[session] loading {file_name:?} ({kind:?})");
        let (storage, resolved) = match Self::open_storage(&path, &file_name, &opts) {
            Ok(storage) => {
                let resolved = Self::resolve(&storage, kind, &source, &opts);
                (Some(storage), resolved)
            }
            Err(e) => (None, Err(e)),
        };

        Self { name, file_name, path, kind, storage, resolved }
    }

    fn open_storage(path: &Path, file_name: &str, opts: &SessionOpts) -> Result<Storage, SessionError> {
        std::fs::create_dir_all(path)?;
        let file = path.join(format!("{file_name}.session"));
        Ok(Storage::open(file, opts.storage.clone())?)
    }

    fn resolve(
        storage: &Storage,
        kind: SessionKind,
        source: &str,
        opts: &SessionOpts,
    ) -> Result<Vec<u8>, SessionError> {
        if kind.is_foreign() {
            let record = decoders::decode(kind, source, &opts.passcode, opts.account_policy)?;
            return record.to_bytes();
        }
        // Native: hand back the stored row, consistency-checked. No row yet
        // means a fresh session: empty bytes, not an error.
        match storage.session()? {
            Some(row) => {
                if row.version != LATEST_VERSION {
                    return Err(SessionError::Corrupt(CorruptError::Version { found: row.version }));
                }
                crate::record::SessionRecord::from_bytes(&row.data)?;
                Ok(row.data)
            }
            None => Ok(Vec::new()),
        }
    }

    /// The logical session name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The on-disk file stem.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The storage directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    /// Full path of the backing session file.
    pub fn session_file(&self) -> PathBuf {
        self.path.join(format!("{}.session", self.file_name))
    }

    /// The canonical session bytes, or the error captured at construction.
    /// Idempotent: nothing is re-decoded on repeat calls.
    pub fn data(&self) -> Result<&[u8], &SessionError> {
        match &self.resolved {
            Ok(bytes) => Ok(bytes.as_slice()),
            Err(e) => Err(e),
        }
    }

    /// The store opened for this session, shared by the peer layer.
    /// `None` only when opening the backing file itself failed.
    pub fn storage(&self) -> Option<&Storage> {
        self.storage.as_ref()
    }
}
