//! # Local snapshots
//! The whole state is serialized and written under one key after every change,
//! overwriting the previous snapshot. On startup the same key is read back.
//!
//! On-disk format: the magic bytes `TETHERSN`, a little-endian `u32` format version,
//! then the JSON-serialized state.

use std::{
    cell::RefCell,
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};

use serde::{Serialize, de::DeserializeOwned};

pub const SNAPSHOT_MAGIC: &[u8] = b"TETHERSN";
pub const SNAPSHOT_VERSION: u32 = 1;
pub const SNAPSHOT_HEADER_LEN: usize = SNAPSHOT_MAGIC.len() + 4;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot payload is not valid JSON for this state: {0}")]
    Json(#[from] serde_json::Error),
    #[error("not a snapshot: {0}")]
    Format(&'static str),
    #[error("unsupported snapshot version {found}")]
    Version { found: u32 },
    #[error("storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },
}

/// Durable key-value storage for snapshots.
pub trait SnapshotStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, SnapshotError>;
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), SnapshotError>;
}

/// Stores each key as a file in a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    directory: PathBuf,
}

impl FileStorage {
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self, SnapshotError> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{key}.snapshot"))
    }
}

impl SnapshotStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, SnapshotError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), SnapshotError> {
        // staged and renamed into place; readers never see a half-written snapshot
        let path = self.path_for(key);
        let staging = path.with_extension("snapshot.tmp");
        fs::write(&staging, bytes)?;
        fs::rename(&staging, &path)?;
        Ok(())
    }
}

/// In-memory storage. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Rc<RefCell<BTreeMap<String, Vec<u8>>>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes larger than `quota` bytes fail, like a full browser storage bucket.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: Rc::default(),
            quota: Some(quota),
        }
    }

    pub fn insert_raw(&self, key: &str, bytes: Vec<u8>) {
        self.entries.borrow_mut().insert(key.to_string(), bytes);
    }

    pub fn get_raw(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.borrow().get(key).cloned()
    }
}

impl SnapshotStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, SnapshotError> {
        Ok(self.get_raw(key))
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), SnapshotError> {
        if let Some(quota) = self.quota {
            if bytes.len() > quota {
                return Err(SnapshotError::QuotaExceeded {
                    needed: bytes.len(),
                    quota,
                });
            }
        }
        self.insert_raw(key, bytes.to_vec());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub version: u32,
    pub payload_len: usize,
}

pub fn read_header(bytes: &[u8]) -> Result<SnapshotHeader, SnapshotError> {
    if bytes.len() < SNAPSHOT_HEADER_LEN {
        return Err(SnapshotError::Format("header too small"));
    }
    if !bytes.starts_with(SNAPSHOT_MAGIC) {
        return Err(SnapshotError::Format("magic bytes did not match"));
    }

    let version_offset = SNAPSHOT_MAGIC.len();
    let version_bytes: [u8; 4] = bytes[version_offset..SNAPSHOT_HEADER_LEN]
        .try_into()
        .map_err(|_| SnapshotError::Format("truncated version"))?;
    let version = u32::from_le_bytes(version_bytes);
    if version != SNAPSHOT_VERSION {
        return Err(SnapshotError::Version { found: version });
    }

    Ok(SnapshotHeader {
        version,
        payload_len: bytes.len() - SNAPSHOT_HEADER_LEN,
    })
}

pub fn encode_snapshot<S: Serialize>(state: &S) -> Result<Vec<u8>, SnapshotError> {
    let payload = serde_json::to_vec(state)?;
    let mut bytes = Vec::with_capacity(SNAPSHOT_HEADER_LEN + payload.len());
    bytes.extend_from_slice(SNAPSHOT_MAGIC);
    bytes.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

pub fn decode_snapshot<S: DeserializeOwned>(bytes: &[u8]) -> Result<S, SnapshotError> {
    read_header(bytes)?;
    Ok(serde_json::from_slice(&bytes[SNAPSHOT_HEADER_LEN..])?)
}

/// A snapshot slot: one storage backend plus the key the state lives under.
#[derive(Clone)]
pub struct LocalSnapshot {
    storage: Rc<dyn SnapshotStorage>,
    key: String,
}

impl LocalSnapshot {
    pub fn new(storage: impl SnapshotStorage + 'static, key: impl Into<String>) -> Self {
        Self {
            storage: Rc::new(storage),
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn try_restore<S: DeserializeOwned>(&self) -> Result<Option<S>, SnapshotError> {
        match self.storage.read(&self.key)? {
            Some(bytes) => decode_snapshot(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Read the snapshot back. Missing or unreadable snapshots yield `None`, so the caller keeps its seed.
    pub fn restore<S: DeserializeOwned>(&self) -> Option<S> {
        match self.try_restore() {
            Ok(Some(state)) => {
                log::info!("Restored state from snapshot `{}`", self.key);
                Some(state)
            }
            Ok(None) => {
                log::info!("No snapshot under `{}`, starting from seed data", self.key);
                None
            }
            Err(e) => {
                log::warn!(
                    "Failed to restore snapshot `{}`, starting from seed data: {e}",
                    self.key
                );
                None
            }
        }
    }

    pub fn try_persist<S: Serialize>(&self, state: &S) -> Result<(), SnapshotError> {
        let bytes = encode_snapshot(state)?;
        self.storage.write(&self.key, &bytes)
    }

    /// Overwrite the snapshot. Failures are logged and the in-memory state carries on regardless.
    pub fn persist<S: Serialize>(&self, state: &S) -> bool {
        match self.try_persist(state) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to persist snapshot `{}`: {e}", self.key);
                false
            }
        }
    }

    /// A store listener that persists every new state.
    pub fn writer<S: Serialize + 'static>(&self) -> impl FnMut(&S) + 'static {
        let snapshot = self.clone();
        move |state: &S| {
            snapshot.persist(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Notes {
        items: Vec<String>,
    }

    fn notes() -> Notes {
        Notes {
            items: vec!["one".to_string(), "two, with comma".to_string()],
        }
    }

    #[test]
    fn test_header_is_magic_then_version() {
        let bytes = encode_snapshot(&notes()).unwrap();
        assert!(bytes.starts_with(SNAPSHOT_MAGIC));
        let header = read_header(&bytes).unwrap();
        assert_eq!(header.version, SNAPSHOT_VERSION);
        assert_eq!(header.payload_len, bytes.len() - SNAPSHOT_HEADER_LEN);
    }

    #[test]
    fn test_restore_roundtrip_in_memory() {
        let snapshot = LocalSnapshot::new(MemoryStorage::new(), "notes");
        assert!(snapshot.persist(&notes()));
        assert_eq!(snapshot.restore::<Notes>(), Some(notes()));
    }

    #[test]
    fn test_rates_restore_bit_for_bit() {
        let snapshot = LocalSnapshot::new(MemoryStorage::new(), "rates");
        for den in 1..400u32 {
            let rates: Vec<f64> = (0..=den).map(|num| f64::from(num) / f64::from(den) * 100.0).collect();
            assert!(snapshot.persist(&rates));
            assert_eq!(snapshot.restore::<Vec<f64>>(), Some(rates), "denominator {den}");
        }
    }

    #[test]
    fn test_missing_snapshot_restores_nothing() {
        let snapshot = LocalSnapshot::new(MemoryStorage::new(), "notes");
        assert_eq!(snapshot.restore::<Notes>(), None);
    }

    #[test]
    fn test_plain_json_without_header_is_rejected() {
        let storage = MemoryStorage::new();
        storage.insert_raw("notes", br#"{"items":[]}"#.to_vec());
        let snapshot = LocalSnapshot::new(storage, "notes");
        assert!(matches!(
            snapshot.try_restore::<Notes>(),
            Err(SnapshotError::Format(_))
        ));
        assert_eq!(snapshot.restore::<Notes>(), None);
    }

    #[test]
    fn test_future_version_is_rejected() {
        let mut bytes = encode_snapshot(&notes()).unwrap();
        bytes[SNAPSHOT_MAGIC.len()..SNAPSHOT_HEADER_LEN].copy_from_slice(&7u32.to_le_bytes());
        assert!(matches!(
            decode_snapshot::<Notes>(&bytes),
            Err(SnapshotError::Version { found: 7 })
        ));
    }

    #[test]
    fn test_corrupt_payload_is_rejected() {
        let mut bytes = encode_snapshot(&notes()).unwrap();
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(
            decode_snapshot::<Notes>(&bytes),
            Err(SnapshotError::Json(_))
        ));
    }

    #[test]
    fn test_quota_failure_keeps_previous_snapshot() {
        let storage = MemoryStorage::with_quota(64);
        let snapshot = LocalSnapshot::new(storage.clone(), "notes");
        let small = Notes { items: vec![] };
        assert!(snapshot.persist(&small));

        let large = Notes {
            items: vec!["x".repeat(200)],
        };
        assert!(!snapshot.persist(&large));
        assert_eq!(snapshot.restore::<Notes>(), Some(small));
    }

    #[test]
    fn test_file_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested")).unwrap();
        let path = storage.path_for("notes");
        let snapshot = LocalSnapshot::new(storage, "notes");

        assert_eq!(snapshot.restore::<Notes>(), None);
        assert!(snapshot.persist(&notes()));
        assert!(path.exists());
        assert_eq!(snapshot.restore::<Notes>(), Some(notes()));
    }
}
