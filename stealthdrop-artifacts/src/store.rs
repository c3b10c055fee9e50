//! Durable artifact storage backed by sled.
//!
//! Artifacts live in the `files` tree keyed by their logical name. Entries are
//! written exactly once; there is no overwrite path. A `meta` tree records the
//! schema version, written the first time a database is opened.

use std::{fs, path::Path};

use tracing::{debug, info};

use crate::error::ArtifactError;

pub const FILES_TREE: &str = "files";
pub const STORE_SCHEMA_VERSION: u32 = 1;

const META_TREE: &str = "meta";
const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";

#[derive(Clone)]
pub struct ArtifactStore {
    db: sled::Db,
    files: sled::Tree,
}

impl ArtifactStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path_ref = path.as_ref();
        if let Some(parent) = path_ref.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let db = sled::open(path_ref)?;
        info!("Opened artifact store at {}", path_ref.display());
        Self::from_db(db)
    }

    /// Store that lives only as long as the process.
    pub fn temporary() -> Result<Self, ArtifactError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, ArtifactError> {
        let meta = db.open_tree(META_TREE)?;
        match meta.get(SCHEMA_VERSION_KEY)? {
            None => {
                meta.insert(SCHEMA_VERSION_KEY, &STORE_SCHEMA_VERSION.to_be_bytes()[..])?;
                debug!("initialised artifact store schema v{}", STORE_SCHEMA_VERSION);
            }
            Some(raw) => {
                let found = decode_version(&raw);
                if found != STORE_SCHEMA_VERSION {
                    return Err(ArtifactError::SchemaMismatch {
                        expected: STORE_SCHEMA_VERSION,
                        found,
                    });
                }
            }
        }
        let files = db.open_tree(FILES_TREE)?;
        Ok(Self { db, files })
    }

    pub fn get(&self, name: &str) -> Result<Option<Vec<u8>>, ArtifactError> {
        Ok(self.files.get(name)?.map(|bytes| bytes.to_vec()))
    }

    pub fn contains(&self, name: &str) -> Result<bool, ArtifactError> {
        Ok(self.files.contains_key(name)?)
    }

    /// Persist `bytes` under `name` unless an entry already exists.
    ///
    /// Returns `false` when the name was already taken; the stored bytes are
    /// left untouched in that case.
    pub fn put_once(&self, name: &str, bytes: &[u8]) -> Result<bool, ArtifactError> {
        let swapped = self
            .files
            .compare_and_swap(name, None::<&[u8]>, Some(bytes))?;
        if swapped.is_ok() {
            self.files.flush()?;
        }
        Ok(swapped.is_ok())
    }

    /// Names of every resident artifact with its size in bytes.
    pub fn entries(&self) -> Result<Vec<(String, usize)>, ArtifactError> {
        let mut out = Vec::new();
        for item in self.files.iter() {
            let (key, value) = item?;
            out.push((String::from_utf8_lossy(&key).into_owned(), value.len()));
        }
        Ok(out)
    }

    pub fn flush(&self) -> Result<(), ArtifactError> {
        self.db.flush()?;
        Ok(())
    }
}

fn decode_version(raw: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    if raw.len() == 4 {
        buf.copy_from_slice(raw);
    }
    u32::from_be_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_once_never_overwrites() {
        let store = ArtifactStore::temporary().unwrap();
        assert!(store.put_once("vk", b"first").unwrap());
        assert!(!store.put_once("vk", b"second").unwrap());
        assert_eq!(store.get("vk").unwrap().as_deref(), Some(&b"first"[..]));
    }

    #[test]
    fn missing_name_reads_none() {
        let store = ArtifactStore::temporary().unwrap();
        assert!(store.get("pk").unwrap().is_none());
        assert!(!store.contains("pk").unwrap());
    }

    #[test]
    fn entries_lists_sizes() {
        let store = ArtifactStore::temporary().unwrap();
        store.put_once("pk", &[0u8; 7]).unwrap();
        store.put_once("vk", &[0u8; 3]).unwrap();
        let mut entries = store.entries().unwrap();
        entries.sort();
        assert_eq!(entries, vec![("pk".to_string(), 7), ("vk".to_string(), 3)]);
    }

    #[test]
    fn reopen_keeps_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifacts.db");
        {
            let store = ArtifactStore::open(&path).unwrap();
            store.put_once("vk", b"bytes").unwrap();
            store.flush().unwrap();
        }
        let store = ArtifactStore::open(&path).unwrap();
        assert_eq!(store.get("vk").unwrap().as_deref(), Some(&b"bytes"[..]));
    }

    #[test]
    fn rejects_other_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifacts.db");
        {
            let db = sled::open(&path).unwrap();
            let meta = db.open_tree(META_TREE).unwrap();
            meta.insert(SCHEMA_VERSION_KEY, &2u32.to_be_bytes()[..]).unwrap();
            db.flush().unwrap();
        }
        match ArtifactStore::open(&path) {
            Err(ArtifactError::SchemaMismatch { expected, found }) => {
                assert_eq!(expected, STORE_SCHEMA_VERSION);
                assert_eq!(found, 2);
            }
            Err(other) => panic!("unexpected error {other}"),
            Ok(_) => panic!("schema mismatch accepted"),
        }
    }
}
