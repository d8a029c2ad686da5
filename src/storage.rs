// The persistence adapter. The folder tree (names and nesting only) is one
// JSON blob under a fixed key; each file's content lives under its own key,
// the file's absolute slash-separated path. Keeping content out of the tree
// blob means it can be fetched per node while the tree is rebuilt.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sled::Db;
use tracing::instrument;

use crate::errors::Result;
use crate::fsystem::{File, FileSystem, FolderId};

/// Fixed key holding the serialized folder tree. File-content keys are
/// absolute `~/`-prefixed paths, so they can never collide with it.
const TREE_KEY: &str = "root";

#[derive(Serialize, Deserialize)]
struct FolderRecord {
    name: String,
    #[serde(default)]
    folders: Vec<FolderRecord>,
    #[serde(default)]
    files: Vec<String>,
}

pub struct Storage {
    db: Db,
}

impl Storage {
    pub fn open(path: PathBuf) -> Result<Storage> {
        let db = sled::open(&path);
        let db = match db {
            Ok(db) => db,
            Err(e) => {
                tracing::error!("Sled failed to open database at {}: {}", path.display(), e);
                return Err(e.into());
            }
        };
        Ok(Storage { db })
    }

    /// An in-memory database that disappears on drop. Test use only.
    pub fn temporary() -> Result<Storage> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Storage { db })
    }

    /// Write-through save of the whole tree structure. File content is not
    /// included; it is persisted separately as files change.
    #[instrument(skip(self, fs))]
    pub fn save_tree(&self, fs: &FileSystem) -> Result<()> {
        let record = folder_record(fs, fs.root());
        let bytes = serde_json::to_vec(&record)?;
        self.db.insert(TREE_KEY, bytes)?;
        self.db.flush()?;
        Ok(())
    }

    pub fn save_file_text(&self, key: &str, text: &str) -> Result<()> {
        self.db.insert(key, text.as_bytes())?;
        self.db.flush()?;
        Ok(())
    }

    pub fn remove_file_text(&self, key: &str) -> Result<()> {
        self.db.remove(key)?;
        self.db.flush()?;
        Ok(())
    }

    pub fn load_file_text(&self, key: &str) -> Result<Option<String>> {
        let value = self.db.get(key)?;
        Ok(value.map(|v| String::from_utf8_lossy(&v).into_owned()))
    }

    /// Rebuild the tree from storage. Returns `Ok(None)` when the tree blob
    /// is absent or does not parse; the caller falls back to a fresh
    /// filesystem instead of failing the session.
    #[instrument(skip(self))]
    pub fn load_tree(&self) -> Result<Option<FileSystem>> {
        let blob = match self.db.get(TREE_KEY)? {
            None => return Ok(None),
            Some(blob) => blob,
        };
        let record: FolderRecord = match serde_json::from_slice(&blob) {
            Ok(record) => record,
            Err(e) => {
                tracing::error!("Stored folder tree failed to parse: {}", e);
                return Ok(None);
            }
        };

        // Level-order rebuild. Duplicate sibling names in a corrupted blob
        // are dropped, first occurrence wins, so a bad store never takes
        // the session down.
        let mut fs = FileSystem::new();
        let mut queue: VecDeque<(FolderRecord, FolderId)> = VecDeque::new();
        queue.push_back((record, fs.root()));
        while let Some((record, id)) = queue.pop_front() {
            let mut seen = HashSet::new();
            for child in record.folders {
                if !seen.insert(child.name.clone()) {
                    tracing::warn!(
                        "Dropping duplicate folder \"{}\" in \"{}\"",
                        child.name,
                        fs.full_name(id)
                    );
                    continue;
                }
                let child_id = fs.add_child_folder(id, &child.name);
                queue.push_back((child, child_id));
            }
            let mut seen = HashSet::new();
            for name in record.files {
                if !seen.insert(name.clone()) {
                    tracing::warn!(
                        "Dropping duplicate file \"{}\" in \"{}\"",
                        name,
                        fs.full_name(id)
                    );
                    continue;
                }
                let text = self
                    .load_file_text(&fs.file_key(id, &name))?
                    .unwrap_or_default();
                fs.add_file(id, File::new(name, text));
            }
        }
        Ok(Some(fs))
    }
}

fn folder_record(fs: &FileSystem, id: FolderId) -> FolderRecord {
    let folder = fs.folder(id);
    FolderRecord {
        name: folder.name().to_string(),
        folders: folder
            .children()
            .iter()
            .map(|&child| folder_record(fs, child))
            .collect(),
        files: folder.files().iter().map(|f| f.name.clone()).collect(),
    }
}
