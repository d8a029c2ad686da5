// Definition of the virtual file system. The whole tree lives in memory,
// owned by a single arena of folders; files are owned by the folder that
// contains them. Parent links are plain indices into the arena, never
// ownership edges. Persistence is the storage adapter's job.

use crate::errors::{Result, TermError, TermErrorType};

/// Characters that may never appear in a file or folder name: path
/// separators, shell metacharacters, quotes, and the operators of the
/// command language itself. Whitespace is rejected separately.
const ILLEGAL_NAME_CHARS: &[char] = &[
    '/', '\\', '|', ';', '<', '>', '*', '?', '"', '\'', '`', '&',
];

/// Navigation-only tokens, never valid as a creatable name.
const RESERVED_TOKENS: &[&str] = &[".", "..", "~"];

pub const ROOT_NAME: &str = "~";

pub fn is_valid_name(name: &str) -> bool {
    if name.is_empty() || RESERVED_TOKENS.contains(&name) {
        return false;
    }
    !name
        .chars()
        .any(|c| c.is_whitespace() || ILLEGAL_NAME_CHARS.contains(&c))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FolderId(usize);

#[derive(Clone)]
pub struct File {
    pub name: String,
    pub text: String,
}

impl File {
    pub fn new(name: String, text: String) -> File {
        File { name, text }
    }
}

pub struct Folder {
    name: String,
    parent: Option<FolderId>,
    children: Vec<FolderId>,
    files: Vec<File>,
}

impl Folder {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<FolderId> {
        self.parent
    }

    pub fn children(&self) -> &[FolderId] {
        &self.children
    }

    pub fn files(&self) -> &[File] {
        &self.files
    }
}

pub struct FileSystem {
    arena: Vec<Folder>,
}

impl FileSystem {
    pub fn new() -> FileSystem {
        FileSystem {
            arena: vec![Folder {
                name: ROOT_NAME.to_string(),
                parent: None,
                children: Vec::new(),
                files: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> FolderId {
        FolderId(0)
    }

    pub fn folder(&self, id: FolderId) -> &Folder {
        &self.arena[id.0]
    }

    fn folder_mut(&mut self, id: FolderId) -> &mut Folder {
        &mut self.arena[id.0]
    }

    // The mutators below operate on the immediate children of a folder and
    // do not validate names. Callers check is_valid_name/contains_* first
    // to keep sibling names unique.

    pub fn add_child_folder(&mut self, parent: FolderId, name: &str) -> FolderId {
        let id = FolderId(self.arena.len());
        self.arena.push(Folder {
            name: name.to_string(),
            parent: Some(parent),
            children: Vec::new(),
            files: Vec::new(),
        });
        self.folder_mut(parent).children.push(id);
        id
    }

    pub fn add_file(&mut self, dir: FolderId, file: File) {
        self.folder_mut(dir).files.push(file);
    }

    pub fn remove_file(&mut self, dir: FolderId, name: &str) -> Option<File> {
        let files = &mut self.folder_mut(dir).files;
        let index = files.iter().position(|f| f.name == name)?;
        Some(files.remove(index))
    }

    /// Unlinks the named child folder and, by extension, its whole subtree.
    /// Arena slots are not reused; unreachable nodes stay allocated until
    /// the next load rebuilds the arena.
    pub fn remove_folder(&mut self, dir: FolderId, name: &str) -> Option<FolderId> {
        let child = self.find_child(dir, name)?;
        self.folder_mut(dir).children.retain(|&c| c != child);
        Some(child)
    }

    pub fn contains_folder(&self, dir: FolderId, name: &str) -> bool {
        self.find_child(dir, name).is_some()
    }

    pub fn contains_file(&self, dir: FolderId, name: &str) -> bool {
        self.folder(dir).files.iter().any(|f| f.name == name)
    }

    pub fn get_file(&self, dir: FolderId, name: &str) -> Option<&File> {
        self.folder(dir).files.iter().find(|f| f.name == name)
    }

    pub fn get_file_mut(&mut self, dir: FolderId, name: &str) -> Option<&mut File> {
        self.folder_mut(dir).files.iter_mut().find(|f| f.name == name)
    }

    pub fn find_child(&self, dir: FolderId, name: &str) -> Option<FolderId> {
        self.folder(dir)
            .children
            .iter()
            .copied()
            .find(|&c| self.folder(c).name == name)
    }

    pub fn child_folder_names(&self, dir: FolderId) -> Vec<&str> {
        self.folder(dir)
            .children
            .iter()
            .map(|&c| self.folder(c).name.as_str())
            .collect()
    }

    pub fn file_names(&self, dir: FolderId) -> Vec<&str> {
        self.folder(dir)
            .files
            .iter()
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Walk a `/`-separated path starting from `current`. Read-only, no
    /// side effects. Reserved tokens are only meaningful as the whole path
    /// or as the first segment; anywhere else they fail validation and the
    /// resolution reports not-found.
    pub fn resolve(&self, current: FolderId, path: &str) -> Result<FolderId> {
        match path {
            "~" => return Ok(self.root()),
            "." => return Ok(current),
            ".." => {
                return self.folder(current).parent.ok_or_else(|| not_found(path));
            }
            _ => {}
        }

        let segments: Vec<&str> = path.split('/').collect();
        // The first segment may be a reserved navigation anchor.
        let (anchor, rest) = match segments[0] {
            "~" => (self.root(), &segments[1..]),
            "." => (current, &segments[1..]),
            ".." => match self.folder(current).parent {
                Some(parent) => (parent, &segments[1..]),
                None => return Err(not_found(path)),
            },
            _ => (current, &segments[..]),
        };

        if rest.iter().any(|segment| !is_valid_name(segment)) {
            return Err(not_found(path));
        }

        let mut dir = anchor;
        for segment in rest {
            dir = self
                .find_child(dir, segment)
                .ok_or_else(|| not_found(path))?;
        }
        Ok(dir)
    }

    /// Absolute path of a folder, names joined from the root with `/`.
    /// Doubles as the prefix of the storage key for any file it contains.
    pub fn full_name(&self, id: FolderId) -> String {
        let mut names = vec![self.folder(id).name.as_str()];
        let mut parent = self.folder(id).parent;
        while let Some(p) = parent {
            names.push(self.folder(p).name.as_str());
            parent = self.folder(p).parent;
        }
        names.reverse();
        names.join("/")
    }

    pub fn file_key(&self, dir: FolderId, name: &str) -> String {
        format!("{}/{}", self.full_name(dir), name)
    }
}

fn not_found(path: &str) -> TermError {
    tracing::debug!("Path \"{}\" did not resolve", path);
    TermError::new(
        TermErrorType::NotFound,
        format!("folder path \"{}\" does not exist", path),
    )
}
