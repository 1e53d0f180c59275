//! In-memory filesystem implementation.
//!
//! Used for tests and fixtures. Supports symlinks (relative, absolute and
//! dangling) so alias directories can be modelled without touching disk.
//! All data is ephemeral.

use super::traits::{DirEntry, DirEntryKind, Filesystem};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::sync::RwLock;

/// Links followed before giving up, as ELOOP.
const MAX_LINK_DEPTH: usize = 40;

/// Entry in the memory filesystem.
#[derive(Debug, Clone)]
enum Entry {
    File { data: Vec<u8> },
    Directory,
    Symlink { target: PathBuf },
}

/// In-memory filesystem.
///
/// Thread-safe via internal `RwLock`. All data is lost when dropped.
#[derive(Debug)]
pub struct MemoryFs {
    entries: RwLock<HashMap<PathBuf, Entry>>,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFs {
    /// Create a new empty in-memory filesystem.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        // Root directory always exists
        entries.insert(PathBuf::new(), Entry::Directory);
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Normalize a path: remove leading `/`, resolve `.` and `..`.
    ///
    /// `..` at the root stays at the root.
    fn normalize(path: &Path) -> PathBuf {
        let mut result = PathBuf::new();
        for component in path.components() {
            match component {
                Component::ParentDir => {
                    result.pop();
                }
                Component::Normal(s) => result.push(s),
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            }
        }
        result
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("not found: {}", path.display()),
        )
    }

    /// Resolve every symlink along `path`, including the last component.
    fn follow(entries: &HashMap<PathBuf, Entry>, path: &Path) -> io::Result<PathBuf> {
        let mut current = Self::normalize(path);
        for _ in 0..MAX_LINK_DEPTH {
            let components: Vec<Component<'_>> = current.components().collect();
            let mut prefix = PathBuf::new();
            let mut redirected = None;

            for (i, component) in components.iter().enumerate() {
                prefix.push(component);
                if let Some(Entry::Symlink { target }) = entries.get(&prefix) {
                    let base = prefix.parent().unwrap_or(Path::new(""));
                    // An absolute target replaces the base entirely.
                    let mut next = base.join(target);
                    for rest in &components[i + 1..] {
                        next.push(rest);
                    }
                    redirected = Some(Self::normalize(&next));
                    break;
                }
            }

            match redirected {
                Some(next) => current = next,
                None => return Ok(current),
            }
        }
        Err(io::Error::other(format!(
            "too many levels of symbolic links: {}",
            path.display()
        )))
    }

    /// Resolve symlinks in the parent only, leaving the last component as-is.
    fn follow_parent(entries: &HashMap<PathBuf, Entry>, path: &Path) -> io::Result<PathBuf> {
        let normalized = Self::normalize(path);
        match (normalized.parent(), normalized.file_name()) {
            (Some(parent), Some(name)) => Ok(Self::follow(entries, parent)?.join(name)),
            _ => Ok(normalized),
        }
    }

    fn ensure_parents(entries: &mut HashMap<PathBuf, Entry>, path: &Path) -> io::Result<()> {
        let mut current = PathBuf::new();
        for component in path.parent().into_iter().flat_map(|p| p.components()) {
            if let Component::Normal(s) = component {
                current.push(s);
                match entries.entry(current.clone()).or_insert(Entry::Directory) {
                    Entry::Directory => {}
                    _ => {
                        return Err(io::Error::new(
                            io::ErrorKind::NotADirectory,
                            format!("not a directory: {}", current.display()),
                        ))
                    }
                }
            }
        }
        Ok(())
    }

    fn describe(name: String, entry: &Entry) -> DirEntry {
        match entry {
            Entry::File { data } => DirEntry::file(name, data.len() as u64),
            Entry::Directory => DirEntry::directory(name),
            Entry::Symlink { target } => DirEntry::symlink(name, target.clone()),
        }
    }

    fn name_of(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "/".to_string())
    }
}

#[async_trait]
impl Filesystem for MemoryFs {
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let entries = self.entries.read().await;
        let resolved = Self::follow(&entries, path)?;

        match entries.get(&resolved) {
            Some(Entry::File { data }) => Ok(data.clone()),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {}", path.display()),
            )),
            None => Err(Self::not_found(path)),
        }
    }

    async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let mut entries = self.entries.write().await;
        let resolved = Self::follow(&entries, path)?;

        if let Some(Entry::Directory) = entries.get(&resolved) {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {}", path.display()),
            ));
        }

        Self::ensure_parents(&mut entries, &resolved)?;
        entries.insert(
            resolved,
            Entry::File {
                data: data.to_vec(),
            },
        );
        Ok(())
    }

    async fn list(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let entries = self.entries.read().await;
        let resolved = Self::follow(&entries, path)?;

        match entries.get(&resolved) {
            Some(Entry::Directory) => {}
            Some(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotADirectory,
                    format!("not a directory: {}", path.display()),
                ))
            }
            None => return Err(Self::not_found(path)),
        }

        let mut result: Vec<DirEntry> = entries
            .iter()
            .filter(|(entry_path, _)| {
                entry_path.parent() == Some(resolved.as_path()) && **entry_path != resolved
            })
            .map(|(entry_path, entry)| Self::describe(Self::name_of(entry_path), entry))
            .collect();

        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    async fn stat(&self, path: &Path) -> io::Result<DirEntry> {
        let entries = self.entries.read().await;
        let resolved = Self::follow(&entries, path)?;

        entries
            .get(&resolved)
            .map(|entry| Self::describe(Self::name_of(path), entry))
            .ok_or_else(|| Self::not_found(path))
    }

    async fn lstat(&self, path: &Path) -> io::Result<DirEntry> {
        let entries = self.entries.read().await;
        let resolved = Self::follow_parent(&entries, path)?;

        entries
            .get(&resolved)
            .map(|entry| Self::describe(Self::name_of(path), entry))
            .ok_or_else(|| Self::not_found(path))
    }

    async fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        let entry = self.lstat(path).await?;
        match (entry.kind, entry.symlink_target) {
            (DirEntryKind::Symlink, Some(target)) => Ok(target),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a symlink: {}", path.display()),
            )),
        }
    }

    async fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        let mut entries = self.entries.write().await;
        let resolved = Self::follow_parent(&entries, link)?;

        if entries.contains_key(&resolved) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("file exists: {}", link.display()),
            ));
        }

        Self::ensure_parents(&mut entries, &resolved)?;
        entries.insert(
            resolved,
            Entry::Symlink {
                target: target.to_path_buf(),
            },
        );
        Ok(())
    }

    async fn mkdir(&self, path: &Path) -> io::Result<()> {
        let mut entries = self.entries.write().await;
        let resolved = Self::follow(&entries, path)?;

        if let Some(existing) = entries.get(&resolved) {
            return match existing {
                Entry::Directory => Ok(()),
                _ => Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("file exists: {}", path.display()),
                )),
            };
        }

        Self::ensure_parents(&mut entries, &resolved)?;
        entries.insert(resolved, Entry::Directory);
        Ok(())
    }

    fn read_only(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_and_read() {
        let fs = MemoryFs::new();
        fs.write(Path::new("test.rb"), b"hello world").await.unwrap();
        let data = fs.read(Path::new("test.rb")).await.unwrap();
        assert_eq!(data, b"hello world");
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let fs = MemoryFs::new();
        let result = fs.read(Path::new("nonexistent.rb")).await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_nested_directories() {
        let fs = MemoryFs::new();
        fs.write(Path::new("a/b/c/file.rb"), b"nested").await.unwrap();

        assert!(fs.stat(Path::new("a")).await.unwrap().is_dir());
        assert!(fs.stat(Path::new("a/b/c")).await.unwrap().is_dir());
        assert!(fs.is_file(Path::new("a/b/c/file.rb")).await);
    }

    #[tokio::test]
    async fn test_list_directory() {
        let fs = MemoryFs::new();
        fs.write(Path::new("b.rb"), b"b").await.unwrap();
        fs.write(Path::new("a.rb"), b"a").await.unwrap();
        fs.mkdir(Path::new("subdir")).await.unwrap();

        let names: Vec<_> = fs
            .list(Path::new(""))
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a.rb", "b.rb", "subdir"]);
    }

    #[tokio::test]
    async fn test_path_normalization() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/a/b/c.rb"), b"data").await.unwrap();

        let data1 = fs.read(Path::new("a/b/c.rb")).await.unwrap();
        let data2 = fs.read(Path::new("a/./b/../b/c.rb")).await.unwrap();
        assert_eq!(data1, data2);
    }

    #[tokio::test]
    async fn test_relative_symlink_is_followed() {
        let fs = MemoryFs::new();
        fs.write(Path::new("tap/Formula/foo.rb"), b"class Foo; end").await.unwrap();
        fs.symlink(Path::new("../Formula/foo.rb"), Path::new("tap/Aliases/bar"))
            .await
            .unwrap();

        assert_eq!(
            fs.read(Path::new("tap/Aliases/bar")).await.unwrap(),
            b"class Foo; end"
        );
        assert!(fs.lstat(Path::new("tap/Aliases/bar")).await.unwrap().is_symlink());
        assert!(fs.stat(Path::new("tap/Aliases/bar")).await.unwrap().is_file());
        assert_eq!(
            fs.read_link(Path::new("tap/Aliases/bar")).await.unwrap(),
            PathBuf::from("../Formula/foo.rb")
        );
    }

    #[tokio::test]
    async fn test_dangling_symlink_is_listed_but_not_found() {
        let fs = MemoryFs::new();
        fs.symlink(Path::new("../Formula/gone.rb"), Path::new("tap/Aliases/gone"))
            .await
            .unwrap();

        let entries = fs.list(Path::new("tap/Aliases")).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_symlink());
        assert!(!fs.exists(Path::new("tap/Aliases/gone")).await);
    }

    #[tokio::test]
    async fn test_absolute_symlink_is_rooted_at_fs_root() {
        let fs = MemoryFs::new();
        fs.write(Path::new("x/y.rb"), b"y").await.unwrap();
        fs.symlink(Path::new("/x/y.rb"), Path::new("link")).await.unwrap();

        assert_eq!(fs.read(Path::new("link")).await.unwrap(), b"y");
    }

    #[tokio::test]
    async fn test_symlink_loop_is_an_error() {
        let fs = MemoryFs::new();
        fs.symlink(Path::new("b"), Path::new("a")).await.unwrap();
        fs.symlink(Path::new("a"), Path::new("b")).await.unwrap();

        assert!(fs.stat(Path::new("a")).await.is_err());
        assert!(!fs.exists(Path::new("a")).await);
    }

    #[tokio::test]
    async fn test_directory_symlink_lists_target() {
        let fs = MemoryFs::new();
        fs.write(Path::new("real/one.rb"), b"1").await.unwrap();
        fs.symlink(Path::new("real"), Path::new("alias")).await.unwrap();

        let entries = fs.list(Path::new("alias")).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "one.rb");
    }
}
