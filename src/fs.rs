//! Read-only filesystem access used while probing candidate directories.
//!
//! Resolution logic only talks to [`FileSystem`], so build tools that keep files in memory can
//! supply their own implementation.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Minimal read-only view of a filesystem.
pub trait FileSystem {
  /// Returns `true` when something exists at `path`.
  fn exists(&self, path: &Path) -> bool;

  /// Returns `true` when `path` is a directory.
  fn is_dir(&self, path: &Path) -> bool;

  /// Names of the entries directly inside `path`, in lexicographic order.
  fn list_entries(&self, path: &Path) -> io::Result<BTreeSet<OsString>>;

  /// Returns `true` when `path` is an existing regular file.
  fn is_file(&self, path: &Path) -> bool {
    self.exists(path) && !self.is_dir(path)
  }
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeFileSystem;

impl FileSystem for NativeFileSystem {
  fn exists(&self, path: &Path) -> bool {
    path.exists()
  }

  fn is_dir(&self, path: &Path) -> bool {
    path.is_dir()
  }

  fn list_entries(&self, path: &Path) -> io::Result<BTreeSet<OsString>> {
    let mut names = BTreeSet::new();
    for entry in fs::read_dir(path)? {
      names.insert(entry?.file_name());
    }
    Ok(names)
  }
}

/// In-memory [`FileSystem`] holding a fixed set of files and directories.
///
/// Adding a file implicitly creates every ancestor directory.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
  files: BTreeSet<PathBuf>,
  dirs: BTreeSet<PathBuf>,
}

impl MemoryFileSystem {
  /// Create an empty filesystem.
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a file and its ancestor directories.
  pub fn add_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
    let path = path.into();
    if let Some(parent) = path.parent() {
      self.add_dir(parent);
    }
    self.files.insert(path);
    self
  }

  /// Register a directory and its ancestors.
  pub fn add_dir(&mut self, path: impl AsRef<Path>) -> &mut Self {
    for ancestor in path.as_ref().ancestors() {
      if ancestor.as_os_str().is_empty() {
        break;
      }
      self.dirs.insert(ancestor.to_path_buf());
    }
    self
  }
}

impl FileSystem for MemoryFileSystem {
  fn exists(&self, path: &Path) -> bool {
    self.files.contains(path) || self.dirs.contains(path)
  }

  fn is_dir(&self, path: &Path) -> bool {
    self.dirs.contains(path)
  }

  fn list_entries(&self, path: &Path) -> io::Result<BTreeSet<OsString>> {
    if !self.dirs.contains(path) {
      return Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such directory: {}", path.display()),
      ));
    }

    Ok(
      self
        .files
        .iter()
        .chain(self.dirs.iter())
        .filter(|candidate| candidate.parent() == Some(path))
        .filter_map(|candidate| candidate.file_name().map(|name| name.to_os_string()))
        .collect(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn memory_filesystem_creates_ancestors() {
    let mut fs = MemoryFileSystem::new();
    fs.add_file("/proj/src/img/x.png");

    assert!(fs.is_dir(Path::new("/proj/src/img")));
    assert!(fs.is_dir(Path::new("/proj")));
    assert!(fs.is_file(Path::new("/proj/src/img/x.png")));
    assert!(!fs.exists(Path::new("/proj/src/img/y.png")));
  }

  #[test]
  fn memory_filesystem_lists_direct_children_in_order() {
    let mut fs = MemoryFileSystem::new();
    fs.add_file("/proj/b/file.css")
      .add_file("/proj/a.css")
      .add_dir("/proj/c/deep");

    let names: Vec<OsString> = fs.list_entries(Path::new("/proj")).unwrap().into_iter().collect();
    assert_eq!(names, vec![
      OsString::from("a.css"),
      OsString::from("b"),
      OsString::from("c")
    ]);
    assert!(fs.list_entries(Path::new("/missing")).is_err());
  }

  #[test]
  fn native_filesystem_lists_entries() -> io::Result<()> {
    let temp = tempdir()?;
    fs::create_dir_all(temp.path().join("zeta"))?;
    fs::write(temp.path().join("alpha.txt"), b"a")?;

    let native = NativeFileSystem;
    let names: Vec<OsString> = native.list_entries(temp.path())?.into_iter().collect();
    assert_eq!(names, vec![OsString::from("alpha.txt"), OsString::from("zeta")]);
    assert!(native.is_dir(&temp.path().join("zeta")));
    assert!(native.is_file(&temp.path().join("alpha.txt")));
    Ok(())
  }
}
