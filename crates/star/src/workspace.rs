//! The file system that member names are resolved against.

use std::{
    fs::{self, File, Metadata},
    io::{self, Read, Write},
    path::{Component, Path, PathBuf},
};

use crate::error::{ArchiveError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceMeta {
    pub size: u64,
    pub mode: u32,
}

/// Where member content comes from on create/append/update and where it
/// goes on extract.
pub trait Workspace {
    type Reader: Read;
    type Writer: Write;

    fn stat(&self, name: &str) -> io::Result<SourceMeta>;

    fn open(&self, name: &str) -> io::Result<Self::Reader>;

    /// Create or truncate the file for `name`, making parent directories
    /// as needed.
    fn create(&self, name: &str) -> io::Result<Self::Writer>;
}

impl<W: Workspace + ?Sized> Workspace for &W {
    type Reader = W::Reader;
    type Writer = W::Writer;

    fn stat(&self, name: &str) -> io::Result<SourceMeta> {
        (**self).stat(name)
    }

    fn open(&self, name: &str) -> io::Result<Self::Reader> {
        (**self).open(name)
    }

    fn create(&self, name: &str) -> io::Result<Self::Writer> {
        (**self).create(name)
    }
}

/// A workspace rooted at a directory on the local disk.
#[derive(Debug, Clone)]
pub struct LocalWorkspace {
    root: PathBuf,
}

impl LocalWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Workspace for LocalWorkspace {
    type Reader = File;
    type Writer = File;

    fn stat(&self, name: &str) -> io::Result<SourceMeta> {
        let metadata = fs::metadata(self.path_of(name))?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{name} is not a regular file"),
            ));
        }
        Ok(SourceMeta {
            size: metadata.len(),
            mode: mode_bits(&metadata),
        })
    }

    fn open(&self, name: &str) -> io::Result<File> {
        File::open(self.path_of(name))
    }

    fn create(&self, name: &str) -> io::Result<File> {
        let path = self.path_of(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        File::create(path)
    }
}

#[cfg(unix)]
fn mode_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

#[cfg(not(unix))]
fn mode_bits(metadata: &Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o100444
    } else {
        0o100644
    }
}

/// Reject names that would land outside the extraction root.
pub fn check_extract_name(name: &str) -> Result<()> {
    let escapes = Path::new(name).components().any(|c| {
        matches!(
            c,
            Component::RootDir | Component::Prefix(_) | Component::ParentDir
        )
    });
    if escapes || name.is_empty() {
        return Err(ArchiveError::UnsafeName(name.to_string()));
    }
    Ok(())
}
