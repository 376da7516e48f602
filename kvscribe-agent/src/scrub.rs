//! Every file kvscribe creates is registered here so it can be securely removed later.
//! The registry is persisted as a JSON manifest which `kvscribe scrub` consumes

use std::{
    fs::{self, OpenOptions, Permissions},
    io::{self, Write as _},
    os::unix::fs::PermissionsExt as _,
    path::{Path, PathBuf},
};

use api::FileMode;
use serde::{Deserialize, Serialize};

use crate::files;

const MANIFEST_MODE: FileMode = FileMode::OWNER_RW;
const CHUNK: usize = 8 * 1024;

pub trait Scrubber {
    fn register(&mut self, path: &Path);
}

#[derive(thiserror::Error, Debug)]
pub enum ScrubError {
    #[error("could not write manifest {}", .path.display())]
    WriteManifest {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not read manifest {}", .path.display())]
    ReadManifest {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("manifest {} is not a list of paths", .path.display())]
    ParseManifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not scrub {}", .path.display())]
    Scrub {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

type Result<T> = core::result::Result<T, ScrubError>;

/// Registered files in the order they were written
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScrubList {
    files: Vec<PathBuf>,
}

impl Scrubber for ScrubList {
    fn register(&mut self, path: &Path) {
        if !self.files.iter().any(|file| file == path) {
            self.files.push(path.to_path_buf());
        }
    }
}

impl ScrubList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn save_manifest(&self, path: &Path) -> Result<()> {
        let write_err = |source| ScrubError::WriteManifest {
            path: path.to_path_buf(),
            source,
        };
        let data = serde_json::to_vec_pretty(self)
            .map_err(io::Error::other)
            .map_err(write_err)?;
        let mut file = files::open_for_write(path, MANIFEST_MODE).map_err(write_err)?;
        file.write_all(&data).map_err(write_err)
    }

    pub fn load_manifest(path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|source| ScrubError::ReadManifest {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&data).map_err(|source| ScrubError::ParseManifest {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Scrubs every registered file. Returns how many files were actually removed
    pub fn scrub(&self) -> Result<usize> {
        let mut removed = 0;
        for path in &self.files {
            if scrub_file(path).map_err(|source| ScrubError::Scrub {
                path: path.clone(),
                source,
            })? {
                log::info!("Scrubbed {}", path.display());
                removed += 1;
            } else {
                log::debug!("{} is already gone", path.display());
            }
        }
        Ok(removed)
    }
}

/// Overwrites the file with zeros before removing it. Returns `false` if there was nothing to remove
pub fn scrub_file(path: &Path) -> io::Result<bool> {
    let len = match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_file() => metadata.len(),
        Ok(_) => {
            fs::remove_file(path)?;
            return Ok(true);
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };

    // secrets are usually written 0400
    fs::set_permissions(path, Permissions::from_mode(FileMode::OWNER_RW.bits()))?;

    let mut file = OpenOptions::new().write(true).open(path)?;
    let zeros = [0_u8; CHUNK];
    let mut remaining = len;
    while remaining > 0 {
        let n = remaining.min(CHUNK as u64) as usize;
        file.write_all(&zeros[..n])?;
        remaining -= n as u64;
    }
    file.sync_all()?;
    drop(file);

    fs::remove_file(path)?;
    Ok(true)
}

#[cfg(test)]
mod test {
    use std::{fs, os::unix::fs::PermissionsExt as _};

    use crate::scrub::{ScrubList, Scrubber as _, scrub_file};

    #[test]
    fn register_keeps_order_and_dedups() {
        let mut list = ScrubList::new();
        list.register("/b".as_ref());
        list.register("/a".as_ref());
        list.register("/b".as_ref());
        assert_eq!(list.files(), ["/b", "/a"].map(std::path::PathBuf::from));
    }

    #[test]
    fn manifest_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("state/manifest.json");

        let mut list = ScrubList::new();
        list.register(&dir.path().join("one"));
        list.register(&dir.path().join("two"));
        list.save_manifest(&manifest).unwrap();

        let mode = fs::metadata(&manifest).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        assert_eq!(ScrubList::load_manifest(&manifest).unwrap(), list);
    }

    #[test]
    fn broken_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("manifest.json");
        fs::write(&manifest, b"{\"not\": \"a list\"}").unwrap();
        assert!(ScrubList::load_manifest(&manifest).is_err());
    }

    #[test]
    fn scrub_removes_read_only_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret");
        fs::write(&path, b"s3cr3t").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o400)).unwrap();

        assert!(scrub_file(&path).unwrap());
        assert!(!path.exists());
        assert!(!scrub_file(&path).unwrap());
    }

    #[test]
    fn scrub_list_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present");
        fs::write(&present, b"value").unwrap();

        let mut list = ScrubList::new();
        list.register(&present);
        list.register(&dir.path().join("missing"));

        assert_eq!(list.scrub().unwrap(), 1);
        assert!(!present.exists());
    }
}
