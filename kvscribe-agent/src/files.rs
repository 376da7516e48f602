use std::{
    fs::{self, DirBuilder, File, OpenOptions, Permissions},
    io,
    os::unix::fs::{DirBuilderExt as _, OpenOptionsExt as _, PermissionsExt as _},
    path::Path,
};

use api::FileMode;

/// Directories created on the way to a secret are only accessible by the owner
pub const DIR_MODE: u32 = 0o700;

const OWNER_WRITE: u32 = 0o200;

pub fn make_dirs_for_file(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => DirBuilder::new()
            .recursive(true)
            .mode(DIR_MODE)
            .create(parent),
        _ => Ok(()),
    }
}

/// Creates or truncates `path` and applies `mode`.
/// The mode is set explicitly as well so the umask and pre-existing files do not change it
pub fn open_for_write(path: &Path, mode: FileMode) -> io::Result<File> {
    make_dirs_for_file(path)?;

    // a previous run may have left the file read only
    match fs::set_permissions(path, Permissions::from_mode(mode.bits() | OWNER_WRITE)) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => return Err(err),
        _ => {}
    }

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode.bits())
        .open(path)?;
    file.set_permissions(Permissions::from_mode(mode.bits()))?;
    Ok(file)
}

#[cfg(test)]
mod test {
    use std::{fs, io::Write as _, os::unix::fs::PermissionsExt as _};

    use api::FileMode;

    use crate::files::{DIR_MODE, open_for_write};

    #[test]
    fn creates_parents_with_private_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/secret");

        let mut file = open_for_write(&path, "0640".parse().unwrap()).unwrap();
        file.write_all(b"value").unwrap();
        drop(file);

        assert_eq!(fs::read(&path).unwrap(), b"value");
        let file_mode = fs::metadata(&path).unwrap().permissions().mode() & 0o7777;
        assert_eq!(file_mode, 0o640);
        let dir_mode = fs::metadata(dir.path().join("a/b"))
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, DIR_MODE);
    }

    #[test]
    fn rewrites_read_only_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret");
        fs::write(&path, b"previous").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o400)).unwrap();

        let mut file = open_for_write(&path, FileMode::DEFAULT).unwrap();
        file.write_all(b"next").unwrap();
        drop(file);

        assert_eq!(fs::read(&path).unwrap(), b"next");
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o400);
    }

    #[test]
    fn truncates_and_resets_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret");
        fs::write(&path, b"a much longer previous value").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o666)).unwrap();

        let mut file = open_for_write(&path, "0600".parse::<FileMode>().unwrap()).unwrap();
        file.write_all(b"short").unwrap();
        drop(file);

        assert_eq!(fs::read(&path).unwrap(), b"short");
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o600);
    }
}
