//! Filesystem utilities.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use glob::glob;
use walkdir::WalkDir;

/// Mirror `src` into `dst`, one way.
///
/// Afterwards `dst` holds exactly the entries of `src`: entries missing from
/// `src` are deleted, everything else is copied over with its modification
/// time. If `src` doesn't exist, `dst` is removed. Running it twice against
/// an unchanged source leaves `dst` untouched in content.
pub fn sync_dir(src: &Path, dst: &Path) -> Result<()> {
    if !src.is_dir() {
        tracing::debug!(
            "sync source {} missing, removing {}",
            src.display(),
            dst.display()
        );
        return remove_path_if_exists(dst);
    }

    // Only a real directory is mirrored into; a symlink is never traversed
    if !is_real_dir(dst) {
        remove_path_if_exists(dst)?;
    }
    ensure_dir(dst)?;

    // Drop anything the source no longer has
    let existing = read_dir(dst)?.collect::<Result<Vec<_>, _>>()?;
    for entry in existing {
        if fs::symlink_metadata(src.join(entry.file_name())).is_err() {
            remove_path_if_exists(&entry.path())?;
        }
    }

    for entry in read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            sync_dir(&src_path, &dst_path)?;
        } else {
            if fs::symlink_metadata(&dst_path).is_ok_and(|m| !m.is_file()) {
                remove_path_if_exists(&dst_path)?;
            }
            copy_file(&src_path, &dst_path)?;
        }
    }

    Ok(())
}

/// Whether `path` is a directory itself, not a link to one.
fn is_real_dir(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.is_dir())
}

/// Copy a single file, overwriting read-only targets and keeping the
/// source's modification time.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if dst.exists() {
        make_writable(dst)?;
    }

    fs::copy(src, dst).with_context(|| {
        format!("failed to copy {} to {}", src.display(), dst.display())
    })?;

    let modified = fs::metadata(src)
        .and_then(|m| m.modified())
        .with_context(|| format!("failed to read metadata: {}", src.display()))?;
    set_modified(dst, modified)
}

fn set_modified(path: &Path, time: SystemTime) -> Result<()> {
    let original = fs::metadata(path)
        .with_context(|| format!("failed to read metadata: {}", path.display()))?
        .permissions();

    // Copies inherit the source's permissions; a read-only copy has to be
    // opened for writing to stamp its time.
    if original.readonly() {
        make_writable(path)?;
    }

    let result = fs::OpenOptions::new()
        .write(true)
        .open(path)
        .and_then(|file| file.set_modified(time));

    if original.readonly() {
        fs::set_permissions(path, original)
            .with_context(|| format!("failed to restore permissions: {}", path.display()))?;
    }

    result.with_context(|| format!("failed to set modification time: {}", path.display()))
}

/// Remove a directory tree, clearing read-only attributes that block the
/// removal. A missing directory is not an error.
pub fn remove_dir_all_force(path: &Path) -> Result<()> {
    if fs::symlink_metadata(path).is_err() {
        return Ok(());
    }

    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            tracing::debug!(
                "clearing read-only attributes under {}",
                path.display()
            );
            clear_readonly(path)?;
            fs::remove_dir_all(path)
                .with_context(|| format!("failed to remove directory: {}", path.display()))
        }
        Err(e) => {
            Err(e).with_context(|| format!("failed to remove directory: {}", path.display()))
        }
    }
}

/// Remove a file or directory tree, whichever is at `path`.
pub fn remove_path_if_exists(path: &Path) -> Result<()> {
    let Ok(meta) = fs::symlink_metadata(path) else {
        return Ok(());
    };

    if meta.is_dir() {
        remove_dir_all_force(path)
    } else {
        if meta.permissions().readonly() {
            make_writable(path)?;
        }
        fs::remove_file(path)
            .with_context(|| format!("failed to remove file: {}", path.display()))
    }
}

fn clear_readonly(path: &Path) -> Result<()> {
    for entry in WalkDir::new(path) {
        let entry = entry?;
        let meta = entry.metadata()?;
        if meta.permissions().readonly() {
            make_writable(entry.path())?;
        }
    }
    Ok(())
}

#[allow(clippy::permissions_set_readonly_false)]
fn make_writable(path: &Path) -> Result<()> {
    let mut perms = fs::metadata(path)
        .with_context(|| format!("failed to read metadata: {}", path.display()))?
        .permissions();
    if perms.readonly() {
        perms.set_readonly(false);
        fs::set_permissions(path, perms)
            .with_context(|| format!("failed to make writable: {}", path.display()))?;
    }
    Ok(())
}

fn read_dir(path: &Path) -> Result<fs::ReadDir> {
    fs::read_dir(path).with_context(|| format!("failed to read directory: {}", path.display()))
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write bytes to a file, creating parent directories if needed.
pub fn write_bytes(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents)
        .with_context(|| format!("failed to write file: {}", path.display()))
}

/// Find files matching glob patterns relative to a base directory.
pub fn glob_files(base: &Path, patterns: &[&str]) -> Result<Vec<PathBuf>> {
    let mut results = Vec::new();

    for pattern in patterns {
        let full_pattern = base.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();

        for entry in glob(&pattern_str)
            .with_context(|| format!("invalid glob pattern: {}", pattern))?
        {
            match entry {
                Ok(path) => {
                    if path.is_file() {
                        results.push(path);
                    }
                }
                Err(e) => {
                    tracing::warn!("glob error: {}", e);
                }
            }
        }
    }

    results.sort();
    results.dedup();
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    /// Relative path -> contents for every file under `root`.
    fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        WalkDir::new(root)
            .into_iter()
            .map(|e| e.unwrap())
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
                (rel, fs::read(e.path()).unwrap())
            })
            .collect()
    }

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_sync_dir_mirrors_nested_tree() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");

        write(&src.join("zlib.h"), "zlib");
        write(&src.join("detail/zconf.h"), "zconf");

        sync_dir(&src, &dst).unwrap();

        assert_eq!(snapshot(&src), snapshot(&dst));
    }

    #[test]
    fn test_sync_dir_removes_stale_entries() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");

        write(&src.join("keep.h"), "new");
        write(&src.join("nested/keep.h"), "nested");
        write(&dst.join("keep.h"), "old contents");
        write(&dst.join("stale.h"), "stale");
        write(&dst.join("stale_dir/inner.h"), "stale");
        write(&dst.join("nested/stale.h"), "stale");

        sync_dir(&src, &dst).unwrap();

        assert_eq!(snapshot(&src), snapshot(&dst));
        assert!(!dst.join("stale_dir").exists());
    }

    #[test]
    fn test_sync_dir_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");

        write(&src.join("a.h"), "a");
        write(&src.join("sub/b.h"), "b");

        sync_dir(&src, &dst).unwrap();
        let first = snapshot(&dst);
        sync_dir(&src, &dst).unwrap();

        assert_eq!(first, snapshot(&dst));
    }

    #[test]
    fn test_sync_dir_preserves_modification_time() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write(&src.join("a.h"), "a");

        let past = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000_000);
        fs::OpenOptions::new()
            .write(true)
            .open(src.join("a.h"))
            .unwrap()
            .set_modified(past)
            .unwrap();

        sync_dir(&src, &dst).unwrap();

        let copied = fs::metadata(dst.join("a.h")).unwrap().modified().unwrap();
        assert_eq!(copied, past);
    }

    #[test]
    fn test_sync_dir_missing_source_removes_destination() {
        let tmp = TempDir::new().unwrap();
        let dst = tmp.path().join("dst");
        write(&dst.join("old.h"), "old");

        sync_dir(&tmp.path().join("missing"), &dst).unwrap();
        assert!(!dst.exists());

        // Already gone: still fine
        sync_dir(&tmp.path().join("missing"), &dst).unwrap();
        assert!(!dst.exists());
    }

    #[test]
    fn test_sync_dir_replaces_file_with_directory() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");

        write(&src.join("gen/config.h"), "cfg");
        write(&dst.join("gen"), "was a file");

        sync_dir(&src, &dst).unwrap();

        assert!(dst.join("gen").is_dir());
        assert_eq!(snapshot(&src), snapshot(&dst));
    }

    #[cfg(unix)]
    #[test]
    fn test_sync_dir_replaces_symlinks_instead_of_following_them() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        let outside = tmp.path().join("outside");

        write(&src.join("sub/a.h"), "a");
        write(&src.join("b.h"), "b");
        write(&outside.join("precious.txt"), "keep me");
        write(&outside.join("b.h"), "outside b");
        fs::create_dir_all(&dst).unwrap();
        std::os::unix::fs::symlink(&outside, dst.join("sub")).unwrap();
        std::os::unix::fs::symlink(outside.join("b.h"), dst.join("b.h")).unwrap();

        sync_dir(&src, &dst).unwrap();

        assert_eq!(
            fs::read_to_string(outside.join("precious.txt")).unwrap(),
            "keep me"
        );
        assert_eq!(
            fs::read_to_string(outside.join("b.h")).unwrap(),
            "outside b"
        );
        assert!(is_real_dir(&dst.join("sub")));
        assert!(!fs::symlink_metadata(dst.join("b.h")).unwrap().is_symlink());
        assert_eq!(snapshot(&src), snapshot(&dst));
    }

    #[cfg(unix)]
    #[test]
    fn test_sync_dir_replaces_symlinked_destination_root() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        let outside = tmp.path().join("outside");

        write(&src.join("a.h"), "a");
        write(&outside.join("precious.txt"), "keep me");
        std::os::unix::fs::symlink(&outside, &dst).unwrap();

        sync_dir(&src, &dst).unwrap();

        assert!(outside.join("precious.txt").exists());
        assert!(is_real_dir(&dst));
        assert_eq!(snapshot(&src), snapshot(&dst));
    }

    #[test]
    fn test_remove_dir_all_force_handles_read_only_entries() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("install");
        let file = root.join("lib/libz.a");
        write(&file, "archive");

        for path in [file.clone(), root.join("lib")] {
            let mut perms = fs::metadata(&path).unwrap().permissions();
            perms.set_readonly(true);
            fs::set_permissions(&path, perms).unwrap();
        }

        remove_dir_all_force(&root).unwrap();
        assert!(!root.exists());

        // Missing directory is a no-op
        remove_dir_all_force(&root).unwrap();
    }

    #[test]
    fn test_glob_files() {
        let tmp = TempDir::new().unwrap();
        let lib = tmp.path().join("lib");
        fs::create_dir_all(&lib).unwrap();
        fs::write(lib.join("libz.a"), "").unwrap();
        fs::write(lib.join("libpng.a"), "").unwrap();
        fs::write(lib.join("zlib.pc"), "").unwrap();

        let files = glob_files(tmp.path(), &["lib/*.a"]).unwrap();
        assert_eq!(files.len(), 2);
    }
}
