//! Directory-tree primitives: copy with mtimes, digest, move, naming.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};
use wsc_types::ContentDigest;

/// Totals for one copied tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub files: u64,
    pub bytes: u64,
}

/// Per-file digests of a tree, keyed by relative path.
pub type FileDigests = BTreeMap<PathBuf, ContentDigest>;

fn keep(entry: &DirEntry, skip_dir: &dyn Fn(&str) -> bool) -> bool {
    entry.depth() == 0
        || !(entry.file_type().is_dir() && skip_dir(&entry.file_name().to_string_lossy()))
}

/// Walk the regular files under `root`, sorted, skipping excluded
/// directories at any depth. Symlinks are followed.
pub fn files<'a>(
    root: &Path,
    skip_dir: &'a dyn Fn(&str) -> bool,
) -> impl Iterator<Item = io::Result<(PathBuf, PathBuf)>> + 'a {
    let base = root.to_path_buf();
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |e| keep(e, skip_dir))
        .filter_map(move |entry| match entry {
            Err(e) => Some(Err(io::Error::from(e))),
            Ok(e) if e.file_type().is_file() => {
                let rel = e.path().strip_prefix(&base).unwrap_or(e.path()).to_path_buf();
                Some(Ok((e.into_path(), rel)))
            }
            Ok(_) => None,
        })
}

/// Copy one file and carry its modification time over.
pub fn copy_file(from: &Path, to: &Path) -> io::Result<u64> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    let bytes = fs::copy(from, to)?;
    let modified = fs::metadata(from)?.modified()?;
    File::options().write(true).open(to)?.set_modified(modified)?;
    Ok(bytes)
}

/// Recursively copy `src` into `dst`, preserving file mtimes.
///
/// Directories rejected by `skip_dir` are left out at every depth. Empty
/// directories are recreated.
pub fn copy_tree(src: &Path, dst: &Path, skip_dir: &dyn Fn(&str) -> bool) -> io::Result<TreeStats> {
    let mut stats = TreeStats::default();
    fs::create_dir_all(dst)?;
    let walker = WalkDir::new(src)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| keep(e, skip_dir));
    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            stats.bytes += copy_file(entry.path(), &target)?;
            stats.files += 1;
        }
    }
    Ok(stats)
}

/// Digest of a single file's content.
pub fn file_digest(path: &Path) -> io::Result<ContentDigest> {
    let mut hasher = blake3::Hasher::new();
    let mut file = File::open(path)?;
    io::copy(&mut file, &mut hasher)?;
    Ok(ContentDigest::from_hash(*hasher.finalize().as_bytes()))
}

/// Per-file digests of a tree plus one digest over all of them.
///
/// The tree digest hashes every `(relative path, file digest)` pair in
/// sorted order, so it changes when any file is added, removed, renamed or
/// edited.
pub fn tree_digest(
    root: &Path,
    skip_dir: &dyn Fn(&str) -> bool,
) -> io::Result<(ContentDigest, FileDigests)> {
    let mut digests = FileDigests::new();
    for item in files(root, skip_dir) {
        let (path, rel) = item?;
        digests.insert(rel, file_digest(&path)?);
    }
    let mut hasher = blake3::Hasher::new();
    for (rel, digest) in &digests {
        hasher.update(rel.to_string_lossy().as_bytes());
        hasher.update(&[0]);
        hasher.update(digest.as_bytes());
    }
    Ok((ContentDigest::from_hash(*hasher.finalize().as_bytes()), digests))
}

/// Move a directory tree, falling back to copy + verify + remove when a
/// plain rename is not possible (e.g. across filesystems).
pub fn move_tree(src: &Path, dst: &Path) -> io::Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    if fs::rename(src, dst).is_ok() {
        return Ok(());
    }
    let none = |_: &str| false;
    copy_tree(src, dst, &none)?;
    let (a, _) = tree_digest(src, &none)?;
    let (b, _) = tree_digest(dst, &none)?;
    if a != b {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("copy of {} did not verify", src.display()),
        ));
    }
    fs::remove_dir_all(src)
}

/// `base`, or `base-1`, `base-2`, … whichever does not exist yet.
pub fn unique_path(base: PathBuf) -> PathBuf {
    if !base.exists() {
        return base;
    }
    let name = base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut n = 1u32;
    loop {
        let candidate = base.with_file_name(format!("{name}-{n}"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Make a logical name usable as a single path component.
pub fn path_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '-' } else { c })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn set_mtime(path: &Path, t: SystemTime) {
        File::options().write(true).open(path).unwrap().set_modified(t).unwrap();
    }

    fn skip_cache(name: &str) -> bool {
        name == "node_modules"
    }

    #[test]
    fn copy_tree_preserves_content_and_mtime() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        write(&src.join("a.txt"), "alpha");
        write(&src.join("lib/b.ts"), "export {}");
        write(&src.join("node_modules/x/index.js"), "cached");
        fs::create_dir_all(src.join("empty")).unwrap();
        let old = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        set_mtime(&src.join("a.txt"), old);

        let dst = tmp.path().join("dst");
        let stats = copy_tree(&src, &dst, &skip_cache).unwrap();
        assert_eq!(stats.files, 2);
        assert_eq!(stats.bytes, 5 + 9);
        assert_eq!(fs::read_to_string(dst.join("lib/b.ts")).unwrap(), "export {}");
        assert!(dst.join("empty").is_dir());
        assert!(!dst.join("node_modules").exists());
        assert_eq!(fs::metadata(dst.join("a.txt")).unwrap().modified().unwrap(), old);
    }

    #[test]
    fn tree_digest_tracks_content_and_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a");
        write(&a.join("x.txt"), "one");
        write(&a.join("d/y.txt"), "two");
        let b = tmp.path().join("b");
        copy_tree(&a, &b, &skip_cache).unwrap();

        let (da, fa) = tree_digest(&a, &skip_cache).unwrap();
        let (db, fb) = tree_digest(&b, &skip_cache).unwrap();
        assert_eq!(da, db);
        assert_eq!(fa, fb);
        assert_eq!(fa.len(), 2);

        write(&b.join("d/y.txt"), "changed");
        assert_ne!(tree_digest(&b, &skip_cache).unwrap().0, da);
    }

    #[test]
    fn move_tree_relocates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("ws/packages/geo");
        write(&src.join("package.json"), "{}");
        let dst = tmp.path().join("archive/superseded/geo");

        move_tree(&src, &dst).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(dst.join("package.json")).unwrap(), "{}");
    }

    #[test]
    fn unique_path_appends_counter() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("backup");
        assert_eq!(unique_path(base.clone()), base);
        fs::create_dir(&base).unwrap();
        fs::create_dir(tmp.path().join("backup-1")).unwrap();
        assert_eq!(unique_path(base), tmp.path().join("backup-2"));
    }

    #[test]
    fn path_component_flattens_scoped_names() {
        assert_eq!(path_component("@cathedral/geometry"), "@cathedral-geometry");
        assert_eq!(path_component(".."), "_");
        assert_eq!(path_component("plain"), "plain");
    }
}
