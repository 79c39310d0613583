//! # Design
//!
//! - Stage the archive in a temp file outside the bundle directory and rename it into place, so
//!   `{prefix}.zip` is only ever observed complete.
//! - The temp file is deleted on every exit path that did not reach the rename.
//! - Entries are collected before staging starts; a stale archive from a previous run is skipped.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{BundleError, BundleResult};
use crate::model::BundleFile;

const ENTRY_MODE: u32 = 0o644;

#[derive(Debug)]
struct ArchiveEntry {
    name: String,
    path: PathBuf,
}

/// Packs a bundle directory into `{prefix}.zip`.
#[derive(Debug, Clone, Default)]
pub struct Archiver {
    staging_dir: Option<PathBuf>,
}

impl Archiver {
    /// Archiver staging in `staging_dir`, or next to the bundle when `None`.
    ///
    /// The staging directory must be on the same filesystem as the bundle for
    /// the final rename to succeed.
    #[must_use]
    pub const fn new(staging_dir: Option<PathBuf>) -> Self {
        Self { staging_dir }
    }

    /// Archive every regular file under `directory` into `{directory}/{prefix}.zip`.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be walked, the temp file
    /// cannot be created or written, or the final rename fails. The target
    /// path is untouched and no temp file remains after a failure.
    pub fn archive(&self, directory: &Path, prefix: &str) -> BundleResult<PathBuf> {
        let target = BundleFile::Archive.path_in(directory, prefix);
        let entries = collect_entries(directory, &target)?;
        let staging = self.staging_for(directory)?;

        let mut staged = tempfile::Builder::new()
            .prefix(".diagpack-")
            .suffix(".zip.tmp")
            .tempfile_in(&staging)
            .map_err(|err| BundleError::io("create archive temp file", &staging, err))?;
        let staged_path = staged.path().to_path_buf();

        let mut zip = ZipWriter::new(staged.as_file_mut());
        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(ENTRY_MODE);
        for entry in &entries {
            zip.start_file(entry.name.as_str(), options)
                .map_err(|err| BundleError::zip("add archive entry", &entry.path, err))?;
            let mut source = File::open(&entry.path)
                .map_err(|err| BundleError::io("open archive entry", &entry.path, err))?;
            io::copy(&mut source, &mut zip)
                .map_err(|err| BundleError::io("copy archive entry", &entry.path, err))?;
            debug!(entry = %entry.name, "archived file");
        }
        zip.finish()
            .map_err(|err| BundleError::zip("finalize archive", &staged_path, err))?;
        drop(zip);

        staged
            .as_file()
            .sync_all()
            .map_err(|err| BundleError::io("sync archive temp file", &staged_path, err))?;
        staged
            .into_temp_path()
            .persist(&target)
            .map_err(|err| BundleError::io("rename archive", &target, err.error))?;

        debug!(path = %target.display(), entries = entries.len(), "archive written");
        Ok(target)
    }

    fn staging_for(&self, directory: &Path) -> BundleResult<PathBuf> {
        if let Some(dir) = &self.staging_dir {
            return Ok(dir.clone());
        }
        // `.` and `..` have no usable lexical parent.
        let resolved = fs::canonicalize(directory)
            .map_err(|err| BundleError::io("resolve bundle directory", directory, err))?;
        Ok(resolved
            .parent()
            .map_or_else(std::env::temp_dir, Path::to_path_buf))
    }
}

fn collect_entries(directory: &Path, target: &Path) -> BundleResult<Vec<ArchiveEntry>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(directory).sort_by_file_name() {
        let entry = entry.map_err(|err| BundleError::walkdir("walk bundle directory", directory, err))?;
        if !entry.file_type().is_file() || entry.path() == target {
            continue;
        }
        let relative = entry.path().strip_prefix(directory).map_err(|_| {
            BundleError::io(
                "walk bundle directory",
                entry.path(),
                io::Error::other("entry outside bundle directory"),
            )
        })?;
        let name = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        entries.push(ArchiveEntry {
            name,
            path: entry.into_path(),
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use diagpack_test_support::fixtures::temp_dir;
    use std::io::Read;
    use zip::ZipArchive;

    fn entry_names(path: &Path) -> Result<Vec<String>> {
        let archive = ZipArchive::new(File::open(path)?)?;
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        Ok(names)
    }

    #[test]
    fn archive_contains_exactly_the_directory_files() -> Result<()> {
        let root = temp_dir()?;
        let bundle = root.path().join("bundle");
        fs::create_dir(&bundle)?;
        fs::write(bundle.join("a.report.json"), "{}")?;
        fs::write(bundle.join("a.log"), "line\n")?;

        let path = Archiver::default().archive(&bundle, "a")?;
        assert_eq!(path, bundle.join("a.zip"));
        assert_eq!(entry_names(&path)?, vec!["a.log", "a.report.json"]);

        let leftovers: Vec<_> = fs::read_dir(root.path())?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.file_name())
            .filter(|name| name != "bundle")
            .collect();
        assert!(leftovers.is_empty(), "unexpected staging leftovers: {leftovers:?}");
        Ok(())
    }

    #[test]
    fn stale_archive_is_not_packed_again() -> Result<()> {
        let root = temp_dir()?;
        let bundle = root.path().join("bundle");
        fs::create_dir(&bundle)?;
        fs::write(bundle.join("a.log"), "line\n")?;
        fs::write(bundle.join("a.zip"), "stale")?;

        let path = Archiver::default().archive(&bundle, "a")?;
        assert_eq!(entry_names(&path)?, vec!["a.log"]);
        Ok(())
    }

    #[test]
    fn nested_entries_use_forward_slashes_and_deflate() -> Result<()> {
        let root = temp_dir()?;
        let bundle = root.path().join("bundle");
        fs::create_dir_all(bundle.join("extra"))?;
        fs::write(bundle.join("extra").join("notes.txt"), "hello")?;

        let path = Archiver::default().archive(&bundle, "a")?;
        let mut archive = ZipArchive::new(File::open(path)?)?;
        let mut file = archive.by_name("extra/notes.txt")?;
        assert_eq!(file.compression(), CompressionMethod::Deflated);
        assert_eq!(file.unix_mode().map(|mode| mode & 0o777), Some(ENTRY_MODE));
        let mut text = String::new();
        file.read_to_string(&mut text)?;
        assert_eq!(text, "hello");
        Ok(())
    }

    #[test]
    fn failed_rename_leaves_no_temp_file() -> Result<()> {
        let root = temp_dir()?;
        let staging = temp_dir()?;
        let bundle = root.path().join("bundle");
        fs::create_dir_all(bundle.join("a.zip").join("occupied"))?;
        fs::write(bundle.join("a.zip").join("occupied").join("keep"), "x")?;
        fs::write(bundle.join("a.log"), "line\n")?;

        let result = Archiver::new(Some(staging.path().to_path_buf())).archive(&bundle, "a");
        assert!(result.is_err());
        assert!(bundle.join("a.zip").is_dir());
        assert_eq!(fs::read_dir(staging.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn missing_staging_directory_fails_without_touching_target() -> Result<()> {
        let root = temp_dir()?;
        let bundle = root.path().join("bundle");
        fs::create_dir(&bundle)?;
        fs::write(bundle.join("a.log"), "line\n")?;

        let result = Archiver::new(Some(root.path().join("absent"))).archive(&bundle, "a");
        assert!(result.is_err());
        assert!(!bundle.join("a.zip").exists());
        Ok(())
    }

    #[test]
    fn staging_is_the_parent_of_the_resolved_directory() -> Result<()> {
        let root = temp_dir()?;
        let bundle = root.path().join("bundle");
        fs::create_dir_all(bundle.join("sub"))?;
        let archiver = Archiver::default();

        let parent = fs::canonicalize(root.path())?;
        assert_eq!(archiver.staging_for(&bundle)?, parent);
        assert_eq!(archiver.staging_for(&bundle.join("sub").join(".."))?, parent);
        assert_eq!(archiver.staging_for(&bundle.join("."))?, parent);
        Ok(())
    }

    #[test]
    fn current_directory_is_never_its_own_staging_area() -> Result<()> {
        let cwd = fs::canonicalize(".")?;
        let staging = Archiver::default().staging_for(Path::new("."))?;
        assert_ne!(staging, cwd);
        assert_eq!(Some(staging.as_path()), cwd.parent());
        Ok(())
    }

    #[test]
    fn missing_bundle_directory_cannot_be_staged() -> Result<()> {
        let root = temp_dir()?;
        let result = Archiver::default().staging_for(&root.path().join("absent"));
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn configured_staging_directory_is_used_as_is() -> Result<()> {
        let archiver = Archiver::new(Some(PathBuf::from("/var/tmp")));
        assert_eq!(archiver.staging_for(Path::new("."))?, PathBuf::from("/var/tmp"));
        Ok(())
    }
}
