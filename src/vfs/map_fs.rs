//! This module provides an in-memory implementation of [`FsBackend`] used as a test double for
//! the synchronizer.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::trace;

use crate::core::{FsBackend, Result, UNKNOWN_CONTENTS, utils};
use crate::error::{LookupError, LookupTarget};
use crate::store::CaseFoldedMap;
use crate::FileRecord;

/// Path returned by [`MapFS::temp_file`].
pub const FAKE_TEMP_FILE: &str = "/tmp/temp_file";

/// A virtual file system that keeps file and folder records in memory.
///
/// `MapFS` never touches the host. Files are [`FileRecord`]s that carry a declared hash instead
/// of real bytes, which lets tests describe a storage tree by its fingerprints alone.
///
/// ### Internal state
///
/// * `files`: file records keyed by case-folded path.
/// * `folders`: presence markers keyed by case-folded path. File writes never add folders;
///   callers use `make_dirs()` or `make_dirs_parent()` first.
/// * `system_paths`: append-only list of mount points, exposed as a snapshot.
///
/// ### Simplifications
///
/// - `is_folder()` is always `true` and `folder_has_items()` always `false`, so tests do not
///   need to mirror a full directory tree.
/// - `touch()` sets the hash of a file to its own path.
/// - Paths are not resolved: `resolve()` and `download_target_path()` are identity.
///
/// ### Example
///
/// ```
/// use catalog_vfs::{FsBackend, MapFS};
///
/// let mut fs = MapFS::new();
/// fs.touch("/a").unwrap();
///
/// assert!(fs.is_file("/A"));
/// assert_eq!(fs.hash("/a").unwrap(), "/a");
/// ```
#[derive(Debug, Clone)]
pub struct MapFS {
    files: CaseFoldedMap<FileRecord>,
    folders: CaseFoldedMap<bool>,
    system_paths: Vec<PathBuf>,
}

impl MapFS {
    pub fn new() -> Self {
        Self {
            files: CaseFoldedMap::new(LookupTarget::File),
            folders: CaseFoldedMap::new(LookupTarget::Folder),
            system_paths: Vec::new(),
        }
    }

    /// Returns a builder that seeds the file system with fixtures.
    pub fn test_data(&mut self) -> TestData<'_> {
        TestData { fs: self }
    }

    /// Returns the record tracked at `path`.
    pub fn record<P: AsRef<Path>>(&self, path: P) -> Result<&FileRecord> {
        Ok(self.files.get(path)?)
    }

    /// Folded paths of every tracked file, sorted.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.files.keys()
    }
}

impl Default for MapFS {
    fn default() -> Self {
        Self::new()
    }
}

impl FsBackend for MapFS {
    fn system_paths(&self) -> Vec<PathBuf> {
        self.system_paths.clone()
    }

    fn add_system_path<P: AsRef<Path>>(&mut self, path: P) {
        self.system_paths.push(path.as_ref().to_path_buf());
    }

    fn resolve<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        path.as_ref().to_path_buf()
    }

    fn download_target_path<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        path.as_ref().to_path_buf()
    }

    fn temp_file(&self) -> Result<PathBuf> {
        Ok(PathBuf::from(FAKE_TEMP_FILE))
    }

    fn is_file<P: AsRef<Path>>(&self, path: P) -> bool {
        self.files.has(path)
    }

    fn is_folder<P: AsRef<Path>>(&self, _path: P) -> bool {
        true
    }

    fn read_file_contents<P: AsRef<Path>>(&self, path: P) -> Result<String> {
        match self.files.get(path) {
            Ok(record) => Ok(record.content().unwrap_or_default().to_owned()),
            Err(_) => Ok(UNKNOWN_CONTENTS.to_owned()),
        }
    }

    fn write_file_contents<P: AsRef<Path>>(&mut self, path: P, content: &str) -> Result<()> {
        let path = path.as_ref();
        if !self.files.has(path) {
            self.files.add(path, FileRecord::new());
        }
        self.files.get_mut(path)?.set_content(content);
        Ok(())
    }

    fn touch<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.files
            .add(path, FileRecord::with_hash(path.to_string_lossy()));
        Ok(())
    }

    fn mv<P: AsRef<Path>, Q: AsRef<Path>>(&mut self, source: P, target: Q) -> Result<()> {
        let record = self.files.pop(source)?;
        self.files.add(target, record);
        Ok(())
    }

    fn copy<P: AsRef<Path>, Q: AsRef<Path>>(&mut self, source: P, target: Q) -> Result<()> {
        let record = self.files.get(source)?.clone();
        self.files.add(target, record);
        Ok(())
    }

    fn hash<P: AsRef<Path>>(&self, path: P) -> Result<String> {
        let path = path.as_ref();
        match self.files.get(path)?.hash() {
            Some(hash) => Ok(hash.to_owned()),
            None => Err(LookupError::new(LookupTarget::Hash, utils::fold(path)).into()),
        }
    }

    fn make_dirs<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.folders.add(path, true);
        Ok(())
    }

    fn make_dirs_parent<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        if let Some(parent) = utils::parent_of(path) {
            self.folders.add(parent, true);
        }
        Ok(())
    }

    fn folder_has_items<P: AsRef<Path>>(&self, _path: P) -> Result<bool> {
        Ok(false)
    }

    fn folders(&self) -> Result<Vec<PathBuf>> {
        Ok(self.folders.keys().map(PathBuf::from).collect())
    }

    fn remove_folder<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.folders.pop(path)?;
        Ok(())
    }

    fn unlink<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        if self.files.has(path) {
            self.files.pop(path)?;
        }
        Ok(())
    }

    fn delete_previous<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let previous: Vec<String> = self
            .files
            .keys()
            .filter(|&candidate| utils::is_previous_version(candidate, path))
            .map(str::to_owned)
            .collect();
        for candidate in previous {
            self.files.pop(&candidate)?;
        }
        Ok(())
    }

    fn save_json_on_zip<P: AsRef<Path>>(&mut self, value: &Value, path: P) -> Result<()> {
        let path = path.as_ref();
        let record = FileRecord::with_hash(path.to_string_lossy()).unzipped_json(value.clone());
        self.files.add(path, record);
        Ok(())
    }

    /// Hands out the pending JSON payload of a record. The payload is consumed: a second call
    /// without a new `save_json_on_zip()` or fixture fails.
    fn load_dict_from_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        _suffix: Option<&str>,
    ) -> Result<Value> {
        let path = path.as_ref();
        match self.files.get_mut(path)?.take_unzipped_json() {
            Some(value) => Ok(value),
            None => Err(LookupError::new(LookupTarget::Payload, utils::fold(path)).into()),
        }
    }

    /// Registers every member of the zip manifest as a file with its declared hash, then drops
    /// the manifest. A zip without a pending manifest is left as is.
    fn unzip_contents<P: AsRef<Path>, Q: AsRef<Path>>(
        &mut self,
        zip_path: P,
        _target: Q,
    ) -> Result<()> {
        let Some(manifest) = self.files.get_mut(zip_path)?.take_zipped_files() else {
            return Ok(());
        };
        for (member, zipped) in manifest {
            self.files.add(&member, FileRecord::with_hash(zipped.hash));
        }
        Ok(())
    }
}

/// Fixture builder returned by [`MapFS::test_data`].
pub struct TestData<'a> {
    fs: &'a mut MapFS,
}

impl TestData<'_> {
    pub fn with_file<P: AsRef<Path>>(self, path: P, record: FileRecord) -> Self {
        trace!(path = %path.as_ref().display(), "fixture file");
        self.fs.files.add(path, record);
        self
    }

    pub fn with_hashed_file<P: AsRef<Path>, S: Into<String>>(self, path: P, hash: S) -> Self {
        self.with_file(path, FileRecord::with_hash(hash))
    }

    /// Adds a file described the way a catalog describes it.
    pub fn with_descriptor<P: AsRef<Path>>(self, path: P, descriptor: &Value) -> Result<Self> {
        let record = FileRecord::from_descriptor(descriptor)?;
        Ok(self.with_file(path, record))
    }

    pub fn with_folders<I, P>(self, folders: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for folder in folders {
            trace!(path = %folder.as_ref().display(), "fixture folder");
            self.fs.folders.add(folder, true);
        }
        self
    }
}
