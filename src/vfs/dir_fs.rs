//! This module provides the production implementation of [`FsBackend`]: it maps logical paths
//! onto a real directory tree on the host.
//!
//! ### Key Features:
//! - **Base path**: relative paths are resolved against `root` (the configured `base_path`).
//!   Absolute paths are used as given, which is how system paths are reached.
//! - **Containment**: relative paths that climb out of `root` with `..` are rejected, and
//!   writes or removals may not target `root` itself.
//! - **Real hashes**: `hash()` is the MD5 of the file content, so `mv()` preserves it.
//! - **Real zips**: `unzip_contents()`, `load_dict_from_file()` and `save_json_on_zip()` work
//!   on actual zip archives.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde_json::Value;
use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::config::Config;
use crate::core::{FsBackend, Result, UNKNOWN_CONTENTS, utils};
use crate::error::{LookupError, LookupTarget};

/// A file system that performs real I/O under a base directory.
///
/// ### Usage notes:
/// - `DirFS` does not follow symlinks specially; `unlink()` removes the link, not the target.
/// - Not thread‑safe; wrap it in a `Mutex` if several workers share it.
/// - Errors are returned via `anyhow::Result` with the host path in the context.
///
/// ### Example:
/// ```no_run
/// use catalog_vfs::{DirFS, FsBackend};
///
/// let mut fs = DirFS::new("/media/fat").unwrap();
/// fs.make_dirs("games/NES").unwrap();
/// fs.write_file_contents("games/NES/readme.txt", "Hello").unwrap();
/// assert!(fs.is_file("games/NES/readme.txt"));
/// ```
pub struct DirFS {
    root: PathBuf,              // host absolute normalized path
    system_paths: Vec<PathBuf>, // host paths
}

impl DirFS {
    /// Creates a new `DirFS` rooted at `root`.
    /// * `root` must be an existing absolute directory on the host. It is never created:
    ///   a missing base path means the storage is not mounted.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();

        if root.as_os_str().is_empty() {
            return Err(anyhow!("invalid root path: empty"));
        }
        if root.is_relative() {
            return Err(anyhow!("the root path must be absolute"));
        }

        let root = utils::normalize(root);
        if !root.exists() {
            return Err(anyhow!("base path {:?} does not exist", root));
        }
        if !root.is_dir() {
            return Err(anyhow!("{:?} is not a directory", root));
        }
        debug!(root = %root.display(), "opened base path");

        Ok(Self {
            root,
            system_paths: Vec::new(),
        })
    }

    /// Creates a `DirFS` rooted at the configured `base_path`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.base_path)
    }

    /// Returns the base path on the host.
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// Resolves `path` and checks that relative paths stay under `root`.
    fn to_host<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(anyhow!("invalid path: empty"));
        }
        let host = self.resolve(path);
        if path.is_relative() && !host.starts_with(&self.root) {
            return Err(anyhow!("{} is outside of {}", path.display(), self.root.display()));
        }
        Ok(host)
    }

    /// Like `to_host()`, but the path must name something below `root`, not `root` itself.
    fn to_host_entry<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        let path = path.as_ref();
        let host = self.to_host(path)?;
        if host == self.root {
            return Err(anyhow!("{} refers to the base path itself", path.display()));
        }
        Ok(host)
    }

    fn existing_file<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        let host = self.to_host(&path)?;
        if !host.is_file() {
            return Err(LookupError::new(LookupTarget::File, host.to_string_lossy()).into());
        }
        Ok(host)
    }

    /// Recursively collects directories below `host_path`, relative to `root`.
    fn collect_folders(&self, host_path: &Path, folders: &mut Vec<PathBuf>) -> Result<()> {
        for entry in fs::read_dir(host_path)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let host_child = entry.path();
            folders.push(host_child.strip_prefix(&self.root)?.to_path_buf());
            self.collect_folders(&host_child, folders)?;
        }
        Ok(())
    }

    /// Name of the single JSON entry written by `save_json_on_zip()`.
    fn json_entry_name(zip_path: &Path) -> String {
        let stem = zip_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        if stem.to_lowercase().ends_with(".json") {
            stem
        } else {
            format!("{stem}.json")
        }
    }

    fn load_json_from_zip(host: &Path) -> Result<Value> {
        let mut archive = ZipArchive::new(File::open(host)?)
            .with_context(|| format!("opening zip {}", host.display()))?;
        let name = archive
            .file_names()
            .find(|name| name.to_lowercase().ends_with(".json"))
            .map(str::to_owned)
            .ok_or_else(|| anyhow!("{} has no json entry", host.display()))?;
        let entry = archive.by_name(&name)?;
        Ok(serde_json::from_reader(entry)?)
    }
}

impl FsBackend for DirFS {
    fn system_paths(&self) -> Vec<PathBuf> {
        self.system_paths.clone()
    }

    fn add_system_path<P: AsRef<Path>>(&mut self, path: P) {
        self.system_paths.push(path.as_ref().to_path_buf());
    }

    /// Absolute paths are normalized as they are; relative paths are joined onto `root`.
    fn resolve<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            utils::normalize(path)
        } else {
            utils::normalize(self.root.join(path))
        }
    }

    fn download_target_path<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.resolve(path)
    }

    /// Creates a named temporary file that outlives this call.
    fn temp_file(&self) -> Result<PathBuf> {
        let path = tempfile::NamedTempFile::new()?.into_temp_path().keep()?;
        Ok(path)
    }

    fn is_file<P: AsRef<Path>>(&self, path: P) -> bool {
        self.to_host(path).is_ok_and(|host| host.is_file())
    }

    fn is_folder<P: AsRef<Path>>(&self, path: P) -> bool {
        self.to_host(path).is_ok_and(|host| host.is_dir())
    }

    fn read_file_contents<P: AsRef<Path>>(&self, path: P) -> Result<String> {
        let host = self.to_host(path)?;
        if !host.is_file() {
            return Ok(UNKNOWN_CONTENTS.to_owned());
        }
        fs::read_to_string(&host).with_context(|| format!("reading {}", host.display()))
    }

    fn write_file_contents<P: AsRef<Path>>(&mut self, path: P, content: &str) -> Result<()> {
        let host = self.to_host_entry(path)?;
        if host.is_dir() {
            return Err(anyhow!("{} is a directory", host.display()));
        }
        fs::write(&host, content).with_context(|| format!("writing {}", host.display()))
    }

    /// Creates an empty file, or leaves an existing one untouched.
    fn touch<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let host = self.to_host_entry(path)?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&host)
            .with_context(|| format!("touching {}", host.display()))?;
        Ok(())
    }

    /// Renames the file. Falls back to copy and delete when the rename crosses devices
    /// (downloads are staged in the system temp directory).
    fn mv<P: AsRef<Path>, Q: AsRef<Path>>(&mut self, source: P, target: Q) -> Result<()> {
        let source = self.existing_file(source)?;
        let target = self.to_host_entry(target)?;
        debug!(source = %source.display(), target = %target.display(), "move");
        match fs::rename(&source, &target) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::CrossesDevices => {
                fs::copy(&source, &target).with_context(|| {
                    format!("moving {} to {}", source.display(), target.display())
                })?;
                fs::remove_file(&source)
                    .with_context(|| format!("removing {}", source.display()))?;
            }
            Err(err) => {
                return Err(anyhow::Error::new(err).context(format!(
                    "moving {} to {}",
                    source.display(),
                    target.display()
                )));
            }
        }
        Ok(())
    }

    fn copy<P: AsRef<Path>, Q: AsRef<Path>>(&mut self, source: P, target: Q) -> Result<()> {
        let source = self.existing_file(source)?;
        let target = self.to_host_entry(target)?;
        debug!(source = %source.display(), target = %target.display(), "copy");
        fs::copy(&source, &target)
            .with_context(|| format!("copying {} to {}", source.display(), target.display()))?;
        Ok(())
    }

    /// MD5 of the file content, as lowercase hex.
    fn hash<P: AsRef<Path>>(&self, path: P) -> Result<String> {
        let host = self.existing_file(path)?;
        let mut file = File::open(&host)?;
        let mut context = md5::Context::new();
        io::copy(&mut file, &mut context)?;
        Ok(format!("{:x}", context.compute()))
    }

    fn make_dirs<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let host = self.to_host(path)?;
        if host.exists() && !host.is_dir() {
            return Err(anyhow!("path '{}' exists but is not a directory", host.display()));
        }
        fs::create_dir_all(&host).with_context(|| format!("creating {}", host.display()))
    }

    fn make_dirs_parent<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        match utils::parent_of(path) {
            Some(parent) => self.make_dirs(parent),
            None => Ok(()),
        }
    }

    fn folder_has_items<P: AsRef<Path>>(&self, path: P) -> Result<bool> {
        let host = self.to_host(path)?;
        if !host.is_dir() {
            return Ok(false);
        }
        Ok(fs::read_dir(&host)?.next().is_some())
    }

    /// Every directory below `root`, relative to it and sorted.
    fn folders(&self) -> Result<Vec<PathBuf>> {
        let mut folders = Vec::new();
        self.collect_folders(&self.root, &mut folders)?;
        folders.sort();
        Ok(folders)
    }

    fn remove_folder<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let host = self.to_host_entry(path)?;
        if !host.is_dir() {
            return Err(LookupError::new(LookupTarget::Folder, host.to_string_lossy()).into());
        }
        debug!(path = %host.display(), "remove folder");
        fs::remove_dir(&host).with_context(|| format!("removing {}", host.display()))
    }

    fn unlink<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let host = self.to_host_entry(path)?;
        if host.is_file() || host.is_symlink() {
            debug!(path = %host.display(), "unlink");
            fs::remove_file(&host).with_context(|| format!("removing {}", host.display()))?;
        }
        Ok(())
    }

    fn delete_previous<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let host = self.to_host_entry(path)?;
        let Some(parent) = host.parent().filter(|parent| parent.is_dir()) else {
            return Ok(());
        };
        for entry in fs::read_dir(parent)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let candidate = entry.path();
            if utils::is_previous_version(&candidate, &host) {
                debug!(path = %candidate.display(), "delete previous version");
                fs::remove_file(&candidate)?;
            }
        }
        Ok(())
    }

    fn save_json_on_zip<P: AsRef<Path>>(&mut self, value: &Value, path: P) -> Result<()> {
        let host = self.to_host_entry(path)?;
        let file = File::create(&host).with_context(|| format!("creating {}", host.display()))?;
        let mut zip = ZipWriter::new(file);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(Self::json_entry_name(&host), options)?;
        serde_json::to_writer(&mut zip, value)?;
        zip.finish()?;
        Ok(())
    }

    fn load_dict_from_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        suffix: Option<&str>,
    ) -> Result<Value> {
        let host = self.existing_file(path)?;
        let suffix = match suffix {
            Some(suffix) => suffix.to_lowercase(),
            None => host
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
                .unwrap_or_default(),
        };
        let value: Value = match suffix.as_str() {
            ".json" => serde_json::from_reader(BufReader::new(File::open(&host)?))
                .with_context(|| format!("parsing {}", host.display()))?,
            ".zip" => Self::load_json_from_zip(&host)?,
            other => return Err(anyhow!("unsupported suffix `{}` for {}", other, host.display())),
        };
        if !value.is_object() {
            return Err(anyhow!("{} does not contain a json object", host.display()));
        }
        Ok(value)
    }

    fn unzip_contents<P: AsRef<Path>, Q: AsRef<Path>>(
        &mut self,
        zip_path: P,
        target: Q,
    ) -> Result<()> {
        let host = self.existing_file(zip_path)?;
        let target = self.to_host(target)?;
        self.make_dirs(&target)?;
        debug!(zip = %host.display(), target = %target.display(), "unzip");
        let mut archive = ZipArchive::new(File::open(&host)?)
            .with_context(|| format!("opening zip {}", host.display()))?;
        archive
            .extract(&target)
            .with_context(|| format!("extracting {} into {}", host.display(), target.display()))?;
        Ok(())
    }
}
