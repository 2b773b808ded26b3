use std::path::{Path, PathBuf};

use serde_json::Value;

/// Contents reported by [`FsBackend::read_file_contents`] for a path that is not tracked.
pub const UNKNOWN_CONTENTS: &str = "unknown";

/// Storage operations a synchronization run performs against the local tree.
///
/// Both the host-backed [`DirFS`](crate::DirFS) and the in-memory [`MapFS`](crate::MapFS)
/// implement this trait with the same success and failure semantics, so code written against
/// `FsBackend` runs unchanged in tests and in production.
///
/// Paths are compared case-insensitively by the in-memory backend, mirroring the FAT-like
/// storage the synchronizer targets. Operations that assume an entry exists (`hash`, `mv`,
/// `copy`, `remove_folder`, `load_dict_from_file`) fail with an error whose root cause is a
/// [`LookupError`](crate::LookupError). Operations with "ensure" semantics (`unlink`,
/// `make_dirs`) never fail on redundant calls.
pub trait FsBackend {
    /// Returns a snapshot of the registered system paths (mount points).
    fn system_paths(&self) -> Vec<PathBuf>;
    fn add_system_path<P: AsRef<Path>>(&mut self, path: P);

    /// Maps a logical path to the location the backend actually operates on.
    fn resolve<P: AsRef<Path>>(&self, path: P) -> PathBuf;
    /// Location a download for `path` should be written to.
    fn download_target_path<P: AsRef<Path>>(&self, path: P) -> PathBuf;
    /// Scratch file for staging downloads.
    fn temp_file(&self) -> Result<PathBuf>;

    fn is_file<P: AsRef<Path>>(&self, path: P) -> bool;
    fn is_folder<P: AsRef<Path>>(&self, path: P) -> bool;

    /// Reads text content of a file.
    /// Returns [`UNKNOWN_CONTENTS`] instead of failing when the file is not there.
    fn read_file_contents<P: AsRef<Path>>(&self, path: P) -> Result<String>;
    /// Creates the file if needed and replaces its content. Parent folders are not created.
    fn write_file_contents<P: AsRef<Path>>(&mut self, path: P, content: &str) -> Result<()>;
    fn touch<P: AsRef<Path>>(&mut self, path: P) -> Result<()>;

    /// Moves a file. The content, and therefore the hash, is preserved at `target`.
    fn mv<P: AsRef<Path>, Q: AsRef<Path>>(&mut self, source: P, target: Q) -> Result<()>;
    fn copy<P: AsRef<Path>, Q: AsRef<Path>>(&mut self, source: P, target: Q) -> Result<()>;
    /// Returns the content fingerprint of a file.
    fn hash<P: AsRef<Path>>(&self, path: P) -> Result<String>;

    /// Ensures the folder and its parents exist.
    fn make_dirs<P: AsRef<Path>>(&mut self, path: P) -> Result<()>;
    /// Ensures the parent folder of `path` exists. Root-level paths are a no-op.
    fn make_dirs_parent<P: AsRef<Path>>(&mut self, path: P) -> Result<()>;
    fn folder_has_items<P: AsRef<Path>>(&self, path: P) -> Result<bool>;
    /// Returns every known folder, sorted.
    fn folders(&self) -> Result<Vec<PathBuf>>;
    /// Removes an empty folder. Not recursive.
    fn remove_folder<P: AsRef<Path>>(&mut self, path: P) -> Result<()>;

    /// Removes a file if it is there.
    fn unlink<P: AsRef<Path>>(&mut self, path: P) -> Result<()>;
    /// Removes older date-stamped siblings of `path` (e.g. `MiSTer_20210101`).
    fn delete_previous<P: AsRef<Path>>(&mut self, path: P) -> Result<()>;

    /// Stores `value` as a single JSON document inside a zip at `path`.
    fn save_json_on_zip<P: AsRef<Path>>(&mut self, value: &Value, path: P) -> Result<()>;
    /// Loads a JSON object from a `.json` file or from the first JSON entry of a `.zip`.
    /// `suffix` overrides the file extension when choosing the format.
    fn load_dict_from_file<P: AsRef<Path>>(&mut self, path: P, suffix: Option<&str>)
    -> Result<Value>;
    /// Expands a zip into `target`.
    fn unzip_contents<P: AsRef<Path>, Q: AsRef<Path>>(&mut self, zip_path: P, target: Q)
    -> Result<()>;
}

pub type Result<T> = std::result::Result<T, anyhow::Error>;

pub(crate) mod utils {
    use std::path::{Component, Path, PathBuf};
    use std::sync::LazyLock;

    use regex::Regex;

    static DATE_STAMPED: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^(?P<prefix>.+_)[0-9]{8}(?P<ext>(\.[A-Za-z0-9]+)*)$")
            .expect("date-stamp pattern is valid")
    });

    /// Resolves `.` and `..` and drops trailing separators.
    pub fn normalize<P: AsRef<Path>>(path: P) -> PathBuf {
        let mut result = PathBuf::new();
        for component in path.as_ref().components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    result.pop();
                }
                _ => result.push(component),
            }
        }
        result
    }

    /// Canonical key of a path on case-insensitive storage.
    pub fn fold<P: AsRef<Path>>(path: P) -> String {
        path.as_ref().to_string_lossy().to_lowercase()
    }

    /// Parent of `path`, or `None` for root-level paths.
    pub fn parent_of<P: AsRef<Path>>(path: P) -> Option<PathBuf> {
        path.as_ref()
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }

    /// Checks if `candidate` is another date-stamped version of `current` in the same folder.
    pub fn is_previous_version<P: AsRef<Path>, Q: AsRef<Path>>(candidate: P, current: Q) -> bool {
        let (candidate, current) = (candidate.as_ref(), current.as_ref());
        if fold(candidate) == fold(current) {
            return false;
        }
        let same_parent = match (candidate.parent(), current.parent()) {
            (Some(a), Some(b)) => fold(a) == fold(b),
            (None, None) => true,
            _ => false,
        };
        if !same_parent {
            return false;
        }
        let (Some(candidate_name), Some(current_name)) = (candidate.file_name(), current.file_name())
        else {
            return false;
        };
        let candidate_name = candidate_name.to_string_lossy().to_lowercase();
        let current_name = current_name.to_string_lossy().to_lowercase();
        match (
            DATE_STAMPED.captures(&candidate_name),
            DATE_STAMPED.captures(&current_name),
        ) {
            (Some(a), Some(b)) => a["prefix"] == b["prefix"] && a["ext"] == b["ext"],
            _ => false,
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_normalize_path() {
            assert_eq!(normalize("/a/b/c/"), PathBuf::from("/a/b/c"));
            assert_eq!(normalize("/a/b/./c"), PathBuf::from("/a/b/c"));
            assert_eq!(normalize("/a/b/../c"), PathBuf::from("/a/c"));
            assert_eq!(normalize("/"), PathBuf::from("/"));
            assert_eq!(normalize("/.."), PathBuf::from("/"));
            assert_eq!(normalize(".."), PathBuf::from(""));
            assert_eq!(normalize(""), PathBuf::from(""));
            assert_eq!(normalize("../a"), PathBuf::from("a"));
            assert_eq!(normalize("./a"), PathBuf::from("a"));
        }

        #[test]
        fn test_fold_ignores_case() {
            assert_eq!(fold("/Games/NES"), fold("/games/nes"));
            assert_eq!(fold("MiSTer"), "mister");
        }

        #[test]
        fn test_parent_of() {
            assert_eq!(parent_of("/a/b"), Some(PathBuf::from("/a")));
            assert_eq!(parent_of("a/b"), Some(PathBuf::from("a")));
            assert_eq!(parent_of("/a"), Some(PathBuf::from("/")));
            assert_eq!(parent_of("a"), None);
            assert_eq!(parent_of("/"), None);
            assert_eq!(parent_of(""), None);
        }

        #[test]
        fn test_is_previous_version() {
            assert!(is_previous_version("/media/MiSTer_20200101", "/media/MiSTer_20210101"));
            assert!(is_previous_version("/media/menu_20200101.rbf", "/media/MENU_20210101.rbf"));
            assert!(is_previous_version("cores/NES_20200101.rbf", "cores/NES_20210101.rbf"));
        }

        #[test]
        fn test_is_not_previous_version() {
            // same file
            assert!(!is_previous_version("/a/MiSTer_20210101", "/A/mister_20210101"));
            // different folder
            assert!(!is_previous_version("/b/MiSTer_20200101", "/a/MiSTer_20210101"));
            // different extension
            assert!(!is_previous_version("/a/NES_20200101.rbf", "/a/NES_20210101.mra"));
            // different prefix
            assert!(!is_previous_version("/a/SNES_20200101.rbf", "/a/NES_20210101.rbf"));
            // no stamp
            assert!(!is_previous_version("/a/NES.rbf", "/a/NES_20210101.rbf"));
            assert!(!is_previous_version("/a/NES_20200101.rbf", "/a/NES.rbf"));
        }
    }
}
