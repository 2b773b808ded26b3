//! Storage and trust-boundary core of a file-distribution tool that keeps a local storage tree
//! (typically a FAT-formatted SD card) in sync with remote catalogs of files, folders and zip
//! bundles.
//!
//! ### Overview
//!
//! Two collaborating pieces live here:
//!
//! - [`DbEntity`] parses and strictly validates an untrusted db descriptor before it may drive
//!   any synchronization. A db is accepted whole or rejected with a
//!   [`DbEntityValidationError`].
//! - [`FsBackend`] is the storage interface the synchronizer performs every operation through.
//!   [`DirFS`] implements it over a real directory; [`MapFS`] implements it in memory with
//!   case-insensitive paths and declared hashes, for tests.
//!
//! **Key ideas**:
//! - **Case-insensitive**: the in-memory model folds paths with [`CaseFoldedMap`], like the
//!   FAT storage it stands in for.
//! - **Hash-aware**: files are compared by content fingerprint; moves preserve it.
//! - **Ensure vs. require**: `unlink`/`make_dirs` are idempotent, while operations that need an
//!   entry fail with a [`LookupError`].
//! - **Interchangeable**: code generic over `FsBackend` runs unchanged on both backends.

mod config;
mod core;
mod db;
mod error;
mod store;
mod vfs;

pub use config::{
    Config, K_ALLOW_REBOOT, K_BASE_PATH, K_BASE_SYSTEM_PATH, K_DOWNLOADER_PROCESS_LIMIT,
    K_DOWNLOADER_RETRIES, K_DOWNLOADER_SIZE_MB_LIMIT, K_DOWNLOADER_TIMEOUT, K_FILTER,
    K_STORAGE_PRIORITY, K_UPDATE_LINUX, K_VERBOSE, RESERVED_GLOBAL_OPTIONS, default_config,
};
pub use crate::core::{FsBackend, Result, UNKNOWN_CONTENTS};
pub use db::{
    DB_MANDATORY_FIELDS, DbEntity, DbOptions, DbOptionsKind, ZIP_MANDATORY_FIELDS, ZipDescription,
    ZipKind,
};
pub use error::{DbEntityValidationError, DbOptionsValidationError, LookupError, LookupTarget};
pub use store::CaseFoldedMap;
pub use vfs::{DirFS, FAKE_TEMP_FILE, FileRecord, MapFS, TestData, ZippedFile};
