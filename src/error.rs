use std::fmt;

use thiserror::Error;

/// Kind of entry a failed lookup was looking for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LookupTarget {
    Entry,
    File,
    Folder,
    Hash,
    Payload,
}

impl fmt::Display for LookupTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LookupTarget::Entry => "entry",
            LookupTarget::File => "file",
            LookupTarget::Folder => "folder",
            LookupTarget::Hash => "hash",
            LookupTarget::Payload => "pending json payload",
        };
        f.write_str(name)
    }
}

/// An operation required an entry that is not there.
///
/// Backends return it wrapped in `anyhow::Error`; use `downcast_ref::<LookupError>()` to tell
/// an expected absence from an I/O failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no {target} at `{path}`")]
pub struct LookupError {
    pub target: LookupTarget,
    pub path: String,
}

impl LookupError {
    pub fn new<S: Into<String>>(target: LookupTarget, path: S) -> Self {
        Self {
            target,
            path: path.into(),
        }
    }
}

/// Options of a db that are unknown, reserved for the global configuration or badly typed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid options: {}", .fields.join(", "))]
pub struct DbOptionsValidationError {
    pub fields: Vec<String>,
}

/// Reasons a db descriptor is rejected. Any of them rejects the whole db.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DbEntityValidationError {
    #[error("db for section `{section}` is empty")]
    EmptyDb { section: String },

    #[error("db for section `{section}` has an incorrect format, contact the db maintainer if this persists")]
    WrongFormat { section: String },

    #[error("db for section `{section}` could not be parsed: {reason}")]
    Malformed { section: String, reason: String },

    #[error("db for section `{section}` does not have `{field}`, contact the db maintainer")]
    MissingField { section: String, field: &'static str },

    #[error("db for section `{section}` has `{field}` that is not a {expected}, contact the db maintainer")]
    WrongFieldType {
        section: String,
        field: &'static str,
        expected: &'static str,
    },

    #[error("section `{section}` doesn't match database id `{db_id}`, fix your INI file")]
    SectionMismatch { section: String, db_id: String },

    #[error("db `{db_id}` has `zips` that is not a mapping, contact the db maintainer")]
    WrongZipsFormat { db_id: String },

    #[error("db `{db_id}` has zip `{zip_id}` with an incorrect format, contact the db maintainer")]
    WrongZipFormat { db_id: String, zip_id: String },

    #[error("db `{db_id}` with zip `{zip_id}` does not have `{field}`, contact the db maintainer")]
    MissingZipField {
        db_id: String,
        zip_id: String,
        field: &'static str,
    },

    #[error("db `{db_id}` with zip `{zip_id}` has a wrong `{field}`, contact the db maintainer")]
    WrongZipField {
        db_id: String,
        zip_id: String,
        field: &'static str,
    },

    #[error("db `{db_id}` with zip `{zip_id}` has wrong kind `{kind}`, contact the db maintainer")]
    WrongZipKind {
        db_id: String,
        zip_id: String,
        kind: String,
    },

    #[error("db `{db_id}` with zip `{zip_id}` extracts all contents but has no `target_folder_path`, contact the db maintainer")]
    MissingTargetFolderPath { db_id: String, zip_id: String },

    #[error("db `{db_id}` has wrong default options, contact the db maintainer")]
    WrongOptions {
        db_id: String,
        #[source]
        source: DbOptionsValidationError,
    },
}
