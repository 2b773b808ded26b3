use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::db::{DbOptions, DbOptionsKind};
use crate::error::DbEntityValidationError as Error;

/// Fields every db must declare.
pub const DB_MANDATORY_FIELDS: [&str; 4] = ["db_id", "files", "folders", "timestamp"];

/// Fields every zip descriptor must declare.
pub const ZIP_MANDATORY_FIELDS: [&str; 4] = ["kind", "description", "contents_file", "summary_file"];

/// How the synchronizer treats a zip bundle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZipKind {
    /// Expand the whole zip into `target_folder_path`.
    ExtractAllContents,
    /// Pick individual files out of the zip.
    ExtractSingleFiles,
}

impl ZipKind {
    pub fn parse(kind: &str) -> Option<ZipKind> {
        match kind {
            "extract_all_contents" => Some(ZipKind::ExtractAllContents),
            "extract_single_files" => Some(ZipKind::ExtractSingleFiles),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ZipKind::ExtractAllContents => "extract_all_contents",
            ZipKind::ExtractSingleFiles => "extract_single_files",
        }
    }
}

/// A validated zip descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZipDescription {
    pub kind: ZipKind,
    pub description: String,
    /// Descriptor of the zip file itself.
    pub contents_file: Value,
    /// Descriptor of the summary (the zip's own manifest of files and folders).
    pub summary_file: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_folder_path: Option<String>,
    /// Any other field, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A validated, normalized db descriptor.
///
/// Built only through [`DbEntity::new`] or [`DbEntity::from_slice`], which reject the whole
/// db on the first problem found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DbEntity {
    pub db_id: String,
    pub base_files_url: String,
    pub db_files: Vec<String>,
    pub files: Map<String, Value>,
    pub folders: Map<String, Value>,
    pub zips: BTreeMap<String, ZipDescription>,
    pub default_options: DbOptions,
    pub timestamp: i64,
}

impl DbEntity {
    /// Validates `raw` as the db expected for INI section `section`.
    ///
    /// The db id must equal the section name ignoring case; the stored `db_id` is lower-cased.
    pub fn new(raw: &Value, section: &str) -> Result<DbEntity, Error> {
        let db = Self::validate(raw, section);
        if let Err(err) = &db {
            warn!(section, error = %err, "rejected db");
        }
        db
    }

    /// Parses JSON bytes and validates them like [`DbEntity::new`].
    pub fn from_slice(bytes: &[u8], section: &str) -> Result<DbEntity, Error> {
        let raw: Value = serde_json::from_slice(bytes).map_err(|err| Error::Malformed {
            section: section.to_owned(),
            reason: err.to_string(),
        })?;
        Self::new(&raw, section)
    }

    pub fn zip(&self, zip_id: &str) -> Option<&ZipDescription> {
        self.zips.get(zip_id)
    }

    fn validate(raw: &Value, section: &str) -> Result<DbEntity, Error> {
        let raw = match raw {
            Value::Object(raw) => raw,
            Value::Null => {
                return Err(Error::EmptyDb {
                    section: section.to_owned(),
                });
            }
            _ => {
                return Err(Error::WrongFormat {
                    section: section.to_owned(),
                });
            }
        };

        if let Some(field) = DB_MANDATORY_FIELDS
            .into_iter()
            .find(|field| !raw.contains_key(*field))
        {
            return Err(Error::MissingField {
                section: section.to_owned(),
                field,
            });
        }

        let wrong_type = |field: &'static str, expected: &'static str| Error::WrongFieldType {
            section: section.to_owned(),
            field,
            expected,
        };

        let db_id = raw["db_id"]
            .as_str()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| wrong_type("db_id", "non-empty string"))?
            .to_lowercase();
        if db_id != section.to_lowercase() {
            return Err(Error::SectionMismatch {
                section: section.to_owned(),
                db_id,
            });
        }

        let files = raw["files"]
            .as_object()
            .ok_or_else(|| wrong_type("files", "mapping"))?
            .clone();
        let folders = raw["folders"]
            .as_object()
            .ok_or_else(|| wrong_type("folders", "mapping"))?
            .clone();
        let timestamp = raw["timestamp"]
            .as_i64()
            .ok_or_else(|| wrong_type("timestamp", "integer"))?;

        let base_files_url = match raw.get("base_files_url") {
            None => String::new(),
            Some(url) => url
                .as_str()
                .ok_or_else(|| wrong_type("base_files_url", "string"))?
                .to_owned(),
        };

        let db_files = match raw.get("db_files") {
            None => Vec::new(),
            Some(db_files) => db_files
                .as_array()
                .and_then(|db_files| {
                    db_files
                        .iter()
                        .map(|f| f.as_str().map(str::to_owned))
                        .collect::<Option<Vec<_>>>()
                })
                .ok_or_else(|| wrong_type("db_files", "sequence of strings"))?,
        };

        let zips = match raw.get("zips") {
            None => BTreeMap::new(),
            Some(Value::Object(zips)) => validate_zips(&db_id, zips)?,
            Some(_) => return Err(Error::WrongZipsFormat { db_id }),
        };

        let default_options = match raw.get("default_options") {
            None => DbOptions::default(),
            Some(Value::Object(props)) => DbOptions::from_props(props, DbOptionsKind::DefaultOptions)
                .map_err(|source| Error::WrongOptions {
                    db_id: db_id.clone(),
                    source,
                })?,
            Some(_) => return Err(wrong_type("default_options", "mapping")),
        };

        Ok(DbEntity {
            db_id,
            base_files_url,
            db_files,
            files,
            folders,
            zips,
            default_options,
            timestamp,
        })
    }
}

fn validate_zips(
    db_id: &str,
    zips: &Map<String, Value>,
) -> Result<BTreeMap<String, ZipDescription>, Error> {
    zips.iter()
        .map(|(zip_id, zip)| Ok((zip_id.clone(), validate_zip(db_id, zip_id, zip)?)))
        .collect()
}

fn validate_zip(db_id: &str, zip_id: &str, zip: &Value) -> Result<ZipDescription, Error> {
    let Value::Object(zip) = zip else {
        return Err(Error::WrongZipFormat {
            db_id: db_id.to_owned(),
            zip_id: zip_id.to_owned(),
        });
    };

    if let Some(field) = ZIP_MANDATORY_FIELDS
        .into_iter()
        .find(|field| !zip.contains_key(*field))
    {
        return Err(Error::MissingZipField {
            db_id: db_id.to_owned(),
            zip_id: zip_id.to_owned(),
            field,
        });
    }

    let kind = match &zip["kind"] {
        Value::String(kind) => ZipKind::parse(kind),
        _ => None,
    }
    .ok_or_else(|| Error::WrongZipKind {
        db_id: db_id.to_owned(),
        zip_id: zip_id.to_owned(),
        kind: match &zip["kind"] {
            Value::String(kind) => kind.clone(),
            other => other.to_string(),
        },
    })?;

    let wrong_field = |field: &'static str| Error::WrongZipField {
        db_id: db_id.to_owned(),
        zip_id: zip_id.to_owned(),
        field,
    };

    let target_folder_path = match zip.get("target_folder_path") {
        None => None,
        Some(path) => Some(
            path.as_str()
                .ok_or_else(|| wrong_field("target_folder_path"))?
                .to_owned(),
        ),
    };
    if kind == ZipKind::ExtractAllContents && target_folder_path.is_none() {
        return Err(Error::MissingTargetFolderPath {
            db_id: db_id.to_owned(),
            zip_id: zip_id.to_owned(),
        });
    }

    let description = zip["description"]
        .as_str()
        .ok_or_else(|| wrong_field("description"))?
        .to_owned();

    let mut extra = zip.clone();
    for field in ZIP_MANDATORY_FIELDS.into_iter().chain(["target_folder_path"]) {
        extra.remove(field);
    }

    Ok(ZipDescription {
        kind,
        description,
        contents_file: zip["contents_file"].clone(),
        summary_file: zip["summary_file"].clone(),
        target_folder_path,
        extra,
    })
}
