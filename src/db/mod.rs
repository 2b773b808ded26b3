mod entity;
mod options;

pub use entity::{DB_MANDATORY_FIELDS, DbEntity, ZIP_MANDATORY_FIELDS, ZipDescription, ZipKind};
pub use options::{DbOptions, DbOptionsKind};
