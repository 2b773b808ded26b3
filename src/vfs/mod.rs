mod dir_fs;
mod entry;
mod map_fs;

pub use dir_fs::DirFS;
pub use entry::{FileRecord, ZippedFile};
pub use map_fs::{FAKE_TEMP_FILE, MapFS, TestData};
