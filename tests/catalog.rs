use std::path::Path;

use catalog_vfs::{
    DbEntity, DbEntityValidationError, DirFS, FileRecord, FsBackend, LookupError, LookupTarget,
    MapFS, Result, ZipKind, default_config,
};
use serde_json::{Value, json};
use tempdir::TempDir;

const SECTION: &str = "Distribution_MiSTer";
const PALETTES: &str = "nes_palettes";

fn raw_catalog() -> Value {
    json!({
        "db_id": "distribution_mister",
        "base_files_url": "https://example.org/files/",
        "files": {
            "MiSTer": {"hash": "5d41402abc4b2a76b9719d911017c592", "size": 5},
            "menu.rbf": {"hash": "7d793037a0760186574b0282f2f435e7", "size": 5}
        },
        "folders": {"games": {}, "games/NES": {}},
        "zips": {
            PALETTES: {
                "kind": "extract_all_contents",
                "description": "Extracting NES palettes",
                "contents_file": {"hash": "zip_hash", "size": 10, "url": "https://example.org/p.zip"},
                "summary_file": {"hash": "summary_hash", "size": 3, "url": "https://example.org/s.json.zip"},
                "target_folder_path": "games/NES/Palettes/"
            }
        },
        "default_options": {"downloader_timeout": 60},
        "timestamp": 1_640_995_200
    })
}

/// Files of `db` whose local hash is missing or differs from the catalog.
fn outdated_files<F: FsBackend>(fs: &F, db: &DbEntity) -> Vec<String> {
    db.files
        .iter()
        .filter(|(path, descriptor)| {
            let expected = descriptor["hash"].as_str();
            !fs.is_file(path.as_str()) || fs.hash(path.as_str()).ok().as_deref() != expected
        })
        .map(|(path, _)| path.clone())
        .collect()
}

/// Creates the catalog folders and removes the ones the catalog no longer lists.
fn sync_folders<F: FsBackend>(fs: &mut F, db: &DbEntity, stale: &[&str]) -> Result<()> {
    for folder in db.folders.keys() {
        fs.make_dirs(folder)?;
    }
    for folder in stale {
        if fs.is_folder(folder) && !fs.folder_has_items(folder)? {
            fs.remove_folder(folder)?;
        }
    }
    Ok(())
}

#[test]
fn test_catalog_is_validated_and_normalized() {
    let bytes = serde_json::to_vec(&raw_catalog()).unwrap();

    let db = DbEntity::from_slice(&bytes, SECTION).unwrap();

    assert_eq!(db.db_id, "distribution_mister");
    assert_eq!(db.zips[PALETTES].kind, ZipKind::ExtractAllContents);
    assert_eq!(
        default_config().with_db_options(&db.default_options).downloader_timeout,
        60
    );
}

#[test]
fn test_catalog_rejected_as_a_whole() {
    let mut raw = raw_catalog();
    raw["zips"][PALETTES]["kind"] = json!("extract_everything");

    let err = DbEntity::new(&raw, SECTION).unwrap_err();

    assert!(matches!(err, DbEntityValidationError::WrongZipKind { ref kind, .. } if kind == "extract_everything"));
}

#[test]
fn test_zip_install_on_map_fs() -> Result<()> {
    let db = DbEntity::new(&raw_catalog(), SECTION)?;
    let zip = &db.zips[PALETTES];
    let target = zip.target_folder_path.as_deref().unwrap();

    let mut fs = MapFS::new();
    let summary_path = fs.download_target_path("summary.json.zip");
    let contents_path = fs.download_target_path("contents.zip");
    fs.test_data()
        .with_file(
            &summary_path,
            FileRecord::with_hash("summary_hash").unzipped_json(json!({
                "files": {
                    "games/NES/Palettes/Smooth.pal": {"hash": "h1"},
                    "games/NES/Palettes/Wavebeam.pal": {"hash": "h2"}
                },
                "folders": {"games/NES/Palettes": {}}
            })),
        )
        .with_file(
            &contents_path,
            FileRecord::with_hash("zip_hash").zipped_files([
                ("games/NES/Palettes/Smooth.pal", "h1"),
                ("games/NES/Palettes/Wavebeam.pal", "h2"),
            ]),
        );

    assert_eq!(fs.hash(&summary_path)?, zip.summary_file["hash"]);
    let summary = fs.load_dict_from_file(&summary_path, None)?;
    fs.make_dirs(target)?;
    fs.unzip_contents(&contents_path, target)?;
    fs.unlink(&contents_path)?;

    for (path, descriptor) in summary["files"].as_object().unwrap() {
        assert!(fs.is_file(path.to_uppercase()));
        assert_eq!(fs.hash(path)?, descriptor["hash"]);
    }

    // the summary is handed out once
    let err = fs.load_dict_from_file(&summary_path, None).unwrap_err();
    assert_eq!(
        err.downcast_ref::<LookupError>().map(|e| e.target),
        Some(LookupTarget::Payload)
    );
    Ok(())
}

#[test]
fn test_outdated_files_on_map_fs() -> Result<()> {
    let db = DbEntity::new(&raw_catalog(), SECTION)?;
    let mut fs = MapFS::new();
    fs.test_data()
        .with_descriptor("mister", &db.files["MiSTer"])?
        .with_hashed_file("MENU.RBF", "old");

    assert_eq!(outdated_files(&fs, &db), vec!["menu.rbf"]);
    Ok(())
}

#[test]
fn test_outdated_files_on_dir_fs() -> Result<()> {
    let db = DbEntity::new(&raw_catalog(), SECTION)?;
    let temp_dir = TempDir::new("catalog_test")?;
    let mut fs = DirFS::new(temp_dir.path())?;

    let download = fs.temp_file()?;
    std::fs::write(&download, "hello")?;
    fs.mv(&download, "MiSTer")?;
    fs.write_file_contents("menu.rbf", "stale")?;

    assert_eq!(outdated_files(&fs, &db), vec!["menu.rbf"]);
    Ok(())
}

#[test]
fn test_sync_folders_on_both_backends() -> Result<()> {
    let db = DbEntity::new(&raw_catalog(), SECTION)?;

    let mut map_fs = MapFS::new();
    map_fs.test_data().with_folders(["old"]);
    sync_folders(&mut map_fs, &db, &["old"])?;
    assert_eq!(
        map_fs.folders()?,
        vec![Path::new("games").to_path_buf(), Path::new("games/nes").to_path_buf()]
    );

    let temp_dir = TempDir::new("catalog_test")?;
    let mut dir_fs = DirFS::new(temp_dir.path())?;
    dir_fs.make_dirs("old")?;
    sync_folders(&mut dir_fs, &db, &["old"])?;
    assert_eq!(
        dir_fs.folders()?,
        vec![Path::new("games").to_path_buf(), Path::new("games/NES").to_path_buf()]
    );
    Ok(())
}
