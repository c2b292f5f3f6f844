//! Catalog loading from a data directory on disk

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use itpcat::application::services::{CatalogService, LibrarySelection};
use itpcat::application::ApplicationError;
use itpcat::config::Settings;
use itpcat::infrastructure::traits::{FileSystem, RealFileSystem};
use itpcat::util::testing::{
    self, write_sample_data_dir, SAMPLE_AFP_CSV, SAMPLE_LIBRARY_INDEX_CSV, SAMPLE_TAXONOMY_JSON,
};

/// In-memory filesystem keyed by full path.
#[derive(Default)]
struct MemoryFileSystem {
    files: Mutex<HashMap<PathBuf, String>>,
}

impl MemoryFileSystem {
    fn with(files: &[(&str, &str)]) -> Self {
        let fs = Self::default();
        for (path, content) in files {
            fs.write(Path::new(path), content).unwrap();
        }
        fs
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.exists(path)
    }

    fn ensure_parent(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }
}

fn service_for(dir: &TempDir) -> CatalogService {
    testing::init_test_setup();
    let settings = Settings {
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    CatalogService::new(Arc::new(RealFileSystem), Arc::new(settings))
}

fn selection(itp: Option<&str>, section: Option<&str>) -> LibrarySelection {
    LibrarySelection {
        itp: itp.map(String::from),
        section: section.map(String::from),
    }
}

#[test]
fn given_sample_data_dir_when_loading_then_reads_all_libraries() {
    let dir = TempDir::new().unwrap();
    write_sample_data_dir(dir.path()).unwrap();

    let catalog = service_for(&dir).load().unwrap();

    assert_eq!(catalog.taxonomy.len(), 2);
    assert_eq!(catalog.libraries.len(), 2);
    assert_eq!(catalog.libraries[0].entries.len(), 3);
    assert_eq!(catalog.libraries[1].entries.len(), 2);
}

#[test]
fn given_all_libraries_when_aggregating_then_counts_ignore_case_and_orphans() {
    let dir = TempDir::new().unwrap();
    write_sample_data_dir(dir.path()).unwrap();
    let catalog = service_for(&dir).load().unwrap();

    let taxonomy = catalog.aggregate(&LibrarySelection::default(), false).unwrap();

    // afp: 05C, 03B35 (99Z dropped); coq: 05c, 03b
    assert_eq!(taxonomy.total_packages(), 4);
    assert_eq!(taxonomy.tops[0].package_count, 2);
    assert_eq!(taxonomy.tops[0].subclassifications[0].packages.len(), 1);
    assert_eq!(taxonomy.tops[1].classifications[0].package_count, 2);
}

#[test]
fn given_itp_filter_when_aggregating_then_only_that_library_counts() {
    let dir = TempDir::new().unwrap();
    write_sample_data_dir(dir.path()).unwrap();
    let catalog = service_for(&dir).load().unwrap();

    let taxonomy = catalog
        .aggregate(&selection(Some("coq"), None), false)
        .unwrap();

    assert_eq!(taxonomy.total_packages(), 2);
}

#[test]
fn given_unknown_itp_when_aggregating_then_reports_library_not_found() {
    let dir = TempDir::new().unwrap();
    write_sample_data_dir(dir.path()).unwrap();
    let catalog = service_for(&dir).load().unwrap();

    let err = catalog
        .aggregate(&selection(Some("Mizar"), None), false)
        .unwrap_err();

    assert!(matches!(err, ApplicationError::LibraryNotFound { .. }));
}

#[test]
fn given_missing_library_file_when_loading_then_fails_with_path() {
    let dir = TempDir::new().unwrap();
    write_sample_data_dir(dir.path()).unwrap();
    fs::remove_file(dir.path().join("library_data").join("coq.csv")).unwrap();

    let err = service_for(&dir).load().unwrap_err();

    assert!(matches!(err, ApplicationError::OperationFailed { .. }));
    assert!(err.to_string().contains("coq.csv"));
}

#[test]
fn given_malformed_taxonomy_when_loading_then_reports_parse_error() {
    let dir = TempDir::new().unwrap();
    write_sample_data_dir(dir.path()).unwrap();
    fs::write(dir.path().join("msc.json"), "{ not json").unwrap();

    let err = service_for(&dir).load_taxonomy().unwrap_err();

    assert!(matches!(err, ApplicationError::Parse { .. }));
}

#[test]
fn given_duplicate_rows_when_deduping_then_verified_row_wins() {
    let dir = TempDir::new().unwrap();
    write_sample_data_dir(dir.path()).unwrap();
    fs::write(
        dir.path().join("library_data").join("coq.csv"),
        "package,description,url,authors,category,msc,verified\n\
         Graph_Theory,Mirror,https://mirror/Graph_Theory,,Mathematics,03B35,False\n",
    )
    .unwrap();
    let catalog = service_for(&dir).load().unwrap();

    let plain = catalog.aggregate(&LibrarySelection::default(), false).unwrap();
    let deduped = catalog.aggregate(&LibrarySelection::default(), true).unwrap();

    assert_eq!(plain.total_packages(), 3);
    assert_eq!(deduped.total_packages(), 2);
    assert_eq!(deduped.tops[1].classifications[0].packages[0].name, "Graph_Theory");
}

#[test]
fn given_memory_filesystem_with_library_override_when_loading_then_resolves_mapped_file() {
    testing::init_test_setup();
    let fs = MemoryFileSystem::with(&[
        ("/catalog/msc.json", SAMPLE_TAXONOMY_JSON),
        ("/catalog/libraries.csv", SAMPLE_LIBRARY_INDEX_CSV),
        ("/catalog/mirror/afp.csv", SAMPLE_AFP_CSV),
        (
            "/catalog/library_data/coq.csv",
            "package,description,url,authors,category,msc,verified\n",
        ),
    ]);
    let mut settings = Settings {
        data_dir: PathBuf::from("/catalog"),
        ..Default::default()
    };
    settings
        .library_files
        .insert("afp.csv".into(), PathBuf::from("mirror/afp.csv"));
    let service = CatalogService::new(Arc::new(fs), Arc::new(settings));

    let catalog = service.load().unwrap();

    assert_eq!(catalog.libraries[0].entries.len(), 3);
    assert!(catalog.libraries[1].entries.is_empty());
}
