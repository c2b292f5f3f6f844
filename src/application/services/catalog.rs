//! Catalog loading service
//!
//! Reads the MSC taxonomy (JSON), the library index (CSV) and every library's
//! package file (CSV), and hands them to the aggregator.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt, ParseResultExt};
use crate::config::Settings;
use crate::domain::{aggregate, dedupe_packages, Library, Package, Taxonomy};
use crate::infrastructure::traits::FileSystem;

/// Row of `libraries.csv`.
#[derive(Debug, Deserialize)]
struct LibraryIndexRow {
    name: String,
    #[serde(default)]
    section: String,
    file: String,
    #[serde(default)]
    url: String,
}

/// Row of a library package file.
#[derive(Debug, Deserialize)]
struct PackageRow {
    package: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    authors: String,
    msc: String,
    #[serde(default)]
    verified: String,
}

impl From<PackageRow> for Package {
    fn from(row: PackageRow) -> Self {
        Package {
            name: row.package,
            url: row.url,
            description: row.description,
            authors: row.authors,
            // Crawlers write Python booleans
            verified: row.verified == "True",
            classification_code: row.msc,
        }
    }
}

/// Filter over the library index; `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibrarySelection {
    pub itp: Option<String>,
    pub section: Option<String>,
}

impl LibrarySelection {
    pub fn matches(&self, library: &Library) -> bool {
        let itp_ok = self
            .itp
            .as_deref()
            .map_or(true, |itp| library.itp.eq_ignore_ascii_case(itp));
        let section_ok = self
            .section
            .as_deref()
            .map_or(true, |section| library.section.eq_ignore_ascii_case(section));
        itp_ok && section_ok
    }
}

/// Everything read from the data directory.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub taxonomy: Taxonomy,
    pub libraries: Vec<Library>,
}

impl Catalog {
    /// Libraries matching `selection`; errors when nothing matches.
    pub fn select(&self, selection: &LibrarySelection) -> ApplicationResult<Vec<&Library>> {
        let selected: Vec<&Library> = self
            .libraries
            .iter()
            .filter(|l| selection.matches(l))
            .collect();
        if selected.is_empty() && (selection.itp.is_some() || selection.section.is_some()) {
            return Err(ApplicationError::LibraryNotFound {
                itp: selection.itp.clone(),
                section: selection.section.clone(),
            });
        }
        Ok(selected)
    }

    /// Concatenated entries of the selected libraries.
    pub fn packages(&self, selection: &LibrarySelection) -> ApplicationResult<Vec<Package>> {
        Ok(self
            .select(selection)?
            .into_iter()
            .flat_map(|l| l.entries.iter().cloned())
            .collect())
    }

    /// Aggregate the selected packages against the taxonomy.
    pub fn aggregate(
        &self,
        selection: &LibrarySelection,
        dedupe: bool,
    ) -> ApplicationResult<Taxonomy> {
        let mut packages = self.packages(selection)?;
        if dedupe {
            let before = packages.len();
            packages = dedupe_packages(packages);
            debug!("dedupe: {} -> {} packages", before, packages.len());
        }
        Ok(aggregate(&packages, &self.taxonomy))
    }
}

/// Service reading catalog sources from the configured data directory.
pub struct CatalogService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl CatalogService {
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    /// Load taxonomy, library index and all library package files.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self) -> ApplicationResult<Catalog> {
        let taxonomy = self.load_taxonomy()?;
        let mut libraries = self.load_library_index()?;
        for library in &mut libraries {
            let path = self.settings.library_file_path(&library.file);
            library.entries = self.load_packages(&path)?;
            debug!(
                "library {} / {}: {} packages",
                library.itp,
                library.section,
                library.entries.len()
            );
        }
        Ok(Catalog {
            taxonomy,
            libraries,
        })
    }

    /// Read the MSC taxonomy definition.
    pub fn load_taxonomy(&self) -> ApplicationResult<Taxonomy> {
        let path = self.settings.taxonomy_path();
        let content = self
            .fs
            .read_to_string(&path)
            .with_path_context("read taxonomy", &path)?;
        let taxonomy = parse_taxonomy(&content, &path)?;
        let duplicates = taxonomy.duplicate_codes();
        if !duplicates.is_empty() {
            warn!(
                "taxonomy repeats codes {:?}; packages under them are counted once per node",
                duplicates
            );
        }
        debug!("taxonomy: {} top classifications", taxonomy.len());
        Ok(taxonomy)
    }

    /// Read the library index; entries are left empty.
    pub fn load_library_index(&self) -> ApplicationResult<Vec<Library>> {
        let path = self.settings.library_index_path();
        let content = self
            .fs
            .read_to_string(&path)
            .with_path_context("read library index", &path)?;
        parse_library_index(&content, &path)
    }

    /// Read one library package file.
    pub fn load_packages(&self, path: &Path) -> ApplicationResult<Vec<Package>> {
        if !self.fs.is_file(path) {
            return Err(ApplicationError::OperationFailed {
                context: format!("library file not found: {}", path.display()),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "file does not exist",
                )),
            });
        }
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read library file", path)?;
        parse_packages(&content, path)
    }
}

/// Parse the MSC taxonomy JSON.
pub fn parse_taxonomy(content: &str, path: &Path) -> ApplicationResult<Taxonomy> {
    serde_json::from_str(content).with_parse_context(path)
}

/// Parse the library index CSV (`name,section,file,url`).
pub fn parse_library_index(content: &str, path: &Path) -> ApplicationResult<Vec<Library>> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    reader
        .deserialize::<LibraryIndexRow>()
        .map(|row| {
            row.map(|r| Library {
                itp: r.name,
                section: r.section,
                file: r.file,
                url: r.url,
                entries: Vec::new(),
            })
            .with_parse_context(path)
        })
        .collect()
}

/// Parse a library package CSV (`package,description,url,authors,category,msc,verified`).
pub fn parse_packages(content: &str, path: &Path) -> ApplicationResult<Vec<Package>> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    reader
        .deserialize::<PackageRow>()
        .map(|row| row.map(Package::from).with_parse_context(path))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_package_csv_when_parsing_then_maps_columns() {
        let csv = "package,description,url,authors,category,msc,verified\n\
                   Graph_Theory,Graphs,https://afp/Graph,Noschinski,Math,05C,True\n\
                   Other,,https://afp/Other,,Math,03B35,False\n";
        let packages = parse_packages(csv, Path::new("afp.csv")).unwrap();

        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0].name, "Graph_Theory");
        assert_eq!(packages[0].classification_code, "05C");
        assert!(packages[0].verified);
        assert!(!packages[1].verified);
    }

    #[test]
    fn given_csv_without_msc_column_when_parsing_then_reports_path() {
        let csv = "package,url\nFoo,https://foo\n";
        let err = parse_packages(csv, Path::new("broken.csv")).unwrap_err();
        assert!(matches!(err, ApplicationError::Parse { .. }));
        assert!(err.to_string().contains("broken.csv"));
    }

    #[test]
    fn given_index_csv_when_parsing_then_entries_start_empty() {
        let csv = "name,section,file,url\nIsabelle,AFP,afp.csv,https://isa-afp.org\n";
        let libraries = parse_library_index(csv, Path::new("libraries.csv")).unwrap();
        assert_eq!(libraries.len(), 1);
        assert_eq!(libraries[0].itp, "Isabelle");
        assert!(libraries[0].entries.is_empty());
    }

    #[test]
    fn given_selection_when_matching_then_ignores_ascii_case() {
        let library = Library {
            itp: "Coq".into(),
            section: "Opam".into(),
            file: "coq.csv".into(),
            url: String::new(),
            entries: Vec::new(),
        };
        let selection = LibrarySelection {
            itp: Some("coq".into()),
            section: None,
        };
        assert!(selection.matches(&library));
        assert!(!LibrarySelection {
            itp: Some("Lean".into()),
            section: None
        }
        .matches(&library));
    }
}
