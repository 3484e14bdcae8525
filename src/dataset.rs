/*!
 * Unified dataset API for CPSC enrollment data
 *
 * Provides a builder pattern running the full read → normalize → classify
 * pipeline, and convenience loading that mirrors the monthly workflow: pick
 * the most recent CSV in a data directory and its sibling contract info file.
 */

use std::path::{Path, PathBuf};

use crate::aggregate::EnrollmentAggregator;
use crate::classify::classify_records;
use crate::data_types::{ClassifiedRecord, EnrollmentSnapshot, OrgLookup};
use crate::error::{CpscError, Result};
use crate::reader::EnrollmentReader;

/// Builder for loading an enrollment dataset
///
/// # Example
/// ```no_run
/// # use cpsc::dataset::EnrollmentDatasetBuilder;
/// let dataset = EnrollmentDatasetBuilder::new()
///     .enrollment_data("data/raw/cpsc_enrollment_2025_06.csv")
///     .contract_info("data/raw/cpsc_contract_info_2025_06.csv")
///     .skip_invalid_records(true)
///     .build()?;
/// # Ok::<(), cpsc::CpscError>(())
/// ```
pub struct EnrollmentDatasetBuilder {
    enrollment_path: Option<PathBuf>,
    contract_info_path: Option<PathBuf>,
    skip_invalid_records: bool,
    #[cfg(feature = "progress")]
    show_progress: bool,
}

impl Default for EnrollmentDatasetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EnrollmentDatasetBuilder {
    /// Create a new dataset builder
    pub fn new() -> Self {
        Self {
            enrollment_path: None,
            contract_info_path: None,
            skip_invalid_records: false,
            #[cfg(feature = "progress")]
            show_progress: true,
        }
    }

    /// Set the path to the enrollment CSV
    pub fn enrollment_data<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.enrollment_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the path to the contract info CSV
    pub fn contract_info<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.contract_info_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enable or disable skipping invalid records
    pub fn skip_invalid_records(mut self, skip: bool) -> Self {
        self.skip_invalid_records = skip;
        self
    }

    #[cfg(feature = "progress")]
    /// Enable or disable progress bars
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Build the dataset: read, normalize, and classify
    ///
    /// When no contract info path was given, a sibling `*contract_info*.csv`
    /// next to the enrollment file is picked up automatically (CMS ships both
    /// in the same ZIP).
    pub fn build(self) -> Result<EnrollmentDataset> {
        let enrollment_path = self.enrollment_path.ok_or_else(|| CpscError::Custom {
            message: "Enrollment data file path not specified".to_string(),
            suggestion: Some(
                "Use .enrollment_data() to specify the enrollment CSV".to_string(),
            ),
        })?;

        let reader = EnrollmentReader::new().with_skip_invalid_records(self.skip_invalid_records);
        #[cfg(feature = "progress")]
        let reader = reader.with_progress_bar(self.show_progress);

        println!("Reading enrollment data from: {}", enrollment_path.display());
        let records = reader.load_enrollment_data(&enrollment_path)?;

        let contract_info_path = self
            .contract_info_path
            .or_else(|| discover_contract_info(&enrollment_path));
        let org_lookup = match contract_info_path {
            Some(path) => {
                println!("Loading contract info from: {}", path.display());
                reader.load_contract_info(&path)?
            }
            None => {
                println!("No contract info file found, using built-in mapping");
                OrgLookup::new()
            }
        };

        let records = classify_records(records, &org_lookup);

        Ok(EnrollmentDataset {
            records,
            org_lookup,
            source: enrollment_path,
        })
    }
}

/// A fully classified enrollment dataset
#[derive(Debug)]
pub struct EnrollmentDataset {
    pub records: Vec<ClassifiedRecord>,
    pub org_lookup: OrgLookup,
    pub source: PathBuf,
}

impl EnrollmentDataset {
    /// Load the most recent enrollment CSV from a data directory
    ///
    /// Mirrors the monthly workflow: the newest `*.csv` (contract info files
    /// excluded) is the current release.
    pub fn load_latest<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let mut newest: Option<(PathBuf, std::time::SystemTime)> = None;

        for entry in std::fs::read_dir(data_dir)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_lowercase();
            if !name.ends_with(".csv") || name.contains("contract_info") {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            if newest.as_ref().map(|(_, m)| modified > *m).unwrap_or(true) {
                newest = Some((path, modified));
            }
        }

        let (path, _) = newest.ok_or_else(|| CpscError::Custom {
            message: format!("No CSV files found in {}", data_dir.display()),
            suggestion: Some(
                "Download the monthly CPSC data first (cpscli fetch with the download feature, \
                or manually from the CMS enrollment data page)."
                    .to_string(),
            ),
        })?;

        println!("Using most recent CSV: {}", path.display());
        EnrollmentDatasetBuilder::new().enrollment_data(path).build()
    }

    /// Aggregate this dataset into a snapshot
    pub fn snapshot(&self) -> EnrollmentSnapshot {
        EnrollmentAggregator::new(&self.records).snapshot()
    }
}

/// Find a contract info CSV in the same directory as the enrollment file
fn discover_contract_info(enrollment_path: &Path) -> Option<PathBuf> {
    let dir = enrollment_path.parent()?;
    let entries = std::fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_lowercase();
        if name.contains("contract_info") && name.ends_with(".csv") {
            return Some(entry.path());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn builder() -> EnrollmentDatasetBuilder {
        let b = EnrollmentDatasetBuilder::new();
        #[cfg(feature = "progress")]
        let b = b.show_progress(false);
        b
    }

    #[test]
    fn builds_and_classifies_with_contract_info() {
        let dir = tempfile::tempdir().unwrap();
        let enrollment = write_file(
            dir.path(),
            "cpsc_enrollment_2025_06.csv",
            "Contract Number,State,County,Enrollment\nH7777,CA,Los Angeles,100\n",
        );
        write_file(
            dir.path(),
            "cpsc_contract_info_2025_06.csv",
            "Contract Number,Parent Organization\nH7777,Example Health\n",
        );

        // Sibling contract info is discovered without being specified
        let dataset = builder().enrollment_data(&enrollment).build().unwrap();
        assert_eq!(dataset.records.len(), 1);
        assert_eq!(dataset.org_lookup.len(), 1);
        assert_eq!(dataset.records[0].parent_org, "Example Health");

        let snapshot = dataset.snapshot();
        assert_eq!(snapshot.metadata.total_enrollment, 100);
    }

    #[test]
    fn builds_without_contract_info() {
        let dir = tempfile::tempdir().unwrap();
        let enrollment = write_file(
            dir.path(),
            "enrollment.csv",
            "contract_number,state,enrollment\nH0028,CA,50\n",
        );

        let dataset = builder().enrollment_data(&enrollment).build().unwrap();
        assert!(dataset.org_lookup.is_empty());
        // Static prefix mapping answers instead
        assert_eq!(dataset.records[0].parent_org, "Humana");
    }

    #[test]
    fn build_requires_a_path() {
        let err = builder().build().unwrap_err();
        assert!(matches!(err, CpscError::Custom { .. }));
    }

    #[test]
    fn load_latest_picks_newest_non_contract_csv() {
        let dir = tempfile::tempdir().unwrap();
        let old = write_file(
            dir.path(),
            "cpsc_enrollment_2025_05.csv",
            "contract_number,state,enrollment\nH0001,CA,1\n",
        );
        let new = write_file(
            dir.path(),
            "cpsc_enrollment_2025_06.csv",
            "contract_number,state,enrollment\nH0002,NY,2\n",
        );
        write_file(
            dir.path(),
            "cpsc_contract_info_2025_06.csv",
            "contract_number,parent_organization\nH0002,Some Org\n",
        );

        // Make the ordering unambiguous regardless of filesystem timestamp
        // granularity
        let past = std::time::SystemTime::now() - std::time::Duration::from_secs(3600);
        std::fs::File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(past)
            .unwrap();
        let future = std::time::SystemTime::now() + std::time::Duration::from_secs(3600);
        std::fs::File::options()
            .write(true)
            .open(&new)
            .unwrap()
            .set_modified(future)
            .unwrap();

        let dataset = EnrollmentDataset::load_latest(dir.path()).unwrap();
        assert_eq!(dataset.records[0].record.state, "NY");
        assert_eq!(dataset.records[0].parent_org, "Some Org");
    }

    #[test]
    fn load_latest_errors_on_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = EnrollmentDataset::load_latest(dir.path()).unwrap_err();
        assert!(matches!(err, CpscError::Custom { .. }));
    }
}
