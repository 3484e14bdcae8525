/*!
 * CSV reading for CPSC enrollment files
 *
 * CMS publishes these files with varying encodings (UTF-8 in recent releases,
 * cp1252 in older ones), so reads decode with a best-effort retry before any
 * parsing. Rows flow through the schema normalizer into typed records.
 */

use std::io::Cursor;
use std::path::Path;
use std::time::Instant;

use csv::ReaderBuilder;

#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};

use crate::data_types::{EnrollmentRecord, OrgLookup};
use crate::error::{CpscError, ErrorContext, Result};
use crate::schema::{
    normalize_header, ColumnMap, CONTRACT_INFO_CONTRACT_COLUMNS, CONTRACT_INFO_ORG_COLUMNS,
};

/// Encodings attempted, in order. windows-1252 is a superset of latin-1 and
/// decodes any byte sequence, so it doubles as the last resort.
pub const SUPPORTED_ENCODINGS: &[&str] = &["utf-8", "windows-1252"];

/// Enrollment data reader with schema normalization
pub struct EnrollmentReader {
    /// Whether to skip malformed CSV rows (true) or fail on the first (false)
    skip_invalid_records: bool,
    /// Whether to show a progress bar
    #[cfg(feature = "progress")]
    show_progress_bar: bool,
}

impl Default for EnrollmentReader {
    fn default() -> Self {
        Self::new()
    }
}

impl EnrollmentReader {
    /// Create a new reader with default settings
    pub fn new() -> Self {
        Self {
            skip_invalid_records: false,
            #[cfg(feature = "progress")]
            show_progress_bar: true,
        }
    }

    /// Enable or disable skipping invalid records
    pub fn with_skip_invalid_records(mut self, skip: bool) -> Self {
        self.skip_invalid_records = skip;
        self
    }

    #[cfg(feature = "progress")]
    /// Enable or disable the progress bar
    pub fn with_progress_bar(mut self, show: bool) -> Self {
        self.show_progress_bar = show;
        self
    }

    /// Read a file into a string, retrying across [`SUPPORTED_ENCODINGS`]
    fn decode_file(path: &Path) -> Result<String> {
        let bytes = std::fs::read(path)?;
        match String::from_utf8(bytes) {
            Ok(mut text) => {
                if text.starts_with('\u{feff}') {
                    text.remove(0);
                }
                Ok(text)
            }
            Err(err) => {
                let bytes = err.into_bytes();
                let (text, _, had_errors) = encoding_rs::WINDOWS_1252.decode(&bytes);
                if had_errors {
                    Err(CpscError::encoding_failure(
                        path.to_path_buf(),
                        SUPPORTED_ENCODINGS,
                    ))
                } else {
                    Ok(text.into_owned())
                }
            }
        }
    }

    /// Load and normalize the enrollment table
    ///
    /// Fails fast with a schema error before reading any rows when the
    /// required columns cannot be resolved.
    pub fn load_enrollment_data<P: AsRef<Path>>(&self, path: P) -> Result<Vec<EnrollmentRecord>> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(CpscError::file_not_found_with_suggestion(path.to_path_buf()));
        }

        let text = Self::decode_file(path)?;
        let total_bytes = text.len() as u64;

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(Cursor::new(text));

        let headers: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();
        let column_map = ColumnMap::from_headers(&headers)?;

        #[cfg(feature = "progress")]
        let progress_bar = if self.show_progress_bar {
            let pb = ProgressBar::new(total_bytes);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                    .unwrap()
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };
        #[cfg(not(feature = "progress"))]
        let _ = total_bytes;

        let mut records = Vec::new();
        let mut invalid_count = 0;
        let start_time = Instant::now();

        for (idx, result) in reader.records().enumerate() {
            match result {
                Ok(row) => {
                    #[cfg(feature = "progress")]
                    if let Some(ref pb) = progress_bar {
                        if let Some(position) = row.position() {
                            pb.set_position(position.byte());
                        }
                    }
                    records.push(column_map.record_from_row(&row));
                }
                Err(e) => {
                    let error = CpscError::CsvParse {
                        message: e.to_string(),
                        line: Some(idx + 2), // +2 for header and 0-based index
                        column: None,
                        context: ErrorContext {
                            file_path: Some(path.to_path_buf()),
                            line_number: Some(idx + 2),
                            ..Default::default()
                        },
                    };

                    if self.skip_invalid_records {
                        invalid_count += 1;
                        if invalid_count <= 10 {
                            eprintln!("Warning: {}", error);
                        }
                    } else {
                        return Err(error);
                    }
                }
            }
        }

        #[cfg(feature = "progress")]
        if let Some(pb) = progress_bar {
            pb.finish_and_clear();
        }

        let elapsed = start_time.elapsed();
        println!(
            "Loaded {} enrollment records in {:.2}s",
            records.len(),
            elapsed.as_secs_f64()
        );
        if invalid_count > 0 {
            println!("Skipped {} invalid records", invalid_count);
        }

        Ok(records)
    }

    /// Load the optional contract info table into an [`OrgLookup`]
    ///
    /// A table without recognizable contract/organization columns yields an
    /// empty lookup; the built-in mapping covers classification instead.
    pub fn load_contract_info<P: AsRef<Path>>(&self, path: P) -> Result<OrgLookup> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(CpscError::file_not_found_with_suggestion(path.to_path_buf()));
        }

        let text = Self::decode_file(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_reader(Cursor::new(text));

        let normalized: Vec<String> = reader
            .headers()?
            .iter()
            .map(normalize_header)
            .collect();

        let contract_col = CONTRACT_INFO_CONTRACT_COLUMNS
            .iter()
            .find_map(|c| normalized.iter().position(|h| h == c));
        let org_col = CONTRACT_INFO_ORG_COLUMNS
            .iter()
            .find_map(|c| normalized.iter().position(|h| h == c));

        let (contract_col, org_col) = match (contract_col, org_col) {
            (Some(c), Some(o)) => (c, o),
            _ => {
                println!("No contract/organization columns in contract info, using built-in mapping");
                return Ok(OrgLookup::new());
            }
        };

        let mut lookup = OrgLookup::new();
        for result in reader.records() {
            let row = result?;
            let contract = row.get(contract_col).map(|s| s.trim()).unwrap_or("");
            let org = row.get(org_col).map(|s| s.trim()).unwrap_or("");
            if !contract.is_empty() && !org.is_empty() {
                lookup.insert(contract, org);
            }
        }

        println!("Loaded {} contract-to-org mappings", lookup.len());
        Ok(lookup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn reader() -> EnrollmentReader {
        let r = EnrollmentReader::new();
        #[cfg(feature = "progress")]
        let r = r.with_progress_bar(false);
        r
    }

    fn write_file(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn loads_utf8_enrollment_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "enrollment.csv",
            b"Contract Number,State,County,Enrollment\nH0028,CA,Los Angeles,\"1,500\"\nH9999,NY,Kings,*\n",
        );

        let records = reader().load_enrollment_data(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].enrollment, 1500);
        assert_eq!(records[1].enrollment, 0);
    }

    #[test]
    fn decodes_cp1252_fallback() {
        let dir = tempfile::tempdir().unwrap();
        // "Doña Ana" with 0xF1 (ñ in cp1252, invalid as UTF-8)
        let path = write_file(
            &dir,
            "enrollment.csv",
            b"contract_number,state,county,enrollment\nH0001,NM,Do\xF1a Ana,10\n",
        );

        let records = reader().load_enrollment_data(&path).unwrap();
        assert_eq!(records[0].county.as_deref(), Some("Doña Ana"));
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "enrollment.csv", b"contract_number,county\nH0001,Kings\n");

        let err = reader().load_enrollment_data(&path).unwrap_err();
        assert!(matches!(err, CpscError::Schema { .. }));
    }

    #[test]
    fn malformed_rows_skip_or_fail_by_setting() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "enrollment.csv",
            b"contract_number,state,enrollment\nH0001,CA,10\nH0002,NY\nH0003,TX,5\n",
        );

        let err = reader().load_enrollment_data(&path).unwrap_err();
        assert!(matches!(err, CpscError::CsvParse { .. }));

        let records = reader()
            .with_skip_invalid_records(true)
            .load_enrollment_data(&path)
            .unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn contract_info_builds_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "contract_info.csv",
            b"Contract ID,Parent Organization\nH0028,Humana Inc.\nH0112,\n",
        );

        let lookup = reader().load_contract_info(&path).unwrap();
        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup.get("H0028"), Some("Humana Inc."));
    }

    #[test]
    fn contract_info_without_known_columns_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "contract_info.csv", b"foo,bar\n1,2\n");

        let lookup = reader().load_contract_info(&path).unwrap();
        assert!(lookup.is_empty());
    }
}
