/*!
 * Error handling for CPSC enrollment data operations
 *
 * Provides detailed error types with context, suggestions, and recovery guidance.
 */

use std::path::PathBuf;
use thiserror::Error;

/// CPSC library result type
pub type Result<T> = std::result::Result<T, CpscError>;

/// Error types with context and suggestions
#[derive(Error, Debug)]
pub enum CpscError {
    /// File I/O errors with context
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
        context: ErrorContext,
    },

    /// CSV parsing errors with location information
    #[error("CSV parsing error at line {line:?}: {message}")]
    CsvParse {
        message: String,
        line: Option<usize>,
        column: Option<String>,
        context: ErrorContext,
    },

    /// Required canonical columns missing after header normalization
    #[error("Schema error: missing required columns: {missing_fields:?}")]
    Schema {
        missing_fields: Vec<String>,
        available_columns: Vec<String>,
    },

    /// No supported text encoding could decode the input table
    #[error("Encoding error: could not decode {path} with any of {encodings_tried:?}")]
    Encoding {
        path: PathBuf,
        encodings_tried: Vec<String>,
    },

    /// File not found with suggestions
    #[error("File not found: {path}")]
    FileNotFound {
        path: PathBuf,
        suggestion: String,
    },

    /// Errors while writing JSON artifacts
    #[error("Export error: {message}")]
    Export {
        message: String,
        path: Option<PathBuf>,
        suggestion: Option<String>,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        suggestion: Option<String>,
    },

    /// Feature not enabled error
    #[error("Feature '{feature}' is not enabled")]
    FeatureNotEnabled {
        feature: String,
        enable_instruction: String,
    },

    /// Generic errors with custom message
    #[error("{message}")]
    Custom {
        message: String,
        suggestion: Option<String>,
    },
}

/// Error context providing additional information
#[derive(Debug, Default, Clone)]
pub struct ErrorContext {
    pub file_path: Option<PathBuf>,
    pub line_number: Option<usize>,
    pub column_name: Option<String>,
    pub contract_number: Option<String>,
}

impl CpscError {
    /// Create a schema error listing what was missing and what the source offered
    pub fn missing_required_columns(
        missing_fields: Vec<String>,
        available_columns: Vec<String>,
    ) -> Self {
        Self::Schema {
            missing_fields,
            available_columns,
        }
    }

    /// Create an encoding error with the list of encodings attempted
    pub fn encoding_failure(path: PathBuf, encodings_tried: &[&str]) -> Self {
        Self::Encoding {
            path,
            encodings_tried: encodings_tried.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a file not found error with helpful suggestion
    pub fn file_not_found_with_suggestion(path: PathBuf) -> Self {
        let suggestion = if path.to_string_lossy().contains("contract_info") {
            format!(
                "Check if the contract info file exists at '{}'. CMS ships it alongside the \
                enrollment CSV in the monthly CPSC ZIP; processing works without it, using the \
                built-in parent organization mapping.",
                path.display()
            )
        } else if path.extension().map(|e| e == "csv").unwrap_or(false) {
            format!(
                "Check if the enrollment CSV exists at '{}'. Monthly CPSC files can be downloaded \
                from the CMS enrollment data page, or via `cpscli fetch` when the download feature \
                is enabled.",
                path.display()
            )
        } else {
            format!(
                "Check if the file exists at '{}'. Make sure the path is correct and you have \
                read permissions.",
                path.display()
            )
        };

        Self::FileNotFound { path, suggestion }
    }

    /// Create a feature not enabled error
    pub fn feature_required(feature: &str) -> Self {
        let enable_instruction = match feature {
            "download" => "Add 'cpsc = { version = \"0.1\", features = [\"download\"] }' to your Cargo.toml",
            _ => "Enable the required feature in your Cargo.toml",
        };

        Self::FeatureNotEnabled {
            feature: feature.to_string(),
            enable_instruction: enable_instruction.to_string(),
        }
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            Self::Schema {
                available_columns, ..
            } => {
                format!(
                    "{}\n\nAvailable columns: {}\n\nThe source schema may have drifted; \
                    check the synonym table in cpsc::schema against the new release.",
                    self,
                    available_columns.join(", ")
                )
            }
            Self::Encoding { encodings_tried, .. } => {
                format!("{}\n\nEncodings attempted: {}", self, encodings_tried.join(", "))
            }
            Self::FileNotFound { suggestion, .. } => {
                format!("{}\n\nSuggestion: {}", self, suggestion)
            }
            Self::FeatureNotEnabled {
                enable_instruction, ..
            } => {
                format!("{}\n\nTo enable: {}", self, enable_instruction)
            }
            Self::Export {
                suggestion: Some(sug),
                ..
            } => {
                format!("{}\n\nSuggestion: {}", self, sug)
            }
            Self::Custom {
                suggestion: Some(sug),
                ..
            } => {
                format!("{}\n\nSuggestion: {}", self, sug)
            }
            _ => self.to_string(),
        }
    }
}

// Convenience conversions
impl From<std::io::Error> for CpscError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: err,
            context: ErrorContext::default(),
        }
    }
}

impl From<csv::Error> for CpscError {
    fn from(err: csv::Error) -> Self {
        let (line, message) = match err.position() {
            Some(pos) => (Some(pos.line() as usize), err.to_string()),
            None => (None, err.to_string()),
        };

        Self::CsvParse {
            message,
            line,
            column: None,
            context: ErrorContext::default(),
        }
    }
}

impl From<serde_json::Error> for CpscError {
    fn from(err: serde_json::Error) -> Self {
        CpscError::Export {
            message: err.to_string(),
            path: None,
            suggestion: Some("Check if the data is serializable to JSON.".to_string()),
        }
    }
}
