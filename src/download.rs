/*!
 * Download functionality for CMS CPSC enrollment data
 *
 * Best-effort retrieval of the monthly ZIP: CMS has used several file naming
 * conventions over the years, so known patterns are tried first and the
 * enrollment data page is scraped for ZIP links as a fallback.
 */

#[cfg(feature = "download")]
use std::path::{Path, PathBuf};

#[cfg(feature = "progress")]
#[cfg(feature = "download")]
use indicatif::{ProgressBar, ProgressStyle};

use crate::{CpscError, Result};

/// CMS enrollment data page, scraped when direct downloads miss
#[cfg(feature = "download")]
const CMS_DATA_PAGE: &str = "https://www.cms.gov/data-research/statistics-trends-and-reports/medicare-advantagepart-d-contract-and-enrollment-data/monthly-enrollment-contract/plan/state/county";

/// Base URL CMS hosts the monthly ZIP files under
#[cfg(feature = "download")]
const CMS_DOWNLOAD_BASE: &str = "https://www.cms.gov/files/zip";

#[cfg(feature = "download")]
const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Download configuration
#[cfg(feature = "download")]
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Timeout for HTTP requests in seconds
    pub timeout_seconds: u64,
    /// Maximum file size to download in bytes
    pub max_file_size: Option<u64>,
    /// Whether to verify SSL certificates
    pub verify_ssl: bool,
    /// Custom user agent string
    pub user_agent: Option<String>,
    /// Directory to store downloaded files (None for temp directory)
    pub download_dir: Option<PathBuf>,
    /// Whether to keep the ZIP file after extraction
    pub keep_files: bool,
}

#[cfg(feature = "download")]
impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 120,
            max_file_size: Some(2 * 1024 * 1024 * 1024), // 2GB
            verify_ssl: true,
            user_agent: Some(format!("cpsc-rust/{}", env!("CARGO_PKG_VERSION"))),
            download_dir: None,
            keep_files: false,
        }
    }
}

/// The data month CMS most plausibly has published
///
/// CMS releases data around the 15th for the prior month: before the 15th
/// reach back two months, otherwise one.
#[cfg(feature = "download")]
pub fn current_data_month() -> (i32, u32) {
    use chrono::Datelike;
    let today = chrono::Utc::now();
    let offset: i32 = if today.day() < 15 { 2 } else { 1 };
    let mut month = today.month() as i32 - offset;
    let mut year = today.year();
    if month <= 0 {
        month += 12;
        year -= 1;
    }
    (year, month as u32)
}

/// File naming conventions CMS has used for the monthly ZIP, in the order
/// they are tried
#[cfg(feature = "download")]
pub fn candidate_filenames(year: i32, month: u32) -> Vec<String> {
    let month_name = MONTH_NAMES[(month as usize).saturating_sub(1).min(11)];
    vec![
        format!("monthly-enrollment-cpsc-{month_name}-{year}.zip"),
        format!("monthly-enrollment-by-cpsc-{month_name}-{year}.zip"),
        format!("CPSC_Enrollment_Info_{year}_{month:02}.zip"),
        format!("CPSC-Enrollment-Info-{year}-{month:02}.zip"),
        format!("cpsc-enrollment-{year}-{month:02}.zip"),
        format!("Monthly_Report_By_CPSC_{year}_{month:02}.zip"),
    ]
}

/// Download manager for CPSC enrollment data
#[cfg(feature = "download")]
pub struct CpscDownloader {
    config: DownloadConfig,
    client: Option<reqwest::Client>,
}

#[cfg(feature = "download")]
impl CpscDownloader {
    /// Create a new downloader with default configuration
    pub fn new() -> Self {
        Self {
            config: DownloadConfig::default(),
            client: None,
        }
    }

    /// Create a new downloader with custom configuration
    pub fn with_config(config: DownloadConfig) -> Self {
        Self {
            config,
            client: None,
        }
    }

    fn client(&mut self) -> Result<&reqwest::Client> {
        if self.client.is_none() {
            let mut builder = reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(self.config.timeout_seconds))
                .danger_accept_invalid_certs(!self.config.verify_ssl);

            if let Some(user_agent) = &self.config.user_agent {
                builder = builder.user_agent(user_agent.as_str());
            }

            self.client = Some(builder.build().map_err(|e| CpscError::Custom {
                message: format!("Failed to create HTTP client: {}", e),
                suggestion: Some("Check your network configuration".to_string()),
            })?);
        }

        Ok(self.client.as_ref().unwrap())
    }

    fn download_dir(&self) -> std::io::Result<PathBuf> {
        match &self.config.download_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                Ok(dir.clone())
            }
            None => Ok(std::env::temp_dir()),
        }
    }

    /// Download a file from a URL, returning the path it was saved to
    pub async fn download_file(&mut self, url: &str, filename: Option<&str>) -> Result<PathBuf> {
        let max_file_size = self.config.max_file_size;
        let download_dir = self.download_dir()?;

        let client = self.client()?;
        let response = client.get(url).send().await.map_err(|e| CpscError::Custom {
            message: format!("Failed to connect to URL: {}", e),
            suggestion: Some("Check the URL and your internet connection".to_string()),
        })?;

        if !response.status().is_success() {
            return Err(CpscError::Custom {
                message: format!("HTTP error {}: {}", response.status(), url),
                suggestion: Some("Check if the URL is correct and accessible".to_string()),
            });
        }

        let content_length = response.content_length();
        if let (Some(max_size), Some(size)) = (max_file_size, content_length) {
            if size > max_size {
                return Err(CpscError::Custom {
                    message: format!(
                        "File size {} bytes exceeds maximum allowed size {} bytes",
                        size, max_size
                    ),
                    suggestion: Some(
                        "Increase max_file_size in DownloadConfig or download manually".to_string(),
                    ),
                });
            }
        }

        let file_name = filename
            .unwrap_or_else(|| url.split('/').next_back().unwrap_or("cpsc_download.zip"));
        let file_path = download_dir.join(file_name);

        let mut file = tokio::fs::File::create(&file_path).await?;

        #[cfg(feature = "progress")]
        let progress_bar = if let Some(total_size) = content_length {
            let pb = ProgressBar::new(total_size);
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

        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        use futures_util::StreamExt;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| CpscError::Custom {
                message: format!("Error downloading chunk: {}", e),
                suggestion: Some("Try downloading again".to_string()),
            })?;

            tokio::io::AsyncWriteExt::write_all(&mut file, &chunk).await?;
            downloaded += chunk.len() as u64;

            #[cfg(feature = "progress")]
            if let Some(ref pb) = progress_bar {
                pb.set_position(downloaded);
            }
        }

        #[cfg(feature = "progress")]
        if let Some(pb) = progress_bar {
            pb.finish_and_clear();
        }

        println!("Downloaded {} bytes to {}", downloaded, file_path.display());

        Ok(file_path)
    }

    /// Extract a downloaded ZIP, categorizing the CSVs inside
    pub fn extract_zip(&self, zip_path: &Path, extract_to: Option<&Path>) -> Result<ExtractedFiles> {
        use std::fs::File;
        use std::io::BufReader;
        use zip::ZipArchive;

        let file = File::open(zip_path)?;
        let reader = BufReader::new(file);
        let mut archive = ZipArchive::new(reader).map_err(|e| CpscError::Custom {
            message: format!("Failed to open ZIP file: {}", e),
            suggestion: Some("Check if the file is a valid ZIP archive".to_string()),
        })?;

        let extract_dir = match extract_to {
            Some(dir) => dir.to_path_buf(),
            None => self.download_dir()?,
        };
        std::fs::create_dir_all(&extract_dir)?;

        let mut extracted = ExtractedFiles {
            directory: extract_dir.clone(),
            files: Vec::new(),
            enrollment_file: None,
            contract_info_file: None,
        };

        println!("Extracting ZIP file to: {}", extract_dir.display());

        let mut csv_sizes: Vec<(PathBuf, u64)> = Vec::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i).map_err(|e| CpscError::Custom {
                message: format!("Failed to read file from ZIP: {}", e),
                suggestion: None,
            })?;

            let Some(relative) = file.enclosed_name() else {
                continue;
            };
            let file_path = extract_dir.join(relative);

            if let Some(parent) = file_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let mut outfile = File::create(&file_path)?;
            std::io::copy(&mut file, &mut outfile)?;

            let name = file.name().to_lowercase();
            if name.ends_with(".csv") {
                csv_sizes.push((file_path.clone(), file.size()));
                if name.contains("enrollment") && !name.contains("contract_info") {
                    extracted.enrollment_file = Some(file_path.clone());
                } else if name.contains("contract") && name.contains("info") {
                    extracted.contract_info_file = Some(file_path.clone());
                }
            }

            extracted.files.push(file_path);
        }

        // No enrollment-named CSV: take the largest one
        if extracted.enrollment_file.is_none() {
            csv_sizes.sort_by(|a, b| b.1.cmp(&a.1));
            extracted.enrollment_file = csv_sizes.first().map(|(p, _)| p.clone());
        }

        println!("Extracted {} files", extracted.files.len());

        Ok(extracted)
    }

    /// Download and extract the CPSC data for a given month
    ///
    /// Tries the known direct-download filename patterns first, then falls
    /// back to scraping the CMS data page for ZIP links. Extracted CSVs are
    /// renamed to the canonical `cpsc_enrollment_YYYY_MM.csv` /
    /// `cpsc_contract_info_YYYY_MM.csv` names.
    pub async fn download_month(&mut self, year: i32, month: u32) -> Result<ExtractedFiles> {
        let mut urls: Vec<String> = candidate_filenames(year, month)
            .into_iter()
            .map(|f| format!("{}/{}", CMS_DOWNLOAD_BASE, f))
            .collect();

        let mut last_error = None;
        for (i, url) in urls.iter().enumerate() {
            println!("Trying: {}", url);
            match self.fetch_and_extract(url, year, month).await {
                Ok(extracted) => return Ok(extracted),
                Err(e) => {
                    last_error = Some(e);
                    // Only scrape the page once the direct patterns are spent
                    if i + 1 == urls.len() {
                        println!("Direct downloads failed. Attempting to parse CMS page...");
                    }
                }
            }
        }

        urls = self.scrape_zip_links(year, month).await.unwrap_or_default();
        for url in &urls {
            println!("Found potential link: {}", url);
            match self.fetch_and_extract(url, year, month).await {
                Ok(extracted) => return Ok(extracted),
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| CpscError::Custom {
            message: format!(
                "Could not find CPSC data for {}-{:02}. The file may not be available yet or \
                the URL format has changed.",
                year, month
            ),
            suggestion: Some("Download the ZIP manually from the CMS data page".to_string()),
        }))
    }

    /// Download the most recently published month
    pub async fn download_latest(&mut self) -> Result<ExtractedFiles> {
        let (year, month) = current_data_month();
        println!("Auto-detected data month: {}-{:02}", year, month);
        self.download_month(year, month).await
    }

    async fn fetch_and_extract(
        &mut self,
        url: &str,
        year: i32,
        month: u32,
    ) -> Result<ExtractedFiles> {
        let zip_path = self.download_file(url, None).await?;
        let mut extracted = self.extract_zip(&zip_path, None)?;

        if !self.config.keep_files {
            let _ = std::fs::remove_file(&zip_path);
        }

        // Canonical names keep the data directory sortable by month
        if let Some(path) = extracted.enrollment_file.take() {
            let renamed = extracted
                .directory
                .join(format!("cpsc_enrollment_{}_{:02}.csv", year, month));
            std::fs::rename(&path, &renamed)?;
            extracted.enrollment_file = Some(renamed);
        }
        if let Some(path) = extracted.contract_info_file.take() {
            let renamed = extracted
                .directory
                .join(format!("cpsc_contract_info_{}_{:02}.csv", year, month));
            std::fs::rename(&path, &renamed)?;
            extracted.contract_info_file = Some(renamed);
        }

        if extracted.enrollment_file.is_none() {
            return Err(CpscError::Custom {
                message: "No CSV files found in the downloaded ZIP".to_string(),
                suggestion: None,
            });
        }

        Ok(extracted)
    }

    /// Scan the CMS data page for ZIP hrefs plausibly matching the month
    async fn scrape_zip_links(&mut self, year: i32, month: u32) -> Result<Vec<String>> {
        let client = self.client()?;
        let body = client
            .get(CMS_DATA_PAGE)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| CpscError::Custom {
                message: format!("Could not fetch CMS page: {}", e),
                suggestion: None,
            })?
            .text()
            .await
            .map_err(|e| CpscError::Custom {
                message: format!("Could not read CMS page: {}", e),
                suggestion: None,
            })?;

        let patterns = [
            format!(r#"href=["']([^"']*{year}[^"']*{month:02}[^"']*\.zip)["']"#),
            format!(r#"href=["']([^"']*cpsc[^"']*{year}[^"']*\.zip)["']"#),
        ];

        let mut urls = Vec::new();
        for pattern in &patterns {
            let re = regex::RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| CpscError::Custom {
                    message: format!("Invalid scrape pattern: {}", e),
                    suggestion: None,
                })?;
            for captures in re.captures_iter(&body) {
                let href = &captures[1];
                let url = if href.starts_with('/') {
                    format!("https://www.cms.gov{}", href)
                } else if !href.starts_with("http") {
                    format!("https://www.cms.gov/{}", href)
                } else {
                    href.to_string()
                };
                if !urls.contains(&url) {
                    urls.push(url);
                }
            }
        }

        Ok(urls)
    }
}

#[cfg(feature = "download")]
impl Default for CpscDownloader {
    fn default() -> Self {
        Self::new()
    }
}

/// Information about extracted files
#[cfg(feature = "download")]
#[derive(Debug, Clone)]
pub struct ExtractedFiles {
    /// Directory where files were extracted
    pub directory: PathBuf,
    /// All extracted files
    pub files: Vec<PathBuf>,
    /// Enrollment CSV (if found)
    pub enrollment_file: Option<PathBuf>,
    /// Contract info CSV (if found)
    pub contract_info_file: Option<PathBuf>,
}

#[cfg(feature = "download")]
impl ExtractedFiles {
    /// Check if the enrollment file was found
    pub fn has_enrollment_data(&self) -> bool {
        self.enrollment_file.is_some()
    }

    /// Get a summary of found files
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if self.enrollment_file.is_some() {
            parts.push("Enrollment");
        }
        if self.contract_info_file.is_some() {
            parts.push("Contract Info");
        }
        if parts.is_empty() {
            "No recognized CPSC files found".to_string()
        } else {
            format!("Found: {}", parts.join(", "))
        }
    }
}

// Re-export types when the feature is not enabled for better error messages
#[cfg(not(feature = "download"))]
pub struct DownloadConfig;

#[cfg(not(feature = "download"))]
pub struct CpscDownloader;

#[cfg(not(feature = "download"))]
pub struct ExtractedFiles;

#[cfg(not(feature = "download"))]
impl CpscDownloader {
    pub fn new() -> Self {
        Self
    }

    pub async fn download_latest(&mut self) -> Result<ExtractedFiles> {
        Err(CpscError::feature_required("download"))
    }
}

#[cfg(not(feature = "download"))]
impl Default for CpscDownloader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, feature = "download"))]
mod tests {
    use super::*;

    #[test]
    fn candidate_filenames_cover_known_conventions() {
        let names = candidate_filenames(2025, 6);
        assert!(names.contains(&"monthly-enrollment-cpsc-june-2025.zip".to_string()));
        assert!(names.contains(&"CPSC_Enrollment_Info_2025_06.zip".to_string()));
        assert_eq!(names.len(), 6);
    }

    #[test]
    fn data_month_is_in_the_past() {
        use chrono::Datelike;
        let (year, month) = current_data_month();
        let today = chrono::Utc::now();
        assert!((1..=12).contains(&month));
        assert!(year == today.year() || year == today.year() - 1);
    }
}
