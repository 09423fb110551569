use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::UploadConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFileKind {
    Csv,
    Tsv,
    Fasta,
    Vcf,
    Txt,
}

impl DataFileKind {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "tsv" => Some(Self::Tsv),
            "fasta" | "fa" | "fas" => Some(Self::Fasta),
            "vcf" => Some(Self::Vcf),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("unsupported file type '{extension}', expected one of: {allowed}")]
    UnsupportedType { extension: String, allowed: String },

    #[error("file is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("file is empty")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An accepted upload, as registered before any analysis runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub location: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
    pub kind: DataFileKind,
}

/// Size and type constraints applied to incoming data files.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    max_file_size_bytes: u64,
    allowed_extensions: Vec<String>,
}

impl UploadPolicy {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            max_file_size_bytes: config.max_file_size_bytes,
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn validate(&self, file_name: &str, size_bytes: u64) -> Result<DataFileKind, UploadError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let kind = self
            .allowed_extensions
            .contains(&extension)
            .then(|| DataFileKind::from_extension(&extension))
            .flatten()
            .ok_or_else(|| UploadError::UnsupportedType {
                extension: extension.clone(),
                allowed: self.allowed_extensions.join(", "),
            })?;

        if size_bytes == 0 {
            return Err(UploadError::Empty);
        }
        if size_bytes > self.max_file_size_bytes {
            return Err(UploadError::TooLarge {
                size: size_bytes,
                limit: self.max_file_size_bytes,
            });
        }

        Ok(kind)
    }

    /// Validate a file already on disk and describe it.
    pub fn inspect(&self, path: &Path) -> Result<UploadedFile, UploadError> {
        let metadata = std::fs::metadata(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let kind = self.validate(&file_name, metadata.len())?;

        Ok(UploadedFile {
            location: path.to_path_buf(),
            file_name,
            size_bytes: metadata.len(),
            kind,
        })
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::new(&UploadConfig::default())
    }
}
