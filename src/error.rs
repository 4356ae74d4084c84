// Error taxonomy shared by the loader, the renderers and the report composer.
//
// Missing values are never errors: they travel as `None` and every consumer
// skips them. Only structural problems end up in these enums.
use std::path::PathBuf;
use thiserror::Error;

/// The source file could not be turned into a tidy table. Fatal for the session.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Unsupported file extension: .{0} (expected csv, xlsx, xls or ods)")]
    UnsupportedFormat(String),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("No header row at offset {0}")]
    MissingHeader(usize),

    #[error("Required column missing: {0}")]
    MissingColumn(String),

    #[error("Year column missing: {0}")]
    MissingYearColumn(i32),

    #[error("Row {row}: indicator number {value:?} has no numeric goal prefix")]
    InvalidIndicatorNumber { row: usize, value: String },

    #[error("Row {row}: goal {goal} is outside 1..=17")]
    GoalOutOfRange { row: usize, goal: i64 },
}

/// Chart or document generation failed. Aborts the current build only.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Chart drawing failed: {0}")]
    Chart(String),

    #[error("Rasterisation failed: {0}")]
    Rasterize(String),

    #[error("Document packaging failed: {0}")]
    Package(#[from] zip::result::ZipError),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// The optional cover image could not be obtained. Always recoverable.
#[derive(Debug, Error)]
pub enum ResourceFetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image could not be decoded: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
