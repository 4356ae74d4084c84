// Session configuration.
//
// Every field has a default so an absent or partial TOML file is valid:
//
// ```toml
// [loader]
// skip_rows = 2
// years = [2015, 2016, 2017, 2018, 2019, 2020, 2021]
//
// [report]
// images_per_page = 2
//
// [cover]
// url = "https://example.org/cover.png"
// ```
use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub loader: LoaderConfig,
    pub trend: TrendConfig,
    pub chart: ChartConfig,
    pub report: ReportConfig,
    pub cover: CoverConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Worksheet name; the first sheet when unset. Ignored for CSV input.
    pub sheet: Option<String>,
    /// Rows discarded before anything else is read.
    pub skip_rows: usize,
    /// Header position, counted after `skip_rows`.
    pub header_row: usize,
    /// Rows discarded from the end of the sheet.
    pub skip_footer: usize,
    /// Value-year columns to melt.
    pub years: Vec<i32>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            sheet: None,
            skip_rows: 0,
            header_row: 0,
            skip_footer: 0,
            years: (2015..=2021).collect(),
        }
    }
}

impl LoaderConfig {
    pub fn first_year(&self) -> Option<i32> {
        self.years.iter().copied().min()
    }

    pub fn last_year(&self) -> Option<i32> {
        self.years.iter().copied().max()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrendConfig {
    /// Number of projected years after the last value-year.
    pub horizon_years: u32,
}

impl Default for TrendConfig {
    fn default() -> Self {
        TrendConfig { horizon_years: 10 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        ChartConfig {
            width: 1200,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub file_name: String,
    pub images_per_page: usize,
    pub image_width_in: f64,
    pub image_height_in: f64,
    pub cover_width_in: f64,
    pub cover_height_in: f64,
    /// Pause after each status notification. Advisory only.
    pub status_pause_ms: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            file_name: "final_report.docx".to_string(),
            images_per_page: 2,
            image_width_in: 6.0,
            image_height_in: 3.6,
            cover_width_in: 6.0,
            cover_height_in: 8.0,
            status_pause_ms: 0,
        }
    }
}

impl ReportConfig {
    pub fn status_pause(&self) -> Duration {
        Duration::from_millis(self.status_pause_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoverConfig {
    pub path: Option<PathBuf>,
    pub url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for CoverConfig {
    fn default() -> Self {
        CoverConfig {
            path: None,
            url: None,
            timeout_secs: 10,
        }
    }
}

impl AppConfig {
    /// Read a TOML file, falling back to defaults for anything it omits.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.loader.years.is_empty() {
            return Err(ConfigError::Invalid("loader.years must not be empty".into()));
        }
        let distinct: HashSet<i32> = self.loader.years.iter().copied().collect();
        if distinct.len() != self.loader.years.len() {
            return Err(ConfigError::Invalid("loader.years contains duplicates".into()));
        }
        if self.trend.horizon_years == 0 {
            return Err(ConfigError::Invalid("trend.horizon_years must be positive".into()));
        }
        if self.report.images_per_page == 0 {
            return Err(ConfigError::Invalid("report.images_per_page must be positive".into()));
        }
        let sizes = [
            self.report.image_width_in,
            self.report.image_height_in,
            self.report.cover_width_in,
            self.report.cover_height_in,
        ];
        if sizes.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(ConfigError::Invalid("report picture sizes must be positive".into()));
        }
        if self.chart.width == 0 || self.chart.height == 0 {
            return Err(ConfigError::Invalid("chart dimensions must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_source_layout() {
        let config = AppConfig::default();
        assert_eq!(config.loader.years, (2015..=2021).collect::<Vec<_>>());
        assert_eq!(config.loader.header_row, 0);
        assert_eq!(config.report.images_per_page, 2);
        assert_eq!(config.report.file_name, "final_report.docx");
        assert_eq!(config.trend.horizon_years, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [loader]
            skip_rows = 2
            years = [2018, 2019]

            [cover]
            url = "https://example.org/cover.png"
            "#,
        )
        .unwrap();
        assert_eq!(config.loader.skip_rows, 2);
        assert_eq!(config.loader.years, vec![2018, 2019]);
        assert_eq!(config.report.images_per_page, 2);
        assert_eq!(config.cover.url.as_deref(), Some("https://example.org/cover.png"));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            AppConfig::from_toml_str("[loader]\nyears = []"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            AppConfig::from_toml_str("[report]\nimages_per_page = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            AppConfig::from_toml_str("[loader]\nyears = [2015, 2015]"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            AppConfig::from_toml_str("[nonsense]\nx = 1"),
            Err(ConfigError::Parse(_))
        ));
    }
}
