// Sustainable Development Goals dashboard and report generator.
//
// The `loader` turns the wide indicator sheet into a tidy table, the
// `dashboard` derives filtered views and charts from it, and the
// `composer` assembles the paginated `.docx` report.

pub mod charts;
pub mod composer;
pub mod config;
pub mod cover;
pub mod dashboard;
pub mod docx;
pub mod error;
pub mod goals;
pub mod loader;
pub mod output;
pub mod reports;
pub mod trend;
pub mod types;
pub mod util;
pub mod views;

pub use composer::{ReportArtifact, ReportComposer, StatusSink};
pub use config::AppConfig;
pub use dashboard::{render, AppContext, DashboardState, Event, Session, View, ViewOutput};
pub use error::{ConfigError, LoadError, RenderError, ResourceFetchError};
pub use loader::{load_dataset, Dataset, LoadReport};
