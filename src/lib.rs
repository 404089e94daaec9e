pub mod api;
pub mod config;
pub mod error;
pub mod input;
pub mod resolve;
pub mod scrobbler;
pub mod signature;
pub mod types;

pub use api::{LastFmApiClientImpl, ScrobbleApi};
pub use config::{Cli, Config};
pub use error::ScrobbleError;
pub use input::{parse_records, read_source};
pub use resolve::resolve;
pub use scrobbler::{ConsoleReporter, ProgressReporter, Scrobbler};
pub use types::{CsvRecord, MissingField, RowOutcome, ScrobbleSummary, TrackPair};

#[cfg(feature = "mock")]
pub use api::MockScrobbleApi;

pub type Result<T> = std::result::Result<T, ScrobbleError>;
