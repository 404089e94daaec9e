//! The scrobble loop: authenticate once, then submit every row in order.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::api::ScrobbleApi;
use crate::config::Config;
use crate::resolve::resolve;
use crate::types::{CsvRecord, RowOutcome, ScrobbleSummary};
use crate::Result;

/// Seconds between the synthetic play times of consecutive rows.
pub const TIMESTAMP_SPACING_SECS: i64 = 30;

/// Pause after each accepted scrobble to stay clear of Last.fm's rate limit.
pub const PAUSE_AFTER_SUCCESS: Duration = Duration::from_millis(200);

/// Play time for row `index` of `total`, counted back from `now`.
///
/// Row 0 gets `now - total * 30`, the last row `now - 30`, so every timestamp
/// is in the past and rows keep their file order.
pub fn backdated_timestamp(now: i64, total: usize, index: usize) -> i64 {
    let rows_after = total.saturating_sub(index) as i64;
    now - rows_after * TIMESTAMP_SPACING_SECS
}

/// Receives progress as the loop runs.
pub trait ProgressReporter {
    fn authenticated(&mut self, _username: &str) {}

    /// Called once per input row, after it has been resolved and submitted.
    fn row_finished(&mut self, outcome: &RowOutcome);

    fn finished(&mut self, summary: &ScrobbleSummary);
}

/// Prints progress to the terminal: successes on stdout, failures on stderr.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn authenticated(&mut self, username: &str) {
        println!("🔐 Authenticated as {username}");
    }

    fn row_finished(&mut self, outcome: &RowOutcome) {
        match outcome {
            RowOutcome::Scrobbled { pair, .. } => println!("✅ Scrobbled: {pair}"),
            RowOutcome::Skipped { pair, timestamp } => {
                let when = DateTime::<Utc>::from_timestamp(*timestamp, 0)
                    .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                    .unwrap_or_else(|| timestamp.to_string());
                println!("🔍 Would scrobble: {pair} at {when}");
            }
            RowOutcome::Unresolved { line, reason } => {
                eprintln!("❌ Line {line}: {reason}, skipping")
            }
            RowOutcome::Failed { line, pair, error } => {
                eprintln!("❌ Line {line}: failed to scrobble {pair}: {error}")
            }
        }
    }

    fn finished(&mut self, summary: &ScrobbleSummary) {
        println!();
        println!("📊 Done: {summary} ({} rows)", summary.total());
    }
}

/// Drives one run over a set of parsed CSV records.
pub struct Scrobbler<'a> {
    api: &'a dyn ScrobbleApi,
    config: &'a Config,
    reporter: &'a mut dyn ProgressReporter,
    pause: Duration,
}

impl<'a> Scrobbler<'a> {
    pub fn new(
        api: &'a dyn ScrobbleApi,
        config: &'a Config,
        reporter: &'a mut dyn ProgressReporter,
    ) -> Self {
        Self {
            api,
            config,
            reporter,
            pause: PAUSE_AFTER_SUCCESS,
        }
    }

    /// Override the pause taken after each accepted scrobble.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Authenticate, then resolve and submit every record in order.
    ///
    /// Authentication failure aborts before any row is touched. Per-row
    /// failures are reported and counted; the loop always reaches the end.
    /// In dry-run mode nothing is sent and resolvable rows count as successes.
    pub async fn run(&mut self, records: &[CsvRecord]) -> Result<ScrobbleSummary> {
        let session_key = if self.config.dry_run {
            log::info!("Dry run: skipping authentication");
            None
        } else {
            let key = self
                .api
                .get_mobile_session(&self.config.username, &self.config.password)
                .await?;
            self.reporter.authenticated(&self.config.username);
            Some(key)
        };

        let total = records.len();
        let mut summary = ScrobbleSummary::default();

        for (index, record) in records.iter().enumerate() {
            let line = index + 1;

            let outcome = match resolve(record) {
                Err(reason) => RowOutcome::Unresolved { line, reason },
                Ok(pair) => {
                    let timestamp = backdated_timestamp(Utc::now().timestamp(), total, index);
                    log::debug!("Row {line}: {pair} at {timestamp}");

                    match &session_key {
                        None => RowOutcome::Skipped { pair, timestamp },
                        Some(session_key) => {
                            let result = self.api.scrobble(session_key, &pair, timestamp).await;
                            match result {
                                Ok(_) => RowOutcome::Scrobbled { pair, timestamp },
                                Err(error) => RowOutcome::Failed { line, pair, error },
                            }
                        }
                    }
                }
            };

            summary.record(&outcome);
            self.reporter.row_finished(&outcome);

            // Only accepted scrobbles are followed by a pause
            if matches!(outcome, RowOutcome::Scrobbled { .. }) {
                tokio::time::sleep(self.pause).await;
            }
        }

        self.reporter.finished(&summary);
        Ok(summary)
    }
}
