//! CLI-specific progress handling for flight-fares
//!
//! Wraps any outcome sink and advances a progress bar on stderr for every
//! query resolved.

use indicatif::{ProgressBar, ProgressStyle};

use flight_fares::{OutcomeSink, QueryOutcome, Result};

/// Creates a progress bar counting resolved queries
pub fn create_progress_bar(total_queries: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_queries);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} queries ({percent}%) {per_sec} ETA: {eta}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Sink decorator that ticks a progress bar
pub struct ProgressSink<S> {
    inner: S,
    pub pb: ProgressBar,
}

impl<S: OutcomeSink> ProgressSink<S> {
    pub fn new(inner: S, total_queries: u64, message: &str) -> Self {
        let pb = create_progress_bar(total_queries);
        pb.set_message(message.to_string());
        Self { inner, pb }
    }
}

impl<S: OutcomeSink> OutcomeSink for ProgressSink<S> {
    fn emit(&self, outcome: QueryOutcome) -> Result<()> {
        self.inner.emit(outcome)?;
        self.pb.inc(1);
        Ok(())
    }

    fn finish(&self) -> Result<()> {
        self.pb.finish_with_message("done");
        self.inner.finish()
    }
}
