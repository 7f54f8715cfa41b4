//! Test-mode statistics
//!
//! Repeated test requests for the same point count ("tier") are accumulated
//! into duration and error buffers; when the tier changes, or the flush
//! sentinel arrives, the previous tier is finalized: its first sample is
//! dropped as a warm-up outlier, the rest are averaged, and one line is
//! appended to the persistent log.
//!
//! The run that triggers a tier switch contributes no sample itself; it
//! only opens the new tier, and collection starts with the next matching
//! request. Non-test traffic never reaches this module.
//!
//! # Log format
//!
//! One tab-delimited line per finalized tier, stable field order:
//!
//! ```text
//! <point count>\t<worker count>\t<average duration> ms\t<average error>
//! ```

use crate::Result;
use anyhow::Context;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

/// Cap on buffered samples per tier; appends past the cap are dropped
pub const MAX_TIER_SAMPLES: usize = 128;

/// Tiered duration/error accumulator with an append-only log
pub struct StatsCollector {
    /// Log file receiving one line per finalized tier
    log_path: PathBuf,

    /// Currently accumulating point-count tier (None: idle)
    tier: Option<i64>,

    /// Durations of same-tier runs, in arrival order
    durations: Vec<Duration>,

    /// Absolute errors vs. pi of same-tier runs, in arrival order
    errors: Vec<f64>,

    /// Pool size captured with the most recent recorded sample
    workers: usize,
}

impl StatsCollector {
    /// Create an idle collector logging to `log_path`
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            tier: None,
            durations: Vec::new(),
            errors: Vec::new(),
            workers: 0,
        }
    }

    /// Currently accumulating tier, if any
    pub fn current_tier(&self) -> Option<i64> {
        self.tier
    }

    /// Number of samples buffered for the current tier
    pub fn sample_count(&self) -> usize {
        self.durations.len()
    }

    /// Record one completed test run of `total_points` points
    ///
    /// A same-tier run appends its sample; a different tier first finalizes
    /// the previous one and then opens the new tier without recording the
    /// triggering run.
    pub fn record(
        &mut self,
        total_points: i64,
        workers: usize,
        duration: Duration,
        error: f64,
    ) -> Result<()> {
        if self.tier == Some(total_points) {
            if self.durations.len() < MAX_TIER_SAMPLES {
                self.durations.push(duration);
                self.errors.push(error);
            }
            self.workers = workers;
        } else {
            self.finalize()?;
            self.tier = Some(total_points);
        }

        Ok(())
    }

    /// Finalize the current tier and return to the idle state
    ///
    /// This is the `-1` sentinel path: whatever is buffered is averaged and
    /// persisted exactly as on a tier switch, and no estimate is produced.
    pub fn flush(&mut self) -> Result<()> {
        self.finalize()?;
        self.tier = None;
        Ok(())
    }

    /// Average the buffered samples (minus the warm-up) and append a log line
    ///
    /// The first sample of each buffer is discarded as a warm-up outlier.
    /// A tier left with no samples after the drop produces no line; buffers
    /// are cleared either way.
    fn finalize(&mut self) -> Result<()> {
        let durations = std::mem::take(&mut self.durations);
        let errors = std::mem::take(&mut self.errors);

        let tier = match self.tier {
            Some(tier) => tier,
            None => return Ok(()),
        };

        if durations.len() < 2 {
            return Ok(());
        }

        let kept_durations = &durations[1..];
        let kept_errors = &errors[1..];

        let avg_ms = kept_durations
            .iter()
            .map(|d| d.as_secs_f64() * 1_000.0)
            .sum::<f64>()
            / kept_durations.len() as f64;
        let avg_error = kept_errors.iter().sum::<f64>() / kept_errors.len() as f64;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("Failed to open stats log: {}", self.log_path.display()))?;

        writeln!(file, "{}\t{}\t{:.3} ms\t{:.6}", tier, self.workers, avg_ms, avg_error)
            .context("Failed to append stats log line")?;

        println!(
            "Stats tier {} finalized: {} workers, {:.3} ms avg, {:.6} avg error",
            tier, self.workers, avg_ms, avg_error
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_tier_switch_drops_warmup_and_averages_rest() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("stats.log");
        let mut stats = StatsCollector::new(&log);

        // First 100-point run only opens the tier; runs two and three buffer.
        stats.record(100, 2, ms(10), 0.5).unwrap();
        stats.record(100, 2, ms(20), 0.4).unwrap();
        stats.record(100, 2, ms(30), 0.25).unwrap();
        assert_eq!(stats.sample_count(), 2);

        // Switching to 1000 finalizes tier 100: the warm-up sample (20ms)
        // is dropped and only the 30ms run is averaged.
        stats.record(1000, 2, ms(99), 0.9).unwrap();

        let contents = fs::read_to_string(&log).unwrap();
        assert_eq!(contents, "100\t2\t30.000 ms\t0.250000\n");

        // The triggering 1000-point run contributed no sample of its own.
        assert_eq!(stats.current_tier(), Some(1000));
        assert_eq!(stats.sample_count(), 0);
    }

    #[test]
    fn test_flush_finalizes_and_resets() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("stats.log");
        let mut stats = StatsCollector::new(&log);

        stats.record(500, 3, ms(5), 0.1).unwrap();
        stats.record(500, 3, ms(12), 0.2).unwrap();
        stats.record(500, 3, ms(16), 0.3).unwrap();

        stats.flush().unwrap();

        let contents = fs::read_to_string(&log).unwrap();
        assert_eq!(contents, "500\t3\t16.000 ms\t0.300000\n");
        assert_eq!(stats.current_tier(), None);

        // The next request of the same count is a fresh tier again: it only
        // opens the tier, so no sample is buffered.
        stats.record(500, 3, ms(7), 0.15).unwrap();
        assert_eq!(stats.sample_count(), 0);
    }

    #[test]
    fn test_single_sample_tier_writes_nothing() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("stats.log");
        let mut stats = StatsCollector::new(&log);

        // Two runs: the first opens the tier, the second is the only sample.
        // After the warm-up drop nothing is left to average.
        stats.record(100, 1, ms(10), 0.5).unwrap();
        stats.record(100, 1, ms(20), 0.4).unwrap();
        stats.flush().unwrap();

        assert!(!log.exists());
    }

    #[test]
    fn test_flush_while_idle_is_a_noop() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("stats.log");
        let mut stats = StatsCollector::new(&log);

        stats.flush().unwrap();
        assert!(!log.exists());
    }

    #[test]
    fn test_sample_buffers_are_bounded() {
        let dir = tempdir().unwrap();
        let mut stats = StatsCollector::new(dir.path().join("stats.log"));

        stats.record(100, 1, ms(1), 0.1).unwrap();
        for _ in 0..(MAX_TIER_SAMPLES + 40) {
            stats.record(100, 1, ms(1), 0.1).unwrap();
        }

        assert_eq!(stats.sample_count(), MAX_TIER_SAMPLES);
    }

    #[test]
    fn test_lines_append_across_tiers() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("stats.log");
        let mut stats = StatsCollector::new(&log);

        for (points, duration) in [(100, 10), (100, 20), (100, 30)] {
            stats.record(points, 1, ms(duration), 0.1).unwrap();
        }
        for (points, duration) in [(1000, 40), (1000, 50), (1000, 60)] {
            stats.record(points, 2, ms(duration), 0.2).unwrap();
        }
        stats.flush().unwrap();

        let contents = fs::read_to_string(&log).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("100\t1\t"));
        assert!(lines[1].starts_with("1000\t2\t"));
    }
}
