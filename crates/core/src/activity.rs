// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activity scoring for collected targets.
//!
//! A target's interaction history is sampled one page at a time, most recent
//! first. Each sample carries the number of interactions stamped within the
//! last hour, day, and week. The scan is bounded by `history_to_check` and
//! stops early when a sample shows the target is plainly active, or when the
//! feed stops advancing (the raw total repeats the one from three samples ago).
//!
//! An early stop discards everything before it: the resulting score only ever
//! reflects the sample that ended the scan.

use serde::{Deserialize, Serialize};

/// Interaction counts harvested from one page of a target's history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySample {
    pub hour: u32,
    pub day: u32,
    pub week: u32,
}

impl ActivitySample {
    pub fn new(hour: u32, day: u32, week: u32) -> Self {
        Self { hour, day, week }
    }

    /// Unweighted sum of all counts. Saturates on absurd counts.
    pub fn raw_total(&self) -> u32 {
        self.hour.saturating_add(self.day).saturating_add(self.week)
    }

    pub fn weighted(&self, weights: &ScoreWeights) -> u32 {
        self.hour
            .saturating_mul(weights.hours)
            .saturating_add(self.day.saturating_mul(weights.days))
            .saturating_add(self.week.saturating_mul(weights.weeks))
    }
}

/// Per-bucket weights applied when a sample contributes to the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub hours: u32,
    pub days: u32,
    pub weeks: u32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self { hours: 6, days: 5, weeks: 3 }
    }
}

/// Scoring parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    /// Upper bound on samples fetched per target
    pub history_to_check: usize,
    pub weights: ScoreWeights,
    pub threshold: u32,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self { history_to_check: 4, weights: ScoreWeights::default(), threshold: 8 }
    }
}

/// Why a scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStop {
    /// A non-final sample reached the threshold on its own
    Threshold,
    /// A raw total repeated the one from three samples earlier
    Stagnation,
    /// The final sample in the bounded sequence was scored
    FinalSample,
    /// The history ran out before the bound; its last sample was weighted
    HistoryExhausted,
}

/// Outcome of scoring one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityScore {
    pub score: u32,
    pub is_good_contact: bool,
    pub samples_checked: usize,
    pub stop: ScanStop,
}

/// Result of feeding one sample into an [`ActivityScan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStep {
    /// Fetch and push the next sample
    Continue,
    Done(ActivityScore),
}

/// Stateless scorer; hands out incremental scans.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityScorer {
    config: ScorerConfig,
}

impl ActivityScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Start an incremental scan, for callers that fetch samples lazily.
    pub fn scan(&self) -> ActivityScan {
        ActivityScan {
            config: self.config,
            processed: 0,
            score: 0,
            previous: 0,
            two_ago: 0,
            three_ago: 0,
            last: None,
        }
    }

    /// Score an already-collected sequence. Samples past the bound are ignored.
    pub fn score(&self, samples: &[ActivitySample]) -> ActivityScore {
        let mut scan = self.scan();
        for sample in samples {
            if let ScanStep::Done(score) = scan.push(*sample) {
                return score;
            }
        }
        scan.finish()
    }
}

/// In-progress scan over one target's history.
///
/// The sliding window holds raw totals and starts zeroed, so the third sample
/// is compared against the initial zero.
#[derive(Debug, Clone)]
pub struct ActivityScan {
    config: ScorerConfig,
    processed: usize,
    score: u32,
    previous: u32,
    two_ago: u32,
    three_ago: u32,
    last: Option<ActivitySample>,
}

impl ActivityScan {
    /// Number of samples consumed so far.
    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn push(&mut self, sample: ActivitySample) -> ScanStep {
        let bound = self.config.history_to_check.max(1);
        if self.processed >= bound {
            return ScanStep::Done(self.result(ScanStop::FinalSample));
        }

        let index = self.processed;
        self.processed += 1;

        if index == bound - 1 {
            self.score = self.score.saturating_add(sample.weighted(&self.config.weights));
            return ScanStep::Done(self.result(ScanStop::FinalSample));
        }

        let current = sample.raw_total();
        if current >= self.config.threshold {
            return ScanStep::Done(self.result(ScanStop::Threshold));
        }
        if index >= 2 && current == self.three_ago {
            self.score = self.score.saturating_add(sample.weighted(&self.config.weights));
            return ScanStep::Done(self.result(ScanStop::Stagnation));
        }

        self.three_ago = self.two_ago;
        self.two_ago = self.previous;
        self.previous = current;
        self.last = Some(sample);
        ScanStep::Continue
    }

    /// Close the scan when the history ran out before the bound. The last
    /// sample seen is the final one, so it is weighted.
    pub fn finish(mut self) -> ActivityScore {
        if let Some(last) = self.last.take() {
            self.score = self.score.saturating_add(last.weighted(&self.config.weights));
        }
        self.result(ScanStop::HistoryExhausted)
    }

    fn result(&self, stop: ScanStop) -> ActivityScore {
        ActivityScore {
            score: self.score,
            is_good_contact: self.score >= self.config.threshold,
            samples_checked: self.processed,
            stop,
        }
    }
}

#[cfg(test)]
#[path = "activity_tests.rs"]
mod tests;
