//! Decay Pipeline Module
//!
//! Approximates a sliding-window access count without per-access timers.
//! Increments enter the finest tier, get coalesced per key and cascade
//! toward coarser tiers; the terminal tier settles records once they age out
//! of the base window (or overflow its capacity) and hands them back to the
//! engine as permanent decrements.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tracing::warn;

use crate::config::DECAY_GROWTH_RATE;

// == Decay Record ==
/// One buffered frequency change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecayRecord {
    pub timestamp: Instant,
    pub key: String,
    pub delta: i64,
}

impl DecayRecord {
    pub fn new(timestamp: Instant, key: impl Into<String>, delta: i64) -> Self {
        Self {
            timestamp,
            key: key.into(),
            delta,
        }
    }
}

// == Tier Role ==
/// Where a tier sends its buffer once it fills up or ages out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierRole {
    /// Consolidate and hand the batch to the tier at `next`
    Forwarding { next: usize },
    /// Settle aged-out records back into the engine
    Terminal,
}

// == Tier ==
/// A single counting buffer with its own capacity and time window.
#[derive(Debug)]
pub struct Tier {
    capacity_limit: usize,
    window: Duration,
    /// Newest record at the front
    buffer: VecDeque<DecayRecord>,
    window_start: Instant,
    role: TierRole,
}

impl Tier {
    fn new(capacity_limit: usize, window: Duration, role: TierRole, now: Instant) -> Self {
        Self {
            capacity_limit,
            window,
            buffer: VecDeque::new(),
            window_start: now,
            role,
        }
    }

    pub fn capacity_limit(&self) -> usize {
        self.capacity_limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn role(&self) -> TierRole {
        self.role
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    fn push(&mut self, record: DecayRecord, now: Instant) {
        self.buffer.push_front(record);
        if self.buffer.len() == 1 {
            self.window_start = now;
        }
    }

    fn aged_out(&self, since: Instant, now: Instant) -> bool {
        aged_out(since, now, self.window)
    }

    /// Buffer overflowed, the window elapsed, or the incoming record (possibly
    /// forwarded late from a finer tier) is already a full window old.
    fn should_flush(&self, record_timestamp: Instant, now: Instant) -> bool {
        self.buffer.len() > self.capacity_limit
            || self.aged_out(self.window_start, now)
            || self.aged_out(record_timestamp, now)
    }

    /// Empties the buffer into one record per key, in first-seen order.
    fn drain_consolidated(&mut self) -> Vec<DecayRecord> {
        consolidate(self.buffer.drain(..))
    }
}

/// A record exactly one window old has aged out.
fn aged_out(since: Instant, now: Instant, window: Duration) -> bool {
    now.saturating_duration_since(since) >= window
}

/// Sums deltas per key, keeping the first record seen for each key.
fn consolidate(records: impl IntoIterator<Item = DecayRecord>) -> Vec<DecayRecord> {
    let mut merged: Vec<DecayRecord> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for record in records {
        match positions.get(&record.key) {
            Some(&at) => merged[at].delta += record.delta,
            None => {
                positions.insert(record.key.clone(), merged.len());
                merged.push(record);
            }
        }
    }
    merged
}

// == Decay Pipeline ==
/// Chain of tiers ordered finest (index 0) to coarsest (terminal).
#[derive(Debug)]
pub struct DecayPipeline {
    tiers: Vec<Tier>,
    saturation_warnings: u64,
}

impl DecayPipeline {
    // == Constructor ==
    /// Builds `tier_count` tiers for an engine holding `capacity_limit` entries.
    ///
    /// The terminal tier holds `capacity_limit * rate` records over the full
    /// `base_duration`; every finer tier multiplies the capacity by `rate`
    /// again and divides the window by the growth so far. A `tier_count` of
    /// zero is treated as one.
    pub fn new(
        capacity_limit: usize,
        base_duration: Duration,
        tier_count: usize,
        now: Instant,
    ) -> Self {
        let tier_count = tier_count.max(1);
        let rate = DECAY_GROWTH_RATE;

        let mut tiers = Vec::with_capacity(tier_count);
        for index in 0..tier_count {
            // distance from the terminal tier
            let depth = u32::try_from(tier_count - 1 - index).unwrap_or(u32::MAX);
            let capacity = (rate as usize)
                .saturating_pow(depth.saturating_add(1))
                .saturating_mul(capacity_limit);
            let window = base_duration / rate.saturating_pow(depth);
            let role = if index + 1 < tier_count {
                TierRole::Forwarding { next: index + 1 }
            } else {
                TierRole::Terminal
            };
            tiers.push(Tier::new(capacity, window, role, now));
        }

        Self {
            tiers,
            saturation_warnings: 0,
        }
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Number of times the terminal tier overflowed before anything expired.
    pub fn saturation_warnings(&self) -> u64 {
        self.saturation_warnings
    }

    /// Total records buffered across all tiers.
    pub fn buffered(&self) -> usize {
        self.tiers.iter().map(Tier::len).sum()
    }

    // == Record Increment ==
    /// Feeds one access into the finest tier, then runs a settle pass on the
    /// terminal tier.
    ///
    /// Returns the consolidated decrements the engine must apply.
    pub fn record_increment(&mut self, key: &str, delta: i64, now: Instant) -> Vec<DecayRecord> {
        let mut settled = Vec::new();
        self.append(0, DecayRecord::new(now, key, delta), now, &mut settled);
        let terminal = self.tiers.len() - 1;
        self.settle(terminal, now, &mut settled);
        settled
    }

    /// Appends to a tier and dispatches on its role when it needs flushing.
    fn append(
        &mut self,
        index: usize,
        record: DecayRecord,
        now: Instant,
        settled: &mut Vec<DecayRecord>,
    ) {
        let tier = &mut self.tiers[index];
        let timestamp = record.timestamp;
        tier.push(record, now);
        if !tier.should_flush(timestamp, now) {
            return;
        }

        let role = tier.role;
        match role {
            TierRole::Forwarding { next } => {
                for forwarded in tier.drain_consolidated() {
                    self.append(next, forwarded, now, settled);
                }
            }
            TierRole::Terminal => self.settle(index, now, settled),
        }
    }

    // == Settle ==
    /// Removes every record that aged out of the window, plus the oldest
    /// records beyond capacity, and collects them consolidated per key.
    ///
    /// All qualifying records are handled in one pass.
    fn settle(&mut self, index: usize, now: Instant, settled: &mut Vec<DecayRecord>) {
        let tier = &mut self.tiers[index];
        let window = tier.window;
        let overflow = tier.buffer.len().saturating_sub(tier.capacity_limit);

        if overflow > 0 {
            let oldest_fresh = tier
                .buffer
                .back()
                .is_some_and(|oldest| !aged_out(oldest.timestamp, now, window));
            if oldest_fresh {
                self.saturation_warnings += 1;
                warn!(
                    buffered = tier.buffer.len(),
                    capacity = tier.capacity_limit,
                    "Decay capacity reached before records expired; raise capacity_limit or lower base_duration"
                );
            }
        }

        // Walk oldest-first so the overflow cut hits the oldest records
        let mut kept = VecDeque::with_capacity(tier.buffer.len());
        let mut expired = Vec::new();
        for (age_rank, record) in tier.buffer.drain(..).rev().enumerate() {
            if age_rank < overflow || aged_out(record.timestamp, now, window) {
                expired.push(record);
            } else {
                kept.push_front(record);
            }
        }
        tier.buffer = kept;

        settled.extend(consolidate(expired));
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn millis(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[test]
    fn test_tier_layout() {
        let now = Instant::now();
        let pipeline = DecayPipeline::new(10, secs(2), 3, now);
        let tiers = pipeline.tiers();

        assert_eq!(tiers.len(), 3);
        assert_eq!(tiers[0].capacity_limit(), 10_000);
        assert_eq!(tiers[0].window(), millis(20));
        assert_eq!(tiers[0].role(), TierRole::Forwarding { next: 1 });
        assert_eq!(tiers[1].capacity_limit(), 1_000);
        assert_eq!(tiers[1].window(), millis(200));
        assert_eq!(tiers[2].capacity_limit(), 100);
        assert_eq!(tiers[2].window(), secs(2));
        assert_eq!(tiers[2].role(), TierRole::Terminal);
    }

    #[test]
    fn test_single_tier_is_terminal() {
        let pipeline = DecayPipeline::new(5, secs(1), 0, Instant::now());
        assert_eq!(pipeline.tiers().len(), 1);
        assert_eq!(pipeline.tiers()[0].role(), TierRole::Terminal);
        assert_eq!(pipeline.tiers()[0].window(), secs(1));
    }

    #[test]
    fn test_consolidate_keeps_first_seen_order() {
        let now = Instant::now();
        let merged = consolidate(vec![
            DecayRecord::new(now, "b", 1),
            DecayRecord::new(now, "a", 2),
            DecayRecord::new(now, "b", 3),
        ]);

        assert_eq!(
            merged,
            vec![DecayRecord::new(now, "b", 4), DecayRecord::new(now, "a", 2)]
        );
    }

    #[test]
    fn test_records_stay_buffered_within_window() {
        let start = Instant::now();
        let mut pipeline = DecayPipeline::new(10, secs(2), 3, start);

        assert!(pipeline.record_increment("a", 1, start).is_empty());
        assert!(pipeline.record_increment("a", 1, start).is_empty());
        assert_eq!(pipeline.tiers()[0].len(), 2);
        assert_eq!(pipeline.buffered(), 2);
    }

    #[test]
    fn test_records_cascade_and_settle() {
        let start = Instant::now();
        let mut pipeline = DecayPipeline::new(10, secs(2), 3, start);

        pipeline.record_increment("a", 1, start);
        pipeline.record_increment("a", 2, start);

        // Finest window elapsed: consolidated "a" moves down one tier
        let later = start + millis(30);
        assert!(pipeline.record_increment("b", 1, later).is_empty());
        assert_eq!(pipeline.tiers()[0].len(), 0);
        assert_eq!(pipeline.tiers()[1].len(), 2);

        // Middle window elapsed: both reach the terminal tier
        let later = start + millis(300);
        assert!(pipeline.record_increment("c", 1, later).is_empty());
        pipeline.record_increment("c", 1, later + millis(30));
        assert!(pipeline.tiers()[2].len() >= 2);

        // Base window elapsed for "a" and "b"
        let settled = pipeline.record_increment("d", 1, start + millis(2100));
        let a = settled.iter().find(|r| r.key == "a").map(|r| r.delta);
        let b = settled.iter().find(|r| r.key == "b").map(|r| r.delta);
        assert_eq!(a, Some(3));
        assert_eq!(b, Some(1));
        assert!(settled.iter().all(|r| r.key != "c" && r.key != "d"));
    }

    #[test]
    fn test_single_tier_settles_directly() {
        let start = Instant::now();
        let mut pipeline = DecayPipeline::new(10, secs(1), 1, start);

        pipeline.record_increment("a", 1, start);
        pipeline.record_increment("b", 1, start + millis(500));

        let settled = pipeline.record_increment("c", 1, start + millis(1001));
        assert_eq!(settled, vec![DecayRecord::new(start, "a", 1)]);
        assert_eq!(pipeline.tiers()[0].len(), 2);
    }

    #[test]
    fn test_record_settles_at_exact_window_boundary() {
        let start = Instant::now();
        let mut pipeline = DecayPipeline::new(10, secs(1), 1, start);

        pipeline.record_increment("a", 1, start);

        assert!(pipeline
            .record_increment("b", 1, start + millis(999))
            .is_empty());
        let settled = pipeline.record_increment("c", 1, start + secs(1));
        assert_eq!(settled, vec![DecayRecord::new(start, "a", 1)]);
    }

    #[test]
    fn test_overflow_settles_oldest_and_warns() {
        let start = Instant::now();
        // Terminal capacity is 1 * 10 = 10 records
        let mut pipeline = DecayPipeline::new(1, secs(100), 1, start);

        let mut settled = Vec::new();
        for i in 0..11 {
            settled.extend(pipeline.record_increment(&format!("k{i}"), 1, start));
        }

        assert_eq!(settled, vec![DecayRecord::new(start, "k0", 1)]);
        assert_eq!(pipeline.tiers()[0].len(), 10);
        assert!(pipeline.saturation_warnings() >= 1);
    }
}
