//! Signal lifecycle.
//!
//! Candidates re-detected every slow tick flow through a persistence
//! window, then a cooldown between emissions of the same canonical key.
//! Pending entries that stop re-triggering are forgotten quickly; active
//! signals age out after a minute. Readers get a severity-ranked top-K.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::consts::{
    ACTIVE_SIGNAL_MAX_AGE_MS, COOLDOWN_MS, PENDING_EVICT_MS, PERSIST_MS, TOP_K_SIGNALS,
};
use crate::logging::targets;

/// Signal taxonomy on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SignalType {
    #[serde(rename = "MONO_VIOLATION")]
    MonoViolation,
    #[serde(rename = "NEG_MASS")]
    NegMass,
    #[serde(rename = "SUM_GT_1")]
    SumGt1,
    #[serde(rename = "OUTLIER_LINE")]
    OutlierLine,
    #[serde(rename = "STALE_QUOTE")]
    StaleQuote,
    #[serde(rename = "JUMP")]
    Jump,
    #[serde(rename = "LOW_LIQUIDITY")]
    LowLiquidity,
    #[serde(rename = "WIDE_SPREAD")]
    WideSpread,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::MonoViolation => "MONO_VIOLATION",
            SignalType::NegMass => "NEG_MASS",
            SignalType::SumGt1 => "SUM_GT_1",
            SignalType::OutlierLine => "OUTLIER_LINE",
            SignalType::StaleQuote => "STALE_QUOTE",
            SignalType::Jump => "JUMP",
            SignalType::LowLiquidity => "LOW_LIQUIDITY",
            SignalType::WideSpread => "WIDE_SPREAD",
        }
    }
}

/// Emission confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Monotonicity confidence from analyzed depth.
    pub fn from_depth(min_depth: i64) -> Self {
        if min_depth < 20 {
            Confidence::Low
        } else if min_depth < 100 {
            Confidence::Medium
        } else {
            Confidence::High
        }
    }

    /// Outlier confidence from residual magnitude in cents.
    pub fn from_residual(residual_cents: f64) -> Self {
        let r = residual_cents.abs();
        if r >= 8.0 {
            Confidence::High
        } else if r >= 6.0 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

/// A detector's output for one slow tick; not yet a signal.
#[derive(Debug, Clone, Serialize)]
pub struct SignalCandidate {
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub market_ticker: String,
    pub ladder_key: Option<String>,
    pub confidence: Confidence,
    pub suggested_action: String,
    pub reason: String,
    /// Cents of mispricing.
    pub magnitude: f64,
    pub related_tickers: Vec<String>,
    pub severity_score: f64,
}

impl SignalCandidate {
    /// Canonical key: one pending slot per `(type, market, ladder)`.
    pub fn canonical_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.signal_type.as_str(),
            self.market_ticker,
            self.ladder_key.as_deref().unwrap_or("")
        )
    }

    /// Severity for monotonicity and outlier candidates: magnitude scaled
    /// by depth, penalized by spread.
    pub fn structural_severity(magnitude_cents: f64, min_depth: i64, avg_spread_cents: f64) -> f64 {
        magnitude_cents * (1.0 + min_depth as f64 / 1_000.0).log10() - 0.5 * avg_spread_cents
    }

    /// Severity for cross-ladder arbitrage candidates.
    pub fn arb_severity(magnitude_cents: f64) -> f64 {
        magnitude_cents * 10.0
    }
}

/// An emitted signal.
#[derive(Debug, Clone, Serialize)]
pub struct Signal {
    pub id: String,
    pub ts: u64,
    #[serde(flatten)]
    pub candidate: SignalCandidate,
}

/// Persistence state for one canonical key.
#[derive(Debug, Clone)]
struct PendingSignal {
    candidate: SignalCandidate,
    first_seen_ts: u64,
    last_seen_ts: u64,
    emitted_ts: Option<u64>,
}

/// Tracks pending and active signals for one session.
#[derive(Debug, Default)]
pub struct SignalTracker {
    pending: HashMap<String, PendingSignal>,
    active: HashMap<String, Signal>,
}

impl SignalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe one candidate at `now_ms`. Returns the emitted signal when
    /// persistence and cooldown both clear.
    pub fn observe(&mut self, candidate: SignalCandidate, now_ms: u64) -> Option<Signal> {
        let key = candidate.canonical_key();
        let entry = self.pending.entry(key.clone()).or_insert(PendingSignal {
            candidate: candidate.clone(),
            first_seen_ts: now_ms,
            last_seen_ts: now_ms,
            emitted_ts: None,
        });

        // Newest detector fields win; timestamps persist across re-sights.
        entry.candidate = candidate;
        entry.last_seen_ts = now_ms;

        let persisted = now_ms.saturating_sub(entry.first_seen_ts) >= PERSIST_MS;
        let cooled = entry
            .emitted_ts
            .map(|t| now_ms.saturating_sub(t) >= COOLDOWN_MS)
            .unwrap_or(true);
        if !(persisted && cooled) {
            return None;
        }

        entry.emitted_ts = Some(now_ms);
        let signal = Signal {
            id: format!("{key}:{now_ms}"),
            ts: now_ms,
            candidate: entry.candidate.clone(),
        };
        debug!(
            target: targets::SIGNALS,
            key = %key,
            severity = signal.candidate.severity_score,
            "signal emitted"
        );
        self.active.insert(signal.id.clone(), signal.clone());
        Some(signal)
    }

    /// Drop stale pending entries and aged-out active signals.
    pub fn cleanup(&mut self, now_ms: u64) {
        self.pending
            .retain(|_, p| now_ms.saturating_sub(p.last_seen_ts) <= PENDING_EVICT_MS);
        self.active
            .retain(|_, s| now_ms.saturating_sub(s.ts) <= ACTIVE_SIGNAL_MAX_AGE_MS);
    }

    /// Top-K active signals by severity, descending.
    pub fn active_signals(&self) -> Vec<Signal> {
        let mut signals: Vec<Signal> = self.active.values().cloned().collect();
        signals.sort_by(|a, b| {
            b.candidate
                .severity_score
                .partial_cmp(&a.candidate.severity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        signals.truncate(TOP_K_SIGNALS);
        signals
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(severity: f64) -> SignalCandidate {
        SignalCandidate {
            signal_type: SignalType::MonoViolation,
            market_ticker: "T1".to_string(),
            ladder_key: Some("g|spread|A|wins_by_over".to_string()),
            confidence: Confidence::Medium,
            suggested_action: "review adjacent lines".to_string(),
            reason: "bid above neighbor ask".to_string(),
            magnitude: 4.0,
            related_tickers: vec![],
            severity_score: severity,
        }
    }

    #[test]
    fn test_persistence_window_blocks_early_emit() {
        let mut tracker = SignalTracker::new();
        assert!(tracker.observe(candidate(1.0), 0).is_none());
        assert!(tracker.observe(candidate(1.0), 1_000).is_none());
        assert!(tracker.observe(candidate(1.0), 2_999).is_none());
        // 3s persisted: emit exactly once.
        assert!(tracker.observe(candidate(1.0), 3_000).is_some());
        assert_eq!(tracker.active_len(), 1);
    }

    #[test]
    fn test_cooldown_blocks_reemit() {
        let mut tracker = SignalTracker::new();
        tracker.observe(candidate(1.0), 0);
        let first = tracker.observe(candidate(1.0), 3_000);
        assert!(first.is_some());

        // Still re-triggering: no re-emit inside the 30s cooldown.
        for t in (4_000..33_000).step_by(1_000) {
            assert!(tracker.observe(candidate(1.0), t).is_none());
        }
        // Cooldown expired.
        assert!(tracker.observe(candidate(1.0), 33_000).is_some());
    }

    #[test]
    fn test_pending_eviction_resets_persistence() {
        let mut tracker = SignalTracker::new();
        tracker.observe(candidate(1.0), 0);
        tracker.cleanup(2_500);
        assert_eq!(tracker.pending_len(), 0);

        // Fresh start after the gap.
        assert!(tracker.observe(candidate(1.0), 2_600).is_none());
        assert!(tracker.observe(candidate(1.0), 5_000).is_none());
        assert!(tracker.observe(candidate(1.0), 5_600).is_some());
    }

    #[test]
    fn test_active_eviction_after_max_age() {
        let mut tracker = SignalTracker::new();
        tracker.observe(candidate(1.0), 0);
        tracker.observe(candidate(1.0), 3_000);
        assert_eq!(tracker.active_len(), 1);

        tracker.cleanup(63_000);
        assert_eq!(tracker.active_len(), 1);
        tracker.cleanup(63_001);
        assert_eq!(tracker.active_len(), 0);
    }

    #[test]
    fn test_top_k_ranked_by_severity() {
        let mut tracker = SignalTracker::new();
        for i in 0..12 {
            let mut c = candidate(i as f64);
            c.market_ticker = format!("T{i}");
            tracker.observe(c.clone(), 0);
            tracker.observe(c, 3_000);
        }
        let top = tracker.active_signals();
        assert_eq!(top.len(), TOP_K_SIGNALS);
        assert_eq!(top[0].candidate.severity_score, 11.0);
        assert!(top
            .windows(2)
            .all(|w| w[0].candidate.severity_score >= w[1].candidate.severity_score));
    }

    #[test]
    fn test_structural_severity_formula() {
        // 4 cents, depth 9000, spread 2 cents:
        // 4 * log10(10) - 1 = 3.
        let s = SignalCandidate::structural_severity(4.0, 9_000, 2.0);
        assert!((s - 3.0).abs() < 1e-9);
        assert_eq!(SignalCandidate::arb_severity(3.0), 30.0);
    }

    #[test]
    fn test_confidence_heuristics() {
        assert_eq!(Confidence::from_depth(10), Confidence::Low);
        assert_eq!(Confidence::from_depth(50), Confidence::Medium);
        assert_eq!(Confidence::from_depth(500), Confidence::High);
        assert_eq!(Confidence::from_residual(5.5), Confidence::Low);
        assert_eq!(Confidence::from_residual(-6.5), Confidence::Medium);
        assert_eq!(Confidence::from_residual(9.0), Confidence::High);
    }
}
