//! Ladder construction and structural checks.
//!
//! Groups enriched markets into monotone families by ladder key, gates
//! points on liquidity, spread, and staleness, deduplicates strikes,
//! fits the isotonic curve, and detects bound-aware monotonicity
//! violations and outlier lines. Detectors emit candidates; the signal
//! tracker decides what actually surfaces.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::analytics::enrich::EnrichedStats;
use crate::analytics::isotonic::{self, Direction};
use crate::analytics::parser::{GroupType, ParseSource};
use crate::analytics::signals::{Confidence, SignalCandidate, SignalType};
use crate::consts::{
    MAX_SPREAD_CENTS, MAX_STALE_MS, MIN_LIQUIDITY_DEPTH, MIN_LIQUIDITY_VOLUME, MONO_EPSILON,
    MONO_MIN_CENTS, OUTLIER_MIN_CENTS,
};
use crate::logging::targets;

/// Ladder family from the key's second segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LadderType {
    Spread,
    Total,
}

/// Why a point was held out of analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExcludeReason {
    LowLiquidity,
    WideSpread,
    Stale,
}

/// Ladder gating and detection thresholds.
#[derive(Debug, Clone)]
pub struct LadderConfig {
    pub min_depth: i64,
    pub min_volume: i64,
    pub max_spread_cents: i64,
    pub max_stale_ms: u64,
    pub outlier_min_cents: f64,
    pub mono_min_cents: f64,
    pub mono_epsilon: f64,
    /// Exclude markets whose side never parsed from ladder membership.
    pub require_parsed_side: bool,
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self {
            min_depth: MIN_LIQUIDITY_DEPTH,
            min_volume: MIN_LIQUIDITY_VOLUME,
            max_spread_cents: MAX_SPREAD_CENTS,
            max_stale_ms: MAX_STALE_MS,
            outlier_min_cents: OUTLIER_MIN_CENTS,
            mono_min_cents: MONO_MIN_CENTS,
            mono_epsilon: MONO_EPSILON,
            require_parsed_side: true,
        }
    }
}

/// One contract on a ladder.
#[derive(Debug, Clone, Serialize)]
pub struct LadderPoint {
    pub line: f64,
    pub side: String,
    pub ticker: String,
    pub bid_prob: f64,
    pub ask_prob: f64,
    pub mid_prob: f64,
    pub fitted_prob: Option<f64>,
    pub residual_cents: Option<f64>,
    /// Top-5 depth per side.
    pub depth_bid: i64,
    pub depth_ask: i64,
    pub volume: i64,
    pub spread_cents: i64,
    pub is_violation: bool,
    pub is_outlier: bool,
    pub is_primary: bool,
    pub is_excluded: bool,
    pub exclude_reason: Option<ExcludeReason>,
    pub parse_source: ParseSource,
    #[serde(skip)]
    max_age_ms: u64,
}

impl LadderPoint {
    fn min_depth(&self) -> i64 {
        self.depth_bid.min(self.depth_ask)
    }

    fn analyzed(&self) -> bool {
        self.is_primary && !self.is_excluded
    }
}

/// Per-ladder build accounting.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LadderDiagnostics {
    pub total_markets: usize,
    pub parsed: usize,
    /// Spread/total markets of this game that joined no ladder.
    pub unparsed: usize,
    pub duplicates_dropped: usize,
    pub excluded_low_liquidity: usize,
    pub excluded_wide_spread: usize,
    pub excluded_stale: usize,
}

/// A monotone family of contracts over one predicate.
#[derive(Debug, Clone, Serialize)]
pub struct Ladder {
    pub ladder_key: String,
    pub game_id: String,
    pub ladder_type: LadderType,
    pub side: String,
    pub expected_direction: Direction,
    /// Sorted by line ascending.
    pub points: Vec<LadderPoint>,
    /// Ids of persisted signals referencing this ladder.
    pub violations: Vec<String>,
    pub diagnostics: LadderDiagnostics,
    pub mono_violation_count: usize,
    pub outlier_count: usize,
    pub max_violation_cents: f64,
    pub last_updated: u64,
}

/// Output of one slow-tick ladder build.
#[derive(Debug, Default)]
pub struct LadderBuildOutput {
    pub ladders: Vec<Ladder>,
    pub candidates: Vec<SignalCandidate>,
}

/// Expected direction for one ladder family.
///
/// `P(wins by over X)` and `P(total over X)` fall as the line rises;
/// `P(total under X)` rises with it.
pub fn expected_direction(ladder_type: LadderType, side: &str) -> Direction {
    match ladder_type {
        LadderType::Spread => Direction::Nonincreasing,
        LadderType::Total if side.eq_ignore_ascii_case("under") => Direction::Nondecreasing,
        LadderType::Total => Direction::Nonincreasing,
    }
}

/// Build every ladder visible in the enriched map at `now_ms`.
pub fn build_ladders(
    enriched: &HashMap<String, EnrichedStats>,
    cfg: &LadderConfig,
    now_ms: u64,
) -> LadderBuildOutput {
    let mut buckets: HashMap<String, Vec<LadderPoint>> = HashMap::new();
    let mut unparsed = 0usize;

    for market in enriched.values() {
        if !matches!(market.group_type, GroupType::Spread | GroupType::Total) {
            continue;
        }
        let key = match &market.ladder_key {
            Some(k) if !k.is_empty() => k.clone(),
            _ => {
                unparsed += 1;
                continue;
            }
        };
        if cfg.require_parsed_side && market.parse_source == ParseSource::Unknown {
            unparsed += 1;
            continue;
        }
        let point = match point_from_market(market, cfg) {
            Some(p) => p,
            None => {
                // No quotable prices or no strike: nothing to place.
                unparsed += 1;
                continue;
            }
        };
        buckets.entry(key).or_default().push(point);
    }

    let mut output = LadderBuildOutput::default();
    for (key, points) in buckets {
        if points.len() < 2 {
            continue;
        }
        if let Some(ladder) = build_one(&key, points, unparsed, cfg, now_ms, &mut output.candidates)
        {
            output.ladders.push(ladder);
        }
    }
    output.ladders.sort_by(|a, b| a.ladder_key.cmp(&b.ladder_key));
    output
}

fn point_from_market(market: &EnrichedStats, cfg: &LadderConfig) -> Option<LadderPoint> {
    let line = market.line?;
    let bid = market.stats.best_bid?;
    let ask = market.stats.best_ask?;
    let mid = market.stats.mid?;
    let spread_cents = market.stats.spread_cents?;

    let max_age_ms = [
        market.stats.last_ticker_age_ms,
        market.stats.last_orderbook_age_ms,
    ]
    .into_iter()
    .flatten()
    .max()
    .unwrap_or(u64::MAX);

    let mut point = LadderPoint {
        line,
        side: market.side.clone(),
        ticker: market.stats.ticker.clone(),
        bid_prob: bid as f64 / 100.0,
        ask_prob: ask as f64 / 100.0,
        mid_prob: mid / 100.0,
        fitted_prob: None,
        residual_cents: None,
        depth_bid: market.stats.sum_bid_top5,
        depth_ask: market.stats.sum_ask_top5,
        volume: market.stats.volume,
        spread_cents,
        is_violation: false,
        is_outlier: false,
        is_primary: false,
        is_excluded: false,
        exclude_reason: None,
        parse_source: market.parse_source,
        max_age_ms,
    };

    point.exclude_reason = gate(&point, cfg);
    point.is_excluded = point.exclude_reason.is_some();
    Some(point)
}

/// First failing gate, if any.
fn gate(point: &LadderPoint, cfg: &LadderConfig) -> Option<ExcludeReason> {
    if point.min_depth() < cfg.min_depth && point.volume < cfg.min_volume {
        Some(ExcludeReason::LowLiquidity)
    } else if point.spread_cents > cfg.max_spread_cents {
        Some(ExcludeReason::WideSpread)
    } else if point.max_age_ms > cfg.max_stale_ms {
        Some(ExcludeReason::Stale)
    } else {
        None
    }
}

fn build_one(
    key: &str,
    mut points: Vec<LadderPoint>,
    game_unparsed: usize,
    cfg: &LadderConfig,
    now_ms: u64,
    candidates: &mut Vec<SignalCandidate>,
) -> Option<Ladder> {
    let mut segments = key.split('|');
    let game_id = segments.next()?.to_string();
    let ladder_type = match segments.next()? {
        "spread" => LadderType::Spread,
        "total" => LadderType::Total,
        _ => return None,
    };
    let side = segments.next()?.to_string();
    let direction = expected_direction(ladder_type, &side);

    points.sort_by(|a, b| {
        a.line
            .partial_cmp(&b.line)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut diagnostics = LadderDiagnostics {
        total_markets: points.len(),
        parsed: points
            .iter()
            .filter(|p| p.parse_source != ParseSource::Unknown)
            .count(),
        unparsed: game_unparsed,
        ..Default::default()
    };
    for point in &points {
        match point.exclude_reason {
            Some(ExcludeReason::LowLiquidity) => diagnostics.excluded_low_liquidity += 1,
            Some(ExcludeReason::WideSpread) => diagnostics.excluded_wide_spread += 1,
            Some(ExcludeReason::Stale) => diagnostics.excluded_stale += 1,
            None => {}
        }
    }

    // Dedup exact strikes among gate-clean points: deepest survives.
    let mut best_at_line: HashMap<u64, usize> = HashMap::new();
    for (idx, point) in points.iter().enumerate() {
        if point.is_excluded {
            continue;
        }
        let line_key = point.line.to_bits();
        match best_at_line.get(&line_key).copied() {
            None => {
                best_at_line.insert(line_key, idx);
            }
            Some(prev) => {
                diagnostics.duplicates_dropped += 1;
                if points[prev].min_depth() < point.min_depth() {
                    best_at_line.insert(line_key, idx);
                }
            }
        }
    }
    for &idx in best_at_line.values() {
        points[idx].is_primary = true;
    }

    let analysis_idx: Vec<usize> = (0..points.len()).filter(|&i| points[i].analyzed()).collect();

    let mut mono_violation_count = 0usize;
    let mut max_violation_cents = 0f64;

    // Bounds-aware adjacent monotonicity.
    for pair in analysis_idx.windows(2) {
        let (i, j) = (pair[0], pair[1]);
        let avg_spread =
            (points[i].spread_cents as f64 + points[j].spread_cents as f64) / 2.0;
        let eps = cfg.mono_epsilon.max(0.5 * avg_spread / 100.0);
        let (margin_cents, rich) = match direction {
            Direction::Nonincreasing => {
                ((points[j].bid_prob - points[i].ask_prob - eps) * 100.0, j)
            }
            Direction::Nondecreasing => {
                ((points[i].bid_prob - points[j].ask_prob - eps) * 100.0, i)
            }
        };
        if margin_cents >= cfg.mono_min_cents {
            points[i].is_violation = true;
            points[j].is_violation = true;
            mono_violation_count += 1;
            max_violation_cents = max_violation_cents.max(margin_cents);

            let cheap = if rich == i { j } else { i };
            let pair_depth = points[i].min_depth().min(points[j].min_depth());
            candidates.push(SignalCandidate {
                signal_type: SignalType::MonoViolation,
                market_ticker: points[rich].ticker.clone(),
                ladder_key: Some(key.to_string()),
                confidence: Confidence::from_depth(pair_depth),
                suggested_action: format!(
                    "sell {} / buy {}",
                    points[rich].ticker, points[cheap].ticker
                ),
                reason: format!(
                    "line {} bid {:.0}c over line {} ask {:.0}c",
                    points[rich].line,
                    points[rich].bid_prob * 100.0,
                    points[cheap].line,
                    points[cheap].ask_prob * 100.0
                ),
                magnitude: margin_cents,
                related_tickers: vec![points[i].ticker.clone(), points[j].ticker.clone()],
                severity_score: SignalCandidate::structural_severity(
                    margin_cents,
                    pair_depth,
                    avg_spread,
                ),
            });
        }
    }

    // Isotonic fit and outlier lines.
    let mut outlier_count = 0usize;
    if analysis_idx.len() >= 3 {
        let mids: Vec<f64> = analysis_idx.iter().map(|&i| points[i].mid_prob).collect();
        let fitted = isotonic::fit(&mids, direction);
        for (&idx, &fit) in analysis_idx.iter().zip(fitted.iter()) {
            let residual_cents = (points[idx].mid_prob - fit) * 100.0;
            points[idx].fitted_prob = Some(fit);
            points[idx].residual_cents = Some(residual_cents);
            if residual_cents.abs() >= cfg.outlier_min_cents {
                points[idx].is_outlier = true;
                outlier_count += 1;
                max_violation_cents = max_violation_cents.max(residual_cents.abs());
                candidates.push(SignalCandidate {
                    signal_type: SignalType::OutlierLine,
                    market_ticker: points[idx].ticker.clone(),
                    ladder_key: Some(key.to_string()),
                    confidence: Confidence::from_residual(residual_cents),
                    suggested_action: if residual_cents > 0.0 {
                        format!("sell {}", points[idx].ticker)
                    } else {
                        format!("buy {}", points[idx].ticker)
                    },
                    reason: format!(
                        "line {} mid {:.0}c off isotonic fit by {:.1}c",
                        points[idx].line,
                        points[idx].mid_prob * 100.0,
                        residual_cents
                    ),
                    magnitude: residual_cents.abs(),
                    related_tickers: vec![],
                    severity_score: SignalCandidate::structural_severity(
                        residual_cents.abs(),
                        points[idx].min_depth(),
                        points[idx].spread_cents as f64,
                    ),
                });
            }
        }
    }

    debug!(
        target: targets::ANALYTICS,
        key = %key,
        points = points.len(),
        analyzed = analysis_idx.len(),
        mono = mono_violation_count,
        outliers = outlier_count,
        "ladder built"
    );

    Some(Ladder {
        ladder_key: key.to_string(),
        game_id,
        ladder_type,
        side,
        expected_direction: direction,
        points,
        violations: Vec::new(),
        diagnostics,
        mono_violation_count,
        outlier_count,
        max_violation_cents,
        last_updated: now_ms,
    })
}
