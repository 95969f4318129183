//! Cross-ladder arbitrage scan.
//!
//! Opposing ladders of the same type price complementary outcomes, so the
//! bids of mirrored lines cannot jointly exceed probability mass one.
//! Totals mirror on the same line (Over 45 vs Under 45); spreads mirror
//! on the negated line (team A by 3 vs team B by -3). A bid sum past the
//! buffer is an overpricing candidate on both legs.

use tracing::debug;

use crate::analytics::ladder::{Ladder, LadderType};
use crate::analytics::signals::{Confidence, SignalCandidate, SignalType};
use crate::consts::ARB_BUFFER;
use crate::logging::targets;

/// Mirror-line match tolerance.
const LINE_TOLERANCE: f64 = 0.01;

/// Scan every opposing ladder pair for bid-sum overpricing.
pub fn scan(ladders: &[Ladder]) -> Vec<SignalCandidate> {
    let mut candidates = Vec::new();
    for (i, first) in ladders.iter().enumerate() {
        for second in &ladders[i + 1..] {
            if first.ladder_type != second.ladder_type {
                continue;
            }
            if !opposing(first, second) {
                continue;
            }
            scan_pair(first, second, &mut candidates);
        }
    }
    candidates
}

/// Whether two same-type ladders price complementary outcomes.
fn opposing(a: &Ladder, b: &Ladder) -> bool {
    match a.ladder_type {
        LadderType::Total => {
            let sides = (a.side.to_lowercase(), b.side.to_lowercase());
            (sides.0 == "over" && sides.1 == "under") || (sides.0 == "under" && sides.1 == "over")
        }
        LadderType::Spread => a.side != b.side,
    }
}

fn scan_pair(first: &Ladder, second: &Ladder, candidates: &mut Vec<SignalCandidate>) {
    for p1 in first.points.iter().filter(|p| p.is_primary) {
        let mirror = match first.ladder_type {
            LadderType::Total => p1.line,
            LadderType::Spread => -p1.line,
        };
        let p2 = match second
            .points
            .iter()
            .filter(|p| p.is_primary)
            .find(|p| (p.line - mirror).abs() <= LINE_TOLERANCE)
        {
            Some(p) => p,
            None => continue,
        };

        let sum_bids = p1.bid_prob + p2.bid_prob;
        if sum_bids <= 1.0 + ARB_BUFFER {
            continue;
        }

        let magnitude = (sum_bids - 1.0) * 100.0;
        debug!(
            target: targets::ANALYTICS,
            first = %p1.ticker,
            second = %p2.ticker,
            sum_bids,
            "bid-sum overpricing detected"
        );
        candidates.push(SignalCandidate {
            signal_type: SignalType::SumGt1,
            market_ticker: p1.ticker.clone(),
            ladder_key: Some(first.ladder_key.clone()),
            confidence: Confidence::High,
            suggested_action: format!("sell {} and {}", p1.ticker, p2.ticker),
            reason: format!(
                "sum of bids exceeds 1: {:.0}c + {:.0}c at mirrored line {}",
                p1.bid_prob * 100.0,
                p2.bid_prob * 100.0,
                p1.line
            ),
            magnitude,
            related_tickers: vec![p1.ticker.clone(), p2.ticker.clone()],
            severity_score: SignalCandidate::arb_severity(magnitude),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::enrich::EnrichedStats;
    use crate::analytics::ladder::{build_ladders, LadderConfig};
    use crate::analytics::parser::GroupType;
    use std::collections::HashMap;

    fn total_market(ticker: &str, bid: i64, ask: i64, now: u64) -> EnrichedStats {
        use crate::analytics::book::{MarketBook, TickerRecord};
        use crate::analytics::history::MarketHistory;
        use crate::analytics::parser::parse_market;
        use crate::analytics::stats::compute_stats;

        let mut book = MarketBook::new();
        book.apply_snapshot(now, &[(bid, 3_000)], &[(100 - ask, 3_000)]);
        book.apply_ticker(
            now,
            TickerRecord {
                volume: Some(10_000),
                ..Default::default()
            },
        );
        let stats = compute_stats(ticker, &book, &MarketHistory::new(), now);
        let meta = parse_market(ticker, "", GroupType::Total, "g1");
        crate::analytics::enrich::enrich(stats, &meta, GroupType::Total, &MarketHistory::new(), now)
    }

    fn ladders_for(markets: Vec<EnrichedStats>) -> Vec<Ladder> {
        let map: HashMap<String, EnrichedStats> = markets
            .into_iter()
            .map(|m| (m.stats.ticker.clone(), m))
            .collect();
        build_ladders(&map, &LadderConfig::default(), 1_000).ladders
    }

    #[test]
    fn test_total_overpricing_detected() {
        // Over@45 bid 58, Under@45 bid 45: sum 1.03 > 1.01.
        let ladders = ladders_for(vec![
            total_market("KXNFLTOTAL-X-O45", 58, 60, 1_000),
            total_market("KXNFLTOTAL-X-O47", 50, 52, 1_000),
            total_market("KXNFLTOTAL-X-U45", 45, 47, 1_000),
            total_market("KXNFLTOTAL-X-U47", 48, 50, 1_000),
        ]);
        assert_eq!(ladders.len(), 2);

        let candidates = scan(&ladders);
        let arbs: Vec<_> = candidates
            .iter()
            .filter(|c| c.signal_type == SignalType::SumGt1)
            .collect();
        assert_eq!(arbs.len(), 1);
        assert!((arbs[0].magnitude - 3.0).abs() < 1e-9);
        assert_eq!(arbs[0].confidence, Confidence::High);
        assert!((arbs[0].severity_score - 30.0).abs() < 1e-9);
        assert_eq!(arbs[0].related_tickers.len(), 2);
    }

    #[test]
    fn test_sum_within_buffer_ignored() {
        // Over@45 bid 55, Under@45 bid 45: sum exactly 1.00.
        let ladders = ladders_for(vec![
            total_market("KXNFLTOTAL-X-O45", 55, 57, 1_000),
            total_market("KXNFLTOTAL-X-O47", 50, 52, 1_000),
            total_market("KXNFLTOTAL-X-U45", 45, 47, 1_000),
            total_market("KXNFLTOTAL-X-U47", 48, 50, 1_000),
        ]);
        assert!(scan(&ladders).is_empty());
    }

    #[test]
    fn test_unmatched_lines_skipped() {
        let ladders = ladders_for(vec![
            total_market("KXNFLTOTAL-X-O45", 58, 60, 1_000),
            total_market("KXNFLTOTAL-X-O49", 52, 54, 1_000),
            total_market("KXNFLTOTAL-X-U46", 45, 47, 1_000),
            total_market("KXNFLTOTAL-X-U48", 50, 52, 1_000),
        ]);
        // No mirror lines exist between the two ladders.
        assert!(scan(&ladders).is_empty());
    }

    #[test]
    fn test_same_side_ladders_not_paired() {
        let ladders = ladders_for(vec![
            total_market("KXNFLTOTAL-X-O45", 58, 60, 1_000),
            total_market("KXNFLTOTAL-X-O47", 55, 57, 1_000),
        ]);
        assert_eq!(ladders.len(), 1);
        assert!(scan(&ladders).is_empty());
    }
}
