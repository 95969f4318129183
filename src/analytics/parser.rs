//! Market metadata parsing.
//!
//! Extracts `(side, line, parse_source)` and the canonical ladder key from a
//! market's ticker and title. Ticker suffixes are authoritative when they
//! resolve; titles are the fallback. Parsing never fails: a market that
//! resists both paths gets side `Unknown` and is excluded from ladder
//! analysis downstream.

use serde::{Deserialize, Serialize};

/// Side label used when neither ticker nor title resolves.
pub const SIDE_UNKNOWN: &str = "Unknown";

/// Coarse market family, as reported by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupType {
    Winner,
    Spread,
    Total,
    Other,
}

impl GroupType {
    /// Ladder-type label used inside ladder keys.
    pub fn ladder_type(&self) -> Option<&'static str> {
        match self {
            GroupType::Spread => Some("spread"),
            GroupType::Total => Some("total"),
            _ => None,
        }
    }
}

/// Which input yielded the parsed side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseSource {
    Ticker,
    Title,
    Unknown,
}

/// The predicate a ladder's probabilities answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    WinsByOver,
    TotalOver,
    TotalUnder,
}

impl Predicate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Predicate::WinsByOver => "wins_by_over",
            Predicate::TotalOver => "total_over",
            Predicate::TotalUnder => "total_under",
        }
    }
}

/// Parse result for one market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedMarket {
    /// Numeric strike; negative for underdog spreads.
    pub line: Option<f64>,
    /// Team name, `Over`, `Under`, or [`SIDE_UNKNOWN`].
    pub side: String,
    pub parse_source: ParseSource,
    /// `"{game_id}|{ladder_type}|{side}|{predicate}"`; only for
    /// spread/total markets with a resolved side.
    pub ladder_key: Option<String>,
    pub predicate: Option<Predicate>,
    /// Raw ticker suffix abbreviation, when one matched the team table.
    pub team_abbrev: Option<String>,
}

impl ParsedMarket {
    fn unknown() -> Self {
        Self {
            line: None,
            side: SIDE_UNKNOWN.to_string(),
            parse_source: ParseSource::Unknown,
            ladder_key: None,
            predicate: None,
            team_abbrev: None,
        }
    }
}

/// Fixed team-abbreviation table (NFL). Ordered; title scans walk it in
/// order so longer city names win over substrings.
const TEAM_ABBREVS: &[(&str, &str)] = &[
    ("ARI", "Arizona Cardinals"),
    ("ATL", "Atlanta Falcons"),
    ("BAL", "Baltimore Ravens"),
    ("BUF", "Buffalo Bills"),
    ("CAR", "Carolina Panthers"),
    ("CHI", "Chicago Bears"),
    ("CIN", "Cincinnati Bengals"),
    ("CLE", "Cleveland Browns"),
    ("DAL", "Dallas Cowboys"),
    ("DEN", "Denver Broncos"),
    ("DET", "Detroit Lions"),
    ("GB", "Green Bay Packers"),
    ("HOU", "Houston Texans"),
    ("IND", "Indianapolis Colts"),
    ("JAX", "Jacksonville Jaguars"),
    ("KC", "Kansas City Chiefs"),
    ("LAC", "Los Angeles Chargers"),
    ("LAR", "Los Angeles Rams"),
    ("LV", "Las Vegas Raiders"),
    ("MIA", "Miami Dolphins"),
    ("MIN", "Minnesota Vikings"),
    ("NE", "New England Patriots"),
    ("NO", "New Orleans Saints"),
    ("NYG", "New York Giants"),
    ("NYJ", "New York Jets"),
    ("PHI", "Philadelphia Eagles"),
    ("PIT", "Pittsburgh Steelers"),
    ("SEA", "Seattle Seahawks"),
    ("SF", "San Francisco 49ers"),
    ("TB", "Tampa Bay Buccaneers"),
    ("TEN", "Tennessee Titans"),
    ("WAS", "Washington Commanders"),
];

/// Full team name for a ticker-suffix abbreviation.
pub fn team_name(abbrev: &str) -> Option<&'static str> {
    TEAM_ABBREVS
        .iter()
        .find(|(a, _)| *a == abbrev)
        .map(|(_, name)| *name)
}

/// Split the ticker's final `-` segment into `(alpha_prefix, line)`.
///
/// The segment must be uppercase letters followed by an optional
/// non-negative decimal; anything else yields `(None, None)`.
pub fn parse_ticker_suffix(ticker: &str) -> (Option<String>, Option<f64>) {
    let segment = match ticker.rsplit('-').next() {
        Some(s) if !s.is_empty() => s,
        _ => return (None, None),
    };

    let prefix_len = segment
        .chars()
        .take_while(|c| c.is_ascii_uppercase())
        .count();
    if prefix_len == 0 {
        return (None, None);
    }

    let (prefix, rest) = segment.split_at(prefix_len);
    if rest.is_empty() {
        return (Some(prefix.to_string()), None);
    }
    match rest.parse::<f64>() {
        Ok(line) if rest.chars().all(|c| c.is_ascii_digit() || c == '.') => {
            (Some(prefix.to_string()), Some(line))
        }
        _ => (None, None),
    }
}

/// First float in `text`; with `signed`, a directly-attached leading `-`
/// is included.
fn first_float(text: &str, signed: bool) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let mut start = i;
            if signed && i > 0 && bytes[i - 1] == b'-' {
                start = i - 1;
            }
            let mut end = i;
            let mut seen_dot = false;
            while end < bytes.len() {
                let c = bytes[end];
                if c.is_ascii_digit() {
                    end += 1;
                } else if c == b'.' && !seen_dot {
                    seen_dot = true;
                    end += 1;
                } else {
                    break;
                }
            }
            // Trailing dot is punctuation, not a decimal point.
            let mut slice = &text[start..end];
            if slice.ends_with('.') {
                slice = &slice[..slice.len() - 1];
            }
            if let Ok(v) = slice.parse::<f64>() {
                return Some(v);
            }
            i = end;
        } else {
            i += 1;
        }
    }
    None
}

/// Spread-title pattern: `wins? by (over )?<float>`.
fn wins_by_line(title_lower: &str) -> Option<f64> {
    let mut search_from = 0;
    while let Some(pos) = title_lower[search_from..].find("win") {
        let after = &title_lower[search_from + pos + 3..];
        let tail = if let Some(t) = after.strip_prefix("s by ") {
            Some(t)
        } else {
            after.strip_prefix(" by ")
        };
        if let Some(tail) = tail {
            let tail = tail.strip_prefix("over ").unwrap_or(tail);
            if let Some(line) = first_float(tail, false) {
                // Only accept a float that starts the tail.
                if tail.trim_start().starts_with(|c: char| c.is_ascii_digit()) {
                    return Some(line);
                }
            }
        }
        search_from += pos + 3;
    }
    None
}

/// Ordered team-name scan of a title; falls back to Home/Away.
fn side_from_title(title: &str) -> Option<String> {
    let lower = title.to_lowercase();
    for (_, name) in TEAM_ABBREVS {
        if lower.contains(&name.to_lowercase()) {
            return Some((*name).to_string());
        }
    }
    if lower.contains("home") {
        return Some("Home".to_string());
    }
    if lower.contains("away") {
        return Some("Away".to_string());
    }
    None
}

fn over_under_from_prefix(prefix: &str) -> Option<&'static str> {
    match prefix {
        "O" | "OV" | "OVER" => Some("Over"),
        "U" | "UN" | "UNDER" => Some("Under"),
        _ => None,
    }
}

fn over_under_from_title(title_lower: &str) -> Option<&'static str> {
    // "over" wins when both appear; totals titles lead with the over leg.
    if title_lower.contains("over") {
        Some("Over")
    } else if title_lower.contains("under") {
        Some("Under")
    } else {
        None
    }
}

/// Parse one market's ticker and title into ladder metadata.
pub fn parse_market(
    ticker: &str,
    title: &str,
    group_type: GroupType,
    game_id: &str,
) -> ParsedMarket {
    let mut parsed = ParsedMarket::unknown();
    let (prefix, suffix_line) = parse_ticker_suffix(ticker);

    if let Some(prefix) = prefix {
        if let Some(name) = team_name(&prefix) {
            parsed.side = name.to_string();
            parsed.team_abbrev = Some(prefix);
            parsed.parse_source = ParseSource::Ticker;
            parsed.line = suffix_line;
        } else if let Some(ou) = over_under_from_prefix(&prefix) {
            parsed.side = ou.to_string();
            parsed.parse_source = ParseSource::Ticker;
            parsed.line = suffix_line;
        }
    }

    if parsed.parse_source == ParseSource::Unknown {
        let lower = title.to_lowercase();
        match group_type {
            GroupType::Total => {
                if parsed.line.is_none() {
                    parsed.line = first_float(title, false);
                }
                if let Some(ou) = over_under_from_title(&lower) {
                    parsed.side = ou.to_string();
                    parsed.parse_source = ParseSource::Title;
                }
            }
            GroupType::Spread => {
                if parsed.line.is_none() {
                    parsed.line = wins_by_line(&lower).or_else(|| first_float(title, true));
                }
                if let Some(side) = side_from_title(title) {
                    parsed.side = side;
                    parsed.parse_source = ParseSource::Title;
                }
            }
            GroupType::Winner | GroupType::Other => {
                if let Some(side) = side_from_title(title) {
                    parsed.side = side;
                    parsed.parse_source = ParseSource::Title;
                }
            }
        }
    }

    if parsed.side != SIDE_UNKNOWN {
        parsed.predicate = match group_type {
            GroupType::Spread => Some(Predicate::WinsByOver),
            GroupType::Total if parsed.side.eq_ignore_ascii_case("over") => {
                Some(Predicate::TotalOver)
            }
            GroupType::Total if parsed.side.eq_ignore_ascii_case("under") => {
                Some(Predicate::TotalUnder)
            }
            _ => None,
        };
        if let (Some(ladder_type), Some(predicate)) =
            (group_type.ladder_type(), parsed.predicate)
        {
            parsed.ladder_key = Some(format!(
                "{}|{}|{}|{}",
                game_id,
                ladder_type,
                parsed.side,
                predicate.as_str()
            ));
        }
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_team_and_line() {
        assert_eq!(
            parse_ticker_suffix("KXNFLSPREAD-26JAN04BALPIT-BAL3"),
            (Some("BAL".to_string()), Some(3.0))
        );
        assert_eq!(
            parse_ticker_suffix("KXNFLSPREAD-26JAN04BALPIT-PIT7"),
            (Some("PIT".to_string()), Some(7.0))
        );
    }

    #[test]
    fn test_suffix_over_under() {
        let parsed = parse_market(
            "KXNFLTOTAL-26JAN04BALPIT-O45",
            "",
            GroupType::Total,
            "g1",
        );
        assert_eq!(parsed.side, "Over");
        assert_eq!(parsed.line, Some(45.0));
        assert_eq!(parsed.parse_source, ParseSource::Ticker);

        let parsed = parse_market(
            "KXNFLTOTAL-26JAN04BALPIT-U42",
            "",
            GroupType::Total,
            "g1",
        );
        assert_eq!(parsed.side, "Under");
        assert_eq!(parsed.line, Some(42.0));
    }

    #[test]
    fn test_suffix_empty_and_garbage() {
        assert_eq!(parse_ticker_suffix(""), (None, None));
        assert_eq!(parse_ticker_suffix("KX-123ABC"), (None, None));
        assert_eq!(parse_ticker_suffix("KX-BAL3.5"), (Some("BAL".to_string()), Some(3.5)));
    }

    #[test]
    fn test_half_point_line() {
        let parsed = parse_market(
            "KXNFLSPREAD-26JAN04BALPIT-BAL3.5",
            "",
            GroupType::Spread,
            "g1",
        );
        assert_eq!(parsed.line, Some(3.5));
        assert_eq!(parsed.side, "Baltimore Ravens");
        assert_eq!(parsed.team_abbrev.as_deref(), Some("BAL"));
    }

    #[test]
    fn test_title_fallback_total() {
        let parsed = parse_market(
            "KXNFLTOTAL-26JAN04BALPIT-X1",
            "Total points scored over 44.5",
            GroupType::Total,
            "g1",
        );
        assert_eq!(parsed.side, "Over");
        assert_eq!(parsed.line, Some(44.5));
        assert_eq!(parsed.parse_source, ParseSource::Title);
    }

    #[test]
    fn test_title_fallback_spread_wins_by() {
        let parsed = parse_market(
            "KXNFLSPREAD-26JAN04BALPIT-ZZZZ9",
            "Baltimore Ravens wins by over 6.5 points",
            GroupType::Spread,
            "g1",
        );
        assert_eq!(parsed.side, "Baltimore Ravens");
        assert_eq!(parsed.line, Some(6.5));
        assert_eq!(parsed.parse_source, ParseSource::Title);
    }

    #[test]
    fn test_title_fallback_signed_float() {
        let parsed = parse_market(
            "X",
            "Pittsburgh Steelers -3.5",
            GroupType::Spread,
            "g1",
        );
        assert_eq!(parsed.line, Some(-3.5));
        assert_eq!(parsed.side, "Pittsburgh Steelers");
    }

    #[test]
    fn test_unparseable_is_unknown_without_key() {
        let parsed = parse_market("???", "mystery market", GroupType::Spread, "g1");
        assert_eq!(parsed.side, SIDE_UNKNOWN);
        assert_eq!(parsed.parse_source, ParseSource::Unknown);
        assert!(parsed.ladder_key.is_none());
    }

    #[test]
    fn test_ladder_key_shape() {
        let parsed = parse_market(
            "KXNFLSPREAD-26JAN04BALPIT-BAL3",
            "",
            GroupType::Spread,
            "game42",
        );
        assert_eq!(
            parsed.ladder_key.as_deref(),
            Some("game42|spread|Baltimore Ravens|wins_by_over")
        );

        let parsed = parse_market(
            "KXNFLTOTAL-26JAN04BALPIT-U42",
            "",
            GroupType::Total,
            "game42",
        );
        assert_eq!(
            parsed.ladder_key.as_deref(),
            Some("game42|total|Under|total_under")
        );
    }

    #[test]
    fn test_winner_markets_build_no_key() {
        let parsed = parse_market(
            "KXNFLGAME-26JAN04BALPIT-BAL",
            "",
            GroupType::Winner,
            "g1",
        );
        assert_eq!(parsed.side, "Baltimore Ravens");
        assert!(parsed.ladder_key.is_none());
        assert!(parsed.predicate.is_none());
    }
}
