use anyhow::{Context, Result};
use deunicode::deunicode;
use tracing::debug;

use crate::record::{CleanRow, RawRow, SCORING_COLUMN};

/// Sentinel the non-participation phrases collapse to.
pub const DNP: &str = "DNP";

/// Time-played phrases that mean the player took no part in the game.
pub const DNP_PHRASES: &[&str] = &[
    "Did Not Dress",
    "Did Not Play",
    "Not With Team",
    "Player Suspended",
];

/// Placeholder rows that describe the table itself, not a player.
const SUMMARY_ROWS: &[&str] = &["Reserves", "Team Totals"];

/// Cleans raw box-score rows: drops summary and non-participation rows,
/// strictly parses the scoring column, and accent-strips player names so they
/// join consistently against the props source.
///
/// Idempotent: already-clean rows pass through unchanged, and rows this pass
/// removes can never reappear.
pub fn clean_rows(rows: Vec<RawRow>) -> Result<Vec<CleanRow>> {
    let total = rows.len();
    let mut out = Vec::with_capacity(total);
    for mut row in rows {
        if SUMMARY_ROWS.contains(&row.player.as_str()) {
            continue;
        }
        if is_dnp(&row.minutes_played) {
            continue;
        }
        let pts_raw = row.stats.remove(SCORING_COLUMN).unwrap_or_default();
        // A remaining row with unparseable points means the source data is
        // corrupt, not optional.
        let pts = pts_raw.trim().parse::<f64>().with_context(|| {
            format!(
                "non-numeric {SCORING_COLUMN} value {pts_raw:?} for {:?} in game {}",
                row.player, row.game_id
            )
        })?;
        out.push(CleanRow {
            player: deunicode(row.player.trim()),
            team: row.team,
            game_id: row.game_id,
            minutes_played: row.minutes_played,
            pts,
            stats: row.stats,
        });
    }
    debug!(kept = out.len(), dropped = total - out.len(), "cleaned box-score rows");
    Ok(out)
}

pub fn is_dnp(minutes_played: &str) -> bool {
    let mp = minutes_played.trim();
    mp == DNP || DNP_PHRASES.contains(&mp)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn raw(player: &str, mp: &str, pts: &str) -> RawRow {
        let mut stats = BTreeMap::new();
        stats.insert("PTS".to_string(), pts.to_string());
        stats.insert("TRB".to_string(), "5".to_string());
        RawRow {
            player: player.to_string(),
            team: "BOS".to_string(),
            game_id: "202412250BOS".to_string(),
            minutes_played: mp.to_string(),
            stats,
        }
    }

    #[test]
    fn drops_dnp_rows_regardless_of_other_fields() {
        for phrase in DNP_PHRASES {
            let rows = clean_rows(vec![raw("Jaylen Brown", phrase, "30")]).unwrap();
            assert!(rows.is_empty(), "{phrase} should be dropped");
        }
        assert!(clean_rows(vec![raw("Jaylen Brown", "DNP", "30")])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn drops_summary_rows() {
        let rows = clean_rows(vec![
            raw("Reserves", "", ""),
            raw("Team Totals", "240", "118"),
            raw("Jayson Tatum", "36:02", "32"),
        ])
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].player, "Jayson Tatum");
    }

    #[test]
    fn strict_scoring_parse_fails_loudly() {
        let err = clean_rows(vec![raw("Jayson Tatum", "36:02", "abc")]).unwrap_err();
        assert!(err.to_string().contains("PTS"));
    }

    #[test]
    fn accents_are_stripped_from_names() {
        let rows = clean_rows(vec![raw("Luka Dončić", "38:11", "33")]).unwrap();
        assert_eq!(rows[0].player, "Luka Doncic");
    }

    #[test]
    fn scoring_column_leaves_secondary_stats_untouched() {
        let rows = clean_rows(vec![raw("Jayson Tatum", "36:02", "32")]).unwrap();
        assert_eq!(rows[0].pts, 32.0);
        assert!(!rows[0].stats.contains_key("PTS"));
        assert_eq!(rows[0].stats.get("TRB").unwrap(), "5");
    }
}
