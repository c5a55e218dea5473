use std::collections::BTreeMap;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Canonical name of the primary scoring column.
pub const SCORING_COLUMN: &str = "PTS";

/// One scraped box-score row, exactly as it came off the page. The player
/// column is already renamed from the source's "Starters" header at the parse
/// boundary; everything else stays raw text until the cleaning pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub player: String,
    pub team: String,
    pub game_id: String,
    pub minutes_played: String,
    /// Remaining stat columns keyed by header name ("PTS", "TRB", ...).
    pub stats: BTreeMap<String, String>,
}

/// Calendar date decomposed from a game identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GameDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl GameDate {
    pub fn new(year: i32, month: u32, day: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| anyhow!("invalid calendar date {year:04}-{month:02}-{day:02}"))?;
        Ok(Self { year, month, day })
    }

    /// Sortable key for chronological ordering.
    pub fn sort_key(&self) -> NaiveDate {
        // new() validated the components, so this cannot fail.
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .unwrap_or(NaiveDate::MIN)
    }

    /// Lowercase english month label ("october", "november", ...).
    pub fn month_label(&self) -> String {
        self.sort_key().format("%B").to_string().to_lowercase()
    }
}

/// Row after the DNP filter and strict scoring parse, before date
/// decomposition.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRow {
    pub player: String,
    pub team: String,
    pub game_id: String,
    pub minutes_played: String,
    pub pts: f64,
    pub stats: BTreeMap<String, String>,
}

/// Fully decomposed per-player-per-game record. Created by the time
/// decomposer, then extended in place by the composite builder (numeric
/// coercions + category sums) and the predictor (prediction + label).
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub player: String,
    pub team: String,
    pub game_id: String,
    pub date: GameDate,
    pub seconds_played: u32,
    pub pts: f64,
    /// Secondary stat columns still in raw text form.
    pub raw_stats: BTreeMap<String, String>,
    /// Leniently coerced constituents of the market categories.
    pub numeric_stats: BTreeMap<String, f64>,
    /// Materialized market-category sums ("pts+rebs+asts", ...).
    pub composites: BTreeMap<String, f64>,
    pub predicted: Option<f64>,
    pub exceeded: Option<bool>,
}

impl GameRecord {
    /// Looks up a statistic by name: the scoring column, then composites,
    /// then coerced secondary stats.
    pub fn stat(&self, name: &str) -> Option<f64> {
        if name == SCORING_COLUMN {
            return Some(self.pts);
        }
        self.composites
            .get(name)
            .or_else(|| self.numeric_stats.get(name))
            .copied()
    }

    /// Target-statistic lookup for the predictor; absence at that stage is an
    /// upstream bug, so it fails loudly.
    pub fn target_stat(&self, name: &str) -> Result<f64> {
        self.stat(name).with_context(|| {
            format!(
                "missing target stat {name:?} for {} in game {}",
                self.player, self.game_id
            )
        })
    }
}
