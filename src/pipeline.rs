use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::boxscore_fetch;
use crate::composite;
use crate::config::PipelineConfig;
use crate::http_client::http_client;
use crate::normalize;
use crate::odds_fetch;
use crate::predictor::{self, WeightVector};
use crate::record::GameRecord;
use crate::refresh;
use crate::store;
use crate::timeparse;

#[derive(Debug, Clone, Default)]
pub struct RefreshSummary {
    pub months: Vec<String>,
    pub games_fetched: usize,
    pub games_skipped: usize,
    pub rows_upserted: usize,
    pub prop_lines_stored: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessSummary {
    pub raw_rows: usize,
    pub processed_rows: usize,
    pub predicted_rows: usize,
}

/// Brings the raw dataset up to date: plans the remaining season months from
/// the newest processed date, scrapes every box score not already stored, and
/// snapshots the current prop lines.
pub fn refresh_dataset(conn: &mut Connection, cfg: &PipelineConfig) -> Result<RefreshSummary> {
    let client = http_client()?;
    let max_date = store::max_processed_date(conn)?;
    let plan = refresh::plan_refresh(max_date, cfg.default_season_year, &cfg.season_months);
    info!(year = plan.year, months = ?plan.months, "refresh plan");

    let mut known = store::known_game_ids(conn)?;
    let mut summary = RefreshSummary {
        months: plan.months.clone(),
        ..Default::default()
    };

    for month in &plan.months {
        let links = boxscore_fetch::fetch_box_score_links(client, plan.year, month)
            .with_context(|| format!("fetch schedule for {month} {}", plan.year))?;
        for link in links {
            let Some(game_id) = boxscore_fetch::game_id_from_url(&link) else {
                warn!(%link, "skipping link without a game id");
                continue;
            };
            // De-duplication is per game id, not per month: a re-fetched
            // month only costs the games it actually added.
            if known.contains(&game_id) {
                summary.games_skipped += 1;
                continue;
            }
            let rows = boxscore_fetch::fetch_player_rows(client, &link)
                .with_context(|| format!("fetch box score {game_id}"))?;
            summary.rows_upserted += store::upsert_raw_rows(conn, &rows)?;
            summary.games_fetched += 1;
            known.insert(game_id);
        }
    }

    if cfg.odds.enabled {
        // A missed odds snapshot does not invalidate the box-score refresh.
        match odds_fetch::fetch_upcoming_lines(client, &cfg.odds) {
            Ok(lines) => {
                summary.prop_lines_stored = store::replace_prop_lines(conn, &lines)?;
            }
            Err(err) => warn!(error = %err, "prop lines fetch failed"),
        }
    } else {
        info!("odds fetch disabled (no API_KEY)");
    }

    Ok(summary)
}

/// Recomputes the processed dataset from the full raw history: clean,
/// decompose, build composite columns, annotate predictions, persist.
pub fn process_dataset(conn: &mut Connection, cfg: &PipelineConfig) -> Result<ProcessSummary> {
    let weights = WeightVector::new(cfg.weights.clone()).context("prediction weights")?;

    let raw = store::load_raw_rows(conn)?;
    let raw_count = raw.len();
    let records = build_records(raw, cfg, &weights)?;

    let predicted = records.iter().filter(|r| r.predicted.is_some()).count();
    store::replace_processed_rows(conn, &records)?;
    info!(
        raw = raw_count,
        processed = records.len(),
        predicted,
        "processed dataset persisted"
    );

    Ok(ProcessSummary {
        raw_rows: raw_count,
        processed_rows: records.len(),
        predicted_rows: predicted,
    })
}

/// The in-memory transformation chain shared by `process_dataset` and tests:
/// normalize -> time decompose -> composite build -> predict.
pub fn build_records(
    raw: Vec<crate::record::RawRow>,
    cfg: &PipelineConfig,
    weights: &WeightVector,
) -> Result<Vec<GameRecord>> {
    let clean = normalize::clean_rows(raw)?;
    let mut records = timeparse::decompose(clean)?;
    composite::add_composite_columns(&mut records, &cfg.categories, &cfg.requested_categories);
    predictor::annotate_predictions(&mut records, &cfg.target_stat, weights)?;
    Ok(records)
}
