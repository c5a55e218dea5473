use std::collections::BTreeMap;
use std::path::PathBuf;

use propsline::config::{
    DEFAULT_SEASON_MONTHS, OddsConfig, PipelineConfig, default_category_map,
};
use propsline::pipeline::build_records;
use propsline::predictor::WeightVector;
use propsline::record::RawRow;
use propsline::refresh::plan_refresh;
use propsline::store;

fn test_config() -> PipelineConfig {
    let categories = default_category_map();
    PipelineConfig {
        db_path: PathBuf::from(":memory:"),
        season_months: DEFAULT_SEASON_MONTHS.iter().map(|m| m.to_string()).collect(),
        default_season_year: 2024,
        weights: vec![0.5, 0.3, 0.2],
        target_stat: "PTS".to_string(),
        requested_categories: categories.keys().cloned().collect(),
        categories,
        odds: OddsConfig {
            enabled: false,
            api_key: None,
            sportsbook: "PrizePicks".to_string(),
            league: "NBA".to_string(),
        },
    }
}

fn raw_row(player: &str, game_id: &str, mp: &str, pts: &str, trb: &str, ast: &str) -> RawRow {
    let mut stats = BTreeMap::new();
    stats.insert("PTS".to_string(), pts.to_string());
    stats.insert("TRB".to_string(), trb.to_string());
    stats.insert("AST".to_string(), ast.to_string());
    RawRow {
        player: player.to_string(),
        team: "BOS".to_string(),
        game_id: game_id.to_string(),
        minutes_played: mp.to_string(),
        stats,
    }
}

fn tatum_season() -> Vec<RawRow> {
    vec![
        raw_row("Jayson Tatum", "202411010BOS", "34:12", "10", "5", "7"),
        raw_row("Jayson Tatum", "202411030BOS", "36:41", "20", "8", "4"),
        raw_row("Jayson Tatum", "202411050BOS", "31:09", "30", "7", "6"),
        raw_row("Jayson Tatum", "202411070BOS", "35:55", "25", "9", "5"),
    ]
}

#[test]
fn full_chain_cleans_decomposes_composites_and_predicts() {
    let cfg = test_config();
    let weights = WeightVector::new(cfg.weights.clone()).unwrap();

    let mut raw = tatum_season();
    raw.push(raw_row("Team Totals", "202411010BOS", "240", "118", "42", "25"));
    raw.push(raw_row("Reserves", "202411010BOS", "", "", "", ""));
    raw.push(raw_row("Sam Hauser", "202411010BOS", "Did Not Play", "", "", ""));
    raw.push(raw_row("Kristaps Porziņģis", "202411010BOS", "28:30", "20", "5", "7"));

    let records = build_records(raw, &cfg, &weights).unwrap();

    // Summary and DNP rows are gone entirely.
    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|r| r.player != "Sam Hauser"));
    assert!(records.iter().all(|r| r.player != "Team Totals"));

    // Accent-stripped name, decomposed date, seconds.
    let kp = records
        .iter()
        .find(|r| r.player == "Kristaps Porzingis")
        .expect("accent-stripped row");
    assert_eq!((kp.date.year, kp.date.month, kp.date.day), (2024, 11, 1));
    assert_eq!(kp.seconds_played, 28 * 60 + 30);

    // Composite: 20 pts + 5 reb + 7 ast.
    assert_eq!(kp.composites.get("pts+rebs+asts"), Some(&32.0));
    assert_eq!(kp.composites.get("rebs+asts"), Some(&12.0));

    // Prediction gating and the right-aligned weighted mean:
    // priors 10, 20, 30 with weights [0.5, 0.3, 0.2] -> 23.0.
    let mut tatum: Vec<_> = records
        .iter()
        .filter(|r| r.player == "Jayson Tatum")
        .collect();
    tatum.sort_by(|a, b| a.game_id.cmp(&b.game_id));
    assert!(tatum[..3].iter().all(|r| r.predicted.is_none()));
    assert_eq!(tatum[3].predicted, Some(23.0));
    assert_eq!(tatum[3].exceeded, Some(true));
}

#[test]
fn processing_is_idempotent_and_round_trips_through_the_store() {
    let cfg = test_config();
    let weights = WeightVector::new(cfg.weights.clone()).unwrap();

    let mut conn = rusqlite::Connection::open_in_memory().unwrap();
    store::init_schema(&conn).unwrap();
    store::upsert_raw_rows(&mut conn, &tatum_season()).unwrap();

    let raw = store::load_raw_rows(&conn).unwrap();
    let records = build_records(raw, &cfg, &weights).unwrap();
    store::replace_processed_rows(&mut conn, &records).unwrap();

    // Reading the just-written dataset gives back the same rows.
    let loaded = store::load_processed_rows(&conn).unwrap();
    assert_eq!(loaded, records);

    // Re-running the whole pass from the same raw data changes nothing.
    let raw_again = store::load_raw_rows(&conn).unwrap();
    let records_again = build_records(raw_again, &cfg, &weights).unwrap();
    store::replace_processed_rows(&mut conn, &records_again).unwrap();
    assert_eq!(store::load_processed_rows(&conn).unwrap(), loaded);
}

#[test]
fn refresh_plan_resumes_from_newest_processed_game() {
    let cfg = test_config();
    let weights = WeightVector::new(cfg.weights.clone()).unwrap();

    let mut conn = rusqlite::Connection::open_in_memory().unwrap();
    store::init_schema(&conn).unwrap();

    // Absent dataset: full season from the default start year.
    let plan = plan_refresh(
        store::max_processed_date(&conn).unwrap(),
        cfg.default_season_year,
        &cfg.season_months,
    );
    assert_eq!(plan.year, 2024);
    assert_eq!(plan.months.len(), 7);
    assert_eq!(plan.months[0], "october");

    // With data through mid-december, only december..april remain.
    let raw = vec![raw_row("Jayson Tatum", "202412140BOS", "34:12", "28", "7", "6")];
    let records = build_records(raw, &cfg, &weights).unwrap();
    store::replace_processed_rows(&mut conn, &records).unwrap();

    let plan = plan_refresh(
        store::max_processed_date(&conn).unwrap(),
        cfg.default_season_year,
        &cfg.season_months,
    );
    assert_eq!(plan.year, 2024);
    assert_eq!(
        plan.months,
        vec!["december", "january", "february", "march", "april"]
    );
}
