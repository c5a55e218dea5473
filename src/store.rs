use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use crate::odds_fetch::PropLine;
use crate::record::{GameDate, GameRecord, RawRow};

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS raw_rows (
            game_id TEXT NOT NULL,
            team TEXT NOT NULL,
            player TEXT NOT NULL,
            minutes_played TEXT NOT NULL,
            stats_json TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (game_id, team, player)
        );
        CREATE INDEX IF NOT EXISTS idx_raw_rows_game ON raw_rows(game_id);

        CREATE TABLE IF NOT EXISTS processed_rows (
            game_id TEXT NOT NULL,
            team TEXT NOT NULL,
            player TEXT NOT NULL,
            year INTEGER NOT NULL,
            month INTEGER NOT NULL,
            day INTEGER NOT NULL,
            seconds_played INTEGER NOT NULL,
            pts REAL NOT NULL,
            raw_stats_json TEXT NOT NULL,
            numeric_stats_json TEXT NOT NULL,
            composites_json TEXT NOT NULL,
            predicted_pts REAL NULL,
            exceeds_prediction INTEGER NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (game_id, team, player)
        );
        CREATE INDEX IF NOT EXISTS idx_processed_rows_player ON processed_rows(player);
        CREATE INDEX IF NOT EXISTS idx_processed_rows_date ON processed_rows(year, month, day);

        CREATE TABLE IF NOT EXISTS prop_lines (
            line_id TEXT NOT NULL,
            game_id TEXT NOT NULL,
            player TEXT NOT NULL,
            normalized_player TEXT NOT NULL,
            team TEXT NOT NULL,
            market TEXT NOT NULL,
            line REAL NOT NULL,
            sportsbook TEXT NOT NULL,
            game_date TEXT NOT NULL,
            start_time TEXT NOT NULL,
            fetched_at TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

/// Upserts scraped rows, keyed by (game id, team, player). Re-fetching a
/// period that is already stored replaces rather than duplicates.
pub fn upsert_raw_rows(conn: &mut Connection, rows: &[RawRow]) -> Result<usize> {
    let tx = conn.transaction().context("begin raw upsert transaction")?;
    let now = Utc::now().to_rfc3339();
    let mut upserted = 0usize;
    for row in rows {
        let stats_json =
            serde_json::to_string(&row.stats).context("serialize raw stat columns")?;
        tx.execute(
            r#"
            INSERT INTO raw_rows (game_id, team, player, minutes_played, stats_json, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(game_id, team, player) DO UPDATE SET
                minutes_played = excluded.minutes_played,
                stats_json = excluded.stats_json,
                updated_at = excluded.updated_at
            "#,
            params![
                row.game_id,
                row.team,
                row.player,
                row.minutes_played,
                stats_json,
                now
            ],
        )
        .context("upsert raw row")?;
        upserted += 1;
    }
    tx.commit().context("commit raw upsert transaction")?;
    Ok(upserted)
}

pub fn load_raw_rows(conn: &Connection) -> Result<Vec<RawRow>> {
    let mut stmt = conn
        .prepare(
            "SELECT game_id, team, player, minutes_played, stats_json
             FROM raw_rows
             ORDER BY game_id ASC, team ASC, player ASC",
        )
        .context("prepare load raw rows query")?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })
        .context("query raw rows")?;

    let mut out = Vec::new();
    for row in rows {
        let (game_id, team, player, minutes_played, stats_json) =
            row.context("decode raw row")?;
        let stats: BTreeMap<String, String> =
            serde_json::from_str(&stats_json).context("decode raw stat columns")?;
        out.push(RawRow {
            player,
            team,
            game_id,
            minutes_played,
            stats,
        });
    }
    Ok(out)
}

/// Game ids already present in the raw table; fetch skips these.
pub fn known_game_ids(conn: &Connection) -> Result<HashSet<String>> {
    let mut stmt = conn
        .prepare("SELECT DISTINCT game_id FROM raw_rows")
        .context("prepare known game ids query")?;
    let ids = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("query known game ids")?;
    let mut out = HashSet::new();
    for id in ids {
        out.insert(id.context("decode game id")?);
    }
    Ok(out)
}

/// Rewrites the processed table wholesale; derived fields are recomputed from
/// scratch each run, so stale rows must not survive.
pub fn replace_processed_rows(conn: &mut Connection, records: &[GameRecord]) -> Result<usize> {
    let tx = conn
        .transaction()
        .context("begin processed replace transaction")?;
    tx.execute("DELETE FROM processed_rows", [])
        .context("clear processed rows")?;
    let now = Utc::now().to_rfc3339();
    for record in records {
        tx.execute(
            r#"
            INSERT INTO processed_rows (
                game_id, team, player, year, month, day,
                seconds_played, pts, raw_stats_json, numeric_stats_json,
                composites_json, predicted_pts, exceeds_prediction, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                record.game_id,
                record.team,
                record.player,
                record.date.year,
                record.date.month as i64,
                record.date.day as i64,
                record.seconds_played as i64,
                record.pts,
                serde_json::to_string(&record.raw_stats).context("serialize raw stats")?,
                serde_json::to_string(&record.numeric_stats)
                    .context("serialize numeric stats")?,
                serde_json::to_string(&record.composites).context("serialize composites")?,
                record.predicted,
                record.exceeded.map(i64::from),
                now
            ],
        )
        .context("insert processed row")?;
    }
    tx.commit().context("commit processed replace transaction")?;
    Ok(records.len())
}

pub fn load_processed_rows(conn: &Connection) -> Result<Vec<GameRecord>> {
    let mut stmt = conn
        .prepare(
            r#"
            SELECT game_id, team, player, year, month, day,
                   seconds_played, pts, raw_stats_json, numeric_stats_json,
                   composites_json, predicted_pts, exceeds_prediction
            FROM processed_rows
            ORDER BY year ASC, month ASC, day ASC, game_id ASC, team ASC, player ASC
            "#,
        )
        .context("prepare load processed rows query")?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i32>(3)?,
                row.get::<_, u32>(4)?,
                row.get::<_, u32>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, f64>(7)?,
                row.get::<_, String>(8)?,
                row.get::<_, String>(9)?,
                row.get::<_, String>(10)?,
                row.get::<_, Option<f64>>(11)?,
                row.get::<_, Option<i64>>(12)?,
            ))
        })
        .context("query processed rows")?;

    let mut out = Vec::new();
    for row in rows {
        let (
            game_id,
            team,
            player,
            year,
            month,
            day,
            seconds_played,
            pts,
            raw_json,
            numeric_json,
            composites_json,
            predicted,
            exceeded,
        ) = row.context("decode processed row")?;
        out.push(GameRecord {
            player,
            team,
            date: GameDate::new(year, month, day)
                .with_context(|| format!("stored date for game {game_id}"))?,
            game_id,
            seconds_played: seconds_played as u32,
            pts,
            raw_stats: serde_json::from_str(&raw_json).context("decode raw stats")?,
            numeric_stats: serde_json::from_str(&numeric_json)
                .context("decode numeric stats")?,
            composites: serde_json::from_str(&composites_json)
                .context("decode composites")?,
            predicted,
            exceeded: exceeded.map(|v| v != 0),
        });
    }
    Ok(out)
}

/// Newest game date in the processed table, the refresh cursor's source.
pub fn max_processed_date(conn: &Connection) -> Result<Option<GameDate>> {
    let row = conn
        .query_row(
            "SELECT year, month, day FROM processed_rows
             ORDER BY year DESC, month DESC, day DESC LIMIT 1",
            [],
            |row| {
                Ok((
                    row.get::<_, i32>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, u32>(2)?,
                ))
            },
        )
        .optional()
        .context("query max processed date")?;
    match row {
        Some((year, month, day)) => Ok(Some(
            GameDate::new(year, month, day).context("stored max date")?,
        )),
        None => Ok(None),
    }
}

/// Replaces the stored odds snapshot with the latest fetch.
pub fn replace_prop_lines(conn: &mut Connection, lines: &[PropLine]) -> Result<usize> {
    let tx = conn
        .transaction()
        .context("begin prop lines transaction")?;
    tx.execute("DELETE FROM prop_lines", [])
        .context("clear prop lines")?;
    let now = Utc::now().to_rfc3339();
    for line in lines {
        tx.execute(
            r#"
            INSERT INTO prop_lines (
                line_id, game_id, player, normalized_player, team,
                market, line, sportsbook, game_date, start_time, fetched_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                line.line_id,
                line.game_id,
                line.player,
                line.normalized_player,
                line.team,
                line.market,
                line.line,
                line.sportsbook,
                line.game_date,
                line.start_time,
                now
            ],
        )
        .context("insert prop line")?;
    }
    tx.commit().context("commit prop lines transaction")?;
    Ok(lines.len())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn mem_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn raw(game_id: &str, player: &str, mp: &str) -> RawRow {
        let mut stats = BTreeMap::new();
        stats.insert("PTS".to_string(), "20".to_string());
        RawRow {
            player: player.to_string(),
            team: "BOS".to_string(),
            game_id: game_id.to_string(),
            minutes_played: mp.to_string(),
            stats,
        }
    }

    #[test]
    fn raw_rows_round_trip_and_dedup() {
        let mut conn = mem_db();
        let rows = vec![
            raw("202410220BOS", "Jayson Tatum", "36:02"),
            raw("202410220BOS", "Jaylen Brown", "33:40"),
        ];
        assert_eq!(upsert_raw_rows(&mut conn, &rows).unwrap(), 2);
        // Upserting again must not duplicate.
        upsert_raw_rows(&mut conn, &rows).unwrap();

        let loaded = load_raw_rows(&conn).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].player, "Jaylen Brown");
        assert_eq!(loaded[0].stats.get("PTS").unwrap(), "20");

        let known = known_game_ids(&conn).unwrap();
        assert!(known.contains("202410220BOS"));
        assert_eq!(known.len(), 1);
    }

    #[test]
    fn empty_processed_table_has_no_max_date() {
        let conn = mem_db();
        assert_eq!(max_processed_date(&conn).unwrap(), None);
    }

    #[test]
    fn processed_rows_round_trip_with_max_date() {
        let mut conn = mem_db();
        let mut record = GameRecord {
            player: "Jayson Tatum".to_string(),
            team: "BOS".to_string(),
            game_id: "202412250BOS".to_string(),
            date: GameDate::new(2024, 12, 25).unwrap(),
            seconds_played: 2052,
            pts: 32.0,
            raw_stats: Default::default(),
            numeric_stats: Default::default(),
            composites: Default::default(),
            predicted: Some(23.0),
            exceeded: Some(true),
        };
        record
            .composites
            .insert("pts+rebs".to_string(), 37.0);
        let earlier = GameRecord {
            game_id: "202411010BOS".to_string(),
            date: GameDate::new(2024, 11, 1).unwrap(),
            predicted: None,
            exceeded: None,
            ..record.clone()
        };

        replace_processed_rows(&mut conn, &[record.clone(), earlier]).unwrap();
        let loaded = load_processed_rows(&conn).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1], record);
        assert_eq!(loaded[0].predicted, None);

        let max = max_processed_date(&conn).unwrap().unwrap();
        assert_eq!((max.year, max.month, max.day), (2024, 12, 25));

        // Replacing rewrites wholesale.
        replace_processed_rows(&mut conn, &[]).unwrap();
        assert!(load_processed_rows(&conn).unwrap().is_empty());
    }
}
