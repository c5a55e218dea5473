use anyhow::{Context, Result, anyhow, bail};

use crate::normalize::is_dnp;
use crate::record::{CleanRow, GameDate, GameRecord};

/// Tagged result of parsing a time-played cell, instead of a mixed-type
/// string/number column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimePlayed {
    Seconds(u32),
    Unplayed,
}

impl TimePlayed {
    pub fn seconds(self) -> u32 {
        match self {
            TimePlayed::Seconds(n) => n,
            TimePlayed::Unplayed => 0,
        }
    }
}

/// Parses a time-played cell: a DNP sentinel, a bare numeral, or "M:SS".
pub fn parse_time_played(raw: &str) -> Result<TimePlayed> {
    let raw = raw.trim();
    if is_dnp(raw) {
        return Ok(TimePlayed::Unplayed);
    }
    if let Some((minutes, seconds)) = raw.split_once(':') {
        let minutes = minutes
            .parse::<u32>()
            .with_context(|| format!("bad minutes in time played {raw:?}"))?;
        let seconds = seconds
            .parse::<u32>()
            .with_context(|| format!("bad seconds in time played {raw:?}"))?;
        if seconds >= 60 {
            bail!("seconds component out of range in time played {raw:?}");
        }
        return Ok(TimePlayed::Seconds(minutes * 60 + seconds));
    }
    let seconds = raw
        .parse::<u32>()
        .with_context(|| format!("unrecognized time played {raw:?}"))?;
    Ok(TimePlayed::Seconds(seconds))
}

/// Extracts the calendar date from a game identifier whose first 8 characters
/// are a fixed-width YYYYMMDD string (e.g. "202412250BOS"). Anything else is
/// a fatal input error: chronological ordering downstream depends on it.
pub fn parse_game_date(game_id: &str) -> Result<GameDate> {
    let digits = game_id
        .get(..8)
        .ok_or_else(|| anyhow!("game id {game_id:?} too short to encode a date"))?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        bail!("game id {game_id:?} does not start with a numeric date");
    }
    let year = digits[..4].parse::<i32>()?;
    let month = digits[4..6].parse::<u32>()?;
    let day = digits[6..8].parse::<u32>()?;
    GameDate::new(year, month, day).with_context(|| format!("game id {game_id:?}"))
}

/// Converts cleaned rows into dated records with numeric played time.
pub fn decompose(rows: Vec<CleanRow>) -> Result<Vec<GameRecord>> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let date = parse_game_date(&row.game_id)?;
        let time = parse_time_played(&row.minutes_played).with_context(|| {
            format!("time played for {:?} in game {}", row.player, row.game_id)
        })?;
        out.push(GameRecord {
            player: row.player,
            team: row.team,
            game_id: row.game_id,
            date,
            seconds_played: time.seconds(),
            pts: row.pts,
            raw_stats: row.stats,
            numeric_stats: Default::default(),
            composites: Default::default(),
            predicted: None,
            exceeded: None,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minutes_seconds_becomes_total_seconds() {
        assert_eq!(parse_time_played("34:12").unwrap(), TimePlayed::Seconds(2052));
        assert_eq!(parse_time_played("0:45").unwrap(), TimePlayed::Seconds(45));
    }

    #[test]
    fn sentinel_becomes_unplayed() {
        assert_eq!(parse_time_played("DNP").unwrap(), TimePlayed::Unplayed);
        assert_eq!(
            parse_time_played("Did Not Play").unwrap(),
            TimePlayed::Unplayed
        );
        assert_eq!(TimePlayed::Unplayed.seconds(), 0);
    }

    #[test]
    fn raw_numeral_passes_through_as_seconds() {
        assert_eq!(parse_time_played("2052").unwrap(), TimePlayed::Seconds(2052));
    }

    #[test]
    fn garbage_time_is_an_error() {
        assert!(parse_time_played("34:xx").is_err());
        assert!(parse_time_played("12:75").is_err());
        assert!(parse_time_played("n/a").is_err());
    }

    #[test]
    fn game_id_date_extraction() {
        let date = parse_game_date("202412250BOS").unwrap();
        assert_eq!((date.year, date.month, date.day), (2024, 12, 25));
    }

    #[test]
    fn malformed_game_ids_are_fatal() {
        assert!(parse_game_date("2024").is_err());
        assert!(parse_game_date("2024BOSxxxx").is_err());
        assert!(parse_game_date("202413990BOS").is_err());
    }
}
