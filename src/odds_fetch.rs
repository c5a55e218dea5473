use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::info;

use crate::config::OddsConfig;

const LINES_URL: &str = "https://api.dailyfantasyapi.io/v1/lines/upcoming";

/// One upcoming market line, flattened to a single player.
#[derive(Debug, Clone, PartialEq)]
pub struct PropLine {
    pub line_id: String,
    pub game_id: String,
    pub player: String,
    pub normalized_player: String,
    pub team: String,
    pub market: String,
    pub line: f64,
    pub sportsbook: String,
    pub game_date: String,
    pub start_time: String,
}

#[derive(Debug, Deserialize)]
struct LineItem {
    #[serde(default)]
    line_id: Option<String>,
    #[serde(default)]
    game_id: Option<String>,
    #[serde(default)]
    players: Vec<LinePlayer>,
    line: Option<f64>,
    #[serde(default)]
    market: Option<String>,
    #[serde(default)]
    sportsbook: Option<String>,
    #[serde(default)]
    game_date: Option<String>,
    #[serde(default)]
    start_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LinePlayer {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    normalized_name: Option<String>,
    #[serde(default)]
    team: Option<String>,
}

/// Fetches upcoming player-prop lines from the provider. Network or HTTP
/// failures propagate; the caller decides whether a missing snapshot is fatal.
pub fn fetch_upcoming_lines(client: &Client, cfg: &OddsConfig) -> Result<Vec<PropLine>> {
    let api_key = cfg
        .api_key
        .as_deref()
        .ok_or_else(|| anyhow!("odds fetch requested without API_KEY"))?;
    let resp = client
        .get(LINES_URL)
        .header("x-api-key", api_key)
        .query(&[
            ("sportsbook", cfg.sportsbook.as_str()),
            ("league", cfg.league.as_str()),
            ("is_available", "true"),
        ])
        .send()
        .context("props line request failed")?;
    let status = resp.status();
    let body = resp.text().context("failed reading props body")?;
    if !status.is_success() {
        return Err(anyhow!("props provider http {status}: {body}"));
    }
    let lines = parse_lines_json(&body)?;
    info!(lines = lines.len(), sportsbook = %cfg.sportsbook, "fetched upcoming prop lines");
    Ok(lines)
}

/// Parses the provider payload and flattens multi-player lines into one
/// record per named player. Lines with no line value are dropped.
pub fn parse_lines_json(raw: &str) -> Result<Vec<PropLine>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let items: Vec<LineItem> =
        serde_json::from_str(trimmed).context("invalid props lines json")?;
    Ok(flatten_lines(items))
}

fn flatten_lines(items: Vec<LineItem>) -> Vec<PropLine> {
    let mut out = Vec::new();
    for item in items {
        let Some(line) = item.line else {
            continue;
        };
        for player in &item.players {
            let Some(name) = player.name.as_deref().filter(|n| !n.is_empty()) else {
                continue;
            };
            out.push(PropLine {
                line_id: item.line_id.clone().unwrap_or_default(),
                game_id: item.game_id.clone().unwrap_or_default(),
                player: name.to_string(),
                normalized_player: player
                    .normalized_name
                    .clone()
                    .unwrap_or_else(|| name.to_lowercase()),
                team: player.team.clone().unwrap_or_default(),
                market: item.market.clone().unwrap_or_default(),
                line,
                sportsbook: item.sportsbook.clone().unwrap_or_default(),
                game_date: item.game_date.clone().unwrap_or_default(),
                start_time: item.start_time.clone().unwrap_or_default(),
            });
        }
    }
    out
}
