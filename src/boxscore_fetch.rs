use std::collections::BTreeMap;

use anyhow::{Result, anyhow};
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::info;

use crate::http_client::polite_get;
use crate::record::RawRow;

const SITE_URL: &str = "https://www.basketball-reference.com";
const BASE_URL: &str = "https://www.basketball-reference.com/leagues/";

pub fn month_schedule_url(year: i32, month: &str) -> String {
    format!("{BASE_URL}NBA_{year}_games-{month}.html")
}

/// Fetches a month's schedule page and returns the box-score page URLs.
pub fn fetch_box_score_links(client: &Client, year: i32, month: &str) -> Result<Vec<String>> {
    let url = month_schedule_url(year, month);
    info!(%url, "scraping month schedule");
    let body = polite_get(client, &url)?;
    parse_box_score_links(&body)
}

/// Collects the targets of every "Box Score" anchor, resolved to absolute
/// URLs.
pub fn parse_box_score_links(html: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let anchors = selector("a[href]")?;
    let mut links = Vec::new();
    for a in document.select(&anchors) {
        if a.text().collect::<String>().trim() != "Box Score" {
            continue;
        }
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        links.push(absolute_url(href));
    }
    Ok(links)
}

/// Game identifier from a box-score URL: the last path segment minus ".html"
/// (e.g. ".../boxscores/202412250BOS.html" -> "202412250BOS").
pub fn game_id_from_url(url: &str) -> Option<String> {
    let segment = url.rsplit('/').next()?;
    let id = segment.strip_suffix(".html").unwrap_or(segment);
    if id.is_empty() { None } else { Some(id.to_string()) }
}

/// Fetches one box-score page and parses both teams' combined basic+advanced
/// player rows.
pub fn fetch_player_rows(client: &Client, box_score_url: &str) -> Result<Vec<RawRow>> {
    let game_id = game_id_from_url(box_score_url)
        .ok_or_else(|| anyhow!("cannot derive game id from {box_score_url}"))?;
    info!(url = %box_score_url, %game_id, "scraping box score");
    let body = polite_get(client, box_score_url)?;
    parse_box_score(&body, &game_id)
}

/// Parses the basic and advanced per-team stat tables of one box-score page.
/// Basic and advanced rows for the same team are merged per player; on
/// duplicate columns (e.g. MP) the basic table wins. The page's "Starters"
/// identity column becomes the player field; "Reserves" separators and
/// "Team Totals" footers pass through for the normalizer to drop.
pub fn parse_box_score(html: &str, game_id: &str) -> Result<Vec<RawRow>> {
    let document = Html::parse_document(html);
    let tables = selector(r#"table[id*="-game-basic"], table[id*="-game-advanced"]"#)?;

    // player -> ordered columns, keyed per team, advanced merged into basic.
    let mut team_order: Vec<String> = Vec::new();
    let mut merged: BTreeMap<String, Vec<(String, BTreeMap<String, String>)>> = BTreeMap::new();

    for table in document.select(&tables) {
        let Some(table_id) = table.value().attr("id") else {
            continue;
        };
        let Some(team) = table_id.split('-').nth(1).map(|t| t.to_string()) else {
            continue;
        };
        let headers = parse_headers(&table)?;
        if headers.is_empty() {
            return Err(anyhow!("stat table {table_id} has no header row"));
        }
        let rows = parse_body_rows(&table, headers.len())?;

        if !merged.contains_key(&team) {
            team_order.push(team.clone());
        }
        let team_rows = merged.entry(team).or_default();
        for cells in rows {
            let player = cells[0].clone();
            let stats = headers
                .iter()
                .skip(1)
                .zip(cells.iter().skip(1))
                .map(|(col, val)| (col.clone(), val.clone()))
                .collect::<Vec<_>>();
            match team_rows.iter_mut().find(|(p, _)| *p == player) {
                Some((_, existing)) => {
                    // Advanced table: only add columns the basic table lacks.
                    for (col, val) in stats {
                        existing.entry(col).or_insert(val);
                    }
                }
                None => {
                    team_rows.push((player, stats.into_iter().collect()));
                }
            }
        }
    }

    if team_order.is_empty() {
        return Err(anyhow!("no stat tables found for game {game_id}"));
    }

    let mut out = Vec::new();
    for team in team_order {
        let Some(rows) = merged.remove(&team) else {
            continue;
        };
        for (player, mut stats) in rows {
            let minutes_played = stats.remove("MP").unwrap_or_default();
            out.push(RawRow {
                player,
                team: team.clone(),
                game_id: game_id.to_string(),
                minutes_played,
                stats,
            });
        }
    }
    Ok(out)
}

/// Column names from the second header row (the first is a spanner).
fn parse_headers(table: &ElementRef<'_>) -> Result<Vec<String>> {
    let head_rows = selector("thead tr")?;
    let cells = selector("th")?;
    let Some(row) = table.select(&head_rows).nth(1) else {
        return Ok(Vec::new());
    };
    Ok(row
        .select(&cells)
        .map(|th| th.text().collect::<String>().trim().to_string())
        .collect())
}

/// Body and footer rows, padded to the header width so short separator rows
/// still line up.
fn parse_body_rows(table: &ElementRef<'_>, width: usize) -> Result<Vec<Vec<String>>> {
    let body_rows = selector("tbody tr, tfoot tr")?;
    let cells = selector("th, td")?;
    let mut out = Vec::new();
    for row in table.select(&body_rows) {
        let mut values = row
            .select(&cells)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect::<Vec<_>>();
        if values.is_empty() {
            continue;
        }
        values.resize(width.max(values.len()), String::new());
        out.push(values);
    }
    Ok(out)
}

fn selector(raw: &str) -> Result<Selector> {
    Selector::parse(raw).map_err(|err| anyhow!("bad css selector {raw:?}: {err}"))
}

fn absolute_url(href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{SITE_URL}{href}")
    } else {
        format!("{BASE_URL}{href}")
    }
}
