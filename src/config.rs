use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

/// Ordered list of constituent stat columns per market-category label.
pub type CategoryMap = BTreeMap<String, Vec<String>>;

pub const DEFAULT_SEASON_MONTHS: &[&str] = &[
    "october",
    "november",
    "december",
    "january",
    "february",
    "march",
    "april",
];

pub const DEFAULT_SEASON_YEAR: i32 = 2024;

pub const DEFAULT_WEIGHTS: &[f64] = &[0.5, 0.25, 0.15, 0.07, 0.03];

const DEFAULT_DB_FILE: &str = "data/propsline.sqlite";

/// Everything the pipeline needs, resolved once at startup and passed down.
/// No component reads process-wide defaults on its own.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub db_path: PathBuf,
    pub season_months: Vec<String>,
    pub default_season_year: i32,
    pub weights: Vec<f64>,
    pub target_stat: String,
    pub categories: CategoryMap,
    /// Category labels that get a materialized sum column.
    pub requested_categories: Vec<String>,
    pub odds: OddsConfig,
}

#[derive(Debug, Clone)]
pub struct OddsConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub sportsbook: String,
    pub league: String,
}

impl OddsConfig {
    pub fn from_env() -> Self {
        let api_key = env::var("API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let sportsbook = env::var("SPORTSBOOK").unwrap_or_else(|_| "PrizePicks".to_string());
        let league = env::var("LEAGUE").unwrap_or_else(|_| "NBA".to_string());
        Self {
            enabled: api_key.is_some(),
            api_key,
            sportsbook,
            league,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let db_path = env::var("PROPSLINE_DB")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE));
        let weights = env::var("PREDICTION_WEIGHTS")
            .ok()
            .and_then(|raw| parse_weights(&raw))
            .unwrap_or_else(|| DEFAULT_WEIGHTS.to_vec());
        let target_stat = env::var("TARGET_STAT")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| crate::record::SCORING_COLUMN.to_string());

        let categories = default_category_map();
        let requested_categories = categories.keys().cloned().collect();

        Self {
            db_path,
            season_months: DEFAULT_SEASON_MONTHS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            default_season_year: DEFAULT_SEASON_YEAR,
            weights,
            target_stat,
            categories,
            requested_categories,
            odds: OddsConfig::from_env(),
        }
    }
}

/// Market-category labels used by the props provider, mapped to the box-score
/// columns they sum.
pub fn default_category_map() -> CategoryMap {
    let mut map = CategoryMap::new();
    map.insert("rebs+asts".to_string(), cols(&["TRB", "AST"]));
    map.insert("pts+asts".to_string(), cols(&["PTS", "AST"]));
    map.insert("pts+rebs".to_string(), cols(&["PTS", "TRB"]));
    map.insert("pts+rebs+asts".to_string(), cols(&["PTS", "TRB", "AST"]));
    map.insert("assists".to_string(), cols(&["AST"]));
    map.insert("rebounds".to_string(), cols(&["TRB"]));
    map.insert("points".to_string(), cols(&["PTS"]));
    map
}

fn cols(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn parse_weights(raw: &str) -> Option<Vec<f64>> {
    let weights = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    if weights.is_empty() {
        return None;
    }
    Some(weights)
}
