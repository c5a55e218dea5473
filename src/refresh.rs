use tracing::warn;

use crate::record::GameDate;

/// Most recent known season-month, the point the next fetch resumes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshCursor {
    pub year: i32,
    pub month: String,
}

/// Work list for the scraping collaborator: which calendar months of the
/// season still need fetching, and under which schedule year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshPlan {
    pub year: i32,
    pub months: Vec<String>,
}

/// Derives the refresh cursor from the newest stored game date, or the season
/// start when no dataset exists yet.
pub fn cursor_from_max_date(
    max_date: Option<GameDate>,
    default_year: i32,
    season_months: &[String],
) -> RefreshCursor {
    match max_date {
        Some(date) => RefreshCursor {
            year: date.year,
            month: date.month_label(),
        },
        None => RefreshCursor {
            year: default_year,
            month: season_months.first().cloned().unwrap_or_default(),
        },
    }
}

/// Months left to fetch, from the cursor month (inclusive) through season
/// end. A cursor month missing from the season list means the stored data is
/// out of season or corrupt; refetching everything is the safe superset, so
/// that is what happens.
pub fn months_to_fetch(cursor: &RefreshCursor, season_months: &[String]) -> Vec<String> {
    match season_months.iter().position(|m| *m == cursor.month) {
        Some(idx) => season_months[idx..].to_vec(),
        None => {
            warn!(
                month = %cursor.month,
                "cursor month not in season list, falling back to full refresh"
            );
            season_months.to_vec()
        }
    }
}

pub fn plan_refresh(
    max_date: Option<GameDate>,
    default_year: i32,
    season_months: &[String],
) -> RefreshPlan {
    let cursor = cursor_from_max_date(max_date, default_year, season_months);
    let months = months_to_fetch(&cursor, season_months);
    RefreshPlan {
        year: cursor.year,
        months,
    }
}
