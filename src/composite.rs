use tracing::trace;

use crate::config::CategoryMap;
use crate::record::{GameRecord, SCORING_COLUMN};

/// Materializes market-category columns.
///
/// Two phases, both required: every constituent column referenced anywhere in
/// the map is coerced to a number (unparseable or missing values become 0.0 —
/// these are optional secondary stats, unlike the strict scoring column), then
/// only the requested categories get a summed column.
pub fn add_composite_columns(rows: &mut [GameRecord], map: &CategoryMap, requested: &[String]) {
    for row in rows.iter_mut() {
        for columns in map.values() {
            for col in columns {
                let value = if col == SCORING_COLUMN {
                    row.pts
                } else {
                    lenient_number(row.raw_stats.get(col))
                };
                row.numeric_stats.insert(col.clone(), value);
            }
        }
        for (label, columns) in map {
            if !requested.contains(label) {
                continue;
            }
            let sum: f64 = columns
                .iter()
                .map(|col| row.numeric_stats.get(col).copied().unwrap_or(0.0))
                .sum();
            row.composites.insert(label.clone(), sum);
        }
    }
    trace!(rows = rows.len(), requested = requested.len(), "composite columns added");
}

fn lenient_number(raw: Option<&String>) -> f64 {
    raw.map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0)
}
