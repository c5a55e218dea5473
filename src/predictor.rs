use std::collections::HashMap;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use tracing::debug;

use crate::record::GameRecord;

/// Trailing-window weights, index 0 applied to the most recent prior game.
/// Validated once at construction so the scan never has to re-check.
#[derive(Debug, Clone)]
pub struct WeightVector(Vec<f64>);

impl WeightVector {
    pub fn new(weights: Vec<f64>) -> Result<Self> {
        if weights.is_empty() {
            bail!("prediction weight vector must not be empty");
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            bail!("prediction weights must be finite and non-negative");
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            bail!("prediction weights must not sum to zero");
        }
        Ok(Self(weights))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Weighted mean over a chronologically ascending window. The weight vector
/// is right-aligned: its first entry pairs with the window's last (most
/// recent) value. Summation runs in window order so results are bit-for-bit
/// reproducible.
pub fn weighted_mean(window: &[f64], weights: &WeightVector) -> f64 {
    let aligned = &weights.as_slice()[weights.len() - window.len()..];
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, value) in window.iter().enumerate() {
        let w = aligned[aligned.len() - 1 - i];
        numerator += value * w;
        denominator += w;
    }
    numerator / denominator
}

/// Annotates every row with the trailing weighted average of `target` over
/// that player's prior games, and a flag for whether the actual value beat it.
///
/// "Prior" means strictly before in the per-player (date, game id) order.
/// Two games on the same calendar day are tie-broken by game id, so exactly
/// one of them sees the other as history — never both. A player with fewer
/// prior games than weights gets no prediction and no label.
pub fn annotate_predictions(
    rows: &mut [GameRecord],
    target: &str,
    weights: &WeightVector,
) -> Result<()> {
    let mut timelines: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, row) in rows.iter().enumerate() {
        timelines.entry(row.player.clone()).or_default().push(idx);
    }

    let window = weights.len();
    let mut predicted_rows = 0usize;

    for indices in timelines.values_mut() {
        indices.sort_by(|&a, &b| timeline_key(&rows[a]).cmp(&timeline_key(&rows[b])));

        let mut history: Vec<f64> = Vec::with_capacity(indices.len());
        for &idx in indices.iter() {
            let actual = rows[idx].target_stat(target)?;
            if history.len() >= window {
                let prediction = weighted_mean(&history[history.len() - window..], weights);
                rows[idx].predicted = Some(prediction);
                rows[idx].exceeded = Some(actual > prediction);
                predicted_rows += 1;
            }
            history.push(actual);
        }
    }

    debug!(
        rows = rows.len(),
        predicted = predicted_rows,
        players = timelines.len(),
        "predictions annotated"
    );
    Ok(())
}

fn timeline_key(row: &GameRecord) -> (NaiveDate, &str) {
    (row.date.sort_key(), row.game_id.as_str())
}
