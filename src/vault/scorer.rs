//! Multi-factor scoring and diversity-aware selection.
//!
//! ```text
//! score = w_rel * similarity
//!       + w_rec * 0.5^(age_days / half_life)
//!       + w_conf * confidence
//!       + w_freq * min(1, ln(1 + access_count) / ln(1 + saturation))
//! ```
//!
//! Every factor lies in `[0, 1]` and the weights sum to 1, so scores do too.
//! Everything here is pure; recording access for picked entries is the caller's job.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{BudgetUnit, RetrievalConfig};
use crate::vault::types::ContextEntry;

/// Per-factor values before weighting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreComponents {
    pub similarity: f64,
    pub recency: f64,
    pub confidence: f64,
    pub frequency: f64,
}

/// An entry with its score for one query. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    pub entry: ContextEntry,
    pub components: ScoreComponents,
    /// Weighted score.
    pub score: f64,
    /// Score after diversity penalties applied during selection.
    pub adjusted: f64,
}

/// `1.0` at age zero, halving every `half_life_days`.
pub fn recency_factor(age_days: f64, half_life_days: f64) -> f64 {
    0.5f64.powf(age_days.max(0.0) / half_life_days)
}

/// Log-scaled access frequency, saturating at 1.0.
///
/// Plain `ln(1 + access_count)` is unbounded; dividing by `ln(1 + saturation)` and
/// capping keeps this factor in `[0, 1]` like the other three, so the weights alone
/// decide its share of the score.
pub fn frequency_factor(access_count: u32, saturation: u32) -> f64 {
    let saturation = saturation.max(1) as f64;
    ((access_count as f64).ln_1p() / saturation.ln_1p()).min(1.0)
}

pub fn score_candidate(
    entry: ContextEntry,
    similarity: f64,
    now: DateTime<Utc>,
    config: &RetrievalConfig,
) -> ScoredCandidate {
    let age_days = (now - entry.updated_at).num_seconds() as f64 / 86_400.0;
    let components = ScoreComponents {
        similarity: similarity.clamp(0.0, 1.0),
        recency: recency_factor(age_days, config.half_life_days),
        confidence: entry.confidence,
        frequency: frequency_factor(entry.access_count, config.frequency_saturation),
    };
    let score = config.weight_relevance * components.similarity
        + config.weight_recency * components.recency
        + config.weight_confidence * components.confidence
        + config.weight_frequency * components.frequency;

    ScoredCandidate {
        entry,
        components,
        score,
        adjusted: score,
    }
}

/// Score a candidate pool. Superseded entries and those at or below
/// `min_similarity` are dropped before scoring.
pub fn score_pool(
    pool: Vec<(ContextEntry, f64)>,
    now: DateTime<Utc>,
    config: &RetrievalConfig,
) -> Vec<ScoredCandidate> {
    pool.into_iter()
        .filter(|(entry, similarity)| entry.is_active() && *similarity > config.min_similarity)
        .map(|(entry, similarity)| score_candidate(entry, similarity, now, config))
        .collect()
}

/// Highest adjusted score first; ties by most recent `updated_at`, then lowest id.
fn rank(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.adjusted
        .total_cmp(&a.adjusted)
        .then_with(|| b.entry.updated_at.cmp(&a.entry.updated_at))
        .then_with(|| a.entry.id.cmp(&b.entry.id))
}

/// Greedy selection under a content budget.
///
/// Each pick multiplies the adjusted score of every unpicked candidate in the same
/// category by `diversity_penalty`. A candidate whose content no longer fits the
/// remaining budget is skipped and selection continues with the next one.
pub fn select(
    candidates: Vec<ScoredCandidate>,
    budget: usize,
    unit: BudgetUnit,
    config: &RetrievalConfig,
) -> Vec<ScoredCandidate> {
    let mut remaining = candidates;
    let mut picked = Vec::new();
    let mut used = 0usize;

    while !remaining.is_empty() && picked.len() < config.max_entries && used < budget {
        let best = remaining
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| rank(a, b))
            .map(|(i, _)| i);
        let Some(best) = best else { break };
        let candidate = remaining.swap_remove(best);

        let cost = unit.measure(&candidate.entry.content);
        if used + cost > budget {
            continue;
        }
        used += cost;

        for other in remaining
            .iter_mut()
            .filter(|c| c.entry.category == candidate.entry.category)
        {
            other.adjusted *= config.diversity_penalty;
        }
        picked.push(candidate);
    }

    picked
}
