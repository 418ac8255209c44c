//! Contradiction detection and supersession at insert time.
//!
//! A neighbour contradicts the new entry when it is active, shares the category,
//! clears the similarity threshold and disagrees on polarity or on a single-valued
//! slot (see [`rules::polarity_mismatch`]). The lower-confidence side is superseded;
//! on a tie the older entry loses. A new entry that loses to one neighbour never
//! supersedes another, so supersession chains cannot form. Pairs that already carry
//! a `contradicts` edge are never re-evaluated.

use std::cmp::Ordering;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::config::ConflictConfig;
use crate::similarity::SimilarityIndex;
use crate::vault::types::{ContextEntry, Relationship, RelationshipKind};
use crate::vault::{nearest, relations, rules};

/// The entry that gives way. Lower confidence loses, then older `created_at`, then lower id.
pub fn loser<'a>(a: &'a ContextEntry, b: &'a ContextEntry) -> &'a ContextEntry {
    let order = a
        .confidence
        .total_cmp(&b.confidence)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id));
    match order {
        Ordering::Greater => b,
        _ => a,
    }
}

/// Compare a freshly stored entry against its neighbours and resolve contradictions.
///
/// Neighbours are the nearest active entries of the same category above the
/// similarity threshold. If any contradicting neighbour outranks the new entry, the
/// new entry is superseded by the closest such neighbour and supersedes nothing
/// itself; otherwise it supersedes every contradicting neighbour.
///
/// Returns the `contradicts` edges created. The new entry must already be in the
/// store and the index.
pub fn check_and_resolve(
    conn: &mut Connection,
    index: &dyn SimilarityIndex,
    config: &ConflictConfig,
    new_entry: &ContextEntry,
    now: DateTime<Utc>,
) -> Result<Vec<Relationship>> {
    if !config.enabled {
        return Ok(Vec::new());
    }

    let threshold = config.similarity_threshold;
    let neighbours = nearest(
        conn,
        index,
        &new_entry.content,
        config.neighbours,
        threshold,
        |other, similarity| {
            other.id != new_entry.id
                && other.category == new_entry.category
                && other.is_active()
                && similarity > threshold
        },
    )?;

    let mut rivals = Vec::new();
    for (other, similarity) in neighbours {
        if relations::contradiction_exists(conn, &new_entry.id, &other.id)? {
            continue;
        }
        if rules::polarity_mismatch(&new_entry.content, &other.content) {
            rivals.push((other, similarity));
        }
    }
    if let Some(pos) = rivals
        .iter()
        .position(|(other, _)| loser(new_entry, other).id == new_entry.id)
    {
        let stronger = rivals.swap_remove(pos);
        rivals = vec![stronger];
    }

    let mut created = Vec::new();
    for (other, similarity) in &rivals {
        let losing = loser(new_entry, other);
        let winner = if losing.id == new_entry.id { other } else { new_entry };

        let tx = conn.transaction()?;
        if !relations::set_superseded(&tx, &losing.id, &winner.id, now)? {
            // superseded since it was read; leave the pair unresolved
            debug!(entry = %losing.id, "skipping contradiction with already superseded entry");
            continue;
        }
        let edge = relations::insert_relationship(
            &tx,
            &new_entry.id,
            &other.id,
            RelationshipKind::Contradicts,
            now,
        )?;
        tx.commit()?;

        info!(
            superseded = %losing.id,
            superseded_by = %winner.id,
            similarity = *similarity,
            "contradiction resolved"
        );
        created.push(edge);
    }

    Ok(created)
}
