//! Multi-step likeliness projection.
//!
//! Starting from a history key, every reachable next state is followed with
//! its probability and the projection recurses. The result for `steps` is the
//! distribution over states after that many transitions, in percent. The
//! enumeration visits up to `states^steps` branches.

use tsp_common::{history_key, parse_history_key, State, TxMatrix};

/// Distribution after `steps` transitions from `key`, at least `width` wide.
///
/// A key without a row is shortened like in simulation; when nothing matches,
/// the row with the highest step probability stands in. `None` only when
/// `tx` has no rows at all.
pub fn project(tx: &TxMatrix, key: &str, steps: usize, history: usize, width: usize) -> Option<Vec<u32>> {
    let (key, row) = tx.lookup(key).or_else(|| tx.most_probable())?;
    let width = width.max(row.next_probs.len());

    if steps <= 1 {
        let mut out = row.next_probs.clone();
        out.resize(width, 0);
        return Some(out);
    }

    let mut out = vec![0u32; width];
    for (next, &p) in row.next_probs.iter().enumerate() {
        if p == 0 {
            continue;
        }
        let next_key = slide(key, next, history);
        let Some(sub) = project(tx, &next_key, steps - 1, history, width) else {
            continue;
        };
        if sub.len() > out.len() {
            out.resize(sub.len(), 0);
        }
        for (cell, &q) in out.iter_mut().zip(&sub) {
            *cell += (f64::from(p) * f64::from(q) / 100.0).round() as u32;
        }
    }
    Some(out)
}

/// Append `next` to `key`, keeping at most `history` states.
pub fn slide(key: &str, next: State, history: usize) -> String {
    let mut states = parse_history_key(key);
    states.push(next);
    let keep = history.max(1);
    let start = states.len().saturating_sub(keep);
    history_key(states[start..].iter().copied())
}
