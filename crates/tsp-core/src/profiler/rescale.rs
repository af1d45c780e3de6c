//! Remapping transition tables into a new coordinate system.
//!
//! When a metric's observed range widens, the counts already collected were
//! binned against the old `[min, max]`. Each state is decoded back to the
//! value it represents and re-binned with the nearest-representative rule, so
//! counts keep pointing at the same region of the value axis.

use std::collections::BTreeMap;

use tsp_common::{history_key, parse_history_key, State};
use tsp_math::{bucket_value, closest_discretize};

/// Raw transition counts: history key → count per next state.
pub type Table = BTreeMap<String, Vec<u64>>;

/// A state space: `states` equal-width buckets over `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimension {
    pub states: usize,
    pub min: f64,
    pub max: f64,
}

impl Dimension {
    pub fn new(states: usize, min: f64, max: f64) -> Self {
        Self { states, min, max }
    }

    /// Map `state` of this space onto `target`.
    pub fn remap(&self, state: State, target: &Dimension) -> Option<State> {
        if state >= self.states {
            return None;
        }
        let value = bucket_value(state, self.states, self.min, self.max);
        closest_discretize(value, target.states, target.min, target.max)
    }
}

/// Result of [`change_dimension`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rescaled {
    pub table: Table,
    /// Non-zero cells that had no valid target bucket.
    pub dropped_cells: usize,
}

/// Re-express `table` from `from` coordinates in `to` coordinates.
///
/// The target range never shrinks below the source range. Counts of old
/// keys that collapse onto the same new key are summed.
pub fn change_dimension(table: &Table, from: Dimension, to: Dimension) -> Rescaled {
    let to = Dimension::new(to.states, to.min.min(from.min), to.max.max(from.max));
    let mut out = Rescaled::default();

    for (key, row) in table {
        let populated = row.iter().filter(|&&c| c > 0).count();
        if populated == 0 {
            continue;
        }

        let new_key: Option<Vec<State>> = parse_history_key(key)
            .into_iter()
            .map(|s| from.remap(s, &to))
            .collect();
        let Some(new_key) = new_key else {
            out.dropped_cells += populated;
            continue;
        };
        let new_key = history_key(new_key);

        for (next, &count) in row.iter().enumerate() {
            if count == 0 {
                continue;
            }
            match from.remap(next, &to) {
                Some(target) => {
                    let new_row = out
                        .table
                        .entry(new_key.clone())
                        .or_insert_with(|| vec![0; to.states]);
                    new_row[target] += count;
                }
                None => out.dropped_cells += 1,
            }
        }
    }

    out
}
