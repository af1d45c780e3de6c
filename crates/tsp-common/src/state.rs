//! Discrete states and history keys.

use serde::{Deserialize, Serialize};

use crate::stats::Stats;

/// A discretized bucket index in `[0, states)`.
pub type State = usize;

/// Separator between states inside a history key.
pub const HISTORY_SEPARATOR: char = '-';

/// One metric's discretized state for a cycle, with the statistics of the
/// buffer it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricState {
    pub metric: String,
    pub state: State,
    pub stats: Stats,
}

impl MetricState {
    pub fn new(metric: impl Into<String>, state: State, stats: Stats) -> Self {
        Self {
            metric: metric.into(),
            state,
            stats,
        }
    }
}

/// Join states, oldest first, into a history key such as `"0-3-1"`.
pub fn history_key<I>(states: I) -> String
where
    I: IntoIterator<Item = State>,
{
    let mut key = String::new();
    for state in states {
        if !key.is_empty() {
            key.push(HISTORY_SEPARATOR);
        }
        key.push_str(&state.to_string());
    }
    key
}

/// Split a history key back into states.
///
/// Parts that are not valid indices decode as state 0.
pub fn parse_history_key(key: &str) -> Vec<State> {
    if key.is_empty() {
        return Vec::new();
    }
    key.split(HISTORY_SEPARATOR)
        .map(|part| part.trim().parse::<State>().unwrap_or(0))
        .collect()
}

/// All suffixes of a history key, longest first: `"a-b-c"`, `"b-c"`, `"c"`.
pub fn key_suffixes(states: &[State]) -> impl Iterator<Item = String> + '_ {
    (0..states.len()).map(move |start| history_key(states[start..].iter().copied()))
}
