//! Observed history handed to the predictor.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Where a monitored system currently stands, in profile coordinates.
///
/// Each entry of `historic_states` maps a metric to its history key at that
/// time; the last entry is the starting point of a simulation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    #[serde(rename = "currentPhase", default)]
    pub current_phase: usize,
    #[serde(rename = "historicStates", default)]
    pub historic_states: Vec<BTreeMap<String, String>>,
    #[serde(rename = "periodPath", default)]
    pub period_path: Vec<usize>,
    #[serde(rename = "periodPathDepth", default)]
    pub period_path_depth: usize,
    #[serde(rename = "nextState", default)]
    pub next_state: BTreeMap<String, String>,
}

impl History {
    /// The most recent per-metric history keys.
    pub fn last_state(&self) -> Option<&BTreeMap<String, String>> {
        self.historic_states.last()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
