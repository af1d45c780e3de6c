//! The exported profile snapshot.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::settings::Settings;
use crate::tree::PeriodTree;
use crate::txmatrix::{find_metric, TxMatrix};

/// Learned phases: one matrix set per phase plus the phase-to-phase model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Phases {
    #[serde(default)]
    pub phases: Vec<Vec<TxMatrix>>,
    #[serde(default)]
    pub tx: TxMatrix,
}

impl Phases {
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}

/// A complete profile as produced by the profiler and consumed by the
/// predictor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "rootTx", default)]
    pub root_tx: Vec<TxMatrix>,
    #[serde(rename = "periodTree", default)]
    pub period_tree: PeriodTree,
    #[serde(default)]
    pub phases: Phases,
    #[serde(default)]
    pub settings: Settings,
}

impl Profile {
    /// Metric names in root matrix order.
    pub fn metrics(&self) -> Vec<&str> {
        self.root_tx.iter().map(|tx| tx.metric.as_str()).collect()
    }

    pub fn root_matrix(&self, metric: &str) -> Option<&TxMatrix> {
        find_metric(&self.root_tx, metric)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Stats;
    use crate::txmatrix::TxStep;

    fn sample_profile() -> Profile {
        let mut cpu = TxMatrix::new("cpu");
        cpu.transitions
            .insert("0".into(), TxStep::new(vec![0, 100], 50));
        cpu.transitions
            .insert("1".into(), TxStep::new(vec![100, 0], 50));
        cpu.stats = Stats::from_values(&[10.0, 90.0], 0.0, 100.0);

        let mut tree = PeriodTree::new(&[2, 3]);
        tree.root.tx_matrix.push(cpu.clone());

        Profile {
            name: "vm-01".into(),
            root_tx: vec![cpu.clone()],
            period_tree: tree,
            phases: Phases {
                phases: vec![vec![cpu]],
                tx: TxMatrix::new(crate::PHASE_TX_METRIC),
            },
            settings: Settings::default().with_states(2),
        }
    }

    #[test]
    fn test_json_round_trip() {
        let profile = sample_profile();
        let json = profile.to_json().unwrap();
        let back = Profile::from_json(&json).unwrap();
        assert_eq!(back, profile);
    }

    #[test]
    fn test_wire_field_names() {
        let value = serde_json::to_value(sample_profile()).unwrap();
        for key in ["name", "rootTx", "periodTree", "phases", "settings"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["rootTx"][0]["transitions"]["0"]["nextProbs"][1], 100);
        assert_eq!(value["rootTx"][0]["transitions"]["0"]["probability"], 50);
        assert_eq!(value["periodTree"]["root"]["maxChilds"], 2);
    }

    #[test]
    fn test_lookup_helpers() {
        let profile = sample_profile();
        assert_eq!(profile.metrics(), vec!["cpu"]);
        assert!(profile.root_matrix("cpu").is_some());
        assert!(profile.root_matrix("io").is_none());
        assert_eq!(profile.phases.len(), 1);
    }

    #[test]
    fn test_from_json_invalid() {
        let err = Profile::from_json("{not json").unwrap_err();
        assert_eq!(err.code(), 61);
    }
}
