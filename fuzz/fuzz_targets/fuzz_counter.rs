//! Fuzz target for transition counting.
//!
//! Arbitrary state sequences and ranges, including ones that widen or
//! invert, must keep every exported row at most 100 percent.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tsp_common::{MetricState, Stats};
use tsp_core::profiler::Counter;

#[derive(Debug, Arbitrary)]
struct Step {
    metric: u8,
    state: u8,
    min: f32,
    max: f32,
}

#[derive(Debug, Arbitrary)]
struct Input {
    history: u8,
    states: u8,
    steps: Vec<Step>,
}

fuzz_target!(|input: Input| {
    let history = usize::from(input.history % 4) + 1;
    let states = usize::from(input.states % 16) + 1;
    let mut counter = Counter::new(history, states, 1);

    for step in input.steps.iter().take(256) {
        let (min, max) = (f64::from(step.min), f64::from(step.max));
        let stats = Stats::from_values(&[min], min, max);
        let metric = format!("m{}", step.metric % 4);
        counter.count(&[MetricState::new(metric, usize::from(step.state), stats)]);
    }

    for tx in counter.get_tx() {
        for row in tx.transitions.values() {
            assert!(row.next_probs.iter().sum::<u32>() <= 100);
        }
    }
});
