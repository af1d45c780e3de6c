//! Fuzz target for simulation over arbitrary profiles.
//!
//! A profile that parses must never make the predictor panic, whatever its
//! matrices, period layout or phase count claim.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tsp_common::Profile;
use tsp_core::{PredictionMode, Predictor};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(mut profile) = Profile::from_json(text) else {
        return;
    };
    // keep the likeliness enumeration small
    profile.settings.states = profile.settings.states.min(8);

    for mode in [
        PredictionMode::RootTx,
        PredictionMode::Phases,
        PredictionMode::Periods,
    ] {
        let mut predictor = Predictor::with_rng(profile.clone(), StdRng::seed_from_u64(0));
        predictor.set_mode(mode);
        let _ = predictor.simulate(16);
        let current = predictor.current_state().clone();
        let _ = predictor.likeliness(&current, 2);
    }
});
