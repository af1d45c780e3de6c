//! Fuzz target for persisted profile parsing.
//!
//! Profiles are read back from disk by the predictor and may have been
//! edited or truncated.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tsp_common::Profile;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(profile) = Profile::from_json(text) {
        let _ = profile.to_json();
        let _ = profile.period_tree.levels();
    }
});
