//! Fuzz target for JSON settings parsing and validation.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tsp_config::{validate_settings, SettingsFormat};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(settings) = SettingsFormat::Json.parse(text) {
        let _ = validate_settings(&settings);
    }
});
