//! End-to-end profiling tests: samples go in through `put`, profiles come
//! out through `get` or the output callback.

use std::sync::mpsc;
use std::time::Duration;

use tempfile::TempDir;
use tsp_core::{Error, Profile, Profiler, Sample, Settings};

const PATTERN: [f64; 6] = [10.0, 10.0, 10.0, 90.0, 90.0, 90.0];

fn two_state_settings(buffer_size: usize) -> Settings {
    Settings::default()
        .with_name("e2e")
        .with_states(2)
        .with_buffer_size(buffer_size)
        .with_history(1)
        .with_fixed_bounds(0.0, 100.0)
}

fn feed(profiler: &Profiler, values: &[f64], repeat: usize) {
    for _ in 0..repeat {
        for &v in values {
            profiler.put(Sample::new().with_metric("cpu", v)).unwrap();
        }
    }
}

fn run(settings: Settings, values: &[f64], repeat: usize) -> Profile {
    let profiler = Profiler::new(settings).unwrap();
    feed(&profiler, values, repeat);
    profiler.terminate();
    profiler.get()
}

fn row(profile: &Profile, key: &str) -> Vec<u32> {
    profile.root_matrix("cpu").unwrap().transitions[key]
        .next_probs
        .clone()
}

#[test]
fn square_wave_per_sample() {
    let profile = run(two_state_settings(1), &PATTERN, 50);
    // runs of three: two of three steps stay, one switches
    let low = row(&profile, "0");
    let high = row(&profile, "1");
    assert!(low[0].abs_diff(67) <= 1, "{low:?}");
    assert!(high[1].abs_diff(67) <= 1, "{high:?}");
    assert_eq!(low.iter().sum::<u32>(), 100);
    assert_eq!(high.iter().sum::<u32>(), 100);
}

#[test]
fn square_wave_per_buffer_is_a_two_cycle() {
    let profile = run(two_state_settings(3), &PATTERN, 50);
    assert!(row(&profile, "0")[1] >= 95);
    assert!(row(&profile, "1")[0] >= 95);

    let stats = profile.root_matrix("cpu").unwrap().stats;
    assert_eq!(stats.count, 300);
    assert_eq!((stats.min, stats.max), (0.0, 100.0));
    assert!((stats.avg - 50.0).abs() < 1e-9);
}

#[test]
fn dynamic_bounds_learn_the_same_cycle() {
    let settings = Settings::default()
        .with_states(2)
        .with_buffer_size(3)
        .with_history(1);
    let profile = run(settings, &PATTERN, 50);
    let tx = profile.root_matrix("cpu").unwrap();
    assert_eq!((tx.stats.min, tx.stats.max), (10.0, 90.0));
    // the very first batch has no range yet and is skipped
    assert!(row(&profile, "1")[0] >= 95);
}

#[test]
fn step_probabilities_follow_cycle_share() {
    let profile = run(two_state_settings(3), &PATTERN, 50);
    let tx = profile.root_matrix("cpu").unwrap();
    let total: u32 = tx.transitions.values().map(|s| s.probability).sum();
    assert!(total.abs_diff(100) <= 2, "{total}");
}

#[test]
fn current_state_and_stats_are_exposed() {
    let profiler = Profiler::new(two_state_settings(3)).unwrap();
    feed(&profiler, &PATTERN, 2);
    profiler.terminate();

    assert_eq!(profiler.cycles(), 4);
    let current = profiler.get_current_state();
    assert_eq!(current[0].metric, "cpu");
    assert_eq!(current[0].state, 1);
    assert_eq!(profiler.get_current_stats()["cpu"].count, 12);
}

#[test]
fn output_callback_receives_profiles() {
    let (tx, rx) = mpsc::channel();
    let profiler = Profiler::with_output(
        two_state_settings(1),
        Duration::from_millis(20),
        move |profile| {
            let _ = tx.send(profile);
        },
    )
    .unwrap();
    feed(&profiler, &PATTERN, 5);

    let profile = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("no profile emitted");
    assert_eq!(profile.name, "e2e");
    assert_eq!(profile.settings.output_interval, Some(Duration::from_millis(20)));
    profiler.terminate();
}

#[test]
fn put_after_terminate_fails() {
    let profiler = Profiler::new(two_state_settings(1)).unwrap();
    profiler.terminate();
    let err = profiler
        .put(Sample::new().with_metric("cpu", 1.0))
        .unwrap_err();
    assert!(matches!(err, Error::ProfilerTerminated));
    assert!(!err.is_recoverable());
}

#[test]
fn concurrent_producers() {
    let profiler = Profiler::new(two_state_settings(1)).unwrap();
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| feed(&profiler, &[10.0, 90.0], 25));
        }
    });
    profiler.terminate();
    assert_eq!(profiler.cycles(), 200);
    assert_eq!(profiler.get_current_stats()["cpu"].count, 200);
}

#[test]
fn period_path_tracks_cycles() {
    let settings = two_state_settings(1).with_period_size(vec![2, 3]);
    let profiler = Profiler::new(settings).unwrap();
    feed(&profiler, &[10.0, 90.0], 4);
    profiler.terminate();

    // eight cycles: one full pass of six plus two
    assert_eq!(profiler.get_current_period_path(), vec![0, 2]);
    let profile = profiler.get();
    assert_eq!(profile.period_tree.root.max_counts, 6);
    assert!(!profile.period_tree.root.tx_matrix.is_empty());
    assert!(!profile.period_tree.node(&[1]).unwrap().tx_matrix.is_empty());
}

#[test]
fn stable_pattern_keeps_its_phase() {
    let profiler = Profiler::new(two_state_settings(1)).unwrap();
    feed(&profiler, &[10.0, 90.0], 20);
    profiler.terminate();
    let settled = profiler.get().phases.len();
    let phase = profiler.get_current_phase();

    let profiler = Profiler::new(two_state_settings(1)).unwrap();
    feed(&profiler, &[10.0, 90.0], 200);
    profiler.terminate();
    assert_eq!(profiler.get().phases.len(), settled);
    assert_eq!(profiler.get_current_phase(), phase);
}

#[test]
fn profile_persists_and_reloads() {
    let profile = run(
        two_state_settings(3).with_period_size(vec![2, 2]),
        &PATTERN,
        10,
    );

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("profile.json");
    std::fs::write(&path, profile.to_json_pretty().unwrap()).unwrap();

    let loaded = Profile::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(loaded, profile);
    assert_eq!(loaded.settings.period_size, vec![2, 2]);
}
