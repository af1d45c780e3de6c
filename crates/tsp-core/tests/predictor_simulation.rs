//! Simulation against profiles learned by a real profiler run.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tsp_core::{History, PredictionMode, Predictor, Profile, Profiler, Sample, Settings};

fn learn(values: &[f64], repeat: usize, settings: Settings) -> Profile {
    let profiler = Profiler::new(settings).unwrap();
    for _ in 0..repeat {
        for &v in values {
            profiler.put(Sample::new().with_metric("cpu", v)).unwrap();
        }
    }
    profiler.terminate();
    profiler.get()
}

fn square_wave() -> Profile {
    learn(
        &[10.0, 10.0, 10.0, 90.0, 90.0, 90.0],
        50,
        Settings::default()
            .with_states(2)
            .with_buffer_size(1)
            .with_fixed_bounds(0.0, 100.0),
    )
}

#[test]
fn seeded_simulation_is_reproducible() {
    let profile = square_wave();
    let mut a = Predictor::with_rng(profile.clone(), StdRng::seed_from_u64(99));
    let mut b = Predictor::with_rng(profile, StdRng::seed_from_u64(99));
    assert_eq!(a.simulate(200).unwrap(), b.simulate(200).unwrap());
}

#[test]
fn simulation_stays_in_learned_envelope() {
    let profile = square_wave();
    let mut predictor = Predictor::new(profile);
    let steps = predictor.simulate(6_000).unwrap();

    let mut stay = 0usize;
    let mut from_low = 0usize;
    for pair in steps.windows(2) {
        if pair[0][0].state == 0 {
            from_low += 1;
            if pair[1][0].state == 0 {
                stay += 1;
            }
        }
    }
    // learned row "0" is 67/33
    let share = stay as f64 / from_low as f64;
    assert!((0.60..0.74).contains(&share), "{share}");

    for step in &steps {
        assert!((0.0..100.0).contains(&step[0].value), "{}", step[0].value);
    }
}

#[test]
fn resume_from_history() {
    // starting high keeps the initial zero window from adding a self-loop
    let profile = learn(
        &[90.0, 10.0],
        50,
        Settings::default()
            .with_states(2)
            .with_buffer_size(1)
            .with_fixed_bounds(0.0, 100.0),
    );
    let history = History {
        historic_states: vec![[("cpu".to_string(), "1".to_string())].into_iter().collect()],
        ..History::default()
    };
    let mut predictor = Predictor::from_history(
        profile,
        PredictionMode::RootTx,
        &history,
        None,
        StdRng::seed_from_u64(5),
    );
    let states: Vec<usize> = predictor
        .simulate(4)
        .unwrap()
        .iter()
        .map(|s| s[0].state)
        .collect();
    assert_eq!(states, vec![0, 1, 0, 1]);
}

#[test]
fn likeliness_projects_learned_rows() {
    let profile = square_wave();
    let predictor = Predictor::with_rng(profile, StdRng::seed_from_u64(1));
    let start: BTreeMap<String, String> =
        [("cpu".to_string(), "0".to_string())].into_iter().collect();

    let one = predictor.likeliness(&start, 1).unwrap();
    assert_eq!(one["cpu"].len(), 2);
    assert!(one["cpu"][0].abs_diff(67) <= 1);

    // 0.67*0.67 + 0.33*0.33 of staying low after two steps
    let two = predictor.likeliness(&start, 2).unwrap();
    assert!(two["cpu"][0].abs_diff(56) <= 2, "{:?}", two["cpu"]);
    assert!(two["cpu"].iter().sum::<u32>().abs_diff(100) <= 2);
}

#[test]
fn phase_mode_runs_on_learned_phases() {
    let profile = square_wave();
    let phases = profile.phases.len();
    assert!(phases >= 1);

    let mut predictor = Predictor::with_rng(profile, StdRng::seed_from_u64(8));
    predictor.set_mode(PredictionMode::Phases);
    predictor.set_phase(0);
    let steps = predictor.simulate(50).unwrap();
    assert_eq!(steps.len(), 50);
    assert!(predictor.current_phase() < phases);
}
