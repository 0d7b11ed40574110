use kalmanifolds::{
    FilterKind,
    simulation::{self, ScenarioConfig, Summary, runner::BASELINE},
};

fn summary<'a>(summaries: &'a [Summary], name: &str) -> &'a Summary {
    summaries
        .iter()
        .find(|summary| summary.name == name)
        .unwrap_or_else(|| panic!("no summary for {name}"))
}

fn assert_bounded(summaries: &[Summary]) {
    for kind in FilterKind::ALL {
        let summary = summary(summaries, kind.name());
        assert!(summary.max_error.is_finite() && summary.max_error < 0.5, "{summary}");
        assert!(summary.rmse_translation < 0.05, "{summary}");
        assert!(summary.rmse_rotation < 0.05, "{summary}");
    }
}

#[test]
fn test_short_scenario_stays_bounded() {
    let summaries = simulation::run(ScenarioConfig {
        steps: 3_500,
        ..Default::default()
    })
    .unwrap();

    assert_eq!(summaries.len(), 5);
    assert_bounded(&summaries);

    // the corrections must beat integrating the noisy controls
    let baseline = summary(&summaries, BASELINE);
    for kind in FilterKind::ALL {
        assert!(summary(&summaries, kind.name()).rmse_translation < baseline.rmse_translation);
    }
}

fn assert_full_run(seed: u64) {
    let summaries = simulation::run(ScenarioConfig {
        seed,
        ..Default::default()
    })
    .unwrap();
    for summary in &summaries {
        println!("seed {seed}: {summary}");
    }
    assert_bounded(&summaries);

    for kind in FilterKind::ALL {
        let summary = summary(&summaries, kind.name());
        let nees = summary.mean_nees.unwrap_or(f64::NAN);
        assert!((4.0..8.0).contains(&nees), "{summary}");
    }

    // the invariant and unscented filters are at least as accurate on the
    // rotation as the extended one, up to sampling noise
    let ekf = summary(&summaries, "EKF").rmse_rotation;
    for kind in [FilterKind::Iekf, FilterKind::Ukfm] {
        let rotation = summary(&summaries, kind.name()).rmse_rotation;
        assert!(rotation <= 1.02 * ekf, "seed {seed}, {kind}: {rotation} vs EKF {ekf}");
    }
}

#[test]
fn test_full_scenario() {
    assert_full_run(ScenarioConfig::default().seed);
}

#[test]
#[ignore = "three more 35,000-step runs, run with --ignored"]
fn test_full_scenario_seeds() {
    for seed in [1, 2, 3] {
        assert_full_run(seed);
    }
}
