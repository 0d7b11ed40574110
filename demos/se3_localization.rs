//! 3D localization among known beacons, with the four filters side by side.
//!
//! ```text
//! cargo run --release --example se3_localization [scenario.toml]
//! ```
//!
//! `RUST_LOG=kalmanifolds=debug` shows the per-filter logs.

use kalmanifolds::{
    KalmanFilter, LieGroup,
    simulation::{Runner, ScenarioConfig, Simulator},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => toml::from_str(&std::fs::read_to_string(path)?)?,
        None => ScenarioConfig::default(),
    };

    let mut simulator = Simulator::new(config)?;
    let initial = simulator.initial_estimate();
    let mut runner = Runner::new(simulator.config(), initial)?;
    let report_every = (simulator.config().steps / 10).max(1);

    for tick in simulator {
        runner.step(&tick);

        if tick.step % report_every == 0 {
            let position = tick.truth.translation();
            info!(
                "t = {:.2} s, position = ({:.3}, {:.3}, {:.3})",
                tick.time, position.x, position.y, position.z
            );
            for filter in runner.filters() {
                info!(
                    "  {:<5} |d| = {:.6}",
                    filter.kind(),
                    tick.truth.minus(filter.state()).norm()
                );
            }
        }
    }

    for summary in runner.summaries() {
        info!("{summary}");
    }
    for (kind, failures) in runner.failures() {
        if failures > 0 {
            info!("{kind}: {failures} skipped calls");
        }
    }
    Ok(())
}
