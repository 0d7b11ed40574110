use tracing::{debug, warn};

use crate::{
    error::{ConfigError, NumericalError},
    filter::{Filter, FilterKind, KalmanFilter, Ukfm},
    lie::SE3,
};

use super::{DeadReckoning, ErrorStats, Models, ScenarioConfig, Summary, Tick};

/// Name of the uncorrected baseline in summaries.
pub const BASELINE: &str = "UNFI";

struct Tracked {
    filter: Filter<SE3<f64>, 6>,
    stats: ErrorStats,
    failures: usize,
}

impl Tracked {
    fn check(&mut self, result: Result<(), NumericalError>) {
        if let Err(e) = result {
            self.failures += 1;
            warn!("[{}] step skipped: {}", self.filter.kind(), e);
        }
    }
}

/// Drives the configured filters and a dead-reckoning baseline in lock-step
/// over the ticks of a scenario, recording their errors.
pub struct Runner {
    models: Models,
    filters: Vec<Tracked>,
    baseline: DeadReckoning<SE3<f64>>,
    baseline_stats: ErrorStats,
}

impl Runner {
    pub fn new(config: &ScenarioConfig, initial: SE3<f64>) -> Result<Self, ConfigError> {
        let models = config.models()?;
        let cov = config.initial_covariance();
        let filters = config
            .filters
            .iter()
            .map(|&kind| -> Result<Tracked, ConfigError> {
                let filter = match kind {
                    FilterKind::Ukfm => Filter::Ukfm(Ukfm::with_config(
                        initial.clone(),
                        cov.clone(),
                        config.unscented,
                    )?),
                    kind => Filter::new(kind, initial.clone(), cov.clone())?,
                };
                Ok(Tracked {
                    filter,
                    stats: ErrorStats::new(kind.name(), config.warmup),
                    failures: 0,
                })
            })
            .collect::<Result<_, _>>()?;
        debug!("[Runner] {} filters", config.filters.len());

        Ok(Self {
            models,
            filters,
            baseline: DeadReckoning::new(initial),
            baseline_stats: ErrorStats::new(BASELINE, config.warmup),
        })
    }

    #[inline]
    pub fn models(&self) -> &Models {
        &self.models
    }

    /// Propagates every filter with the tick's control, then applies its
    /// measurements. A numerical failure skips that call for that filter only.
    pub fn step(&mut self, tick: &Tick) {
        let Self {
            models,
            filters,
            baseline,
            baseline_stats,
        } = self;

        for tracked in filters.iter_mut() {
            let result = tracked.filter.propagate(&models.motion, &tick.control);
            tracked.check(result);

            for (model, measurement) in models.landmarks.iter().zip(&tick.landmarks) {
                let result = tracked.filter.update(model, measurement);
                tracked.check(result);
            }
            if let Some(fix) = &tick.gps {
                let result = tracked.filter.update(&models.gps, fix);
                tracked.check(result);
            }

            let cov = tracked.filter.covariance();
            tracked
                .stats
                .record(&tick.truth, tracked.filter.state(), Some(&cov));
        }

        baseline.propagate(&models.motion, &tick.control);
        baseline_stats.record(&tick.truth, baseline.state(), None);
    }

    pub fn filters(&self) -> impl Iterator<Item = &Filter<SE3<f64>, 6>> {
        self.filters.iter().map(|tracked| &tracked.filter)
    }

    /// Number of skipped calls per filter, in configuration order.
    pub fn failures(&self) -> Vec<(FilterKind, usize)> {
        self.filters
            .iter()
            .map(|tracked| (tracked.filter.kind(), tracked.failures))
            .collect()
    }

    /// One summary per filter, then the baseline.
    pub fn summaries(&self) -> Vec<Summary> {
        self.filters
            .iter()
            .map(|tracked| tracked.stats.summary())
            .chain(std::iter::once(self.baseline_stats.summary()))
            .collect()
    }
}
