use std::sync::{LazyLock, RwLock};

/// Process wide defaults, read when building reactions and sizing worker pools
pub static CONFIGURATION: LazyLock<RwLock<Configuration>> =
    LazyLock::new(|| RwLock::new(Configuration::default()));

#[derive(Clone, Debug)]
pub struct Configuration {
    /// Default lower flux bound for new reactions
    pub lower_bound: f64,
    /// Default upper flux bound for new reactions
    pub upper_bound: f64,
    /// Numerical tolerance used when reading solver output
    pub tolerance: f64,
    /// Number of worker threads used for parallel evaluation
    pub processes: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            lower_bound: -1000.,
            upper_bound: 1000.,
            tolerance: 1e-07,
            processes: num_cpus::get().max(1),
        }
    }
}

impl Configuration {
    /// Copy of the current global configuration
    ///
    /// Falls back to the defaults if the lock was poisoned by a panicking writer.
    pub fn current() -> Configuration {
        match CONFIGURATION.read() {
            Ok(config) => config.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
