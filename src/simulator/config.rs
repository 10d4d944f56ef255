//! Simulation run configuration.

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of iterations to run
    pub iterations: u32,

    /// Base random seed; iteration i uses seed + i
    pub seed: u64,

    /// Encounter length in seconds
    pub duration_secs: f64,

    /// Number of enemy targets in the encounter
    pub num_targets: u32,

    /// Chance for the player's spells to miss the targets, as a fraction
    pub target_miss_chance: f64,

    /// Capture the combat log of the last iteration
    pub log_enabled: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            seed: 1,
            duration_secs: 60.0,
            num_targets: 1,
            target_miss_chance: 0.0,
            log_enabled: false,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.iterations == 0 {
            return Err("iterations must be at least 1".to_string());
        }
        if self.duration_secs <= 0.0 {
            return Err("duration must be positive".to_string());
        }
        if self.num_targets == 0 {
            return Err("encounter needs at least one target".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_iterations() {
        let config = SimConfig {
            iterations: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_nonpositive_duration() {
        let config = SimConfig {
            duration_secs: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
