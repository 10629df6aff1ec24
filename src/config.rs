use std::time::Duration;

/// Number of colors in the palette at startup
pub const DEFAULT_COLOR_COUNT: usize = 21;

/// Side of one cell in pixels at startup
pub const DEFAULT_SCALE: u32 = 3;

/// Interval between simulation ticks
pub const TICK_INTERVAL_MS: u64 = 25;

/// Delay between detecting stagnation and restarting
pub const RESTART_DELAY_MS: u64 = 800;

/// Debounce delay after a window resize (longer than the restart delay)
pub const RESIZE_DELAY_MS: u64 = 1000;

/// A run is force-restarted after this long, regardless of activity
pub const MAX_RUN_LIFETIME_MS: u64 = 30 * 60 * 1000;

/// Initial window size in logical pixels
pub const DEFAULT_WINDOW_WIDTH: u32 = 1024;
pub const DEFAULT_WINDOW_HEIGHT: u32 = 768;

/// Environment overrides read by [`Settings::from_env`]
pub const ENV_SEED: &str = "CCA_SEED";
pub const ENV_COLORS: &str = "CCA_COLORS";
pub const ENV_SCALE: &str = "CCA_SCALE";

/// Timing and startup parameters of a simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub tick_interval: Duration,
    pub restart_delay: Duration,
    pub resize_delay: Duration,
    pub max_run_lifetime: Duration,
    pub color_count: usize,
    pub scale: u32,
    /// Fixed RNG seed; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(TICK_INTERVAL_MS),
            restart_delay: Duration::from_millis(RESTART_DELAY_MS),
            resize_delay: Duration::from_millis(RESIZE_DELAY_MS),
            max_run_lifetime: Duration::from_millis(MAX_RUN_LIFETIME_MS),
            color_count: DEFAULT_COLOR_COUNT,
            scale: DEFAULT_SCALE,
            seed: None,
        }
    }
}

impl Settings {
    /// Defaults with overrides from `CCA_SEED`, `CCA_COLORS` and `CCA_SCALE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();

        if let Some(seed) = parse_var::<u64>(&lookup, ENV_SEED) {
            settings.seed = Some(seed);
        }
        if let Some(colors) = parse_var::<usize>(&lookup, ENV_COLORS) {
            settings.color_count = colors.max(1);
        }
        if let Some(scale) = parse_var::<u32>(&lookup, ENV_SCALE) {
            settings.scale = scale.max(1);
        }

        settings
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring {}={:?}: not a valid number", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_delay_longer_than_restart() {
        let settings = Settings::default();
        assert!(settings.resize_delay > settings.restart_delay);
    }

    #[test]
    fn test_env_overrides() {
        let settings = Settings::from_lookup(|key| match key {
            ENV_SEED => Some("42".to_string()),
            ENV_COLORS => Some(" 7 ".to_string()),
            ENV_SCALE => Some("0".to_string()),
            _ => None,
        });
        assert_eq!(settings.seed, Some(42));
        assert_eq!(settings.color_count, 7);
        // Clamped, never rejected
        assert_eq!(settings.scale, 1);
    }

    #[test]
    fn test_invalid_env_values_ignored() {
        let settings = Settings::from_lookup(|key| match key {
            ENV_SEED => Some("not-a-seed".to_string()),
            ENV_COLORS => Some("-3".to_string()),
            _ => None,
        });
        assert_eq!(settings, Settings::default());
    }
}
