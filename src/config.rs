use crate::notifications::dispatcher::DEFAULT_PHASE_NOTICE_SECS;
use crate::scheduler::PhaseDurations;
use crate::ticker::DEFAULT_TICK_MS;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Phase notices never outlive an hour
const MAX_PHASE_NOTICE_SECS: u64 = 60 * 60;

/// User configuration stored in config.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Length of a work phase
    pub work_minutes: u32,
    /// Length of a break phase
    pub break_minutes: u32,
    /// How often the run loop polls timers
    pub tick_ms: u64,
    /// Seconds before phase notifications clear themselves
    pub phase_notice_secs: u64,
    /// Default log level when RUST_LOG is not set
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            break_minutes: 5,
            tick_ms: DEFAULT_TICK_MS,
            phase_notice_secs: DEFAULT_PHASE_NOTICE_SECS,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn phase_durations(&self) -> PhaseDurations {
        PhaseDurations::from_minutes(self.work_minutes, self.break_minutes)
    }

    pub fn phase_notice(&self) -> chrono::Duration {
        let secs = self.phase_notice_secs.min(MAX_PHASE_NOTICE_SECS);
        chrono::Duration::seconds(secs as i64)
    }

    /// Reject values that would make the timer spin or never fire
    pub fn validate(&self) -> Result<()> {
        if self.work_minutes == 0 {
            anyhow::bail!("work_minutes must be greater than zero");
        }
        if self.break_minutes == 0 {
            anyhow::bail!("break_minutes must be greater than zero");
        }
        if self.tick_ms == 0 {
            anyhow::bail!("tick_ms must be greater than zero");
        }
        if self.phase_notice_secs > MAX_PHASE_NOTICE_SECS {
            anyhow::bail!(
                "phase_notice_secs must be at most {}",
                MAX_PHASE_NOTICE_SECS
            );
        }
        Ok(())
    }
}

/// Load configuration from config.json, falling back to defaults if it doesn't exist
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();

    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let config: Config = serde_json::from_str(&content)
        .with_context(|| format!("Invalid config: {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid config: {}", path.display()))?;
    Ok(config)
}
