use super::SimulatorConfig;

pub const MAX_BATCH_SIZE: usize = 1_000_000;
pub const MAX_CHUNK_SIZE: usize = 100_000;
pub const MAX_INTERVAL_MS: u64 = 3_600_000;
pub const MAX_LATENCY_MS: u64 = 600_000;
pub const MAX_TIMEOUT_SECS: u64 = 86_400;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid batch.size: {configured} (limit: {limit})")]
    BatchSize { configured: usize, limit: usize },
    #[error("Invalid limits.chunk_size: {configured} (limit: {limit})")]
    ChunkSize { configured: usize, limit: usize },
    #[error("Invalid limits.interval_ms: {configured} (limit: {limit})")]
    Interval { configured: u64, limit: u64 },
    #[error("Invalid downstream.latency_ms: {configured} (limit: {limit})")]
    Latency { configured: u64, limit: u64 },
    #[error("Invalid run.timeout_secs: {configured} (min: 1, max: {limit})")]
    Timeout { configured: u64, limit: u64 },
    #[error("Invalid logging.level: {configured}")]
    LogLevel { configured: String },
}

impl ConfigValidationError {
    pub fn user_message(&self) -> String {
        match self {
            ConfigValidationError::BatchSize { configured, limit } => format!(
                "Batch size too large!\n\
                Your configured value: {configured}\n\
                Maximum: {limit}\n\
                Please update [batch] size in simulator.toml or pass a smaller --batch-size."
            ),
            ConfigValidationError::ChunkSize { configured, limit } => format!(
                "Chunk size too large!\n\
                Your configured value: {configured}\n\
                Maximum: {limit}\n\
                Please update [limits] chunk_size in simulator.toml."
            ),
            ConfigValidationError::Interval { configured, limit } => format!(
                "Dispatch interval too long!\n\
                Your configured value: {configured} ms\n\
                Maximum: {limit} ms\n\
                Please update [limits] interval_ms in simulator.toml."
            ),
            ConfigValidationError::Latency { configured, limit } => format!(
                "Downstream latency too long!\n\
                Your configured value: {configured} ms\n\
                Maximum: {limit} ms\n\
                Please update [downstream] latency_ms in simulator.toml."
            ),
            ConfigValidationError::Timeout { configured, limit } => format!(
                "Run timeout out of range!\n\
                Your configured value: {configured} seconds\n\
                Valid range: 1 - {limit} seconds\n\
                Please update [run] timeout_secs in simulator.toml, \
                or remove it to run without a deadline."
            ),
            ConfigValidationError::LogLevel { configured } => format!(
                "Unknown log level '{configured}'!\n\
                Valid levels: {}\n\
                Please update [logging] level in simulator.toml.",
                LOG_LEVELS.join(", ")
            ),
        }
    }
}

impl SimulatorConfig {
    /// Check every value against the simulator's hard limits.
    pub fn validate(&self) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        if self.batch().size() > MAX_BATCH_SIZE {
            errors.push(ConfigValidationError::BatchSize {
                configured: self.batch().size(),
                limit: MAX_BATCH_SIZE,
            });
        }

        if self.limits().chunk_size() > MAX_CHUNK_SIZE {
            errors.push(ConfigValidationError::ChunkSize {
                configured: self.limits().chunk_size(),
                limit: MAX_CHUNK_SIZE,
            });
        }

        // A zero interval is left to the dispatcher, which rejects it itself.
        if self.limits().interval_ms() > MAX_INTERVAL_MS {
            errors.push(ConfigValidationError::Interval {
                configured: self.limits().interval_ms(),
                limit: MAX_INTERVAL_MS,
            });
        }

        if self.downstream().latency_ms() > MAX_LATENCY_MS {
            errors.push(ConfigValidationError::Latency {
                configured: self.downstream().latency_ms(),
                limit: MAX_LATENCY_MS,
            });
        }

        if let Some(timeout_secs) = self.run().timeout_secs() {
            if timeout_secs == 0 || timeout_secs > MAX_TIMEOUT_SECS {
                errors.push(ConfigValidationError::Timeout {
                    configured: timeout_secs,
                    limit: MAX_TIMEOUT_SECS,
                });
            }
        }

        let level = self.logging().level().to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            errors.push(ConfigValidationError::LogLevel {
                configured: self.logging().level().to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
