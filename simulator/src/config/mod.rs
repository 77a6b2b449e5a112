use crate::cli::Args;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub mod validation;

pub use validation::ConfigValidationError;

/// Environment prefix for overrides, e.g. `DISPATCH_LIMITS__CHUNK_SIZE=25`.
const ENV_PREFIX: &str = "DISPATCH";

/// Load configuration from `path` (optional) and the environment.
///
/// A `.env` file in the working directory is read first; environment
/// entries override file values.
pub fn load(path: &Path) -> Result<SimulatorConfig, ConfigError> {
    dotenv::dotenv().ok();

    let env_source = Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true);

    Config::builder()
        .add_source(File::from(path).required(false))
        .add_source(env_source)
        .build()?
        .try_deserialize::<SimulatorConfig>()
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct SimulatorConfig {
    #[serde(default)]
    batch: BatchConfig,
    #[serde(default)]
    limits: LimitsConfig,
    #[serde(default)]
    downstream: DownstreamConfig,
    #[serde(default)]
    run: RunConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl SimulatorConfig {
    pub fn batch(&self) -> &BatchConfig {
        &self.batch
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    pub fn downstream(&self) -> &DownstreamConfig {
        &self.downstream
    }

    pub fn run(&self) -> &RunConfig {
        &self.run
    }

    pub fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    /// Apply command-line flags on top of file and environment values.
    pub fn apply_overrides(&mut self, args: &Args) {
        if let Some(size) = args.batch_size {
            self.batch.size = Some(size);
        }
        if let Some(chunk_size) = args.chunk_size {
            self.limits.chunk_size = Some(chunk_size);
        }
        if let Some(interval_ms) = args.interval_ms {
            self.limits.interval_ms = Some(interval_ms);
        }
        if let Some(latency_ms) = args.latency_ms {
            self.downstream.latency_ms = Some(latency_ms);
        }
        if let Some(chunk) = args.fail_at_chunk {
            self.downstream.fail_at_chunk = Some(chunk);
        }
        if args.no_quota {
            self.downstream.enforce_quota = Some(false);
        }
        if let Some(timeout_secs) = args.timeout_secs {
            self.run.timeout_secs = Some(timeout_secs);
        }
        if let Some(level) = &args.log_level {
            self.logging.level = Some(level.clone());
        }
    }
}

/// Batch generation configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct BatchConfig {
    size: Option<usize>,
}

impl BatchConfig {
    /// Number of sequential items to dispatch (default: 100)
    pub fn size(&self) -> usize {
        self.size.unwrap_or(100)
    }
}

/// Limits advertised by the simulated downstream
#[derive(Debug, Deserialize, Default, Clone)]
pub struct LimitsConfig {
    chunk_size: Option<usize>,
    interval_ms: Option<u64>,
}

impl LimitsConfig {
    /// Items per chunk, zero disables dispatch (default: 13)
    pub fn chunk_size(&self) -> usize {
        self.chunk_size.unwrap_or(13)
    }

    /// Interval in milliseconds (default: 1000)
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms.unwrap_or(1000)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms())
    }
}

/// Behaviour of the simulated downstream
#[derive(Debug, Deserialize, Default, Clone)]
pub struct DownstreamConfig {
    latency_ms: Option<u64>,
    fail_at_chunk: Option<usize>,
    enforce_quota: Option<bool>,
}

impl DownstreamConfig {
    /// Per-call latency in milliseconds (default: 0)
    pub fn latency_ms(&self) -> u64 {
        self.latency_ms.unwrap_or(0)
    }

    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms())
    }

    /// Chunk index that fails, if any (default: none)
    pub fn fail_at_chunk(&self) -> Option<usize> {
        self.fail_at_chunk
    }

    /// Reject chunks that arrive faster than the limits allow (default: true)
    pub fn enforce_quota(&self) -> bool {
        self.enforce_quota.unwrap_or(true)
    }
}

/// Run control configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct RunConfig {
    timeout_secs: Option<u64>,
}

impl RunConfig {
    /// Overall dispatch deadline in seconds (default: none)
    pub fn timeout_secs(&self) -> Option<u64> {
        self.timeout_secs
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Additional logging configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct LoggingConfig {
    level: Option<String>,
    file: Option<String>,
}

impl LoggingConfig {
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or("info")
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }
}
