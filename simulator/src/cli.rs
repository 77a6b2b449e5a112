use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments of the `dispatch-simulator` binary.
///
/// Every flag is optional; a flag that is given overrides the matching value
/// from the configuration file and environment.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "dispatch-simulator",
    version,
    about = "Dispatch a batch in paced chunks to a simulated rate-limited downstream"
)]
pub struct Args {
    /// Path to the configuration file. A missing file is not an error.
    #[arg(short, long, default_value = "simulator.toml")]
    pub config: PathBuf,

    /// Number of sequential items in the batch.
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Items per chunk advertised by the downstream. Zero disables dispatch.
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Interval between chunks, in milliseconds.
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Simulated processing latency per chunk, in milliseconds.
    #[arg(long)]
    pub latency_ms: Option<u64>,

    /// Zero-based chunk index the downstream rejects.
    #[arg(long)]
    pub fail_at_chunk: Option<usize>,

    /// Overall deadline for the dispatch, in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Do not enforce the advertised limits downstream.
    #[arg(long, default_value_t = false)]
    pub no_quota: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}
