use clap::Parser;
use msd::engine::FlippingAlgorithm;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "MSD worker - drives a molecular spintronic device simulation over a line protocol on stdin/stdout.",
    after_help = "The first input line configures the lattice. Commands: SET, RUN, GET, RESET, EXIT.",
    help_template = HELP_TEMPLATE,
)]
pub struct Cli {
    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Path to a worker configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Seed for the engine's random number generator.
    /// A startup request carrying its own seed takes precedence.
    #[arg(short, long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Spin proposal used by the Metropolis engine (e.g., 'continuous-spin', 'up-down').
    #[arg(short = 'a', long, value_name = "ALGORITHM")]
    pub flipping_algorithm: Option<FlippingAlgorithm>,

    /// Control line that cancels a running simulation at its next checkpoint.
    #[arg(long, value_name = "TOKEN")]
    pub cancel_token: Option<String>,
}
