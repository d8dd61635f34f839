use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary.
    HumanReadable,
    /// Emit JSON progress lines (NDJSON) to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "ordersim",
    author,
    version,
    about = "Load-testing harness for the restaurant-ordering platform",
    long_about = "ordersim drives weighted user journeys (ordering, admin dashboard, split \
payments, menu browsing) against the platform's HTTP API with a configurable number of \
virtual users, then writes HTML/JSON/CSV performance reports and evaluates the run against \
response-time, error-rate and throughput thresholds.",
    after_help = "Examples:\n  ordersim init\n  ordersim run ordersim.yaml\n  ordersim run ordersim.yaml --users 100 --duration 2m\n  ordersim run --base-url https://staging.example.test --seed 42 --output json"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a load test
    #[command(
        long_about = "Run a load test against the configured platform. CLI flags override \
values from the YAML config; with no config file the built-in defaults are used."
    )]
    Run(RunArgs),

    /// Scaffold a commented configuration file
    Init(InitArgs),
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Target directory for the config file (created if missing)
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to the YAML config (built-in defaults when omitted)
    pub config: Option<PathBuf>,

    /// Number of concurrent virtual users
    #[arg(long)]
    pub users: Option<u64>,

    /// Test duration (e.g. 30s, 2m)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// Ramp-up window over which users are launched (e.g. 10s)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub ramp_up: Option<Duration>,

    /// Override the customer-facing API origin
    #[arg(long)]
    pub base_url: Option<String>,

    /// Override the admin dashboard origin
    #[arg(long)]
    pub dashboard_url: Option<String>,

    /// RNG seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Report output directory
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_run_with_overrides() {
        let parsed = Cli::try_parse_from([
            "ordersim",
            "run",
            "perf.yaml",
            "--users",
            "100",
            "--duration",
            "2m",
            "--ramp-up",
            "10s",
            "--seed",
            "42",
            "--output",
            "json",
        ]);

        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.config, Some(PathBuf::from("perf.yaml")));
                assert_eq!(args.users, Some(100));
                assert_eq!(args.duration, Some(Duration::from_secs(120)));
                assert_eq!(args.ramp_up, Some(Duration::from_secs(10)));
                assert_eq!(args.seed, Some(42));
                assert!(matches!(args.output, OutputFormat::Json));
            }
            Command::Init(_) => panic!("expected run command"),
        }
    }

    #[test]
    fn cli_parses_run_without_config_file() {
        let parsed = Cli::try_parse_from(["ordersim", "run"]);
        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.config, None);
                assert!(matches!(args.output, OutputFormat::HumanReadable));
            }
            Command::Init(_) => panic!("expected run command"),
        }
    }

    #[test]
    fn cli_parses_init_defaults() {
        let parsed = Cli::try_parse_from(["ordersim", "init"]);
        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        match cli.command {
            Command::Init(args) => {
                assert_eq!(args.dir, PathBuf::from("."));
                assert!(!args.force);
            }
            Command::Run(_) => panic!("expected init command"),
        }
    }

    #[test]
    fn rejects_invalid_duration() {
        assert!(Cli::try_parse_from(["ordersim", "run", "--duration", "abc"]).is_err());
    }
}
