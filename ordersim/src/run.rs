use anyhow::Context as _;
use std::path::Path;

use ordersim_core::runner::{LoadConfig, LoadTestRunner, ResultsSummary};

use crate::cli::RunArgs;
use crate::exit_codes::ExitCode;
use crate::output;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Bad config file or rejected configuration.
    #[error("{0:#}")]
    Invalid(anyhow::Error),

    /// The run itself (or report writing) failed.
    #[error("{0:#}")]
    Runtime(anyhow::Error),
}

impl RunError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            RunError::Invalid(_) => ExitCode::InvalidInput,
            RunError::Runtime(_) => ExitCode::RuntimeError,
        }
    }
}

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let out = output::formatter(args.output);

    let mut config = match &args.config {
        Some(path) => load_config(path).await.map_err(RunError::Invalid)?,
        None => LoadConfig::default(),
    };
    apply_overrides(&mut config, &args);

    let runner = LoadTestRunner::new(config)
        .map_err(|err| RunError::Invalid(anyhow::Error::new(err).context("invalid configuration")))?;

    out.print_header(runner.config());

    let runner = match out.progress() {
        Some(progress) => runner.with_progress(progress),
        None => runner,
    };

    let stats = runner
        .run()
        .await
        .map_err(|err| RunError::Runtime(anyhow::Error::new(err).context("load test failed")))?;

    out.print_summary(&stats).map_err(RunError::Runtime)?;
    out.print_results(&ResultsSummary::from_statistics(&stats))
        .map_err(RunError::Runtime)?;

    if stats.threshold_violations.is_empty() {
        Ok(ExitCode::Success)
    } else {
        Ok(ExitCode::ThresholdsFailed)
    }
}

async fn load_config(path: &Path) -> anyhow::Result<LoadConfig> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("invalid config: {}", path.display()))
}

/// CLI flags take precedence over the config file.
fn apply_overrides(config: &mut LoadConfig, args: &RunArgs) {
    if let Some(users) = args.users {
        config.concurrent_users = users;
    }
    if let Some(duration) = args.duration {
        config.test_duration_secs = duration.as_secs().max(1);
    }
    if let Some(ramp_up) = args.ramp_up {
        config.ramp_up_secs = ramp_up.as_secs();
    }
    if let Some(url) = &args.base_url {
        config.base_url = url.clone();
    }
    if let Some(url) = &args.dashboard_url {
        config.dashboard_url = url.clone();
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(dir) = &args.output_dir {
        config.report.output_dir = dir.to_string_lossy().into_owned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use std::time::Duration;

    fn args() -> RunArgs {
        RunArgs {
            config: None,
            users: None,
            duration: None,
            ramp_up: None,
            base_url: None,
            dashboard_url: None,
            seed: None,
            output_dir: None,
            output: OutputFormat::HumanReadable,
        }
    }

    #[test]
    fn overrides_win_over_config_values() {
        let mut config = LoadConfig::default();
        let args = RunArgs {
            users: Some(5),
            duration: Some(Duration::from_secs(120)),
            ramp_up: Some(Duration::from_secs(2)),
            base_url: Some("http://localhost:8080".to_string()),
            seed: Some(9),
            ..args()
        };

        apply_overrides(&mut config, &args);
        assert_eq!(config.concurrent_users, 5);
        assert_eq!(config.test_duration_secs, 120);
        assert_eq!(config.ramp_up_secs, 2);
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.seed, Some(9));
    }

    #[test]
    fn sub_second_duration_rounds_up_to_one_second() {
        let mut config = LoadConfig::default();
        let args = RunArgs {
            duration: Some(Duration::from_millis(500)),
            ..args()
        };

        apply_overrides(&mut config, &args);
        assert_eq!(config.test_duration_secs, 1);
    }

    #[test]
    fn no_overrides_leave_config_untouched() {
        let mut config = LoadConfig::default();
        apply_overrides(&mut config, &args());
        assert_eq!(config.concurrent_users, 50);
        assert_eq!(config.test_duration_secs, 60);
        assert_eq!(config.seed, None);
    }
}
