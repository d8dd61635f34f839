mod human;
mod json;

use ordersim_core::runner::{LoadConfig, ProgressFn, ResultsSummary, Statistics};

use crate::cli::OutputFormat;

pub trait OutputFormatter {
    fn print_header(&self, config: &LoadConfig);

    /// Callback wired into the runner for live phase/tick events.
    fn progress(&self) -> Option<ProgressFn>;

    fn print_summary(&self, stats: &Statistics) -> anyhow::Result<()>;

    /// The CI results shape consumed by the notification glue.
    fn print_results(&self, results: &ResultsSummary) -> anyhow::Result<()>;
}

pub fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanOutput),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}
