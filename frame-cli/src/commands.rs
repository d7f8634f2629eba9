use std::path::Path;
use std::time::Duration;

use frame_player::{
    ChannelCatalog, ChannelDescriptor, PlatformCapabilities, StaticCatalog, StreamSourceResolver,
};
use tracing::info;

use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::output::OutputManager;
use crate::script::{self, Scenario};

pub struct CommandExecutor {
    config: AppConfig,
    output: OutputManager,
}

impl CommandExecutor {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            output: OutputManager::new(cfg!(feature = "colored-output")),
        }
    }

    pub fn resolve(
        &self,
        url: &str,
        capabilities: PlatformCapabilities,
        format: OutputFormat,
    ) -> Result<()> {
        let resolver = StreamSourceResolver::new(&self.config.player.hls);
        let plan = resolver.resolve(&ChannelDescriptor::new(url, url), capabilities);
        println!("{}", self.output.format_plan(url, &plan, format)?);
        Ok(())
    }

    pub async fn probe(&self, url: &str, timeout: Option<u64>, format: OutputFormat) -> Result<()> {
        let timeout = Duration::from_secs(timeout.unwrap_or(self.config.probe_timeout_secs));
        let report = crate::probe::probe(url, timeout, &self.config.user_agent).await?;
        println!("{}", self.output.format_probe(&report, format)?);
        Ok(())
    }

    pub async fn channels(&self, file: &Path, format: OutputFormat) -> Result<()> {
        let catalog = StaticCatalog::from_path(file).await?;
        let groups = catalog.groups().await?;
        info!(groups = groups.len(), "Catalog loaded");
        println!("{}", self.output.format_groups(&groups, format)?);
        Ok(())
    }

    pub async fn simulate(
        &self,
        script_path: &Path,
        time_scale: Option<f64>,
        format: OutputFormat,
    ) -> Result<()> {
        let mut config = self.config.clone();
        if let Some(scale) = time_scale {
            config.time_scale = scale;
        }
        config.validate()?;

        let scenario = Scenario::from_path(script_path).await?;
        let report = script::run(&scenario, config.scaled_player(), config.time_scale).await?;
        println!("{}", self.output.format_scenario(&report, format)?);

        if report.transports_live > 1 {
            return Err(AppError::scenario(format!(
                "{} transport instances left alive",
                report.transports_live
            )));
        }
        Ok(())
    }
}
