pub mod roles;

use crate::config::Config;
use crate::http::HttpClient;
use crate::report::{ReportSink, Severity};
use crate::Result;
use async_trait::async_trait;
use roles::RoleEnumeration;
use tracing::{info, instrument};

pub trait Module {
    fn name(&self) -> String;
    fn description(&self) -> String;
}

#[async_trait]
pub trait KibanaModule: Module + Send + Sync {
    async fn run(
        &self,
        config: &Config,
        http_client: &dyn HttpClient,
        report: &mut dyn ReportSink,
    ) -> Result<()>;
}

pub fn all_modules() -> Vec<Box<dyn KibanaModule>> {
    vec![Box::new(RoleEnumeration::new())]
}

/// Run every check in order, each under its own header. The first transport
/// error stops the run.
#[instrument(name = "checks", level = "info", skip_all)]
pub async fn run_all(
    modules: &[Box<dyn KibanaModule>],
    config: &Config,
    http_client: &dyn HttpClient,
    report: &mut dyn ReportSink,
) -> Result<()> {
    for module in modules {
        info!("Running {}", module.name());
        report.print_line(&module.description(), Severity::Title, 0, !config.json)?;
        module.run(config, http_client, report).await?;
    }
    Ok(())
}
