use crate::config::Config;
use crate::http::ReqwestClient;
use crate::modules;
use crate::report::ReportSink;
use crate::Result;
use tracing::{debug, instrument, trace};

// region:        --- Scan main function

#[tokio::main(flavor = "current_thread")]
#[instrument(name = "scan", level = "info", skip_all, fields(target = %config.url))]
pub async fn scan(config: &Config, report: &mut dyn ReportSink) -> Result<()> {
    trace!("Start scan on {}", config.url);

    let http_client = ReqwestClient::new(config)?;
    let modules = modules::all_modules();
    debug!("{} checks to run", modules.len());

    modules::run_all(&modules, config, &http_client, report).await
}

// endregion:     --- Scan main function
