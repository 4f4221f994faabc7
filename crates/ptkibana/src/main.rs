mod config;
mod error;
mod http;
mod log;
mod modules;
mod report;
mod scan;

pub use error::{Error, Result};

use clap::{value_parser, Arg, ArgAction, Command};
use config::{Config, DEFAULT_USER_AGENT};
use log::init_tracing_subscriber;
use report::{Report, ReportSink, Severity, Status};
use scan::scan;
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info};

fn main() -> Result<()> {
    let args = cli().get_matches();
    let config = Config::from_matches(&args)?;

    // one log file per run
    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    init_tracing_subscriber(config.log_dir.as_deref(), &timestamp.to_string())?;

    info!("Scanning {} (run_{})", config.url, timestamp);
    let mut report = Report::stdout();
    run(&config, &mut report, scan)
}

/// Banner, checks, then the final status. A failed scan is still reported
/// before its error is returned.
fn run<W, F>(config: &Config, report: &mut Report<W>, scan: F) -> Result<()>
where
    W: Write + Send,
    F: FnOnce(&Config, &mut dyn ReportSink) -> Result<()>,
{
    report.print_line(
        &format!("{} v{}", clap::crate_name!(), clap::crate_version!()),
        Severity::Additions,
        0,
        !config.json,
    )?;

    match scan(config, report) {
        Ok(()) => {
            info!("{} nodes reported", report.nodes().len());
            report.set_status(Status::Finished, "");
            if config.json {
                report.print_json()?;
            }
            Ok(())
        }
        Err(err) => {
            error!("{:12} - {}", "SCAN ERROR", err);
            report.set_status(Status::Error, err.to_string());
            if config.json {
                report.print_json()?;
            } else {
                report.print_line(&err.to_string(), Severity::Error, 0, true)?;
            }
            Err(err)
        }
    }
}

fn cli() -> Command {
    Command::new(clap::crate_name!())
        .version(clap::crate_version!())
        .about("Kibana security assessment")
        .arg(
            Arg::new("url")
                .short('u')
                .long("url")
                .value_name("URL")
                .help("Connect to URL")
                .required(true),
        )
        .arg(
            Arg::new("proxy")
                .short('p')
                .long("proxy")
                .value_name("PROXY")
                .help("Set proxy (e.g. http://127.0.0.1:8080)"),
        )
        .arg(
            Arg::new("timeout")
                .short('T')
                .long("timeout")
                .value_name("SECONDS")
                .value_parser(value_parser!(u64))
                .default_value("10")
                .help("Set timeout"),
        )
        .arg(
            Arg::new("user-agent")
                .short('a')
                .long("user-agent")
                .value_name("USER_AGENT")
                .default_value(DEFAULT_USER_AGENT)
                .help("Set User-Agent header"),
        )
        .arg(
            Arg::new("cookie")
                .short('c')
                .long("cookie")
                .value_name("COOKIE")
                .help("Set cookie"),
        )
        .arg(
            Arg::new("headers")
                .short('H')
                .long("headers")
                .value_name("HEADER:VALUE")
                .num_args(1..)
                .action(ArgAction::Append)
                .help("Set custom header(s)"),
        )
        .arg(
            Arg::new("redirects")
                .short('r')
                .long("redirects")
                .action(ArgAction::SetTrue)
                .help("Follow redirects"),
        )
        .arg(
            Arg::new("json")
                .short('j')
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Output in JSON format"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Show raw responses of failed checks"),
        )
        .arg(
            Arg::new("log-dir")
                .long("log-dir")
                .value_name("DIR")
                .help("Save logs into a .log file in DIR"),
        )
        .arg_required_else_help(true)
}
