use crate::{Error, Result};
use clap::ArgMatches;
use lazy_regex::regex_captures;
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

// region:        --- Defaults

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_USER_AGENT: &str = "Penterep Tools";

// endregion:     --- Defaults

/// Options for one run, resolved once from the command line.
#[derive(Debug, Clone)]
pub struct Config {
    /// Target base URL, always ending with `/`.
    pub url: Url,
    pub proxy: Option<String>,
    pub timeout: Duration,
    pub redirects: bool,
    /// Final request headers, sent as is by every check.
    pub headers: Vec<(String, String)>,
    pub json: bool,
    pub verbose: bool,
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_matches(args: &ArgMatches) -> Result<Self> {
        let url = args
            .get_one::<String>("url")
            .ok_or_else(|| Error::CliUsage("Missing target url".into()))?;
        let url = parse_base_url(url)?;

        let user_agent = args
            .get_one::<String>("user-agent")
            .map(String::as_str)
            .unwrap_or(DEFAULT_USER_AGENT);
        let cookie = args.get_one::<String>("cookie").map(String::as_str);
        let custom_headers = args
            .get_many::<String>("headers")
            .map(|values| values.map(|value| parse_header_pair(value)).collect::<Result<Vec<_>>>())
            .unwrap_or_else(|| Ok(Vec::new()))?;

        Ok(Self {
            url,
            proxy: args.get_one::<String>("proxy").cloned(),
            timeout: Duration::from_secs(
                *args.get_one::<u64>("timeout").unwrap_or(&DEFAULT_TIMEOUT_SECS),
            ),
            redirects: args.get_flag("redirects"),
            headers: request_headers(user_agent, cookie, custom_headers),
            json: args.get_flag("json"),
            verbose: args.get_flag("verbose"),
            log_dir: args.get_one::<String>("log-dir").map(PathBuf::from),
        })
    }

    /// Resolve `path` against the target base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.url
            .join(path)
            .map_err(|err| Error::InvalidUrl(format!("{}{}: {}", self.url, path, err)))
    }
}

// region:        --- Parsing utils

pub fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url =
        Url::parse(raw.trim()).map_err(|err| Error::InvalidUrl(format!("{}: {}", raw, err)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::InvalidUrl(format!(
            "{}: scheme must be http or https",
            raw
        )));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// Parse a `Name: value` pair given on the command line.
pub fn parse_header_pair(raw: &str) -> Result<(String, String)> {
    match regex_captures!(r"^\s*([!#$%&'*+.^_`|~0-9A-Za-z-]+)\s*:\s*(.*?)\s*$", raw) {
        Some((_, name, value)) => Ok((name.to_string(), value.to_string())),
        None => Err(Error::InvalidHeader(raw.to_string())),
    }
}

/// User-Agent first, then Cookie, then custom headers. A custom header replaces
/// an earlier one with the same name.
fn request_headers(
    user_agent: &str,
    cookie: Option<&str>,
    custom_headers: Vec<(String, String)>,
) -> Vec<(String, String)> {
    let mut headers = vec![("User-Agent".to_string(), user_agent.to_string())];
    if let Some(cookie) = cookie {
        headers.push(("Cookie".to_string(), cookie.to_string()));
    }

    for (name, value) in custom_headers {
        match headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(header) => header.1 = value,
            None => headers.push((name, value)),
        }
    }

    headers
}

// endregion:     --- Parsing utils
