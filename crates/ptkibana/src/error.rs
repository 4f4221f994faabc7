use derive_more::From;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, From)]
pub enum Error {
    // -- CLI
    CliUsage(String),
    InvalidUrl(String),
    InvalidHeader(String),

    // -- Externals
    #[from]
    SystemTime(std::time::SystemTimeError),

    #[from]
    File(std::io::Error),

    #[from]
    Reqwest(reqwest::Error),

    #[from]
    HeaderName(reqwest::header::InvalidHeaderName),

    #[from]
    HeaderValue(reqwest::header::InvalidHeaderValue),

    #[from]
    SerdeJson(serde_json::Error),

    #[from]
    LogFile(tracing_appender::rolling::InitError),

    #[from]
    Tracing(tracing::subscriber::SetGlobalDefaultError),
}

// region:    --- Error Boilerplate

impl core::fmt::Display for Error {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::result::Result<(), core::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl std::error::Error for Error {}

// endregion: --- Error Boilerplate
