use crate::config::Config;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::{Client, Method, Proxy, Url};
use tracing::{debug, error, info, instrument};

const MAX_REDIRECTS: usize = 10;

// region:        --- Models

/// What the checks need from a response: the status and the raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(
        &self,
        url: &Url,
        method: Method,
        headers: &[(String, String)],
    ) -> Result<HttpResponse>;
}

// endregion:     --- Models

// region:        --- Reqwest client

pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new(config: &Config) -> Result<Self> {
        let redirect = if config.redirects {
            Policy::limited(MAX_REDIRECTS)
        } else {
            Policy::none()
        };

        let mut builder = Client::builder().timeout(config.timeout).redirect(redirect);
        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(Proxy::all(proxy)?);
        }

        let client = builder.build()?;
        debug!("HTTP Client created: {:?}", client);

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(
        &self,
        url: &Url,
        method: Method,
        headers: &[(String, String)],
    ) -> Result<HttpResponse> {
        let res = http_request(&self.client, url, method, to_header_map(headers)?).await?;
        let status = res.status().as_u16();
        let body = res.text().await?;

        Ok(HttpResponse { status, body })
    }
}

// endregion:     --- Reqwest client

// region:        --- HTTP requests

#[instrument(name = "HTTP_request", level = "info", skip_all, fields(url = %url, method = %method))]
pub async fn http_request(
    http_client: &Client,
    url: &Url,
    method: Method,
    headers: HeaderMap,
) -> Result<reqwest::Response> {
    info!("Sending request");
    match http_client
        .request(method, url.clone())
        .headers(headers)
        .send()
        .await
    {
        Ok(res) => {
            info!("Receive with status: {}", res.status());
            debug!("Response: {:?}", res);
            Ok(res)
        }
        Err(err) => {
            error!("Reason: {}", err);
            Err(Error::Reqwest(err))
        }
    }
}

fn to_header_map(headers: &[(String, String)]) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        map.insert(
            HeaderName::from_bytes(name.as_bytes())?,
            HeaderValue::from_str(value)?,
        );
    }
    Ok(map)
}

// endregion:     --- HTTP requests
