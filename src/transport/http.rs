//! HTTP collaborator.
//!
//! One configured [`reqwest::Client`] serves both the content-type sniff and
//! the download itself.

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::streaming::decompress::ContentType;
use crate::transport::detect::{detect_content_type, SNIFF_LEN};
use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use reqwest::header::RANGE;
use reqwest::{Response, Url};
use std::pin::Pin;
use std::time::Duration;
use tracing::debug;

/// A boxed stream of response body fragments.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// An opened transfer: the body stream and its advertised length.
pub struct Download {
    /// Value of `Content-Length`, if the server sent one
    pub size_hint: Option<u64>,
    pub body: BoxStream<'static, Result<Bytes>>,
}

impl Download {
    /// Wrap any fragment stream, e.g. an in-memory body in tests.
    pub fn new<S>(size_hint: Option<u64>, body: S) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self {
            size_hint,
            body: body.boxed(),
        }
    }
}

pub struct HttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }

    /// Start the download. The timeout covers the time to response headers
    /// only; the body is streamed for as long as it takes.
    pub async fn open(&self, url: &Url) -> Result<Download> {
        let response = tokio::time::timeout(self.timeout, self.client.get(url.clone()).send())
            .await
            .map_err(|_| Error::Timeout {
                url: url.to_string(),
                secs: self.timeout.as_secs(),
            })??;
        let response = check_status(url, response)?;

        let size_hint = response.content_length();
        debug!(%url, ?size_hint, "Download opened");

        Ok(Download::new(
            size_hint,
            response.bytes_stream().map_err(Error::from),
        ))
    }

    /// Sniff the content type from the first bytes of the resource.
    pub async fn detect_content_type(&self, url: &Url) -> Result<ContentType> {
        let response = self
            .client
            .get(url.clone())
            .header(RANGE, format!("bytes=0-{}", SNIFF_LEN - 1))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::Detection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Detection(format!(
                "HTTP request returned {}",
                response.status()
            )));
        }

        let mut body = response.bytes_stream();
        let mut prefix = Vec::with_capacity(SNIFF_LEN);
        while prefix.len() < SNIFF_LEN {
            let Some(part) = body.next().await else {
                break;
            };
            let part = part.map_err(|e| Error::Detection(e.to_string()))?;
            let take = (SNIFF_LEN - prefix.len()).min(part.len());
            prefix.extend_from_slice(&part[..take]);
        }

        if prefix.is_empty() {
            return Err(Error::Detection("resource is empty".into()));
        }

        detect_content_type(&prefix)
            .ok_or_else(|| Error::Detection("no known signature in leading bytes".into()))
    }
}

fn check_status(url: &Url, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(Error::HttpStatus {
            url: url.to_string(),
            status,
        })
    }
}
