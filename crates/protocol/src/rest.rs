//! REST backend over HTTP/HTTPS

use crate::{filler, join_url, Protocol, ProtocolError, ProtocolOptions, RequestTiming};
use async_trait::async_trait;
use reqwest::header::HOST;
use std::time::Instant;

/// Issues plain HTTP requests against `{base}/{path}`.
///
/// Any response, whatever its status, is a completed request; only transport
/// failures are errors.
pub struct RestProtocol {
    client: reqwest::Client,
    host_header: Option<String>,
}

impl RestProtocol {
    pub fn new(options: &ProtocolOptions) -> Result<Self, ProtocolError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            host_header: options.host_header.clone(),
        })
    }

    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<RequestTiming, ProtocolError> {
        let request = match &self.host_header {
            Some(host) => request.header(HOST, host),
            None => request,
        };

        let start = Instant::now();
        let response = request.send().await?;
        let latency = start.elapsed();
        let status = response.status().as_u16();

        let body = response.bytes().await?;
        let transfer = start.elapsed().saturating_sub(latency);

        Ok(RequestTiming {
            latency,
            transfer,
            bytes: body.len() as u64,
            status,
        })
    }
}

#[async_trait]
impl Protocol for RestProtocol {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn get(&self, base: &str, path: &str) -> Result<RequestTiming, ProtocolError> {
        let url = join_url(base, path);
        let timing = self.execute(self.client.get(&url)).await?;
        tracing::debug!("GET {} -> {} ({} bytes)", url, timing.status, timing.bytes);
        Ok(timing)
    }

    async fn put(
        &self,
        base: &str,
        path: &str,
        size: u64,
    ) -> Result<RequestTiming, ProtocolError> {
        let url = join_url(base, path);
        let timing = self
            .execute(self.client.put(&url).body(filler(size)?))
            .await?;
        tracing::debug!("PUT {} ({} bytes) -> {}", url, size, timing.status);
        Ok(RequestTiming {
            bytes: size,
            ..timing
        })
    }
}
