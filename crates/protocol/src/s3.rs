//! S3 object-storage backend

use crate::{filler, Protocol, ProtocolError, RequestTiming};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;

/// Bucket and key prefix taken from the base address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    pub bucket: String,
    pub prefix: String,
}

impl S3Location {
    /// Object key for a trace path.
    pub fn key(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            path.to_string()
        } else {
            format!("{prefix}/{path}")
        }
    }
}

/// Parse an S3 base address: `s3://bucket`, `s3://bucket/prefix` or a bare
/// bucket name.
pub fn parse_s3_base(base: &str) -> Result<S3Location, ProtocolError> {
    let rest = base.strip_prefix("s3://").unwrap_or(base);
    let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
    if bucket.is_empty() || bucket.contains(':') {
        return Err(ProtocolError::InvalidBase(base.to_string()));
    }
    Ok(S3Location {
        bucket: bucket.to_string(),
        prefix: prefix.to_string(),
    })
}

/// Replays requests as S3 object reads and writes.
///
/// The SDK client is built on first use, since loading the AWS configuration
/// is async and relatively expensive.
#[derive(Default)]
pub struct S3Protocol {
    client: OnceCell<aws_sdk_s3::Client>,
}

impl S3Protocol {
    pub fn new() -> Self {
        Self::default()
    }

    async fn client(&self) -> &aws_sdk_s3::Client {
        self.client
            .get_or_init(|| async {
                let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
                aws_sdk_s3::Client::new(&sdk_config)
            })
            .await
    }
}

/// Turn an SDK error into an outcome when the service answered with a status
/// (e.g. 404 for a missing key), or into an error when it did not.
fn service_outcome<E>(
    err: SdkError<E, HttpResponse>,
    started: Instant,
    context: String,
) -> Result<RequestTiming, ProtocolError>
where
    E: std::error::Error + 'static,
{
    match err.raw_response() {
        Some(raw) => Ok(RequestTiming {
            latency: started.elapsed(),
            transfer: Duration::ZERO,
            bytes: 0,
            status: raw.status().as_u16(),
        }),
        None => Err(ProtocolError::S3(format!(
            "{context}: {}",
            DisplayErrorContext(&err)
        ))),
    }
}

#[async_trait]
impl Protocol for S3Protocol {
    fn name(&self) -> &'static str {
        "s3"
    }

    /// Make sure the bucket exists, creating it when `HeadBucket` fails.
    async fn prepare(&self, base: &str) -> Result<(), ProtocolError> {
        let location = parse_s3_base(base)?;
        let client = self.client().await;

        if client
            .head_bucket()
            .bucket(&location.bucket)
            .send()
            .await
            .is_ok()
        {
            tracing::debug!("Bucket {} already exists", location.bucket);
            return Ok(());
        }

        tracing::info!("Creating bucket {}", location.bucket);
        client
            .create_bucket()
            .bucket(&location.bucket)
            .send()
            .await
            .map_err(|e| {
                ProtocolError::S3(format!(
                    "failed to create bucket {}: {}",
                    location.bucket,
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }

    async fn get(&self, base: &str, path: &str) -> Result<RequestTiming, ProtocolError> {
        let location = parse_s3_base(base)?;
        let key = location.key(path);
        let client = self.client().await;

        let start = Instant::now();
        let output = match client
            .get_object()
            .bucket(&location.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                return service_outcome(e, start, format!("GET s3://{}/{key}", location.bucket))
            }
        };
        let latency = start.elapsed();

        let body = output.body.collect().await.map_err(|e| {
            ProtocolError::S3(format!(
                "failed to read s3://{}/{key}: {e}",
                location.bucket
            ))
        })?;
        let bytes = body.into_bytes().len() as u64;

        tracing::debug!("GET s3://{}/{} ({} bytes)", location.bucket, key, bytes);
        Ok(RequestTiming {
            latency,
            transfer: start.elapsed().saturating_sub(latency),
            bytes,
            status: 200,
        })
    }

    async fn put(
        &self,
        base: &str,
        path: &str,
        size: u64,
    ) -> Result<RequestTiming, ProtocolError> {
        let location = parse_s3_base(base)?;
        let key = location.key(path);
        let client = self.client().await;

        let start = Instant::now();
        let result = client
            .put_object()
            .bucket(&location.bucket)
            .key(&key)
            .body(ByteStream::from(filler(size)?))
            .send()
            .await;
        if let Err(e) = result {
            return service_outcome(e, start, format!("PUT s3://{}/{key}", location.bucket));
        }

        tracing::debug!("PUT s3://{}/{} ({} bytes)", location.bucket, key, size);
        Ok(RequestTiming {
            latency: start.elapsed(),
            transfer: Duration::ZERO,
            bytes: size,
            status: 200,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_s3_base_with_prefix() {
        let location = parse_s3_base("s3://my-bucket/replay/run1").unwrap();
        assert_eq!(location.bucket, "my-bucket");
        assert_eq!(location.prefix, "replay/run1");
        assert_eq!(location.key("/images/a.jpg"), "replay/run1/images/a.jpg");
    }

    #[test]
    fn test_parse_s3_base_bucket_only() {
        let location = parse_s3_base("s3://my-bucket").unwrap();
        assert_eq!(location.bucket, "my-bucket");
        assert_eq!(location.key("/a.jpg"), "a.jpg");

        let bare = parse_s3_base("my-bucket/").unwrap();
        assert_eq!(bare, location);
    }

    #[test]
    fn test_parse_s3_base_invalid() {
        assert!(parse_s3_base("s3://").is_err());
        assert!(parse_s3_base("http://host:8080").is_err());
    }

    // Requests against S3 itself need AWS credentials and are not covered by
    // unit tests
}
