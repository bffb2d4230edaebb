// HTTP segment fetcher: one GET per segment, optional Range header, bounded retry.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, header};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

use crate::config::StitchConfig;
use crate::error::{Result, StitchError};
use crate::fetch::SegmentSource;
use crate::manifest::{ByteRange, SegmentDescriptor};
use crate::retry::{RetryPolicy, with_retry};

pub struct HttpSegmentFetcher {
    client: Client,
    params: Vec<(String, String)>,
    segment_timeout: Duration,
    retry: RetryPolicy,
}

impl HttpSegmentFetcher {
    pub fn new(client: Client, config: &StitchConfig) -> Self {
        Self {
            client,
            params: config.base.params.clone(),
            segment_timeout: config.fetch.segment_timeout,
            retry: config.fetch.retry.clone(),
        }
    }

    async fn fetch_once(&self, segment: &SegmentDescriptor) -> Result<Bytes> {
        let mut request = self
            .client
            .get(segment.url.clone())
            .timeout(self.segment_timeout);
        if !self.params.is_empty() {
            request = request.query(&self.params);
        }
        if let Some(range) = segment.byte_range {
            request = request.header(header::RANGE, range.header_value());
        }

        let started = Instant::now();
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::RANGE_NOT_SATISFIABLE
            && let Some(range) = segment.byte_range
        {
            return Err(StitchError::RangeNotSatisfiable {
                url: segment.url.to_string(),
                range,
            });
        }
        if !status.is_success() {
            return Err(StitchError::http_status(
                status,
                segment.url.as_str(),
                "segment fetch",
            ));
        }

        let has_content_range = response.headers().contains_key(header::CONTENT_RANGE);
        let body = response.bytes().await?;
        trace!(
            url = %segment.url,
            status = %status,
            bytes = body.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Segment response received"
        );

        match segment.byte_range {
            Some(range) if status == StatusCode::OK => {
                ok_body_for_range(segment, range, body, has_content_range)
            }
            Some(range) => {
                if body.len() as u64 != range.len() {
                    warn!(
                        url = %segment.url,
                        expected = range.len(),
                        received = body.len(),
                        "Partial response length differs from requested range"
                    );
                }
                Ok(body)
            }
            None => Ok(body),
        }
    }
}

/// 200 to a ranged request. A `Content-Range` header or a body of exactly the
/// range length means the range was applied; anything else is the whole resource.
fn ok_body_for_range(
    segment: &SegmentDescriptor,
    range: ByteRange,
    body: Bytes,
    has_content_range: bool,
) -> Result<Bytes> {
    if has_content_range || body.len() as u64 == range.len() {
        trace!(url = %segment.url, %range, "Range applied despite 200 status");
        return Ok(body);
    }
    slice_full_body(segment, range, body)
}

fn slice_full_body(segment: &SegmentDescriptor, range: ByteRange, body: Bytes) -> Result<Bytes> {
    let bounds = usize::try_from(range.start())
        .ok()
        .zip(usize::try_from(range.end()).ok())
        .filter(|(_, end)| *end <= body.len());

    match bounds {
        Some((start, end)) => {
            debug!(url = %segment.url, %range, "Server ignored Range header, slicing full body");
            Ok(body.slice(start..end))
        }
        None => Err(StitchError::RangeNotHonored {
            url: segment.url.to_string(),
            range,
            received: body.len(),
        }),
    }
}

#[async_trait]
impl SegmentSource for HttpSegmentFetcher {
    #[instrument(skip_all, fields(index = segment.sequence, url = %segment.url))]
    async fn fetch_segment(
        &self,
        segment: &SegmentDescriptor,
        token: &CancellationToken,
    ) -> Result<Bytes> {
        with_retry(&self.retry, token, "segment", |_| self.fetch_once(segment)).await
    }
}
