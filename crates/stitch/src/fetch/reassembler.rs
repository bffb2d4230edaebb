// Reassembler: bounded fan-out over the segment list, positional slots, one output buffer.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::{StreamExt, stream};
use tracing::{Instrument, debug, info};

use crate::config::FetchConfig;
use crate::error::{Result, StitchError};
use crate::fetch::{FetchProgress, ProgressCallback, ReassembledMedia, SegmentSource};
use crate::job::DownloadJob;
use crate::manifest::Manifest;

pub struct Reassembler<S: SegmentSource + ?Sized> {
    source: Arc<S>,
    config: FetchConfig,
    on_progress: Option<ProgressCallback>,
}

impl<S: SegmentSource + ?Sized> Reassembler<S> {
    pub fn new(source: Arc<S>, config: FetchConfig) -> Self {
        Self {
            source,
            config,
            on_progress: None,
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    fn emit(&self, event: FetchProgress) {
        if let Some(callback) = &self.on_progress {
            callback(event);
        }
    }

    /// Fetch every segment of `manifest` and concatenate the bodies in manifest order.
    ///
    /// The first failing segment aborts the download; requests still in flight
    /// are dropped with it. The whole operation is bounded by
    /// [`FetchConfig::overall_timeout`] and by the job's cancellation token.
    pub async fn fetch(
        &self,
        job: &DownloadJob,
        manifest: &Manifest,
    ) -> Result<ReassembledMedia> {
        self.config.validate()?;
        if manifest.is_empty() {
            return Err(StitchError::EmptyManifest {
                url: Some(job.manifest_url().to_string()),
            });
        }

        let total = manifest.len();
        info!(
            segments = total,
            concurrency = self.config.concurrency,
            "Fetching segments"
        );
        self.emit(FetchProgress::Started { total });

        let fill = self.fill_slots(job, manifest).instrument(job.span());
        let slots = tokio::select! {
            _ = job.token().cancelled() => return Err(StitchError::Cancelled),
            res = tokio::time::timeout(self.config.overall_timeout, fill) => {
                res.map_err(|_| {
                    StitchError::timeout(format!(
                        "reassembly of {total} segments exceeded {:?}",
                        self.config.overall_timeout
                    ))
                })??
            }
        };

        let bytes = concat(slots);
        self.emit(FetchProgress::Finished { bytes: bytes.len() });
        info!(
            segments = total,
            bytes = bytes.len(),
            elapsed_ms = job.elapsed().as_millis() as u64,
            "Reassembly complete"
        );

        Ok(ReassembledMedia {
            job_id: job.id(),
            bytes,
            segment_count: total,
            elapsed: job.elapsed(),
        })
    }

    async fn fill_slots(
        &self,
        job: &DownloadJob,
        manifest: &Manifest,
    ) -> Result<Vec<Option<Bytes>>> {
        let total = manifest.len();
        let mut slots: Vec<Option<Bytes>> = vec![None; total];
        let source = &*self.source;
        let token = job.token();

        let mut in_flight = stream::iter(manifest.segments().iter().enumerate())
            .map(|(index, segment)| async move {
                (index, segment, source.fetch_segment(segment, token).await)
            })
            .buffer_unordered(self.config.concurrency);

        let mut completed = 0;
        while let Some((index, segment, result)) = in_flight.next().await {
            let body = match result {
                Ok(body) => body,
                Err(StitchError::Cancelled) => return Err(StitchError::Cancelled),
                Err(err) => return Err(StitchError::segment(index, segment.url.as_str(), err)),
            };

            debug!(index, bytes = body.len(), url = %segment.url, "Segment fetched");
            completed += 1;
            self.emit(FetchProgress::SegmentCompleted {
                index,
                bytes: body.len(),
                completed,
                total,
            });
            slots[index] = Some(body);
        }

        Ok(slots)
    }
}

fn concat(slots: Vec<Option<Bytes>>) -> Bytes {
    if let [Some(only)] = slots.as_slice() {
        return only.clone();
    }

    let len = slots.iter().flatten().map(Bytes::len).sum();
    let mut out = BytesMut::with_capacity(len);
    for body in slots.iter().flatten() {
        out.extend_from_slice(body);
    }
    out.freeze()
}
