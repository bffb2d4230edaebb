// Segment fetching and ordered reassembly.

mod http;
mod reassembler;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::Result;
use crate::manifest::SegmentDescriptor;

pub use http::HttpSegmentFetcher;
pub use reassembler::Reassembler;

/// Anything that can produce the bytes of one segment.
#[async_trait]
pub trait SegmentSource: Send + Sync {
    async fn fetch_segment(
        &self,
        segment: &SegmentDescriptor,
        token: &CancellationToken,
    ) -> Result<Bytes>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchProgress {
    Started {
        total: usize,
    },
    SegmentCompleted {
        index: usize,
        bytes: usize,
        completed: usize,
        total: usize,
    },
    Finished {
        bytes: usize,
    },
}

pub type ProgressCallback = Arc<dyn Fn(FetchProgress) + Send + Sync + 'static>;

/// The ordered concatenation of every segment body of one download.
#[derive(Debug, Clone)]
pub struct ReassembledMedia {
    pub job_id: Uuid,
    pub bytes: Bytes,
    pub segment_count: usize,
    pub elapsed: Duration,
}

impl ReassembledMedia {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
