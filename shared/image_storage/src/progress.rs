//! Upload progress reporting

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};

/// Size of each frame handed to the transport
pub const PROGRESS_CHUNK_SIZE: usize = 64 * 1024;

/// Receives upload progress as an integer percentage in `0..=100`
pub trait ProgressListener: Send + Sync {
    /// Called every time the rounded percentage increases
    fn on_progress(&self, percent: u8);
}

impl<F> ProgressListener for F
where
    F: Fn(u8) + Send + Sync,
{
    fn on_progress(&self, percent: u8) {
        self(percent);
    }
}

/// Turns byte counts into rounded, strictly increasing percentages
pub struct ProgressTracker {
    total: u64,
    sent: u64,
    last_reported: Option<u8>,
    listener: Arc<dyn ProgressListener>,
}

impl ProgressTracker {
    /// Creates a tracker for a transfer of `total` bytes
    #[must_use]
    pub fn new(total: u64, listener: Arc<dyn ProgressListener>) -> Self {
        Self {
            total,
            sent: 0,
            last_reported: None,
            listener,
        }
    }

    /// Records `bytes` more bytes sent and notifies the listener if the
    /// rounded percentage moved forward
    pub fn advance(&mut self, bytes: u64) {
        self.sent = self.sent.saturating_add(bytes).min(self.total);
        let percent = self.percent();

        if self.last_reported.is_none_or(|last| percent > last) {
            self.last_reported = Some(percent);
            self.listener.on_progress(percent);
        }
    }

    /// Current percentage, `round(sent / total * 100)`
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let scaled = (u128::from(self.sent) * 100 + u128::from(self.total) / 2) / u128::from(self.total);
        u8::try_from(scaled.min(100)).unwrap_or(100)
    }
}

/// Request body that yields its payload in fixed-size frames and reports
/// progress as the transport pulls each frame
pub struct ProgressBody {
    remaining: Bytes,
    chunk_size: usize,
    tracker: ProgressTracker,
    finished: bool,
}

impl ProgressBody {
    /// Wraps `payload` so that reading it drives `listener`
    #[must_use]
    pub fn new(payload: Bytes, listener: Arc<dyn ProgressListener>) -> Self {
        Self::with_chunk_size(payload, PROGRESS_CHUNK_SIZE, listener)
    }

    /// Same as [`ProgressBody::new`] with an explicit frame size
    #[must_use]
    pub fn with_chunk_size(
        payload: Bytes,
        chunk_size: usize,
        listener: Arc<dyn ProgressListener>,
    ) -> Self {
        let total = payload.len() as u64;
        Self {
            remaining: payload,
            chunk_size: chunk_size.max(1),
            tracker: ProgressTracker::new(total, listener),
            finished: false,
        }
    }
}

impl Body for ProgressBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();

        if this.remaining.is_empty() {
            // An empty payload still completes the transfer once
            if !this.finished {
                this.finished = true;
                this.tracker.advance(0);
            }
            return Poll::Ready(None);
        }

        let take = this.chunk_size.min(this.remaining.len());
        let chunk = this.remaining.split_to(take);
        this.tracker.advance(chunk.len() as u64);
        if this.remaining.is_empty() {
            this.finished = true;
        }

        Poll::Ready(Some(Ok(Frame::data(chunk))))
    }

    fn is_end_stream(&self) -> bool {
        self.finished && self.remaining.is_empty()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.remaining.len() as u64)
    }
}
