//! Attributed relay of workflow output streams

use agent_core::{Result, SegmentStream, StreamSegment};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;

/// A segment as delivered by [`StreamRelay`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayedSegment {
    /// Position in the relayed sequence, starting at 1
    pub sequence: u64,
    /// Set on the first segment after the producing agent changed
    pub new_attribution: bool,
    /// The segment itself
    pub segment: StreamSegment,
}

/// Forwards a workflow's segment stream to a single consumer
///
/// Segments are passed through in emission order, never merged or
/// reordered, each tagged with whether it starts a new attribution (a
/// different producing agent than the segment before). The relay ends when
/// the underlying stream ends or fails.
///
/// Dropping a relay that has not finished cancels its token, which stops the
/// running stage and every stage that has not started yet.
pub struct StreamRelay<'a> {
    inner: SegmentStream<'a>,
    cancellation: CancellationToken,
    current_agent: Option<String>,
    sequence: u64,
    finished: bool,
}

impl<'a> StreamRelay<'a> {
    /// Relay `inner`, cancelling `cancellation` if abandoned early
    pub fn new(inner: SegmentStream<'a>, cancellation: CancellationToken) -> Self {
        Self {
            inner,
            cancellation,
            current_agent: None,
            sequence: 0,
            finished: false,
        }
    }

    /// Cancel the upstream run
    ///
    /// The relay reports the resulting `Cancelled` error and then ends.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Agent that produced the most recent segment
    pub fn current_agent(&self) -> Option<&str> {
        self.current_agent.as_deref()
    }

    /// Whether the upstream stream has ended
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Stream for StreamRelay<'_> {
    type Item = Result<RelayedSegment>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        match this.inner.as_mut().poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(err))) => {
                this.finished = true;
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(Some(Ok(segment))) => {
                let new_attribution = this.current_agent.as_deref() != Some(&segment.agent_id);
                if new_attribution {
                    this.current_agent = Some(segment.agent_id.clone());
                }
                this.sequence += 1;
                Poll::Ready(Some(Ok(RelayedSegment {
                    sequence: this.sequence,
                    new_attribution,
                    segment,
                })))
            }
        }
    }
}

impl Drop for StreamRelay<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.cancellation.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::Error;
    use futures::StreamExt;

    fn segments() -> SegmentStream<'static> {
        Box::pin(futures::stream::iter(vec![
            Ok(StreamSegment::fragment("a", "Research", "MSFT ")),
            Ok(StreamSegment::fragment("a", "Research", "420")),
            Ok(StreamSegment::finished("a", "Research")),
            Ok(StreamSegment::fragment("b", "Risk", "Low")),
            Ok(StreamSegment::finished("b", "Risk")),
        ]))
    }

    #[tokio::test]
    async fn test_marks_attribution_changes() {
        let relay = StreamRelay::new(segments(), CancellationToken::new());
        let out: Vec<RelayedSegment> = relay.map(|s| s.unwrap()).collect().await;

        let sequences: Vec<u64> = out.iter().map(|s| s.sequence).collect();
        assert_eq!(sequences, [1, 2, 3, 4, 5]);

        let changes: Vec<bool> = out.iter().map(|s| s.new_attribution).collect();
        assert_eq!(changes, [true, false, false, true, false]);
    }

    #[tokio::test]
    async fn test_drop_before_end_cancels() {
        let token = CancellationToken::new();
        {
            let mut relay = StreamRelay::new(segments(), token.clone());
            relay.next().await.unwrap().unwrap();
        }
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_exhausted_relay_does_not_cancel() {
        let token = CancellationToken::new();
        let mut relay = StreamRelay::new(segments(), token.clone());
        while relay.next().await.is_some() {}
        assert!(relay.is_finished());
        drop(relay);
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn test_error_ends_relay() {
        let inner: SegmentStream<'static> = Box::pin(futures::stream::iter(vec![
            Ok(StreamSegment::fragment("a", "Research", "x")),
            Err(Error::Cancelled),
            Ok(StreamSegment::fragment("a", "Research", "never")),
        ]));
        let mut relay = StreamRelay::new(inner, CancellationToken::new());

        assert!(relay.next().await.unwrap().is_ok());
        assert!(matches!(relay.next().await, Some(Err(Error::Cancelled))));
        assert!(relay.next().await.is_none());
    }
}
