//! Exchange engine: one request, one correlated reply.
//!
//! The primary channel permits exactly one outstanding request at a time, so
//! the channel lives behind a `tokio::sync::Mutex`; concurrent facade calls
//! queue on the lock instead of interleaving bytes on the wire. The lock is
//! held across the full send + receive pair (strictly half-duplex).

use std::time::Duration;

use tokio::sync::Mutex;

use crate::error::{Result, ZestError};
use crate::protocol::{Header, Status};
use crate::transport::RequestChannel;

/// Socket-level receive timeout on the primary channel.
pub(crate) const RECV_TIMEOUT: Duration = Duration::from_secs(10);

/// Outer bound on the whole reply wait, slightly wider than the socket
/// timeout to allow one internal retry window.
pub(crate) const REPLY_WINDOW: Duration = Duration::from_secs(11);

/// Owns the primary request/reply channel.
pub(crate) struct Exchange<C: RequestChannel> {
    channel: Mutex<C>,
    recv_timeout: Duration,
    reply_window: Duration,
    log_frames: bool,
}

impl<C: RequestChannel> Exchange<C> {
    pub(crate) fn new(
        channel: C,
        recv_timeout: Duration,
        reply_window: Duration,
        log_frames: bool,
    ) -> Self {
        Self {
            channel: Mutex::new(channel),
            recv_timeout,
            reply_window,
            log_frames,
        }
    }

    /// Serialize `request`, transmit it, and block for exactly one
    /// correlated reply.
    ///
    /// Returns the decoded reply together with its classified status. A
    /// reply that never arrives surfaces as [`ZestError::Timeout`] and
    /// leaves the channel usable for the next call; a reply carrying a
    /// failure status surfaces as the corresponding typed error.
    pub(crate) async fn round_trip(&self, request: &Header) -> Result<(Status, Header)> {
        let frame = request.encode()?;

        let mut channel = self.channel.lock().await;
        if self.log_frames {
            tracing::debug!(bytes = frame.len(), frame = %hex::encode(&frame), "sending request");
        }
        channel.send(frame).await?;

        let raw = tokio::time::timeout(self.reply_window, channel.recv(self.recv_timeout))
            .await
            .map_err(|_| ZestError::Timeout)??;
        drop(channel);

        if self.log_frames {
            tracing::debug!(bytes = raw.len(), frame = %hex::encode(&raw), "received reply");
        }

        let reply = Header::decode(&raw)?;
        let status = Status::classify(reply.code)?;
        Ok((status, reply))
    }

    /// Release the primary channel's socket. Idempotent.
    pub(crate) async fn close(&self) -> Result<()> {
        self.channel.lock().await.close().await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex as StdMutex};

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::protocol::code;

    /// Scripted request channel: records sent frames, pops pre-queued
    /// replies, times out when the script is empty.
    #[derive(Default)]
    struct ScriptedChannel {
        sent: Arc<StdMutex<Vec<Bytes>>>,
        replies: Arc<StdMutex<VecDeque<Bytes>>>,
    }

    #[async_trait]
    impl RequestChannel for ScriptedChannel {
        async fn send(&mut self, frame: Bytes) -> Result<()> {
            self.sent.lock().unwrap().push(frame);
            Ok(())
        }

        async fn recv(&mut self, timeout: Duration) -> Result<Bytes> {
            let next = self.replies.lock().unwrap().pop_front();
            match next {
                Some(frame) => Ok(frame),
                None => {
                    tokio::time::sleep(timeout).await;
                    Err(ZestError::Timeout)
                }
            }
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn queue_reply(channel: &ScriptedChannel, code: u8, payload: &[u8]) {
        let frame = Header::new(code)
            .with_payload(payload.to_vec())
            .encode()
            .unwrap();
        channel.replies.lock().unwrap().push_back(frame);
    }

    fn exchange(channel: ScriptedChannel) -> Exchange<ScriptedChannel> {
        Exchange::new(
            channel,
            Duration::from_millis(20),
            Duration::from_millis(50),
            false,
        )
    }

    #[tokio::test]
    async fn test_round_trip_returns_classified_reply() {
        let channel = ScriptedChannel::default();
        let sent = channel.sent.clone();
        queue_reply(&channel, Status::Content.code(), b"value");

        let exchange = exchange(channel);
        let request = Header::new(code::GET);
        let (status, reply) = exchange.round_trip(&request).await.unwrap();

        assert_eq!(status, Status::Content);
        assert_eq!(&reply.payload[..], b"value");
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_round_trip_times_out_and_channel_stays_usable() {
        let channel = ScriptedChannel::default();
        let replies = channel.replies.clone();

        let exchange = exchange(channel);
        let request = Header::new(code::GET);

        let result = exchange.round_trip(&request).await;
        assert!(matches!(result, Err(ZestError::Timeout)));

        // A later reply is picked up by the next call on the same channel.
        let frame = Header::new(Status::Content.code())
            .with_payload(&b"late"[..])
            .encode()
            .unwrap();
        replies.lock().unwrap().push_back(frame);

        let (status, reply) = exchange.round_trip(&request).await.unwrap();
        assert_eq!(status, Status::Content);
        assert_eq!(&reply.payload[..], b"late");
    }

    #[tokio::test]
    async fn test_round_trip_surfaces_error_status() {
        let channel = ScriptedChannel::default();
        queue_reply(&channel, 129, b"");

        let exchange = exchange(channel);
        let result = exchange.round_trip(&Header::new(code::GET)).await;
        assert!(matches!(result, Err(ZestError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_round_trip_rejects_malformed_reply() {
        let channel = ScriptedChannel::default();
        channel
            .replies
            .lock()
            .unwrap()
            .push_back(Bytes::from_static(&[69, 9]));

        let exchange = exchange(channel);
        let result = exchange.round_trip(&Header::new(code::GET)).await;
        assert!(matches!(result, Err(ZestError::MalformedFrame(_))));
    }

    #[tokio::test]
    async fn test_concurrent_round_trips_are_serialized() {
        let channel = ScriptedChannel::default();
        let sent = channel.sent.clone();
        queue_reply(&channel, Status::Created.code(), b"a");
        queue_reply(&channel, Status::Created.code(), b"b");

        let exchange = Arc::new(exchange(channel));
        let request = Header::new(code::POST);

        let first = {
            let exchange = exchange.clone();
            let request = request.clone();
            tokio::spawn(async move { exchange.round_trip(&request).await })
        };
        let second = {
            let exchange = exchange.clone();
            let request = request.clone();
            tokio::spawn(async move { exchange.round_trip(&request).await })
        };

        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        // Both exchanges completed without interleaving: every send was
        // paired with a reply before the next send went out.
        assert_eq!(sent.lock().unwrap().len(), 2);
    }
}
