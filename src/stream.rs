//! Push stream subsystem.
//!
//! An Observe or Notify call turns one handshake reply into a live,
//! cancellable sequence of payloads. Per stream the states are
//! `Handshaking -> Streaming -> Closed`: the handshake is a synchronous
//! exchange on the primary channel, streaming runs on a dedicated task that
//! owns the stream's secondary channel exclusively, and closing releases
//! that channel exactly once.
//!
//! The receive loop delivers at most one payload at a time: the delivery
//! queue holds a single in-flight item, so the loop does not issue further
//! receives while the consumer lags. That bounds buffering at the cost of
//! slowing the stream to the consumer's pace.
//!
//! Cancellation is cooperative and idempotent. The loop checks the
//! cancellation token at every wait cycle; there is no hard interrupt of an
//! in-flight socket read, so worst-case latency to honor a cancel equals
//! one receive-timeout window. Consuming the sequence after cancelling
//! yields end-of-sequence, never a hang.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, ZestError};
use crate::protocol::{Header, Status, OPTION_PUBLIC_KEY};
use crate::transport::PushChannel;

/// One in-flight delivery; the loop blocks until the consumer accepts it.
const DELIVERY_QUEUE_DEPTH: usize = 1;

/// Filter applied to an Observe subscription.
///
/// The mode travels as the raw string bytes of option 6. [`Default`] is the
/// oldest protocol revision's empty value; it is a distinct variant and the
/// option is always sent, never omitted.
///
/// [`Default`]: ObserveMode::Default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObserveMode {
    /// Legacy empty mode, treated by servers as data.
    #[default]
    Default,
    /// Raw resource data.
    Data,
    /// Audit trail entries.
    Audit,
    /// Notifications.
    Notification,
}

impl ObserveMode {
    /// The bytes carried in the observe-mode option.
    pub const fn wire_value(self) -> &'static [u8] {
        match self {
            ObserveMode::Default => b"",
            ObserveMode::Data => b"data",
            ObserveMode::Audit => b"audit",
            ObserveMode::Notification => b"notification",
        }
    }
}

impl FromStr for ObserveMode {
    type Err = ZestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "" | "default" => Ok(ObserveMode::Default),
            "data" => Ok(ObserveMode::Data),
            "audit" => Ok(ObserveMode::Audit),
            "notification" => Ok(ObserveMode::Notification),
            _ => Err(ZestError::UnsupportedMode(s.to_string())),
        }
    }
}

impl fmt::Display for ObserveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObserveMode::Default => f.write_str("default"),
            ObserveMode::Data => f.write_str("data"),
            ObserveMode::Audit => f.write_str("audit"),
            ObserveMode::Notification => f.write_str("notification"),
        }
    }
}

/// Routing identity and peer key extracted from a handshake reply.
///
/// The two operations address their streams differently, a genuine
/// protocol-level distinction: Observe subscriptions use a server-minted
/// token carried in the reply payload, Notify mailboxes use the
/// caller-supplied path.
pub(crate) struct PushStreamSpec {
    /// Identity the secondary channel binds to.
    pub identity: Bytes,
    /// Peer public key for authenticating the secondary channel.
    pub server_key: String,
}

impl PushStreamSpec {
    /// Build the spec for an Observe stream: identity is the reply payload.
    pub fn for_observe(reply: &Header) -> Result<Self> {
        Ok(Self {
            identity: reply.payload.clone(),
            server_key: peer_key(reply)?,
        })
    }

    /// Build the spec for a Notify stream: identity is the request path.
    pub fn for_notify(reply: &Header, path: &str) -> Result<Self> {
        Ok(Self {
            identity: Bytes::copy_from_slice(path.as_bytes()),
            server_key: peer_key(reply)?,
        })
    }
}

/// Extract the peer security key from option 2048 of a handshake reply.
fn peer_key(reply: &Header) -> Result<String> {
    let option = reply.option(OPTION_PUBLIC_KEY).ok_or_else(|| {
        ZestError::MalformedFrame("handshake reply carries no peer security key".to_string())
    })?;
    String::from_utf8(option.value.to_vec()).map_err(|_| {
        ZestError::MalformedFrame("peer security key is not valid UTF-8".to_string())
    })
}

/// Live sequence of payloads delivered by one push stream.
///
/// Payloads preserve the arrival order of frames off the stream's channel.
/// After cancellation, remaining buffered payloads drain first and then
/// [`next`](Subscription::next) returns `None` forever.
pub struct Subscription {
    rx: mpsc::Receiver<Bytes>,
}

impl Subscription {
    /// Wait for the next delivered payload.
    ///
    /// Returns `None` once the stream is closed and drained.
    pub async fn next(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }
}

/// Cancellation handle for one push stream.
///
/// Cancellation is cooperative: the receive loop notices the signal at its
/// next wait cycle, closes the secondary channel and ends the sequence.
/// Cancelling more than once is a no-op. Dropping the handle without
/// cancelling leaves the stream running; it still shuts down once the
/// [`Subscription`] is dropped.
pub struct StreamHandle {
    cancel: CancellationToken,
}

impl StreamHandle {
    /// Signal the stream to shut down. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Spawn the receive loop for an established secondary channel and return
/// the consumer-facing handles.
pub(crate) fn spawn_stream<P: PushChannel>(
    channel: P,
    recv_timeout: Duration,
    log_frames: bool,
) -> (Subscription, StreamHandle) {
    let (tx, rx) = mpsc::channel(DELIVERY_QUEUE_DEPTH);
    let cancel = CancellationToken::new();

    tokio::spawn(receive_loop(
        channel,
        tx,
        cancel.clone(),
        recv_timeout,
        log_frames,
    ));

    (Subscription { rx }, StreamHandle { cancel })
}

/// Dedicated receive loop, single task per stream.
///
/// Loop rules: a receive timeout is not terminal (idle subscriptions are
/// normal); a malformed frame or a frame carrying an error status is logged
/// and skipped, one bad delivery must not kill the subscription; a content
/// frame is delivered in arrival order. The loop takes a delivery slot
/// before touching the socket, so no receive is issued while a prior
/// payload sits unconsumed. On cancellation the secondary channel is
/// released and dropping the sender closes the sequence.
async fn receive_loop<P: PushChannel>(
    mut channel: P,
    tx: mpsc::Sender<Bytes>,
    cancel: CancellationToken,
    recv_timeout: Duration,
    log_frames: bool,
) {
    loop {
        let permit = tokio::select! {
            _ = cancel.cancelled() => break,
            permit = tx.reserve() => match permit {
                Ok(permit) => permit,
                // The consumer dropped the subscription; nothing left to
                // deliver to.
                Err(_) => break,
            },
        };

        let received = tokio::select! {
            _ = cancel.cancelled() => break,
            received = channel.recv(recv_timeout) => received,
        };

        let raw = match received {
            Ok(raw) => raw,
            Err(ZestError::Timeout) => continue,
            Err(ZestError::ChannelClosed) => {
                tracing::debug!("push channel closed under the stream");
                break;
            }
            Err(err) => {
                tracing::warn!(error = %err, "push channel receive failed");
                continue;
            }
        };

        if log_frames {
            tracing::debug!(bytes = raw.len(), frame = %hex::encode(&raw), "push frame");
        }

        let header = match Header::decode(&raw) {
            Ok(header) => header,
            Err(err) => {
                tracing::warn!(error = %err, "dropping malformed push frame");
                continue;
            }
        };

        if let Err(err) = Status::classify(header.code) {
            tracing::warn!(code = header.code, error = %err, "dropping push frame with error status");
            continue;
        }

        permit.send(header.payload);
    }

    if let Err(err) = channel.close().await {
        tracing::debug!(error = %err, "push channel close failed");
    }
}
