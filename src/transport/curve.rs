//! CurveZMQ transport backend.
//!
//! The request/reply channel is a REQ socket, the push channel a DEALER
//! socket with an explicit identity. Both authenticate with CURVE client
//! auth: a fresh key pair per socket against the server's public key.
//!
//! libzmq sockets are blocking, so every socket operation runs on the
//! blocking thread pool via `spawn_blocking`, with the socket handed into
//! the closure and returned afterwards. If the future driving a receive is
//! dropped mid-call (cooperative cancellation), the orphaned blocking task
//! keeps the socket until the receive timeout fires and then drops it,
//! which closes it; the channel itself then reports `ChannelClosed`.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::task;

use super::{PushChannel, RequestChannel, Transport};
use crate::error::{Result, ZestError};

/// Connect timeout applied to every socket, in milliseconds.
const CONNECT_TIMEOUT_MS: i32 = 10_000;

fn connect_err(err: zmq::Error) -> ZestError {
    ZestError::ConnectionFailed(err.to_string())
}

fn timeout_ms(timeout: Duration) -> i32 {
    i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX)
}

/// Generate a fresh CURVE key pair and authenticate `socket` against
/// `server_key` (Z85 text, as handed out by the remote service).
fn configure_curve(socket: &zmq::Socket, server_key: &str) -> Result<()> {
    let keys = zmq::CurveKeyPair::new().map_err(connect_err)?;
    socket
        .set_curve_serverkey(server_key.as_bytes())
        .map_err(connect_err)?;
    socket
        .set_curve_publickey(&keys.public_key)
        .map_err(connect_err)?;
    socket
        .set_curve_secretkey(&keys.secret_key)
        .map_err(connect_err)?;
    Ok(())
}

fn configure_common(socket: &zmq::Socket) -> Result<()> {
    socket.set_rcvtimeo(CONNECT_TIMEOUT_MS).map_err(connect_err)?;
    socket
        .set_connect_timeout(CONNECT_TIMEOUT_MS)
        .map_err(connect_err)?;
    // Don't block teardown on undelivered frames.
    socket.set_linger(0).map_err(connect_err)?;
    Ok(())
}

/// Socket holder shared by both channel types.
///
/// The socket lives in an `Option` because each blocking call takes it out,
/// moves it onto the blocking pool and puts it back afterwards.
struct SocketSlot {
    socket: Option<zmq::Socket>,
}

impl SocketSlot {
    fn new(socket: zmq::Socket) -> Self {
        Self {
            socket: Some(socket),
        }
    }

    async fn run<F, R>(&mut self, op: F) -> Result<R>
    where
        F: FnOnce(&zmq::Socket) -> std::result::Result<R, zmq::Error> + Send + 'static,
        R: Send + 'static,
    {
        let socket = self.socket.take().ok_or(ZestError::ChannelClosed)?;
        let (socket, out) = task::spawn_blocking(move || {
            let out = op(&socket);
            (socket, out)
        })
        .await
        .map_err(|_| ZestError::ChannelClosed)?;
        self.socket = Some(socket);
        out.map_err(ZestError::from)
    }

    async fn recv(&mut self, timeout: Duration) -> Result<Bytes> {
        let ms = timeout_ms(timeout);
        let received = self
            .run(move |socket| {
                socket.set_rcvtimeo(ms)?;
                socket.recv_bytes(0)
            })
            .await;
        match received {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(ZestError::Transport(zmq::Error::EAGAIN)) => Err(ZestError::Timeout),
            Err(err) => Err(err),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(socket) = self.socket.take() {
            task::spawn_blocking(move || drop(socket))
                .await
                .map_err(|_| ZestError::ChannelClosed)?;
        }
        Ok(())
    }
}

/// REQ-socket request/reply channel with CURVE client auth.
pub struct CurveRequestChannel {
    slot: SocketSlot,
}

#[async_trait]
impl RequestChannel for CurveRequestChannel {
    async fn send(&mut self, frame: Bytes) -> Result<()> {
        self.slot.run(move |socket| socket.send(&frame[..], 0)).await
    }

    async fn recv(&mut self, timeout: Duration) -> Result<Bytes> {
        self.slot.recv(timeout).await
    }

    async fn close(&mut self) -> Result<()> {
        self.slot.close().await
    }
}

/// DEALER-socket identity-bound push channel with CURVE client auth.
pub struct CurvePushChannel {
    slot: SocketSlot,
}

#[async_trait]
impl PushChannel for CurvePushChannel {
    async fn recv(&mut self, timeout: Duration) -> Result<Bytes> {
        self.slot.recv(timeout).await
    }

    async fn close(&mut self) -> Result<()> {
        self.slot.close().await
    }
}

/// Production transport over CurveZMQ.
///
/// Cheap to construct; one shared `zmq::Context` backs every socket it
/// opens.
pub struct CurveTransport {
    context: zmq::Context,
}

impl CurveTransport {
    /// Create a transport with its own ZeroMQ context.
    pub fn new() -> Self {
        Self {
            context: zmq::Context::new(),
        }
    }
}

impl Default for CurveTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for CurveTransport {
    type Request = CurveRequestChannel;
    type Push = CurvePushChannel;

    async fn connect_request(&self, endpoint: &str, server_key: &str) -> Result<Self::Request> {
        let context = self.context.clone();
        let endpoint = endpoint.to_string();
        let server_key = server_key.to_string();

        let socket = task::spawn_blocking(move || -> Result<zmq::Socket> {
            let socket = context.socket(zmq::REQ).map_err(connect_err)?;
            configure_common(&socket)?;
            // A timed-out request must not wedge the strict REQ state
            // machine; relax it so the next send goes out and correlate
            // replies so a stale one is not matched to it.
            socket.set_req_relaxed(true).map_err(connect_err)?;
            socket.set_req_correlate(true).map_err(connect_err)?;
            configure_curve(&socket, &server_key)?;
            socket.connect(&endpoint).map_err(connect_err)?;
            Ok(socket)
        })
        .await
        .map_err(|_| ZestError::ConnectionFailed("connect task aborted".to_string()))??;

        tracing::debug!("request channel connected");
        Ok(CurveRequestChannel {
            slot: SocketSlot::new(socket),
        })
    }

    async fn connect_push(
        &self,
        endpoint: &str,
        server_key: &str,
        identity: Bytes,
    ) -> Result<Self::Push> {
        let context = self.context.clone();
        let endpoint = endpoint.to_string();
        let server_key = server_key.to_string();

        let socket = task::spawn_blocking(move || -> Result<zmq::Socket> {
            let socket = context.socket(zmq::DEALER).map_err(connect_err)?;
            configure_common(&socket)?;
            socket.set_identity(&identity).map_err(connect_err)?;
            configure_curve(&socket, &server_key)?;
            socket.connect(&endpoint).map_err(connect_err)?;
            Ok(socket)
        })
        .await
        .map_err(|_| ZestError::ConnectionFailed("connect task aborted".to_string()))??;

        tracing::debug!("push channel connected");
        Ok(CurvePushChannel {
            slot: SocketSlot::new(socket),
        })
    }
}
