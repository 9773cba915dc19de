//! WebSocket transport implementation using `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// How long a client may take to complete the WebSocket upgrade before
/// its TCP connection is dropped.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
    handshake_timeout: Duration,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self {
            listener,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        })
    }

    /// Sets how long [`PendingUpgrade::upgrade`] waits for the client's
    /// upgrade request.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Returns the address the listener is actually bound to.
    ///
    /// Useful after binding to port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts the next TCP connection without performing the WebSocket
    /// handshake.
    ///
    /// Servers call this in their accept loop and run
    /// [`PendingUpgrade::upgrade`] in a per-connection task, so a client
    /// that never finishes its handshake cannot hold up anyone else.
    pub async fn accept_pending(
        &self,
    ) -> Result<PendingUpgrade, TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        Ok(PendingUpgrade {
            stream,
            addr,
            timeout: self.handshake_timeout,
        })
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        self.accept_pending().await?.upgrade().await
    }
}

/// A TCP connection whose WebSocket handshake has not run yet.
pub struct PendingUpgrade {
    stream: TcpStream,
    addr: SocketAddr,
    timeout: Duration,
}

impl PendingUpgrade {
    /// The remote address of the TCP connection.
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Runs the WebSocket handshake, giving up after the transport's
    /// handshake timeout.
    pub async fn upgrade(self) -> Result<WebSocketConnection, TransportError> {
        let Self {
            stream,
            addr,
            timeout,
        } = self;

        // The upgrade request is only visible inside the handshake
        // callback, so the query string is copied out here.
        let mut query: Option<String> = None;
        let handshake = tokio_tungstenite::accept_hdr_async(
            stream,
            |req: &Request,
             resp: Response|
             -> Result<Response, ErrorResponse> {
                query = req.uri().query().map(str::to_owned);
                Ok(resp)
            },
        );
        let ws = tokio::time::timeout(timeout, handshake)
            .await
            .map_err(|_| {
                TransportError::AcceptFailed(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("websocket handshake from {addr} timed out"),
                ))
            })?
            .map_err(|e| {
                TransportError::AcceptFailed(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                ))
            })?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %addr, ?query, "accepted WebSocket connection");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            query,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

/// A single WebSocket connection.
///
/// The socket is split so a task blocked in [`Connection::recv`] never
/// holds up a concurrent [`Connection::send`].
pub struct WebSocketConnection {
    id: ConnectionId,
    query: Option<String>,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    /// Valid UTF-8 goes out as a text frame (browsers hand text frames to
    /// `JSON.parse` directly), anything else as a binary frame.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let msg = match String::from_utf8(data.to_vec()) {
            Ok(text) => Message::Text(text.into()),
            Err(e) => Message::Binary(e.into_bytes().into()),
        };
        self.sink.lock().await.send(msg).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        SinkExt::close(&mut *self.sink.lock().await)
            .await
            .map_err(|e| {
                TransportError::ConnectionClosed(e.to_string())
            })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }
}
