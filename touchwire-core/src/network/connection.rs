use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codec::DaemonCodec;
use crate::config::ConnectionConfig;
use crate::error::{Result, TouchwireError};
use crate::message::{Opcode, ResponseMode};
use crate::packet::{DecodedFrame, Packet};
use crate::state::{ConnectionState, PendingSlot, Reply};

type FrameReader = FramedRead<OwnedReadHalf, DaemonCodec>;
type FrameWriter = FramedWrite<OwnedWriteHalf, DaemonCodec>;

/// Notifications published by a [`DaemonConnection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Handshake accepted.
    Connected,
    /// The socket was closed, by either side.
    Disconnected,
    /// The socket failed; the connection is in the `Error` state.
    Error(String),
}

/// State shared between the connection handle and its reader task.
///
/// Lock order is `writer` then `state`. The epoch only changes while
/// `state` is held.
struct Shared {
    state: Mutex<ConnectionState>,
    pending: PendingSlot,
    events: broadcast::Sender<ConnectionEvent>,
    writer: tokio::sync::Mutex<Option<FrameWriter>>,
    /// Bumped on every connect/disconnect so a reader task or connect
    /// attempt from an older socket cannot touch the state of a newer one.
    epoch: AtomicU64,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, ConnectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: ConnectionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Apply `change` to the state if `epoch` is still the live one.
    ///
    /// A stale epoch fails with `ConnectionClosed` and leaves the state alone.
    fn transition(
        &self,
        epoch: u64,
        change: impl FnOnce(&mut ConnectionState) -> Result<()>,
    ) -> Result<()> {
        let mut state = self.state();
        if !self.is_current(epoch) {
            return Err(TouchwireError::ConnectionClosed);
        }
        change(&mut state)
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    /// Route one inbound frame to the waiting request.
    fn dispatch(&self, frame: DecodedFrame) {
        if !frame.checksum_valid {
            warn!(
                received = frame.received_checksum,
                computed = frame.computed_checksum,
                opcode = frame.opcode,
                "checksum mismatch on inbound frame"
            );
        }
        self.pending.resolve(frame);
    }

    /// Move to `Error` after a socket failure on `epoch`.
    async fn on_transport_error(&self, epoch: u64, error: TouchwireError) {
        let reason = error.to_string();
        let mut writer = self.writer.lock().await;
        if self.transition(epoch, |state| state.fail(reason.clone())).is_err() {
            return;
        }
        writer.take();
        drop(writer);

        warn!(%reason, "daemon connection failed");
        self.pending.fail(error);
        self.publish(ConnectionEvent::Error(reason));
    }

    /// Move to `Disconnected` after the daemon closed the socket on `epoch`.
    async fn on_closed(&self, epoch: u64) {
        let mut writer = self.writer.lock().await;
        let mut uptime = None;
        let closed = self.transition(epoch, |state| {
            uptime = state.connected_duration();
            state.close()
        });
        if closed.is_err() {
            return;
        }
        writer.take();
        drop(writer);

        info!(?uptime, "daemon closed the connection");
        self.pending.fail(TouchwireError::ConnectionClosed);
        self.publish(ConnectionEvent::Disconnected);
    }
}

/// Owns the socket to one remote control daemon.
///
/// `connect` performs the handshake, after which a background task reads
/// and reassembles inbound frames. [`request`](Self::request) sends an
/// `AwaitReply` command and waits for the correlated reply;
/// [`send`](Self::send) fires a command without waiting.
///
/// Callers of `request` are served one at a time in arrival order: the
/// protocol has no request ids, so a second reply-awaiting command must not
/// hit the wire until the first has settled.
pub struct DaemonConnection {
    config: ConnectionConfig,
    shared: Arc<Shared>,
    /// FIFO queue for reply-awaiting requests.
    request_gate: tokio::sync::Mutex<()>,
    reader: Mutex<Option<JoinHandle<()>>>,
    /// Epoch and cancel handle of the connect attempt in flight.
    connecting: Mutex<Option<(u64, CancellationToken)>>,
}

impl DaemonConnection {
    pub fn new(config: ConnectionConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            config,
            shared: Arc::new(Shared {
                state: Mutex::new(ConnectionState::default()),
                pending: PendingSlot::new(),
                events,
                writer: tokio::sync::Mutex::new(None),
                epoch: AtomicU64::new(0),
            }),
            request_gate: tokio::sync::Mutex::new(()),
            reader: Mutex::new(None),
            connecting: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.state().is_connected()
    }

    /// Receive future [`ConnectionEvent`]s.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.shared.events.subscribe()
    }

    /// Whether a reply-awaiting request is outstanding.
    pub fn has_pending_request(&self) -> bool {
        self.shared.pending.is_pending()
    }

    /// Connect to the host and port from the configuration.
    pub async fn connect_default(&self) -> Result<()> {
        let host = self.config.host.clone();
        self.connect(&host, self.config.port).await
    }

    /// Open the socket and wait for the daemon's handshake frame.
    ///
    /// Rejected with `InvalidState` while another attempt is running or the
    /// connection is already up. On failure the socket is dropped and the
    /// state is `Error`. A [`disconnect`](Self::disconnect) during the
    /// attempt drops the socket at once and fails it with `ConnectionClosed`.
    pub async fn connect(&self, host: &str, port: u16) -> Result<()> {
        let epoch = {
            let mut state = self.shared.state();
            state.begin_connect()?;
            self.shared.epoch.fetch_add(1, Ordering::SeqCst) + 1
        };
        let cancel = CancellationToken::new();
        *self.connecting_slot() = Some((epoch, cancel.clone()));

        let addr = format!("{host}:{port}");
        info!(%addr, "connecting to daemon");

        let outcome = tokio::select! {
            outcome = self.establish(&addr, epoch) => outcome,
            () = cancel.cancelled() => Err(TouchwireError::ConnectionClosed),
        };

        {
            let mut connecting = self.connecting_slot();
            if connecting.as_ref().is_some_and(|(e, _)| *e == epoch) {
                *connecting = None;
            }
        }

        match outcome {
            Ok(()) => {
                info!(%addr, "daemon connected");
                self.shared.publish(ConnectionEvent::Connected);
                Ok(())
            }
            Err(error) => {
                let reason = error.to_string();
                if self
                    .shared
                    .transition(epoch, |state| state.fail(reason.clone()))
                    .is_ok()
                {
                    warn!(%addr, %error, "connect attempt failed");
                    self.shared.publish(ConnectionEvent::Error(reason));
                }
                Err(error)
            }
        }
    }

    async fn establish(&self, addr: &str, epoch: u64) -> Result<()> {
        let stream = tokio::time::timeout(self.config.connect_timeout(), TcpStream::connect(addr))
            .await
            .map_err(|_| TouchwireError::Timeout(self.config.connect_timeout()))??;
        stream.set_nodelay(true)?;

        self.shared
            .transition(epoch, ConnectionState::begin_handshake)?;
        let (read_half, write_half) = stream.into_split();
        let mut reader = FramedRead::new(read_half, DaemonCodec::new());

        let hello = Self::await_handshake(&mut reader, self.config.handshake_timeout()).await?;
        match hello.known_opcode() {
            Some(Opcode::Hello) => debug!("handshake frame accepted"),
            _ => warn!(
                opcode = hello.opcode,
                "unexpected opcode in handshake frame; continuing"
            ),
        }

        // Writer and reader go in under the same locks as the state flip, so
        // a caller that sees `Connected` can always write, disconnect() always
        // finds the reader, and a stale attempt never reaches either slot.
        let mut writer = self.shared.writer.lock().await;
        self.shared
            .transition(epoch, ConnectionState::complete_handshake)?;
        *writer = Some(FramedWrite::new(write_half, DaemonCodec::new()));
        let handle = tokio::spawn(read_loop(reader, Arc::clone(&self.shared), epoch));
        if let Some(old) = self.reader_slot().replace(handle) {
            old.abort();
        }
        Ok(())
    }

    async fn await_handshake(reader: &mut FrameReader, limit: Duration) -> Result<DecodedFrame> {
        let frame = match tokio::time::timeout(limit, reader.next()).await {
            Err(_) => return Err(TouchwireError::Timeout(limit)),
            Ok(None) => {
                return Err(TouchwireError::HandshakeFailed(
                    "daemon closed the socket before its handshake".into(),
                ));
            }
            Ok(Some(result)) => result?,
        };
        if !frame.checksum_valid {
            return Err(TouchwireError::HandshakeFailed(
                TouchwireError::ChecksumMismatch {
                    received: frame.received_checksum,
                    computed: frame.computed_checksum,
                }
                .to_string(),
            ));
        }
        Ok(frame)
    }

    fn reader_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.reader.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn connecting_slot(&self) -> MutexGuard<'_, Option<(u64, CancellationToken)>> {
        self.connecting.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Close the socket. Any waiting request fails with `ConnectionClosed`
    /// and a connect attempt in flight is abandoned.
    pub async fn disconnect(&self) {
        if let Some((_, cancel)) = self.connecting_slot().take() {
            cancel.cancel();
        }

        let mut writer = self.shared.writer.lock().await;
        let (was_connected, uptime) = {
            let mut state = self.shared.state();
            self.shared.epoch.fetch_add(1, Ordering::SeqCst);
            let uptime = state.connected_duration();
            let was = state.is_connected();
            state.force_disconnect();
            (was, uptime)
        };
        if let Some(handle) = self.reader_slot().take() {
            handle.abort();
        }
        if let Some(mut sink) = writer.take() {
            // Best effort; the socket is dropped either way.
            let _ = sink.close().await;
        }
        drop(writer);

        if self.shared.pending.fail(TouchwireError::ConnectionClosed) {
            debug!("pending request failed by disconnect");
        }
        if was_connected {
            info!(?uptime, "disconnected from daemon");
            self.shared.publish(ConnectionEvent::Disconnected);
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(TouchwireError::InvalidState("not connected"))
        }
    }

    async fn write(&self, packet: Packet) -> Result<()> {
        let mut writer = self.shared.writer.lock().await;
        let Some(sink) = writer.as_mut() else {
            return Err(TouchwireError::InvalidState("not connected"));
        };
        debug!(?packet, "sending");
        sink.send(packet).await
    }

    /// Send `packet` as fire-and-forget. Nothing is correlated and no
    /// reply is awaited.
    pub async fn send(&self, packet: Packet) -> Result<()> {
        self.ensure_connected()?;
        self.write(packet.with_response_mode(ResponseMode::FireAndForget))
            .await
    }

    /// Send `packet` as `AwaitReply` and wait up to `timeout` for the reply.
    ///
    /// Concurrent callers queue in arrival order. A timeout leaves the
    /// connection open; a reply that arrives afterwards is ignored.
    pub async fn request(&self, packet: Packet, timeout: Duration) -> Result<Reply> {
        let _turn = self.request_gate.lock().await;
        self.ensure_connected()?;

        let opcode = packet.opcode();
        let (reply_tx, reply_rx) = oneshot::channel();
        let ticket = self.shared.pending.register(opcode, timeout, reply_tx)?;
        let _registration = Registration {
            slot: &self.shared.pending,
            ticket,
        };

        self.write(packet.with_response_mode(ResponseMode::AwaitReply))
            .await?;

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(TouchwireError::ConnectionClosed),
            Err(_) => {
                warn!(opcode, ?timeout, "no reply before deadline");
                Err(TouchwireError::Timeout(timeout))
            }
        }
    }

    /// `request` with the interactive reply timeout from the configuration.
    pub async fn request_default(&self, packet: Packet) -> Result<Reply> {
        self.request(packet, self.config.reply_timeout()).await
    }
}

impl Drop for DaemonConnection {
    fn drop(&mut self) {
        if let Some((_, cancel)) = self.connecting_slot().take() {
            cancel.cancel();
        }
        if let Some(handle) = self.reader_slot().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for DaemonConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaemonConnection")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("state", &self.state())
            .finish()
    }
}

/// Clears its pending registration when the request settles or the
/// caller's future is dropped.
struct Registration<'a> {
    slot: &'a PendingSlot,
    ticket: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.slot.cancel(self.ticket);
    }
}

async fn read_loop(mut reader: FrameReader, shared: Arc<Shared>, epoch: u64) {
    while let Some(item) = reader.next().await {
        match item {
            Ok(_) if !shared.is_current(epoch) => return,
            Ok(frame) => shared.dispatch(frame),
            Err(error) => {
                shared.on_transport_error(epoch, error).await;
                return;
            }
        }
    }
    shared.on_closed(epoch).await;
}
