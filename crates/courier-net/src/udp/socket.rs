//! Tokio implementation of the UDP transport.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket as StdUdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use rand::Rng;
use tokio::net::UdpSocket as TokioUdpSocket;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use super::config::{Datagram, EPHEMERAL_PORTS, UdpDescriptor};
use super::transport::{UdpChannel, UdpEvents, UdpTransport};
use crate::Result;
use crate::error::NetworkError;

/// Default receive buffer; large enough for any UDP payload.
const DEFAULT_RECV_BUFFER: usize = 65535;

/// Command sent to a channel's async task.
enum Command {
    Send(Bytes),
    Close,
}

/// A [`UdpTransport`] that opens real sockets on a tokio runtime.
///
/// Binding happens synchronously inside [`open`](UdpTransport::open) so bind
/// errors are reported to the caller directly. Each channel then runs its
/// send/receive loop as a spawned task.
///
/// # Example
///
/// ```ignore
/// use courier_net::udp::{TokioUdpTransport, UdpDescriptor, UdpEvents, UdpTransport};
///
/// let transport = TokioUdpTransport::new()?;
/// let port = transport.allocate_port();
/// let channel = transport.open(
///     UdpDescriptor::new(port, "127.0.0.1:9999".parse()?),
///     UdpEvents::ignored(),
/// )?;
/// channel.send(bytes::Bytes::from_static(b"ping"))?;
/// ```
#[derive(Debug, Clone)]
pub struct TokioUdpTransport {
    handle: Handle,
    recv_buffer_size: usize,
}

impl TokioUdpTransport {
    /// Create a transport on the current tokio runtime.
    pub fn new() -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|_| NetworkError::UdpSocket("No tokio runtime available".into()))?;
        Ok(Self::with_handle(handle))
    }

    /// Create a transport that spawns channel tasks on the given runtime.
    pub fn with_handle(handle: Handle) -> Self {
        Self {
            handle,
            recv_buffer_size: DEFAULT_RECV_BUFFER,
        }
    }

    /// Set the receive buffer size. Longer datagrams are truncated.
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.recv_buffer_size = size;
        self
    }

    /// Bind the descriptor's local address, falling back to an OS-assigned
    /// port if the requested one is taken.
    fn bind(local: SocketAddr) -> Result<StdUdpSocket> {
        match StdUdpSocket::bind(local) {
            Ok(socket) => Ok(socket),
            Err(e) if e.kind() == ErrorKind::AddrInUse && local.port() != 0 => {
                tracing::warn!(
                    target: "courier_net::udp",
                    %local,
                    "port in use, using an OS-assigned port"
                );
                StdUdpSocket::bind(SocketAddr::new(local.ip(), 0)).map_err(|e| {
                    NetworkError::UdpSocket(format!("Failed to bind {}: {}", local.ip(), e))
                })
            }
            Err(e) => Err(NetworkError::UdpSocket(format!(
                "Failed to bind {}: {}",
                local, e
            ))),
        }
    }
}

impl UdpTransport for TokioUdpTransport {
    fn allocate_port(&self) -> u16 {
        rand::thread_rng().gen_range(EPHEMERAL_PORTS)
    }

    fn open(&self, descriptor: UdpDescriptor, events: UdpEvents) -> Result<Arc<dyn UdpChannel>> {
        let std_socket = Self::bind(descriptor.local)?;
        std_socket.set_nonblocking(true)?;
        let local_addr = std_socket.local_addr()?;

        let socket = {
            let _guard = self.handle.enter();
            TokioUdpSocket::from_std(std_socket)
                .map_err(|e| NetworkError::UdpSocket(format!("Failed to register socket: {}", e)))?
        };

        let (tx, rx) = mpsc::unbounded_channel::<Command>();
        let is_open = Arc::new(AtomicBool::new(true));

        self.handle.spawn(run_channel(
            socket,
            descriptor.remote,
            rx,
            events,
            is_open.clone(),
            self.recv_buffer_size,
        ));

        tracing::trace!(
            target: "courier_net::udp",
            %local_addr,
            remote = %descriptor.remote,
            "channel opened"
        );
        Ok(Arc::new(TokioUdpChannel {
            local_addr,
            remote: descriptor.remote,
            command_tx: Mutex::new(Some(tx)),
            is_open,
        }))
    }
}

/// The send/receive loop of one channel.
async fn run_channel(
    socket: TokioUdpSocket,
    remote: SocketAddr,
    mut rx: mpsc::UnboundedReceiver<Command>,
    events: UdpEvents,
    is_open: Arc<AtomicBool>,
    recv_buffer_size: usize,
) {
    let mut buffer = vec![0u8; recv_buffer_size];

    loop {
        tokio::select! {
            cmd = rx.recv() => {
                match cmd {
                    Some(Command::Send(data)) => {
                        match socket.send_to(&data, remote).await {
                            Ok(_) if is_open.load(Ordering::SeqCst) => (events.on_sent)(),
                            Ok(_) => {}
                            Err(e) => {
                                (events.on_error)(NetworkError::UdpSocket(format!(
                                    "Send error: {}", e
                                )));
                            }
                        }
                    }
                    Some(Command::Close) | None => {
                        break;
                    }
                }
            }

            result = socket.recv_from(&mut buffer) => {
                match result {
                    Ok((n, source)) => {
                        if is_open.load(Ordering::SeqCst) {
                            (events.on_received)(Datagram::new(buffer[..n].to_vec(), source));
                        }
                    }
                    Err(e) => {
                        (events.on_error)(NetworkError::UdpSocket(format!(
                            "Receive error: {}", e
                        )));
                    }
                }
            }
        }
    }

    is_open.store(false, Ordering::SeqCst);
    tracing::trace!(target: "courier_net::udp", %remote, "channel closed");
}

/// A channel opened by [`TokioUdpTransport`].
struct TokioUdpChannel {
    local_addr: SocketAddr,
    remote: SocketAddr,
    command_tx: Mutex<Option<mpsc::UnboundedSender<Command>>>,
    is_open: Arc<AtomicBool>,
}

impl UdpChannel for TokioUdpChannel {
    fn local_port(&self) -> u16 {
        self.local_addr.port()
    }

    fn send(&self, payload: Bytes) -> Result<()> {
        let tx = self.command_tx.lock();
        match tx.as_ref() {
            Some(tx) if self.is_open.load(Ordering::SeqCst) => {
                tx.send(Command::Send(payload))
                    .map_err(|_| NetworkError::SendFailed("Channel closed".into()))?;
                Ok(())
            }
            _ => Err(NetworkError::SendFailed("Channel closed".into())),
        }
    }

    fn close(&self) {
        self.is_open.store(false, Ordering::SeqCst);
        if let Some(tx) = self.command_tx.lock().take() {
            let _ = tx.send(Command::Close);
        }
    }
}

impl Drop for TokioUdpChannel {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for TokioUdpChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioUdpChannel")
            .field("local_addr", &self.local_addr)
            .field("remote", &self.remote)
            .field("is_open", &self.is_open.load(Ordering::SeqCst))
            .finish()
    }
}
