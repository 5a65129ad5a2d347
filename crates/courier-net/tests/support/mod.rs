//! In-memory collaborators for driving the session deterministically.

#![allow(dead_code)]

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use courier_core::{OneShotTimer, TimerCallback};
use courier_net::dns::{LookupCallback, NameResolver, validate_server_count};
use courier_net::udp::{Datagram, UdpChannel, UdpDescriptor, UdpEvents, UdpTransport};
use courier_net::{NetworkError, Result};
use parking_lot::Mutex;

/// A resolver whose lookups stay pending until the test answers them.
#[derive(Default)]
pub struct ScriptedResolver {
    lookups: Mutex<Vec<String>>,
    pending: Mutex<Vec<LookupCallback>>,
    servers: Mutex<Vec<IpAddr>>,
}

impl ScriptedResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Host names looked up so far, in order.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().clone()
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.lock().len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Complete the oldest pending lookup.
    pub fn answer(&self, result: Result<IpAddr>) -> bool {
        let done = {
            let mut pending = self.pending.lock();
            if pending.is_empty() {
                return false;
            }
            pending.remove(0)
        };
        done(result);
        true
    }

    /// Complete the most recent pending lookup.
    pub fn answer_latest(&self, result: Result<IpAddr>) -> bool {
        let done = self.pending.lock().pop();
        match done {
            Some(done) => {
                done(result);
                true
            }
            None => false,
        }
    }

    pub fn servers(&self) -> Vec<IpAddr> {
        self.servers.lock().clone()
    }
}

impl NameResolver for ScriptedResolver {
    fn lookup(&self, hostname: &str, done: LookupCallback) {
        self.lookups.lock().push(hostname.to_string());
        self.pending.lock().push(done);
    }

    fn set_servers(&self, servers: &[IpAddr]) -> Result<()> {
        validate_server_count(servers)?;
        *self.servers.lock() = servers.to_vec();
        Ok(())
    }
}

/// A channel opened by [`FakeTransport`].
pub struct FakeChannel {
    pub descriptor: UdpDescriptor,
    events: UdpEvents,
    sent: Mutex<Vec<Bytes>>,
    closed: AtomicBool,
    fail_send: bool,
}

impl FakeChannel {
    pub fn sent(&self) -> Vec<Bytes> {
        self.sent.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Report that the datagram left the device.
    pub fn deliver_sent(&self) {
        if !self.is_closed() {
            (self.events.on_sent)();
        }
    }

    /// Deliver a datagram from the remote endpoint.
    pub fn deliver_reply(&self, payload: &'static [u8]) {
        if !self.is_closed() {
            (self.events.on_received)(Datagram::new(payload, self.descriptor.remote));
        }
    }

    /// Deliver a datagram even though the channel is closed.
    pub fn deliver_reply_unchecked(&self, payload: &'static [u8]) {
        (self.events.on_received)(Datagram::new(payload, self.descriptor.remote));
    }

    pub fn deliver_error(&self, message: &str) {
        (self.events.on_error)(NetworkError::UdpSocket(message.to_string()));
    }
}

impl UdpChannel for FakeChannel {
    fn local_port(&self) -> u16 {
        self.descriptor.local_port()
    }

    fn send(&self, payload: Bytes) -> Result<()> {
        if self.fail_send {
            return Err(NetworkError::SendFailed("stack rejected the datagram".into()));
        }
        self.sent.lock().push(payload);
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// A transport that records every channel it opens.
#[derive(Default)]
pub struct FakeTransport {
    next_port: Mutex<u16>,
    channels: Mutex<Vec<Arc<FakeChannel>>>,
    fail_send: AtomicBool,
    fail_open: AtomicBool,
    stray_on_open: Mutex<Option<&'static [u8]>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_port: Mutex::new(50000),
            ..Self::default()
        })
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::SeqCst);
    }

    pub fn fail_opens(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Deliver `payload` from inside the next `open`, before the channel is
    /// handed back. Models a receive loop that runs ahead of the caller.
    pub fn stray_reply_on_open(&self, payload: &'static [u8]) {
        *self.stray_on_open.lock() = Some(payload);
    }

    pub fn channel_count(&self) -> usize {
        self.channels.lock().len()
    }

    /// The most recently opened channel.
    pub fn last(&self) -> Arc<FakeChannel> {
        self.channels
            .lock()
            .last()
            .cloned()
            .expect("no channel has been opened")
    }
}

impl UdpTransport for FakeTransport {
    fn allocate_port(&self) -> u16 {
        let mut port = self.next_port.lock();
        *port += 1;
        *port
    }

    fn open(&self, descriptor: UdpDescriptor, events: UdpEvents) -> Result<Arc<dyn UdpChannel>> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(NetworkError::UdpSocket("no sockets left".into()));
        }

        let channel = Arc::new(FakeChannel {
            descriptor,
            events,
            sent: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            fail_send: self.fail_send.load(Ordering::SeqCst),
        });
        self.channels.lock().push(channel.clone());

        let stray = self.stray_on_open.lock().take();
        if let Some(payload) = stray {
            channel.deliver_reply(payload);
        }
        Ok(channel)
    }
}

/// A timer whose expiry is split in two: [`latch`](Self::latch) starts it and
/// hands back the callback, which the test runs whenever it likes.
///
/// This reproduces an expiry that already passed the timer's own checks when
/// the owner re-armed or disarmed it.
#[derive(Default)]
pub struct LatchTimer {
    callback: Mutex<Option<TimerCallback>>,
    armed: AtomicBool,
    arms: Mutex<Vec<Duration>>,
}

impl LatchTimer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Begin an expiry. Returns the callback in force, or `None` when the
    /// timer is not armed.
    pub fn latch(&self) -> Option<TimerCallback> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.callback.lock().clone()
        } else {
            None
        }
    }

    /// Durations passed to `arm`, in order.
    pub fn arms(&self) -> Vec<Duration> {
        self.arms.lock().clone()
    }
}

impl OneShotTimer for LatchTimer {
    fn set_callback(&self, callback: TimerCallback) {
        *self.callback.lock() = Some(callback);
    }

    fn arm(&self, duration: Duration) {
        self.arms.lock().push(duration);
        self.armed.store(true, Ordering::SeqCst);
    }

    fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }
}

pub fn remote(addr: &str) -> SocketAddr {
    addr.parse().unwrap()
}
