//! Handle-addressed table of framing instances.
//!
//! Each instance pairs a [`Receiver`] with the handler its events go to. The
//! registry is an ordinary owned value: create one per subsystem and pass it
//! where it is needed.

use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::builder;
use crate::config::ProtocolConfig;
use crate::error::{FrameError, Result};
use crate::header::{Preamble, HEADER_SIZE};
use crate::receiver::{PacketEvent, Receiver};

/// Identifies one instance within a [`Registry`]. Assigned sequentially, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u8);

impl Handle {
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> u8 {
        self.0
    }

    fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Receives the events of one instance.
///
/// `source` is the token the caller passed to [`Registry::feed_bytes`], handed
/// back untouched so one handler can serve several links.
pub trait PacketHandler<S: ?Sized> {
    fn on_event(&mut self, event: PacketEvent, source: &S);
}

impl<S: ?Sized, F> PacketHandler<S> for F
where
    F: FnMut(PacketEvent, &S),
{
    fn on_event(&mut self, event: PacketEvent, source: &S) {
        self(event, source)
    }
}

/// One framing context: preamble, parse state, and handler.
pub struct Instance<S: ?Sized> {
    handle: Handle,
    receiver: Receiver,
    handler: Box<dyn PacketHandler<S> + Send>,
}

impl<S: ?Sized> Instance<S> {
    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn preamble(&self) -> Preamble {
        self.receiver.preamble()
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    /// Run `data` through this instance's state machine, dispatching every
    /// event to its handler before returning.
    pub fn feed_bytes(&mut self, data: &[u8], source: &S) {
        let handler = &mut self.handler;
        self.receiver
            .feed(data, |event| handler.on_event(event, source));
    }

    /// Drop any partial frame.
    pub fn reset(&mut self) {
        self.receiver.reset();
    }
}

impl<S: ?Sized> std::fmt::Debug for Instance<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("handle", &self.handle)
            .field("receiver", &self.receiver)
            .finish_non_exhaustive()
    }
}

/// Fixed-capacity collection of framing instances.
///
/// `S` is the source token type passed through `feed_bytes` to handlers.
pub struct Registry<S: ?Sized = ()> {
    instances: Vec<Instance<S>>,
    config: ProtocolConfig,
}

impl<S: ?Sized> Registry<S> {
    /// Create an empty registry.
    pub fn new(config: ProtocolConfig) -> Self {
        Self {
            instances: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Maximum number of instances this registry accepts.
    pub fn capacity(&self) -> usize {
        self.config.instance_capacity()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Register a new instance and return its handle.
    ///
    /// Fails without changing the registry when it is full, when both preamble
    /// bytes are equal, or when slot storage cannot be grown.
    pub fn create_instance<H>(&mut self, handler: H, preamble_1: u8, preamble_2: u8) -> Result<Handle>
    where
        H: PacketHandler<S> + Send + 'static,
    {
        let max = self.capacity();
        if self.instances.len() >= max {
            return Err(FrameError::CapacityExceeded { max });
        }
        let handle = u8::try_from(self.instances.len())
            .map(Handle)
            .map_err(|_| FrameError::CapacityExceeded { max })?;

        let preamble = Preamble::new(preamble_1, preamble_2);
        if !preamble.is_distinct() {
            return Err(FrameError::AmbiguousPreamble(preamble_1));
        }

        self.instances
            .try_reserve(1)
            .map_err(|_| FrameError::AllocationFailure {
                size: std::mem::size_of::<Instance<S>>(),
            })?;
        self.instances.push(Instance {
            handle,
            receiver: Receiver::with_max_payload(preamble, self.config.max_payload_size),
            handler: Box::new(handler),
        });

        debug!(%handle, %preamble, "framing instance created");
        Ok(handle)
    }

    pub fn instance(&self, handle: Handle) -> Result<&Instance<S>> {
        self.instances
            .get(handle.index())
            .ok_or(FrameError::InvalidInstance(handle))
    }

    pub fn instance_mut(&mut self, handle: Handle) -> Result<&mut Instance<S>> {
        self.instances
            .get_mut(handle.index())
            .ok_or(FrameError::InvalidInstance(handle))
    }

    /// All instances, mutably. Distinct instances share no state, so they can
    /// be moved to different threads and fed concurrently.
    pub fn instances_mut(&mut self) -> std::slice::IterMut<'_, Instance<S>> {
        self.instances.iter_mut()
    }

    pub fn preamble(&self, handle: Handle) -> Result<Preamble> {
        self.instance(handle).map(Instance::preamble)
    }

    /// Feed received bytes to one instance. Its handler runs zero or more
    /// times before this returns.
    pub fn feed_bytes(&mut self, handle: Handle, data: &[u8], source: &S) -> Result<()> {
        self.instance_mut(handle)?.feed_bytes(data, source);
        Ok(())
    }

    /// See [`builder::build_packet`].
    pub fn build_packet(&self, dest: &mut BytesMut, payload: &[u8], handle: Handle) -> Result<()> {
        builder::build_packet(dest, payload, self.preamble(handle)?)
    }

    /// See [`builder::build_packet_from_buffer`].
    pub fn build_packet_from_buffer(&self, dest: &mut BytesMut, src: &BytesMut, handle: Handle) -> Result<()> {
        builder::build_packet_from_buffer(dest, src, self.preamble(handle)?)
    }

    /// See [`builder::build_header_in_place`].
    pub fn build_header_in_place(
        &self,
        dest: &mut [u8; HEADER_SIZE],
        payload: &[u8],
        handle: Handle,
    ) -> Result<()> {
        builder::build_header_in_place(dest, payload, self.preamble(handle)?)
    }

    /// See [`builder::append_header`].
    pub fn append_header(&self, dest: &mut BytesMut, payload: &[u8], handle: Handle) -> Result<()> {
        builder::append_header(dest, payload, self.preamble(handle)?)
    }

    /// See [`builder::build_single_param`].
    pub fn build_single_param(&self, payload: &[u8], handle: Handle) -> Result<Bytes> {
        builder::build_single_param(payload, self.preamble(handle)?)
    }

    /// See [`builder::build_multi_param`].
    pub fn build_multi_param(&self, segments: &[&[u8]], handle: Handle) -> Result<Bytes> {
        builder::build_multi_param(segments, self.preamble(handle)?)
    }
}

impl<S: ?Sized> Default for Registry<S> {
    fn default() -> Self {
        Self::new(ProtocolConfig::default())
    }
}

impl<S: ?Sized> std::fmt::Debug for Registry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("instances", &self.instances)
            .finish()
    }
}
