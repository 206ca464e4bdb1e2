use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use log::{debug, warn};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use serde::Deserialize;

use crate::error::ControlError;
use crate::relay::RelayWriter;

/// Asynchronous update for a running processor. Each present field is applied
/// on its own; absent fields keep their current value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlMessage {
    #[serde(skip)]
    pub relay: Option<RelayWriter>,
    #[serde(default)]
    pub is_playing: Option<bool>,
    #[serde(default)]
    pub mic_active: Option<bool>,
}

impl ControlMessage {
    pub fn playing(is_playing: bool) -> Self {
        Self {
            is_playing: Some(is_playing),
            ..Self::default()
        }
    }

    pub fn mic(mic_active: bool) -> Self {
        Self {
            mic_active: Some(mic_active),
            ..Self::default()
        }
    }

    pub fn bind(relay: impl Into<RelayWriter>) -> Self {
        Self {
            relay: Some(relay.into()),
            ..Self::default()
        }
    }

    /// Parses the flag portion of a control message, e.g.
    /// `{"isPlaying": true}` or `{"micActive": false}`.
    pub fn from_json(text: &str) -> Result<Self, ControlError> {
        serde_json::from_str(text).map_err(|e| ControlError::Parse(e.to_string()))
    }
}

/// Flags as observed at the top of one quantum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlSnapshot {
    pub is_playing: bool,
    pub mic_active: bool,
}

impl ControlSnapshot {
    pub fn is_active(&self) -> bool {
        self.is_playing || self.mic_active
    }
}

/// Receiving end of the relay hand-off, owned by the processor. Polling it
/// never blocks.
pub(crate) struct RelayInbox(HeapCons<RelayWriter>);

impl RelayInbox {
    pub(crate) fn try_take(&mut self) -> Option<RelayWriter> {
        self.0.try_pop()
    }
}

/// Flags and relay binding shared between the audio thread and whoever
/// controls it.
///
/// Flags are plain atomics. A bound relay writer travels to the audio thread
/// through a one-slot ring; the mutexes around its two ends are only touched
/// off the audio thread (binding, and processor construction).
pub struct ControlState {
    is_playing: AtomicBool,
    mic_active: AtomicBool,
    relay_bound: AtomicBool,
    outbox: Mutex<HeapProd<RelayWriter>>,
    inbox: Mutex<Option<HeapCons<RelayWriter>>>,
}

impl ControlState {
    pub fn new() -> Self {
        let (outbox, inbox) = HeapRb::<RelayWriter>::new(1).split();
        Self {
            is_playing: AtomicBool::new(false),
            mic_active: AtomicBool::new(false),
            relay_bound: AtomicBool::new(false),
            outbox: Mutex::new(outbox),
            inbox: Mutex::new(Some(inbox)),
        }
    }

    /// Applies every field present in `message`. Flags are always applied; a
    /// second relay binding is refused and the first one stays in place.
    pub fn apply(&self, message: ControlMessage) -> Result<(), ControlError> {
        if let Some(is_playing) = message.is_playing {
            self.is_playing.store(is_playing, Ordering::Release);
            debug!("isPlaying -> {}", is_playing);
        }
        if let Some(mic_active) = message.mic_active {
            self.mic_active.store(mic_active, Ordering::Release);
            debug!("micActive -> {}", mic_active);
        }
        match message.relay {
            Some(relay) => self.bind_relay(relay),
            None => Ok(()),
        }
    }

    fn bind_relay(&self, relay: RelayWriter) -> Result<(), ControlError> {
        if self.relay_bound.swap(true, Ordering::AcqRel) {
            warn!("ignoring relay rebinding; the processor keeps its first relay");
            return Err(ControlError::RelayAlreadyBound);
        }
        let capacity = relay.capacity();
        let mut outbox = self.outbox.lock().unwrap_or_else(PoisonError::into_inner);
        if outbox.try_push(relay).is_ok() {
            debug!("relay bound (capacity {})", capacity);
        }
        Ok(())
    }

    pub fn is_relay_bound(&self) -> bool {
        self.relay_bound.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> ControlSnapshot {
        ControlSnapshot {
            is_playing: self.is_playing.load(Ordering::Acquire),
            mic_active: self.mic_active.load(Ordering::Acquire),
        }
    }

    /// Hands out the receiving end of the relay hand-off. Only the first
    /// caller gets it.
    pub(crate) fn take_relay_inbox(&self) -> Option<RelayInbox> {
        self.inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map(RelayInbox)
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlState")
            .field("snapshot", &self.snapshot())
            .field("relay_bound", &self.is_relay_bound())
            .finish()
    }
}
