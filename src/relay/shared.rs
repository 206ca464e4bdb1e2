//! Relay over a shared memory region laid out like the browser `ringbuf.js`
//! queue: a `u32` write cursor, a `u32` read cursor, then `capacity + 1` `f32`
//! slots. One slot always stays empty so "full" and "empty" differ. The
//! consumer may be any thread that maps the same region with that library.

use crate::error::ControlError;

/// Bytes taken by the two cursors in front of the slots.
pub const HEADER_BYTES: usize = 8;
pub const SLOT_BYTES: usize = 4;

/// Index of each cursor word in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Write = 0,
    Read = 1,
}

/// Size of a region that holds `capacity` values.
pub fn byte_length(capacity: usize) -> usize {
    HEADER_BYTES + (capacity.max(1) + 1) * SLOT_BYTES
}

/// Number of slots (capacity + 1) in a region of `byte_length` bytes.
pub fn slot_count(byte_length: usize) -> Result<usize, ControlError> {
    let slots = byte_length
        .checked_sub(HEADER_BYTES)
        .filter(|body| body % SLOT_BYTES == 0)
        .map(|body| body / SLOT_BYTES);
    match slots {
        Some(slots) if slots >= 2 => Ok(slots),
        _ => Err(ControlError::InvalidRelayBuffer(byte_length)),
    }
}

/// Access to the cursor words and slots of a shared region. Cursor accesses
/// must be atomic and sequentially consistent with respect to the slots.
pub trait SlotStorage {
    fn slot_count(&self) -> usize;
    fn load_cursor(&self, cursor: Cursor) -> usize;
    fn store_cursor(&self, cursor: Cursor, value: usize);
    fn read_slot(&self, index: usize) -> f32;
    fn write_slot(&self, index: usize, value: f32);
}

/// Queue logic over a [`SlotStorage`]. Either side of the queue can be driven
/// through it; each side only ever stores its own cursor.
pub struct SharedRelay<S> {
    storage: S,
}

impl<S: SlotStorage> SharedRelay<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn capacity(&self) -> usize {
        self.storage.slot_count() - 1
    }

    pub fn available_read(&self) -> usize {
        let slots = self.storage.slot_count();
        let (read, write) = self.cursors();
        (write + slots - read) % slots
    }

    /// Producer side. Returns `false` and drops `value` when full.
    pub fn enqueue(&self, value: f32) -> bool {
        let slots = self.storage.slot_count();
        let (read, write) = self.cursors();
        let next = (write + 1) % slots;
        if next == read {
            return false;
        }
        self.storage.write_slot(write, value);
        self.storage.store_cursor(Cursor::Write, next);
        true
    }

    /// Consumer side.
    pub fn dequeue(&self) -> Option<f32> {
        let slots = self.storage.slot_count();
        let (read, write) = self.cursors();
        if read == write {
            return None;
        }
        let value = self.storage.read_slot(read);
        self.storage.store_cursor(Cursor::Read, (read + 1) % slots);
        Some(value)
    }

    pub fn drain_into(&self, out: &mut Vec<f32>) -> usize {
        let before = out.len();
        while let Some(value) = self.dequeue() {
            out.push(value);
        }
        out.len() - before
    }

    // Cursors come from memory another context writes; keep them in range.
    fn cursors(&self) -> (usize, usize) {
        let slots = self.storage.slot_count();
        (
            self.storage.load_cursor(Cursor::Read) % slots,
            self.storage.load_cursor(Cursor::Write) % slots,
        )
    }
}

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
mod js {
    use js_sys::{Atomics, Float32Array, Int32Array, SharedArrayBuffer};

    use super::{slot_count, Cursor, SlotStorage, HEADER_BYTES};
    use crate::error::ControlError;

    /// Views over a `SharedArrayBuffer`. Cursors go through `Atomics`.
    pub struct JsSlots {
        buffer: SharedArrayBuffer,
        cursors: Int32Array,
        slots: Float32Array,
    }

    impl JsSlots {
        pub fn new(buffer: SharedArrayBuffer) -> Result<Self, ControlError> {
            let count = slot_count(buffer.byte_length() as usize)?;
            let cursors = Int32Array::new_with_byte_offset_and_length(&buffer, 0, 2);
            let slots = Float32Array::new_with_byte_offset_and_length(
                &buffer,
                HEADER_BYTES as u32,
                count as u32,
            );
            Ok(Self {
                buffer,
                cursors,
                slots,
            })
        }

        pub fn buffer(&self) -> &SharedArrayBuffer {
            &self.buffer
        }
    }

    impl SlotStorage for JsSlots {
        fn slot_count(&self) -> usize {
            self.slots.length() as usize
        }

        fn load_cursor(&self, cursor: Cursor) -> usize {
            Atomics::load(&self.cursors, cursor as u32).map_or(0, |v| v as u32 as usize)
        }

        fn store_cursor(&self, cursor: Cursor, value: usize) {
            let _ = Atomics::store(&self.cursors, cursor as u32, value as i32);
        }

        fn read_slot(&self, index: usize) -> f32 {
            self.slots.get_index(index as u32)
        }

        fn write_slot(&self, index: usize, value: f32) {
            self.slots.set_index(index as u32, value);
        }
    }
}

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub use js::JsSlots;
