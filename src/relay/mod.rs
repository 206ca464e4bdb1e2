//! Bounded single-producer/single-consumer relay of `f32` results.
//!
//! Natively the relay is a `ringbuf` heap ring split into its two halves: the
//! producer is bound into a processor, the consumer stays with whoever reads
//! the results. In the browser the queue instead lives in a
//! `SharedArrayBuffer` (see [`shared`]) so a consumer on another thread can
//! read it.

pub mod shared;

use std::fmt;

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

pub use shared::{SharedRelay, SlotStorage};

/// Creates a relay holding at most `capacity` values.
pub fn relay_channel(capacity: usize) -> (RelayProducer, RelayConsumer) {
    let rb = HeapRb::<f32>::new(capacity.max(1));
    let (prod, cons) = rb.split();
    (RelayProducer { inner: prod }, RelayConsumer { inner: cons })
}

/// Writing half, owned by the audio thread once bound.
pub struct RelayProducer {
    inner: HeapProd<f32>,
}

impl RelayProducer {
    /// Returns `false` and drops `value` when the relay is full.
    pub fn enqueue(&mut self, value: f32) -> bool {
        self.inner.try_push(value).is_ok()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity().get()
    }

    pub fn available_write(&self) -> usize {
        self.inner.vacant_len()
    }
}

impl fmt::Debug for RelayProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayProducer")
            .field("capacity", &self.capacity())
            .field("available_write", &self.available_write())
            .finish()
    }
}

/// Reading half.
pub struct RelayConsumer {
    inner: HeapCons<f32>,
}

impl RelayConsumer {
    pub fn dequeue(&mut self) -> Option<f32> {
        self.inner.try_pop()
    }

    /// Appends everything currently queued to `out` and returns how many
    /// values were moved.
    pub fn drain_into(&mut self, out: &mut Vec<f32>) -> usize {
        let before = out.len();
        out.extend(self.inner.pop_iter());
        out.len() - before
    }

    pub fn available_read(&self) -> usize {
        self.inner.occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity().get()
    }
}

impl fmt::Debug for RelayConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConsumer")
            .field("capacity", &self.capacity())
            .field("available_read", &self.available_read())
            .finish()
    }
}

/// Whatever a processor writes its results into.
pub enum RelayWriter {
    Local(RelayProducer),
    #[cfg(all(feature = "wasm", target_arch = "wasm32"))]
    Shared(SharedRelay<shared::JsSlots>),
}

impl RelayWriter {
    /// Non-blocking. `false` means the value was dropped.
    pub fn enqueue(&mut self, value: f32) -> bool {
        match self {
            RelayWriter::Local(producer) => producer.enqueue(value),
            #[cfg(all(feature = "wasm", target_arch = "wasm32"))]
            RelayWriter::Shared(relay) => relay.enqueue(value),
        }
    }

    pub fn capacity(&self) -> usize {
        match self {
            RelayWriter::Local(producer) => producer.capacity(),
            #[cfg(all(feature = "wasm", target_arch = "wasm32"))]
            RelayWriter::Shared(relay) => relay.capacity(),
        }
    }
}

impl From<RelayProducer> for RelayWriter {
    fn from(producer: RelayProducer) -> Self {
        RelayWriter::Local(producer)
    }
}

impl fmt::Debug for RelayWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayWriter::Local(producer) => f.debug_tuple("Local").field(producer).finish(),
            #[cfg(all(feature = "wasm", target_arch = "wasm32"))]
            RelayWriter::Shared(relay) => f
                .debug_struct("Shared")
                .field("capacity", &relay.capacity())
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_capacity_one_keeps_first_value() {
        let (mut producer, mut consumer) = relay_channel(1);
        assert!(producer.enqueue(220.0));
        assert!(!producer.enqueue(330.0));

        assert_eq!(consumer.dequeue(), Some(220.0));
        assert_eq!(consumer.dequeue(), None);
    }

    #[test]
    fn test_available_counts_track_both_halves() {
        let (mut producer, mut consumer) = relay_channel(3);
        assert_eq!(producer.capacity(), 3);
        assert_eq!(consumer.capacity(), 3);
        assert_eq!(producer.available_write(), 3);

        producer.enqueue(1.0);
        producer.enqueue(2.0);
        assert_eq!(consumer.available_read(), 2);
        assert_eq!(producer.available_write(), 1);

        consumer.dequeue();
        producer.enqueue(3.0);
        producer.enqueue(4.0);
        assert_eq!(producer.available_write(), 0);

        let mut out = Vec::new();
        assert_eq!(consumer.drain_into(&mut out), 3);
        assert_eq!(out, vec![2.0, 3.0, 4.0]);
        assert!(consumer.is_empty());
    }

    #[test]
    fn test_writer_reports_drops() {
        let (producer, mut consumer) = relay_channel(1);
        let mut writer = RelayWriter::from(producer);
        assert_eq!(writer.capacity(), 1);
        assert!(writer.enqueue(110.0));
        assert!(!writer.enqueue(120.0));
        assert_eq!(consumer.dequeue(), Some(110.0));
    }

    #[test]
    fn test_values_cross_threads_in_order() {
        let (mut producer, mut consumer) = relay_channel(16);

        let reader = thread::spawn(move || {
            let mut seen = Vec::new();
            while seen.len() < 1000 {
                if let Some(v) = consumer.dequeue() {
                    seen.push(v);
                } else {
                    thread::yield_now();
                }
            }
            seen
        });

        let mut sent = 0;
        while sent < 1000 {
            if producer.enqueue(sent as f32) {
                sent += 1;
            } else {
                thread::yield_now();
            }
        }

        let seen = reader.join().unwrap();
        assert!(seen.iter().enumerate().all(|(i, &v)| v == i as f32));
    }
}
