// src/output/sink.rs

//! Write-only byte sinks shared across the whole task tree.
//!
//! Every output buffer worker in the tree may write to the same sink
//! concurrently. A [`Sink`] guarantees that one emission is written as a
//! unit; nothing is guaranteed across emissions.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

/// Destination for formatted emissions.
pub trait SinkWriter: Send + Sync {
    /// Write one complete emission.
    fn write_emission(&self, bytes: &[u8]) -> io::Result<()>;
}

/// Cheaply clonable handle to a shared [`SinkWriter`].
#[derive(Clone)]
pub struct Sink {
    inner: Arc<dyn SinkWriter>,
}

impl Sink {
    pub fn new(writer: impl SinkWriter + 'static) -> Self {
        Self {
            inner: Arc::new(writer),
        }
    }

    /// Wrap any `io::Write` behind a mutex.
    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self::new(LockedWriter {
            writer: Mutex::new(Box::new(writer)),
        })
    }

    /// Sink that hands each emission to a callback.
    pub fn from_fn(f: impl Fn(&[u8]) + Send + Sync + 'static) -> Self {
        Self::new(FnSink(f))
    }

    /// In-memory sink plus a handle for reading back what was emitted.
    pub fn memory() -> (Self, MemorySink) {
        let memory = MemorySink::default();
        (Self::new(memory.clone()), memory)
    }

    pub fn emit(&self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_emission(bytes)
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink").finish_non_exhaustive()
    }
}

struct LockedWriter {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl SinkWriter for LockedWriter {
    fn write_emission(&self, bytes: &[u8]) -> io::Result<()> {
        let mut writer = lock(&self.writer);
        writer.write_all(bytes)?;
        writer.flush()
    }
}

struct FnSink<F>(F);

impl<F> SinkWriter for FnSink<F>
where
    F: Fn(&[u8]) + Send + Sync,
{
    fn write_emission(&self, bytes: &[u8]) -> io::Result<()> {
        (self.0)(bytes);
        Ok(())
    }
}

/// Records every emission as a separate string.
#[derive(Clone, Default)]
pub struct MemorySink {
    emissions: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    /// Snapshot of all emissions so far, in write order.
    pub fn emissions(&self) -> Vec<String> {
        lock(&self.emissions).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.emissions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All emissions concatenated.
    pub fn contents(&self) -> String {
        lock(&self.emissions).concat()
    }
}

impl SinkWriter for MemorySink {
    fn write_emission(&self, bytes: &[u8]) -> io::Result<()> {
        lock(&self.emissions).push(String::from_utf8_lossy(bytes).into_owned());
        Ok(())
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
