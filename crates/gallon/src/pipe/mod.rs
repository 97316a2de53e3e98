//! Single-slot record channel between one producer and one consumer.
//!
//! A [`Pipe`] is split into a [`PipeWriter`] held by the input plugin and a
//! [`PipeReader`] held by the output plugin. The channel holds at most one
//! record, so a writer can never get more than one record ahead of its
//! reader.
//!
//! # Close protocol
//!
//! Both handles share one closed flag and one done signal. Every blocking
//! call waits on the data channel and the done signal together, so closing
//! from either side wakes the other:
//!
//! - a blocked or later [`PipeWriter::write`] fails with [`PipeError::Closed`]
//! - a blocked or later [`PipeReader::read`] returns [`PipeError::EndOfStream`]
//!   once the record already accepted by a successful write has been read
//!
//! Closing cannot fail: `close` only reports whether this call was the one
//! that closed the pipe. Closing is idempotent and dropping a handle closes
//! the pipe, so a task that exits early on any path still releases its peer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::core::Record;
use crate::error::PipeError;

/// Number of records the pipe holds between a write and its matching read.
const SLOT_CAPACITY: usize = 1;

#[derive(Debug)]
struct Shared {
    closed: AtomicBool,
    done: CancellationToken,
}

impl Shared {
    fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.done.cancel();
        true
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// A freshly created pipe, ready to be split between its two sides.
#[derive(Debug)]
pub struct Pipe {
    pub writer: PipeWriter,
    pub reader: PipeReader,
}

impl Pipe {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(SLOT_CAPACITY);
        let shared = Arc::new(Shared {
            closed: AtomicBool::new(false),
            done: CancellationToken::new(),
        });

        Self {
            writer: PipeWriter {
                tx,
                shared: shared.clone(),
            },
            reader: PipeReader { rx, shared },
        }
    }

    pub fn split(self) -> (PipeWriter, PipeReader) {
        (self.writer, self.reader)
    }
}

impl Default for Pipe {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer side of a [`Pipe`].
#[derive(Debug)]
pub struct PipeWriter {
    tx: mpsc::Sender<Record>,
    shared: Arc<Shared>,
}

impl PipeWriter {
    /// Hand a record to the reader.
    ///
    /// Waits while the slot is occupied. Fails with [`PipeError::Closed`]
    /// immediately if the pipe is already closed, or as soon as it gets
    /// closed while waiting; the record is dropped in that case.
    ///
    /// `Ok` means the record is in the slot, not that it has been read. It
    /// reaches the reader only if the reader does not close first; see
    /// [`PipeReader::close`].
    pub async fn write(&self, record: Record) -> Result<(), PipeError> {
        if self.shared.is_closed() {
            return Err(PipeError::Closed);
        }

        tokio::select! {
            biased;
            _ = self.shared.done.cancelled() => Err(PipeError::Closed),
            sent = self.tx.send(record) => sent.map_err(|_| PipeError::Closed),
        }
    }

    /// Mark the pipe closed. Returns true only for the call that closed it.
    ///
    /// A record accepted by an earlier successful write stays readable.
    pub fn close(&self) -> bool {
        let closed = self.shared.close();
        if closed {
            trace!("pipe closed by writer");
        }
        closed
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        self.shared.close();
    }
}

/// Consumer side of a [`Pipe`].
#[derive(Debug)]
pub struct PipeReader {
    rx: mpsc::Receiver<Record>,
    shared: Arc<Shared>,
}

impl PipeReader {
    /// Take the next record.
    ///
    /// Waits for a write or a close. After the pipe is closed and drained,
    /// every call returns [`PipeError::EndOfStream`] without waiting.
    pub async fn read(&mut self) -> Result<Record, PipeError> {
        tokio::select! {
            biased;
            received = self.rx.recv() => received.ok_or(PipeError::EndOfStream),
            // A write may have landed between the two polls.
            _ = self.shared.done.cancelled() => {
                self.rx.try_recv().map_err(|_| PipeError::EndOfStream)
            }
        }
    }

    /// Mark the pipe closed from the consumer side.
    ///
    /// The consumer is giving up, so a record still sitting in the slot is
    /// discarded and every later read returns [`PipeError::EndOfStream`].
    /// Returns true only for the call that closed the pipe.
    pub fn close(&mut self) -> bool {
        let closed = self.shared.close();
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
        if closed {
            trace!("pipe closed by reader");
        }
        closed
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

impl Drop for PipeReader {
    fn drop(&mut self) {
        self.shared.close();
    }
}
