//! Write Buffer
//!
//! Serializes every call to a backing store through a bounded queue drained
//! by a single consumer task. Writes and deletes are fire-and-forget, reads
//! wait for the consumer to post a reply on a one-shot channel.
//!
//! Commands are applied strictly in enqueue order. Failures of queued writes
//! and deletes are logged; the caller has already been told it succeeded.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::BackingStore;
use crate::cache::Entry;
use crate::error::{PersistenceError, PersistenceResult};

/// Queue capacity used when none is configured.
pub const DEFAULT_BUFFER_SIZE: usize = 64;

enum Command {
    Write {
        key: String,
        entry: Entry,
    },
    Delete {
        key: String,
    },
    Read {
        key: String,
        with_payload: bool,
        reply: oneshot::Sender<PersistenceResult<Entry>>,
    },
}

/// Decorator making a slow or non-thread-safe backend safe to share.
///
/// Must be created inside a tokio runtime.
pub struct WriteBuffer {
    inner: Arc<dyn BackingStore>,
    commands: mpsc::Sender<Command>,
    shutdown: CancellationToken,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl WriteBuffer {
    /// Wraps `inner` behind a queue holding at most `buffer_size` commands.
    pub fn new(inner: Arc<dyn BackingStore>, buffer_size: usize) -> Self {
        let (commands, receiver) = mpsc::channel(buffer_size.max(1));
        let shutdown = CancellationToken::new();
        let worker = tokio::spawn(run_consumer(
            Arc::clone(&inner),
            receiver,
            shutdown.clone(),
        ));

        Self {
            inner,
            commands,
            shutdown,
            worker: Mutex::new(Some(worker)),
        }
    }

    async fn enqueue(&self, command: Command) -> PersistenceResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PersistenceError::Closed)
    }
}

impl Drop for WriteBuffer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[async_trait]
impl BackingStore for WriteBuffer {
    async fn write(&self, key: &str, entry: &Entry) -> PersistenceResult<()> {
        self.enqueue(Command::Write {
            key: key.to_string(),
            entry: entry.clone(),
        })
        .await
    }

    async fn read(&self, key: &str, with_payload: bool) -> PersistenceResult<Entry> {
        let (reply, response) = oneshot::channel();
        self.enqueue(Command::Read {
            key: key.to_string(),
            with_payload,
            reply,
        })
        .await?;

        // The sender is dropped unanswered if the consumer stops first
        response.await.map_err(|_| PersistenceError::Closed)?
    }

    async fn delete(&self, key: &str) -> PersistenceResult<()> {
        self.enqueue(Command::Delete {
            key: key.to_string(),
        })
        .await
    }

    async fn keys(&self) -> PersistenceResult<Vec<String>> {
        self.inner.keys().await
    }

    /// Stops the consumer once its current command finishes, abandons
    /// anything still queued, then closes the wrapped backend.
    async fn close(&self) {
        self.shutdown.cancel();

        let Some(worker) = self.worker.lock().await.take() else {
            return;
        };
        if let Err(err) = worker.await {
            warn!("Write buffer consumer ended abnormally: {}", err);
        }
        self.inner.close().await;
    }
}

async fn run_consumer(
    inner: Arc<dyn BackingStore>,
    mut commands: mpsc::Receiver<Command>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                info!("Write buffer consumer cancelled");
                break;
            }
            command = commands.recv() => match command {
                Some(command) => process(inner.as_ref(), command).await,
                None => break,
            },
        }
    }
}

async fn process(inner: &dyn BackingStore, command: Command) {
    match command {
        Command::Write { key, entry } => {
            if let Err(err) = inner.write(&key, &entry).await {
                error!("Write buffer: write of key {} failed: {}", key, err);
            }
        }
        Command::Delete { key } => {
            if let Err(err) = inner.delete(&key).await {
                error!("Write buffer: delete of key {} failed: {}", key, err);
            }
        }
        Command::Read {
            key,
            with_payload,
            reply,
        } => {
            // The reader may have given up waiting
            let _ = reply.send(inner.read(&key, with_payload).await);
        }
    }
}
