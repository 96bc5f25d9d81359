//! Upload session tracking.
//!
//! Each upload runs on one spawned task that owns all mutation of the
//! session's state and progress. Observer callbacks are invoked in emission
//! order; events emitted before an observer registers are buffered and
//! replayed so the registration race loses nothing.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::traits::{ObjectStore, StorageError, StorageResult};

/// Identifier of one upload session, unique per `StorageClient`.
pub type TransferId = u64;

/// Lifecycle of one upload session.
///
/// `Completed`, `Failed`, and `Canceled` are terminal: once reached, the
/// session emits no further events and its state never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Pending,
    InProgress,
    Completed,
    Failed,
    Canceled,
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Completed | TransferState::Failed | TransferState::Canceled
        )
    }
}

impl Display for TransferState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TransferState::Pending => write!(f, "pending"),
            TransferState::InProgress => write!(f, "in_progress"),
            TransferState::Completed => write!(f, "completed"),
            TransferState::Failed => write!(f, "failed"),
            TransferState::Canceled => write!(f, "canceled"),
        }
    }
}

/// Observer for one upload session.
///
/// Exactly one observer is registered per session; re-registering replaces
/// the previous one. Callbacks run on the session's transfer task, in
/// emission order, and must not block.
pub trait TransferObserver: Send {
    /// Invoked on every state change except the failure transition, which
    /// is reported through `on_error` instead.
    fn on_state_changed(&mut self, id: TransferId, state: TransferState);

    /// Invoked after each chunk is accepted by the store, with
    /// `0 <= bytes_transferred <= bytes_total`. A final
    /// `(bytes_total, bytes_total)` call precedes the `Completed` state
    /// notification; it does not replace it.
    fn on_progress(&mut self, id: TransferId, bytes_transferred: u64, bytes_total: u64);

    /// Invoked exactly once if the transfer fails. The session state is
    /// `Failed` afterwards and nothing further is emitted.
    fn on_error(&mut self, id: TransferId, error: &StorageError);
}

enum TransferEvent {
    State(TransferState),
    Progress(u64, u64),
    Error(StorageError),
}

struct ObserverSlot {
    observer: Option<Box<dyn TransferObserver>>,
    /// Events emitted before the first observer registered.
    backlog: Vec<TransferEvent>,
}

pub(crate) struct Shared {
    id: TransferId,
    key: String,
    local_file: PathBuf,
    bytes_total: u64,
    bytes_transferred: AtomicU64,
    state_tx: watch::Sender<TransferState>,
    slot: Mutex<ObserverSlot>,
    cancel: CancellationToken,
}

impl Shared {
    /// Run `f` with the observer slot locked, recovering from a poisoned
    /// lock so a panicking observer can't wedge the session.
    fn with_slot<R>(&self, f: impl FnOnce(&mut ObserverSlot) -> R) -> R {
        let mut guard = match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    fn emit(&self, event: TransferEvent) {
        let id = self.id;
        self.with_slot(|slot| match slot.observer.as_mut() {
            Some(observer) => dispatch(observer.as_mut(), id, &event),
            None => slot.backlog.push(event),
        });
    }

    fn set_state(&self, state: TransferState) {
        if self.state_tx.borrow().is_terminal() {
            return;
        }
        self.state_tx.send_replace(state);
        self.emit(TransferEvent::State(state));
    }

    fn record_progress(&self, bytes_transferred: u64) {
        self.bytes_transferred
            .store(bytes_transferred, Ordering::Relaxed);
        self.emit(TransferEvent::Progress(bytes_transferred, self.bytes_total));
    }

    fn fail(&self, error: StorageError) {
        if self.state_tx.borrow().is_terminal() {
            return;
        }
        self.state_tx.send_replace(TransferState::Failed);
        self.emit(TransferEvent::Error(error));
    }
}

fn dispatch(observer: &mut dyn TransferObserver, id: TransferId, event: &TransferEvent) {
    match event {
        TransferEvent::State(state) => observer.on_state_changed(id, *state),
        TransferEvent::Progress(transferred, total) => {
            observer.on_progress(id, *transferred, *total)
        }
        TransferEvent::Error(error) => observer.on_error(id, error),
    }
}

/// Handle to one in-flight upload session.
///
/// The handle only observes: all mutation happens on the session's transfer
/// task. Dropping the handle does not cancel the upload.
#[derive(Clone)]
pub struct TransferHandle {
    shared: Arc<Shared>,
}

impl TransferHandle {
    pub(crate) fn new(
        id: TransferId,
        key: String,
        local_file: PathBuf,
        bytes_total: u64,
    ) -> (TransferHandle, Arc<Shared>) {
        let (state_tx, _state_rx) = watch::channel(TransferState::Pending);
        let shared = Arc::new(Shared {
            id,
            key,
            local_file,
            bytes_total,
            bytes_transferred: AtomicU64::new(0),
            state_tx,
            slot: Mutex::new(ObserverSlot {
                observer: None,
                backlog: Vec::new(),
            }),
            cancel: CancellationToken::new(),
        });
        (
            TransferHandle {
                shared: Arc::clone(&shared),
            },
            shared,
        )
    }

    pub fn id(&self) -> TransferId {
        self.shared.id
    }

    pub fn key(&self) -> &str {
        &self.shared.key
    }

    pub fn local_file(&self) -> &Path {
        &self.shared.local_file
    }

    pub fn bytes_total(&self) -> u64 {
        self.shared.bytes_total
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.shared.bytes_transferred.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> TransferState {
        *self.shared.state_tx.borrow()
    }

    /// Register the session's observer, replacing any previous one.
    ///
    /// Events emitted before the first registration are replayed, in order,
    /// before the observer starts receiving live events.
    pub fn observe(&self, observer: Box<dyn TransferObserver>) {
        let id = self.shared.id;
        self.shared.with_slot(|slot| {
            let mut observer = observer;
            for event in slot.backlog.drain(..) {
                dispatch(observer.as_mut(), id, &event);
            }
            slot.observer = Some(observer);
        });
    }

    /// Request cancellation. A `Pending` or `InProgress` session transitions
    /// to `Canceled` with one final state notification; a session that is
    /// already terminal is unaffected.
    pub fn cancel(&self) {
        self.shared.cancel.cancel();
    }

    /// Wait until the session reaches a terminal state and return it.
    pub async fn wait(&self) -> TransferState {
        let mut rx = self.shared.state_tx.subscribe();
        loop {
            let state = *rx.borrow_and_update();
            if state.is_terminal() {
                return state;
            }
            if rx.changed().await.is_err() {
                return *rx.borrow();
            }
        }
    }
}

pub(crate) struct TransferParams {
    pub bucket: String,
    pub content_type: String,
    pub part_size: usize,
    pub multipart_threshold: u64,
}

enum Driven {
    Completed,
    Canceled,
}

/// Transfer task body: drives the backend and resolves the session to
/// exactly one terminal state.
pub(crate) async fn run(shared: Arc<Shared>, store: Arc<dyn ObjectStore>, params: TransferParams) {
    let start = Instant::now();
    match drive(&shared, store.as_ref(), &params).await {
        Ok(Driven::Completed) => {
            shared.set_state(TransferState::Completed);
            tracing::info!(
                bucket = %params.bucket,
                key = %shared.key,
                size_bytes = shared.bytes_total,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                transfer_id = shared.id,
                "Upload completed"
            );
        }
        Ok(Driven::Canceled) => {
            shared.set_state(TransferState::Canceled);
            tracing::info!(
                bucket = %params.bucket,
                key = %shared.key,
                transfer_id = shared.id,
                "Upload canceled"
            );
        }
        Err(error) => {
            tracing::error!(
                error = %error,
                bucket = %params.bucket,
                key = %shared.key,
                size_bytes = shared.bytes_total,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                transfer_id = shared.id,
                "Upload failed"
            );
            shared.fail(error);
        }
    }
}

async fn drive(
    shared: &Shared,
    store: &dyn ObjectStore,
    params: &TransferParams,
) -> StorageResult<Driven> {
    if shared.cancel.is_cancelled() {
        return Ok(Driven::Canceled);
    }

    let total = shared.bytes_total;

    if total <= params.multipart_threshold {
        let data = tokio::fs::read(&shared.local_file).await.map_err(|e| {
            StorageError::TransferFailed(format!(
                "Failed to read {}: {}",
                shared.local_file.display(),
                e
            ))
        })?;

        if shared.cancel.is_cancelled() {
            return Ok(Driven::Canceled);
        }

        shared.set_state(TransferState::InProgress);
        store
            .put_object(
                &params.bucket,
                &shared.key,
                &params.content_type,
                Bytes::from(data),
            )
            .await?;
        shared.record_progress(total);
        return Ok(Driven::Completed);
    }

    let mut file = tokio::fs::File::open(&shared.local_file).await.map_err(|e| {
        StorageError::TransferFailed(format!(
            "Failed to open {}: {}",
            shared.local_file.display(),
            e
        ))
    })?;

    let upload_id = store
        .create_multipart(&params.bucket, &shared.key, &params.content_type)
        .await?;

    let mut parts = Vec::new();
    let mut part_number = 1i32;
    let mut transferred = 0u64;

    loop {
        if shared.cancel.is_cancelled() {
            abort_quietly(store, params, shared, &upload_id).await;
            return Ok(Driven::Canceled);
        }

        let chunk = match read_chunk(&mut file, params.part_size).await {
            Ok(chunk) => chunk,
            Err(error) => {
                abort_quietly(store, params, shared, &upload_id).await;
                return Err(error);
            }
        };

        if chunk.is_empty() {
            break;
        }

        if transferred == 0 {
            // First bytes handed to the store.
            shared.set_state(TransferState::InProgress);
        }

        let chunk_len = chunk.len() as u64;
        match store
            .upload_part(&params.bucket, &shared.key, &upload_id, part_number, chunk)
            .await
        {
            Ok(part) => parts.push(part),
            Err(error) => {
                abort_quietly(store, params, shared, &upload_id).await;
                return Err(error);
            }
        }

        if shared.cancel.is_cancelled() {
            abort_quietly(store, params, shared, &upload_id).await;
            return Ok(Driven::Canceled);
        }

        transferred += chunk_len;
        shared.record_progress(transferred);
        part_number += 1;

        // A short read means EOF.
        if chunk_len < params.part_size as u64 {
            break;
        }
    }

    if let Err(error) = store
        .complete_multipart(&params.bucket, &shared.key, &upload_id, parts)
        .await
    {
        abort_quietly(store, params, shared, &upload_id).await;
        return Err(error);
    }

    Ok(Driven::Completed)
}

/// Read up to `part_size` bytes, filling the buffer across short reads.
async fn read_chunk(file: &mut tokio::fs::File, part_size: usize) -> StorageResult<Bytes> {
    let mut buf = vec![0u8; part_size];
    let mut filled = 0usize;

    while filled < part_size {
        let bytes_read = file.read(&mut buf[filled..]).await.map_err(|e| {
            StorageError::TransferFailed(format!("Failed to read local file: {}", e))
        })?;
        if bytes_read == 0 {
            break;
        }
        filled += bytes_read;
    }

    buf.truncate(filled);
    Ok(Bytes::from(buf))
}

async fn abort_quietly(
    store: &dyn ObjectStore,
    params: &TransferParams,
    shared: &Shared,
    upload_id: &str,
) {
    if let Err(error) = store
        .abort_multipart(&params.bucket, &shared.key, upload_id)
        .await
    {
        tracing::warn!(
            error = %error,
            bucket = %params.bucket,
            key = %shared.key,
            transfer_id = shared.id,
            "Failed to abort multipart upload"
        );
    }
}
