#![allow(dead_code)]

//! Shared test doubles: a scripted backend and an event-recording observer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{Notify, Semaphore};

use clipvault_core::StorageBackend;
use clipvault_storage::{
    CompletedPartRef, ListPage, ObjectStore, StorageError, StorageResult, TransferId,
    TransferObserver, TransferState,
};

/// Scripted in-memory backend. Pages are served in call order; failures and
/// a part gate can be injected to drive exact scenarios.
pub struct ScriptedStore {
    pages: Vec<ListPage>,
    fail_page: Option<usize>,
    fail_part: Option<i32>,
    fail_put: bool,
    gate: Option<Gate>,
    list_calls: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

struct Gate {
    entered: Notify,
    release: Semaphore,
}

impl ScriptedStore {
    pub fn new() -> Self {
        ScriptedStore {
            pages: Vec::new(),
            fail_page: None,
            fail_part: None,
            fail_put: false,
            gate: None,
            list_calls: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_pages(mut self, pages: Vec<ListPage>) -> Self {
        self.pages = pages;
        self
    }

    /// Fail the `index`-th page request (0-based).
    pub fn fail_page_at(mut self, index: usize) -> Self {
        self.fail_page = Some(index);
        self
    }

    /// Fail the upload of the given part number.
    pub fn fail_part(mut self, part_number: i32) -> Self {
        self.fail_part = Some(part_number);
        self
    }

    pub fn fail_put(mut self) -> Self {
        self.fail_put = true;
        self
    }

    /// Block the first part upload until `release_gate` is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Gate {
            entered: Notify::new(),
            release: Semaphore::new(0),
        });
        self
    }

    /// Wait until the gated part upload is in flight.
    pub async fn gate_entered(&self) {
        if let Some(gate) = &self.gate {
            gate.entered.notified().await;
        }
    }

    pub fn release_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.release.add_permits(1);
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

#[async_trait]
impl ObjectStore for ScriptedStore {
    async fn list_page(&self, _bucket: &str, _marker: Option<&str>) -> StorageResult<ListPage> {
        let index = self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.record(format!("list-{}", index));

        if self.fail_page == Some(index) {
            return Err(StorageError::StoreUnavailable(
                "injected page failure".to_string(),
            ));
        }

        self.pages.get(index).cloned().ok_or_else(|| {
            StorageError::StoreUnavailable(format!("unexpected page request {}", index))
        })
    }

    async fn put_object(
        &self,
        _bucket: &str,
        _key: &str,
        _content_type: &str,
        _data: Bytes,
    ) -> StorageResult<()> {
        self.record("put");
        if self.fail_put {
            return Err(StorageError::TransferFailed(
                "injected put failure".to_string(),
            ));
        }
        Ok(())
    }

    async fn create_multipart(
        &self,
        _bucket: &str,
        _key: &str,
        _content_type: &str,
    ) -> StorageResult<String> {
        self.record("create");
        Ok("upload-1".to_string())
    }

    async fn upload_part(
        &self,
        _bucket: &str,
        _key: &str,
        _upload_id: &str,
        part_number: i32,
        _data: Bytes,
    ) -> StorageResult<CompletedPartRef> {
        self.record(format!("part-{}", part_number));

        if part_number == 1 {
            if let Some(gate) = &self.gate {
                gate.entered.notify_one();
                let permit = gate.release.acquire().await.map_err(|_| {
                    StorageError::TransferFailed("gate closed".to_string())
                })?;
                permit.forget();
            }
        }

        if self.fail_part == Some(part_number) {
            return Err(StorageError::TransferFailed(
                "injected part failure".to_string(),
            ));
        }

        Ok(CompletedPartRef {
            part_number,
            etag: format!("test-{}", part_number),
        })
    }

    async fn complete_multipart(
        &self,
        _bucket: &str,
        _key: &str,
        _upload_id: &str,
        _parts: Vec<CompletedPartRef>,
    ) -> StorageResult<()> {
        self.record("complete");
        Ok(())
    }

    async fn abort_multipart(
        &self,
        _bucket: &str,
        _key: &str,
        _upload_id: &str,
    ) -> StorageResult<()> {
        self.record("abort");
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

/// Everything an observer can see, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    State(TransferState),
    Progress(u64, u64),
    Error(String),
}

pub struct Recorder {
    events: Arc<Mutex<Vec<Recorded>>>,
}

impl Recorder {
    pub fn new() -> (Box<Recorder>, Arc<Mutex<Vec<Recorded>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        (
            Box::new(Recorder {
                events: Arc::clone(&events),
            }),
            events,
        )
    }
}

impl TransferObserver for Recorder {
    fn on_state_changed(&mut self, _id: TransferId, state: TransferState) {
        self.events.lock().unwrap().push(Recorded::State(state));
    }

    fn on_progress(&mut self, _id: TransferId, bytes_transferred: u64, bytes_total: u64) {
        self.events
            .lock()
            .unwrap()
            .push(Recorded::Progress(bytes_transferred, bytes_total));
    }

    fn on_error(&mut self, _id: TransferId, error: &StorageError) {
        self.events
            .lock()
            .unwrap()
            .push(Recorded::Error(error.to_string()));
    }
}
