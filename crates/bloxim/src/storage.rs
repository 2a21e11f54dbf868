//! # Key-Value Storage
//!
//! Scripts persist JSON blobs through a [`StorageClient`] owned by the world.
//! Requests go out over a bounded channel to a [`StorageEndpoint`], which
//! serves them against any [`KeyValueStore`], on demand or on its own
//! thread. Responses come back over a second channel that the world drains
//! at the start of each tick, so a request issued in tick N resolves no
//! earlier than tick N+1 and the tick thread never waits on storage.

use std::collections::{BTreeMap, HashMap};
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TryRecvError, TrySendError};
use serde::Serialize;
use serde_json::Value;

use crate::error::StorageError;
use crate::events::{pending_channel, Completer, Pending};

/// Outcome of a storage request: the stored value for `get`, the previous
/// value for `set` and `remove`.
pub type StorageResult = Result<Option<Value>, StorageError>;

/// A synchronous key-value backend.
pub trait KeyValueStore: Send {
    /// Reads a value.
    ///
    /// # Errors
    ///
    /// Backend-specific failure.
    fn get(&mut self, key: &str) -> StorageResult;

    /// Writes a value and returns the previous one.
    ///
    /// # Errors
    ///
    /// Backend-specific failure.
    fn set(&mut self, key: &str, value: Value) -> StorageResult;

    /// Deletes a value and returns it.
    ///
    /// # Errors
    ///
    /// Backend-specific failure.
    fn remove(&mut self, key: &str) -> StorageResult;
}

/// In-process store backed by an ordered map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, Value>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&mut self, key: &str) -> StorageResult {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> StorageResult {
        Ok(self.entries.insert(key.to_owned(), value))
    }

    fn remove(&mut self, key: &str) -> StorageResult {
        Ok(self.entries.remove(key))
    }
}

/// Operation carried by a request.
#[derive(Clone, Debug, PartialEq)]
pub enum StorageOp {
    /// Read.
    Get,
    /// Write.
    Set(Value),
    /// Delete.
    Remove,
}

/// A request travelling to the endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct StorageRequest {
    /// Correlates the response.
    pub ticket: u64,
    /// Key addressed.
    pub key: String,
    /// What to do.
    pub op: StorageOp,
}

/// A response travelling back to the client.
#[derive(Clone, Debug, PartialEq)]
pub struct StorageResponse {
    /// Ticket of the request.
    pub ticket: u64,
    /// Outcome.
    pub result: StorageResult,
}

/// Tick-thread side of the storage channel.
#[derive(Debug)]
pub struct StorageClient {
    requests: Sender<StorageRequest>,
    responses: Receiver<StorageResponse>,
    waiting: HashMap<u64, Completer<StorageResult>>,
    next_ticket: u64,
}

/// Backend side of the storage channel.
#[derive(Debug)]
pub struct StorageEndpoint {
    requests: Receiver<StorageRequest>,
    responses: Sender<StorageResponse>,
}

impl StorageClient {
    /// Creates a connected client/endpoint pair. At most `capacity` requests
    /// may be in flight.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, StorageEndpoint) {
        let (request_tx, request_rx) = bounded(capacity.max(1));
        let (response_tx, response_rx) = unbounded();
        (
            Self {
                requests: request_tx,
                responses: response_rx,
                waiting: HashMap::new(),
                next_ticket: 0,
            },
            StorageEndpoint {
                requests: request_rx,
                responses: response_tx,
            },
        )
    }

    fn send(&mut self, key: &str, op: StorageOp) -> Pending<StorageResult> {
        self.next_ticket += 1;
        let request = StorageRequest {
            ticket: self.next_ticket,
            key: key.to_owned(),
            op,
        };
        match self.requests.try_send(request) {
            Ok(()) => {
                let (completer, pending) = pending_channel();
                self.waiting.insert(self.next_ticket, completer);
                pending
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(key, "storage queue full, request rejected");
                Pending::ready(Err(StorageError::Busy))
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::warn!(key, "storage backend disconnected");
                Pending::ready(Err(StorageError::Disconnected))
            }
        }
    }

    /// Reads `key`.
    pub fn get(&mut self, key: &str) -> Pending<StorageResult> {
        self.send(key, StorageOp::Get)
    }

    /// Writes `value` under `key`.
    ///
    /// A value that does not serialize resolves immediately with
    /// [`StorageError::Serialize`].
    pub fn set<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Pending<StorageResult> {
        match serde_json::to_value(value) {
            Ok(value) => self.send(key, StorageOp::Set(value)),
            Err(err) => Pending::ready(Err(StorageError::Serialize(err.to_string()))),
        }
    }

    /// Deletes `key`.
    pub fn remove(&mut self, key: &str) -> Pending<StorageResult> {
        self.send(key, StorageOp::Remove)
    }

    /// Number of requests awaiting a response.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.waiting.len()
    }

    /// Resolves every response that has arrived. Returns how many resolved.
    ///
    /// If the endpoint is gone, everything still waiting resolves with
    /// [`StorageError::Disconnected`].
    pub fn drain_responses(&mut self) -> usize {
        let mut resolved = 0;
        loop {
            match self.responses.try_recv() {
                Ok(response) => {
                    if let Some(completer) = self.waiting.remove(&response.ticket) {
                        if let Err(err) = &response.result {
                            tracing::warn!(ticket = response.ticket, error = %err, "storage request failed");
                        }
                        completer.complete(response.result);
                        resolved += 1;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    for (_, completer) in self.waiting.drain() {
                        completer.complete(Err(StorageError::Disconnected));
                        resolved += 1;
                    }
                    break;
                }
            }
        }
        resolved
    }
}

impl StorageEndpoint {
    fn serve_one(&self, store: &mut dyn KeyValueStore, request: StorageRequest) -> bool {
        let result = match request.op {
            StorageOp::Get => store.get(&request.key),
            StorageOp::Set(value) => store.set(&request.key, value),
            StorageOp::Remove => store.remove(&request.key),
        };
        self.responses
            .send(StorageResponse {
                ticket: request.ticket,
                result,
            })
            .is_ok()
    }

    /// Serves every request queued so far. Returns how many were served.
    pub fn serve_pending(&self, store: &mut dyn KeyValueStore) -> usize {
        let mut served = 0;
        while let Ok(request) = self.requests.try_recv() {
            if !self.serve_one(store, request) {
                break;
            }
            served += 1;
        }
        served
    }

    /// Serves requests on a worker thread until the client is dropped.
    /// The thread returns the store when it exits.
    pub fn spawn<S>(self, mut store: S) -> std::io::Result<JoinHandle<S>>
    where
        S: KeyValueStore + 'static,
    {
        std::thread::Builder::new()
            .name("bloxim-storage".into())
            .spawn(move || {
                while let Ok(request) = self.requests.recv() {
                    if !self.serve_one(&mut store, request) {
                        break;
                    }
                }
                tracing::debug!("storage worker stopped");
                store
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip_on_demand() {
        let (mut client, endpoint) = StorageClient::new(8);
        let mut store = MemoryStore::new();

        let mut written = client.set("score", &json!({ "points": 7 }));
        let mut read = client.get("score");
        assert!(written.try_take().is_none());
        assert_eq!(client.in_flight(), 2);

        assert_eq!(endpoint.serve_pending(&mut store), 2);
        assert_eq!(client.drain_responses(), 2);
        assert_eq!(written.try_take(), Some(Ok(None)));
        assert_eq!(read.try_take(), Some(Ok(Some(json!({ "points": 7 })))));

        let mut removed = client.remove("score");
        endpoint.serve_pending(&mut store);
        client.drain_responses();
        assert_eq!(removed.try_take(), Some(Ok(Some(json!({ "points": 7 })))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_full_queue_is_busy() {
        let (mut client, _endpoint) = StorageClient::new(1);
        let _first = client.get("a");
        let mut second = client.get("b");
        assert_eq!(second.try_take(), Some(Err(StorageError::Busy)));
    }

    #[test]
    fn test_disconnected_endpoint() {
        let (mut client, endpoint) = StorageClient::new(4);
        let mut waiting = client.get("a");
        drop(endpoint);
        assert_eq!(client.drain_responses(), 1);
        assert_eq!(waiting.try_take(), Some(Err(StorageError::Disconnected)));

        let mut late = client.get("b");
        assert_eq!(late.try_take(), Some(Err(StorageError::Disconnected)));
    }

    #[test]
    fn test_worker_thread() {
        let (mut client, endpoint) = StorageClient::new(4);
        let worker = endpoint.spawn(MemoryStore::new()).unwrap();

        let mut written = client.set("k", "v");
        let mut outcome = None;
        for _ in 0..1000 {
            client.drain_responses();
            if let Some(result) = written.try_take() {
                outcome = Some(result);
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        assert_eq!(outcome, Some(Ok(None)));

        drop(client);
        let store = worker.join().unwrap();
        assert_eq!(store.len(), 1);
    }
}
