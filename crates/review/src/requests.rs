//! Single-flight request coordination.
//!
//! Every fetch is keyed (`FetchKey`) and tagged with a request id and the
//! session generation it was issued under. A fetch runs as its own task
//! wrapped in an abort handle; whatever happens, the task reports back
//! exactly once over the completion channel, with `payload: None` if it was
//! aborted. The tracker decides what a completion is still allowed to do.

use std::collections::HashMap;
use std::future::Future;

use futures::future::{AbortHandle, Abortable};
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKey {
    Evaluation(usize),
    Explanation(usize),
    /// Alternate continuation, keyed by anchor ply
    Branch(usize),
    /// Why the original move at the anchor ply was suboptimal
    AlternateNotes(usize),
    Summary,
}

impl FetchKey {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchKey::Evaluation(_) => "evaluation",
            FetchKey::Explanation(_) => "explanation",
            FetchKey::Branch(_) => "alternate_line",
            FetchKey::AlternateNotes(_) => "explain_alternate",
            FetchKey::Summary => "summary",
        }
    }

    pub fn ply(&self) -> Option<usize> {
        match *self {
            FetchKey::Evaluation(p)
            | FetchKey::Explanation(p)
            | FetchKey::Branch(p)
            | FetchKey::AlternateNotes(p) => Some(p),
            FetchKey::Summary => None,
        }
    }
}

pub type RequestId = u64;

#[derive(Debug)]
pub struct Completion<P> {
    pub generation: u64,
    pub id: RequestId,
    pub key: FetchKey,
    /// `None` when the fetch was aborted before it finished
    pub payload: Option<P>,
}

/// What a cancelled fetch may still do if its result arrives anyway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settle {
    /// Write the result into the cache, but nothing else
    Merge,
    /// Drop the result
    Discard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The live request for its key; apply fully
    Current,
    /// Cancelled after the result was already on its way
    Late(Settle),
    /// Aborted, or issued under a previous session
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Issue {
    Started(RequestId),
    /// A fetch for the key was already outstanding
    Joined(RequestId),
}

struct InFlight {
    id: RequestId,
    abort: AbortHandle,
}

pub struct RequestTracker<P> {
    generation: u64,
    next_id: RequestId,
    in_flight: HashMap<FetchKey, InFlight>,
    cancelled: HashMap<RequestId, Settle>,
    /// Spawned tasks whose completion has not been received yet
    unreported: usize,
    tx: mpsc::UnboundedSender<Completion<P>>,
}

impl<P: Send + 'static> RequestTracker<P> {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Completion<P>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let tracker = Self {
            generation: 0,
            next_id: 1,
            in_flight: HashMap::new(),
            cancelled: HashMap::new(),
            unreported: 0,
            tx,
        };
        (tracker, rx)
    }

    /// Start `fetch` for `key` unless one is already outstanding.
    /// Must be called from within a tokio runtime.
    pub fn issue<F>(&mut self, key: FetchKey, fetch: F) -> Issue
    where
        F: Future<Output = P> + Send + 'static,
    {
        if let Some(existing) = self.in_flight.get(&key) {
            debug!(kind = key.kind(), ply = ?key.ply(), request_id = existing.id, "Joined in-flight fetch");
            return Issue::Joined(existing.id);
        }

        let id = self.next_id;
        self.next_id += 1;
        let generation = self.generation;
        let (abort, registration) = AbortHandle::new_pair();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let payload = Abortable::new(fetch, registration).await.ok();
            // Receiver gone means the orchestrator was dropped
            let _ = tx.send(Completion {
                generation,
                id,
                key,
                payload,
            });
        });

        debug!(kind = key.kind(), ply = ?key.ply(), request_id = id, "Issued fetch");
        self.in_flight.insert(key, InFlight { id, abort });
        self.unreported += 1;
        Issue::Started(id)
    }

    pub fn is_in_flight(&self, key: &FetchKey) -> bool {
        self.in_flight.contains_key(key)
    }

    pub fn any_in_flight(&self, pred: impl Fn(&FetchKey) -> bool) -> bool {
        self.in_flight.keys().any(pred)
    }

    /// Abort the outstanding fetch for `key`, if any.
    pub fn cancel(&mut self, key: &FetchKey, settle: Settle) -> bool {
        match self.in_flight.remove(key) {
            Some(entry) => {
                debug!(kind = key.kind(), ply = ?key.ply(), request_id = entry.id, ?settle, "Cancelled fetch");
                entry.abort.abort();
                self.cancelled.insert(entry.id, settle);
                true
            }
            None => false,
        }
    }

    /// Cancel every outstanding fetch whose key matches `pred`.
    pub fn cancel_where(&mut self, pred: impl Fn(&FetchKey) -> bool, settle: Settle) -> usize {
        let keys: Vec<FetchKey> = self.in_flight.keys().filter(|k| pred(k)).copied().collect();
        for key in &keys {
            self.cancel(key, settle);
        }
        keys.len()
    }

    /// Abort everything and start a new generation. Completions from
    /// earlier generations resolve to `Ignored`.
    pub fn reset(&mut self) {
        for (_, entry) in self.in_flight.drain() {
            entry.abort.abort();
        }
        self.cancelled.clear();
        self.generation += 1;
        debug!(generation = self.generation, "Request tracker reset");
    }

    pub fn resolve(&mut self, completion: &Completion<P>) -> Resolution {
        self.unreported = self.unreported.saturating_sub(1);

        if completion.generation != self.generation {
            return Resolution::Ignored;
        }

        let live = self
            .in_flight
            .get(&completion.key)
            .is_some_and(|entry| entry.id == completion.id);
        if live {
            self.in_flight.remove(&completion.key);
            return Resolution::Current;
        }

        match self.cancelled.remove(&completion.id) {
            Some(settle) if completion.payload.is_some() => Resolution::Late(settle),
            _ => Resolution::Ignored,
        }
    }

    pub fn has_unreported(&self) -> bool {
        self.unreported > 0
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
