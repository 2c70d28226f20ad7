//! Single-flight coordination of cache fills
//!
//! The first caller for a key becomes the leader and performs the fill; later
//! callers wait for the leader's result instead of calling the backend
//! themselves. A leader dropped without completing (cancelled task, panic)
//! unblocks its followers with `None`.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::Shared;
use std::sync::Arc;
use tokio::sync::oneshot;

type Waiter<T> = Shared<oneshot::Receiver<T>>;

/// In-flight fills keyed by cache fingerprint
pub struct SingleFlight<T: Clone> {
    flights: DashMap<String, Waiter<T>>,
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            flights: DashMap::new(),
        }
    }
}

impl<T: Clone> SingleFlight<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fills currently in flight
    pub fn in_flight(&self) -> usize {
        self.flights.len()
    }

    /// Join the flight for `key`, leading it if none is running
    pub fn join(self: &Arc<Self>, key: &str) -> Flight<T> {
        match self.flights.entry(key.to_string()) {
            Entry::Occupied(entry) => Flight::Follower(FlightFollower {
                waiter: entry.get().clone(),
            }),
            Entry::Vacant(entry) => {
                let (sender, receiver) = oneshot::channel();
                entry.insert(receiver.shared());
                Flight::Leader(FlightLeader {
                    group: Arc::clone(self),
                    key: key.to_string(),
                    sender: Some(sender),
                })
            }
        }
    }
}

/// Role assigned by [`SingleFlight::join`]
pub enum Flight<T: Clone> {
    Leader(FlightLeader<T>),
    Follower(FlightFollower<T>),
}

/// Handle of the caller that performs the fill
pub struct FlightLeader<T: Clone> {
    group: Arc<SingleFlight<T>>,
    key: String,
    sender: Option<oneshot::Sender<T>>,
}

impl<T: Clone> FlightLeader<T> {
    /// Publish the result to every follower
    pub fn complete(mut self, value: T) {
        // remove first so callers arriving after this point start a new flight
        self.group.flights.remove(&self.key);
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(value);
        }
    }
}

impl<T: Clone> Drop for FlightLeader<T> {
    fn drop(&mut self) {
        if self.sender.is_some() {
            self.group.flights.remove(&self.key);
        }
    }
}

/// Handle of a caller waiting on someone else's fill
pub struct FlightFollower<T: Clone> {
    waiter: Waiter<T>,
}

impl<T: Clone> FlightFollower<T> {
    /// Wait for the leader; `None` if it went away without a result
    pub async fn wait(self) -> Option<T> {
        self.waiter.await.ok()
    }
}
