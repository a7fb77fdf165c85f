//! Where location estimates go once a fusion engine produces them.

use crate::location::LocationEstimate;
use log::info;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Something interested in location estimates. Engines call into observers on
/// their own threads, at their own pace.
pub trait LocationObserver {
    /// A new estimate is available.
    fn on_location_update(&mut self, location: &LocationEstimate);

    /// The engine started delivering estimates.
    fn on_started_updating(&mut self) {}

    /// The engine stopped delivering estimates.
    fn on_stopped_updating(&mut self) {}
}

/// Writes every estimate to the log, one line each.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl LocationObserver for LogObserver {
    fn on_location_update(&mut self, location: &LocationEstimate) {
        info!("{}", location);
    }

    fn on_started_updating(&mut self) {
        info!("location updates started");
    }

    fn on_stopped_updating(&mut self) {
        info!("location updates stopped");
    }
}

type ObserverList = Vec<Box<dyn LocationObserver + Send>>;

/// A thread-safe list of observers. Clones share the same list, so an engine
/// and the shim can both hold one.
///
/// The list stays locked while an estimate is delivered, so an observer must
/// not call [`LocationFanout::subscribe`] (or deliver through the same
/// fanout) from inside its own callbacks. That deadlocks.
#[derive(Clone, Default)]
pub struct LocationFanout {
    observers: Arc<Mutex<ObserverList>>,
}

impl LocationFanout {
    /// Instantiates an empty [`LocationFanout`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an observer. It receives every estimate delivered from now on.
    pub fn subscribe(&self, observer: Box<dyn LocationObserver + Send>) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Number of subscribed observers.
    pub fn len(&self) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True when nobody is listening.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Holds the lock for the whole pass; see the note on the type.
    fn for_each(&self, mut f: impl FnMut(&mut (dyn LocationObserver + Send))) {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        for observer in observers.iter_mut() {
            f(observer.as_mut());
        }
    }
}

impl LocationObserver for LocationFanout {
    fn on_location_update(&mut self, location: &LocationEstimate) {
        self.for_each(|o| o.on_location_update(location));
    }

    fn on_started_updating(&mut self) {
        self.for_each(|o| o.on_started_updating());
    }

    fn on_stopped_updating(&mut self) {
        self.for_each(|o| o.on_stopped_updating());
    }
}

impl fmt::Debug for LocationFanout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocationFanout({} observers)", self.len())
    }
}
