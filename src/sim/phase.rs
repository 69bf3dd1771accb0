//! Run phase state machine
//!
//! `Idle -> Running -> Ended`, with `restart` returning to `Idle` from any
//! phase. The store is a cheap-to-clone handle shared by everything that
//! reacts to phase changes. Listeners run synchronously, in registration
//! order, on the thread that made the transition. A transition triggered
//! from inside a listener is queued and dispatched after the current one,
//! so every listener sees events in the order they happened.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Lifecycle stage of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for the first key press
    #[default]
    Idle,
    /// Clock is running
    Running,
    /// Player crossed the finish line
    Ended,
}

/// A completed transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseEvent {
    pub from: GamePhase,
    pub to: GamePhase,
    /// Restart counter after the transition
    pub restarts: u64,
}

/// Snapshot of the store's state
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PhaseState {
    pub phase: GamePhase,
    pub restarts: u64,
    /// Clock reading at `start()`
    pub start_time: Option<f64>,
    /// Clock reading at `end()`
    pub end_time: Option<f64>,
    /// Latest clock reading supplied by the game loop
    pub clock: f64,
}

type Listener = Box<dyn FnMut(&PhaseEvent) -> Result<()>>;

struct Entry {
    id: u64,
    listener: Listener,
}

#[derive(Default)]
struct Inner {
    state: RefCell<PhaseState>,
    listeners: RefCell<Vec<Entry>>,
    queue: RefCell<VecDeque<PhaseEvent>>,
    removed: RefCell<Vec<u64>>,
    dispatching: Cell<bool>,
    next_id: Cell<u64>,
}

/// Shared phase store handle
#[derive(Clone, Default)]
pub struct PhaseStore {
    inner: Rc<Inner>,
}

impl std::fmt::Debug for PhaseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseStore")
            .field("state", &*self.inner.state.borrow())
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish()
    }
}

/// Keeps a listener registered; unsubscribes when dropped
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    inner: Weak<Inner>,
    id: u64,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            PhaseStore { inner }.unsubscribe(self.id);
        }
    }
}

impl PhaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> GamePhase {
        self.inner.state.borrow().phase
    }

    pub fn restarts(&self) -> u64 {
        self.inner.state.borrow().restarts
    }

    pub fn snapshot(&self) -> PhaseState {
        *self.inner.state.borrow()
    }

    /// Feed the game loop's elapsed time; timestamps read it
    pub fn set_clock(&self, now: f64) {
        self.inner.state.borrow_mut().clock = now;
    }

    /// Run time: finished duration when ended, time so far while running
    pub fn elapsed(&self) -> Option<f64> {
        let state = self.inner.state.borrow();
        match (state.phase, state.start_time, state.end_time) {
            (GamePhase::Ended, Some(start), Some(end)) => Some(end - start),
            (GamePhase::Running, Some(start), _) => Some(state.clock - start),
            _ => None,
        }
    }

    /// Duration of a finished run
    pub fn duration(&self) -> Option<f64> {
        match self.phase() {
            GamePhase::Ended => self.elapsed(),
            _ => None,
        }
    }

    /// `Idle -> Running`. Returns whether the phase changed.
    pub fn start(&self) -> Result<bool> {
        let event = {
            let mut state = self.inner.state.borrow_mut();
            if state.phase != GamePhase::Idle {
                return Ok(false);
            }
            state.phase = GamePhase::Running;
            state.start_time = Some(state.clock);
            PhaseEvent {
                from: GamePhase::Idle,
                to: GamePhase::Running,
                restarts: state.restarts,
            }
        };
        log::info!("Run started");
        self.publish(event)?;
        Ok(true)
    }

    /// `Running -> Ended`. Returns whether the phase changed.
    pub fn end(&self) -> Result<bool> {
        let event = {
            let mut state = self.inner.state.borrow_mut();
            if state.phase != GamePhase::Running {
                return Ok(false);
            }
            state.phase = GamePhase::Ended;
            state.end_time = Some(state.clock);
            PhaseEvent {
                from: GamePhase::Running,
                to: GamePhase::Ended,
                restarts: state.restarts,
            }
        };
        if let Some(duration) = self.duration() {
            log::info!("Run finished in {:.2}s", duration);
        }
        self.publish(event)?;
        Ok(true)
    }

    /// Any phase `-> Idle`, bumping the restart counter
    pub fn restart(&self) -> Result<()> {
        let event = {
            let mut state = self.inner.state.borrow_mut();
            let from = state.phase;
            state.phase = GamePhase::Idle;
            state.restarts += 1;
            state.start_time = None;
            state.end_time = None;
            PhaseEvent {
                from,
                to: GamePhase::Idle,
                restarts: state.restarts,
            }
        };
        log::info!("Restart #{} (from {:?})", event.restarts, event.from);
        self.publish(event)
    }

    /// Register a listener for every transition
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: FnMut(&PhaseEvent) -> Result<()> + 'static,
    {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.listeners.borrow_mut().push(Entry {
            id,
            listener: Box::new(listener),
        });
        Subscription {
            inner: Rc::downgrade(&self.inner),
            id,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    fn unsubscribe(&self, id: u64) {
        self.inner.listeners.borrow_mut().retain(|e| e.id != id);
        if self.inner.dispatching.get() {
            self.inner.removed.borrow_mut().push(id);
        }
    }

    fn publish(&self, event: PhaseEvent) -> Result<()> {
        self.inner.queue.borrow_mut().push_back(event);
        if self.inner.dispatching.get() {
            return Ok(());
        }

        self.inner.dispatching.set(true);
        let result = self.drain();
        self.inner.dispatching.set(false);
        self.inner.removed.borrow_mut().clear();
        if result.is_err() {
            self.inner.queue.borrow_mut().clear();
        }
        result
    }

    fn drain(&self) -> Result<()> {
        loop {
            let Some(event) = self.inner.queue.borrow_mut().pop_front() else {
                return Ok(());
            };

            // Listeners are moved out while running so they may subscribe,
            // unsubscribe or transition without a double borrow
            let mut running = std::mem::take(&mut *self.inner.listeners.borrow_mut());
            let mut outcome = Ok(());
            for entry in running.iter_mut() {
                if self.inner.removed.borrow().contains(&entry.id) {
                    continue;
                }
                if let Err(e) = (entry.listener)(&event) {
                    outcome = Err(e);
                    break;
                }
            }

            let added = std::mem::take(&mut *self.inner.listeners.borrow_mut());
            running.extend(added);
            let removed = std::mem::take(&mut *self.inner.removed.borrow_mut());
            running.retain(|e| !removed.contains(&e.id));
            *self.inner.listeners.borrow_mut() = running;

            outcome?;
        }
    }
}
