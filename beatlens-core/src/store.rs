//! Per-channel result state shared between workers and the UI context
//!
//! Each channel holds its `(outcome, ticket, finished)` triple behind its own
//! mutex. Callers go through a narrow interface (snapshot, set_outcome,
//! take_finished) and never hold a lock across extractor or display calls.
//! When all three cells must change together the locks are taken in
//! [`Channel::ALL`] order.

use crate::channel::Ticket;
use beatlens_analysis::{ChordAnalysis, KeyAnalysis, TempoAnalysis};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Latest outcome of one channel
#[derive(Debug)]
pub enum Outcome<T> {
    Pending,
    Success(Arc<T>),
    Failure(String),
}

// Manual impl: `Arc<T>` is cloneable without `T: Clone`
impl<T> Clone for Outcome<T> {
    fn clone(&self) -> Self {
        match self {
            Outcome::Pending => Outcome::Pending,
            Outcome::Success(v) => Outcome::Success(Arc::clone(v)),
            Outcome::Failure(m) => Outcome::Failure(m.clone()),
        }
    }
}

impl<T> Outcome<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Outcome::Pending)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }
}

/// The guarded triple of one channel
#[derive(Debug)]
pub struct ChannelState<T> {
    pub outcome: Outcome<T>,
    /// Round the outcome (or the in-flight job) belongs to
    pub ticket: Option<Ticket>,
    /// One-shot "new outcome not yet consumed by the render loop"
    pub finished: bool,
}

impl<T> Default for ChannelState<T> {
    fn default() -> Self {
        Self {
            outcome: Outcome::Pending,
            ticket: None,
            finished: false,
        }
    }
}

impl<T> Clone for ChannelState<T> {
    fn clone(&self) -> Self {
        Self {
            outcome: self.outcome.clone(),
            ticket: self.ticket.clone(),
            finished: self.finished,
        }
    }
}

/// Mutex-guarded state of one channel
#[derive(Debug)]
pub struct ChannelCell<T> {
    state: Mutex<ChannelState<T>>,
}

impl<T> Default for ChannelCell<T> {
    fn default() -> Self {
        Self {
            state: Mutex::new(ChannelState::default()),
        }
    }
}

impl<T> ChannelCell<T> {
    /// Copy of the current triple
    pub fn snapshot(&self) -> ChannelState<T> {
        self.state.lock().clone()
    }

    /// Store a completed outcome if it still belongs to the cell's round
    ///
    /// Returns `false`, leaving the cell untouched, when `ticket` is not the
    /// round the cell was last reset for.
    pub fn set_outcome(&self, ticket: &Ticket, outcome: Outcome<T>) -> bool {
        let mut state = self.state.lock();
        if state.ticket.as_ref() != Some(ticket) {
            return false;
        }
        state.outcome = outcome;
        state.finished = true;
        true
    }

    /// Consume the finished flag, returning the outcome it signalled
    pub fn take_finished(&self) -> Option<Outcome<T>> {
        let mut state = self.state.lock();
        if !state.finished {
            return None;
        }
        state.finished = false;
        Some(state.outcome.clone())
    }

    fn lock(&self) -> MutexGuard<'_, ChannelState<T>> {
        self.state.lock()
    }
}

fn reset<T>(state: &mut ChannelState<T>, ticket: &Ticket) {
    state.outcome = Outcome::Pending;
    state.ticket = Some(ticket.clone());
    state.finished = false;
}

/// Result cells of all three channels
#[derive(Debug, Default)]
pub struct ResultStore {
    pub tempo: ChannelCell<TempoAnalysis>,
    pub key: ChannelCell<KeyAnalysis>,
    pub chords: ChannelCell<ChordAnalysis>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset every channel to a pending state for a new round
    ///
    /// All three locks are held together, acquired tempo, key, chords.
    pub fn reset_all(&self, ticket: &Ticket) {
        let mut tempo = self.tempo.lock();
        let mut key = self.key.lock();
        let mut chords = self.chords.lock();
        reset(&mut tempo, ticket);
        reset(&mut key, ticket);
        reset(&mut chords, ticket);
    }
}
