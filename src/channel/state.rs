//! Connection lifecycle state machine.
//!
//! ```text
//!              ┌──────────► open ──────┬──► closed
//!  connecting ─┤                       │
//!              └──────────────────────►└──► errored
//! ```
//!
//! `closed` and `errored` are terminal. The observed path is kept in a
//! `watch` cell so every subscriber replays it from the start and no
//! transition is lost to coalescing.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use futures_util::Stream;
use futures_util::stream;
use tokio::sync::watch;
use tracing::{debug, warn};

// ============================================================================
// LifecycleState
// ============================================================================

/// Lifecycle state of a [`MessageChannel`](super::MessageChannel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Handshake in progress. Initial state.
    Connecting,
    /// Handshake done; sends are accepted.
    Open,
    /// Closed cleanly by either side. Terminal.
    Closed,
    /// Connect failure or transport drop. Terminal.
    Errored,
}

impl LifecycleState {
    /// Returns `true` for `closed` and `errored`.
    #[inline]
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Errored)
    }

    /// Returns `true` if `self -> next` is a legal transition.
    #[inline]
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Connecting, Self::Open)
                | (Self::Connecting, Self::Errored)
                | (Self::Open, Self::Closed)
                | (Self::Open, Self::Errored)
        )
    }

    /// Returns the lowercase state name.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Errored => "errored",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Fault
// ============================================================================

/// Why a channel ended in [`LifecycleState::Errored`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Address unreachable or handshake rejected.
    ConnectFailure {
        /// Transport-provided description.
        reason: String,
    },
    /// Connection lost after it was open.
    TransportDrop {
        /// Transport-provided description.
        reason: String,
    },
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailure { reason } => write!(f, "connect failure: {reason}"),
            Self::TransportDrop { reason } => write!(f, "transport drop: {reason}"),
        }
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Observed path plus the fault, if any.
#[derive(Debug, Clone)]
struct Snapshot {
    path: Vec<LifecycleState>,
    fault: Option<Fault>,
}

impl Snapshot {
    fn current(&self) -> LifecycleState {
        self.path
            .last()
            .copied()
            .unwrap_or(LifecycleState::Connecting)
    }
}

/// Shared lifecycle cell, written by the connection task only.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    tx: watch::Sender<Snapshot>,
}

impl Lifecycle {
    /// Creates a cell in `connecting`.
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(Snapshot {
            path: vec![LifecycleState::Connecting],
            fault: None,
        });
        Self { tx }
    }

    /// Returns the current state.
    pub(crate) fn state(&self) -> LifecycleState {
        self.tx.borrow().current()
    }

    /// Returns the fault recorded with `errored`.
    pub(crate) fn fault(&self) -> Option<Fault> {
        self.tx.borrow().fault.clone()
    }

    /// Returns the observed path so far.
    #[cfg(test)]
    pub(crate) fn path(&self) -> Vec<LifecycleState> {
        self.tx.borrow().path.clone()
    }

    /// Moves to `next` if the transition is legal.
    ///
    /// Returns `false` and leaves the state untouched otherwise.
    pub(crate) fn advance(&self, next: LifecycleState) -> bool {
        self.apply(next, None)
    }

    /// Moves to `errored`, recording `fault`.
    pub(crate) fn fail(&self, fault: Fault) -> bool {
        self.apply(LifecycleState::Errored, Some(fault))
    }

    fn apply(&self, next: LifecycleState, fault: Option<Fault>) -> bool {
        let mut from = LifecycleState::Connecting;
        let applied = self.tx.send_if_modified(|snapshot| {
            from = snapshot.current();
            if !from.can_transition_to(next) {
                return false;
            }
            snapshot.path.push(next);
            if fault.is_some() {
                snapshot.fault = fault;
            }
            true
        });

        if applied {
            debug!(%from, to = %next, "Lifecycle transition");
        } else {
            warn!(%from, to = %next, "Rejected lifecycle transition");
        }
        applied
    }

    /// Subscribes to the observed path, starting at `connecting`.
    pub(crate) fn subscribe(&self) -> LifecycleEvents {
        LifecycleEvents {
            rx: self.tx.subscribe(),
            cursor: 0,
            finished: false,
        }
    }
}

// ============================================================================
// LifecycleEvents
// ============================================================================

/// Lazy sequence of lifecycle states.
///
/// Yields the path `connecting`, then each later state, and ends after a
/// terminal state.
#[derive(Debug)]
pub struct LifecycleEvents {
    rx: watch::Receiver<Snapshot>,
    cursor: usize,
    finished: bool,
}

impl LifecycleEvents {
    /// Waits for the next state on the path.
    ///
    /// Returns `None` once a terminal state has been yielded.
    pub async fn next(&mut self) -> Option<LifecycleState> {
        if self.finished {
            return None;
        }

        loop {
            if let Some(state) = self.take_next() {
                if state.is_terminal() {
                    self.finished = true;
                }
                return Some(state);
            }

            if self.rx.changed().await.is_err() {
                // Writer gone; nothing further can arrive.
                let state = self.take_next();
                if state.is_none_or(|s| s.is_terminal()) {
                    self.finished = true;
                }
                return state;
            }
        }
    }

    /// Converts into a [`Stream`].
    pub fn into_stream(self) -> impl Stream<Item = LifecycleState> + Send + Unpin {
        Box::pin(stream::unfold(self, |mut events| async move {
            events.next().await.map(|state| (state, events))
        }))
    }

    fn take_next(&mut self) -> Option<LifecycleState> {
        let snapshot = self.rx.borrow_and_update();
        let state = snapshot.path.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(state)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use futures_util::StreamExt;
    use proptest::prelude::*;

    use super::LifecycleState::{Closed, Connecting, Errored, Open};

    const ALL: [LifecycleState; 4] = [Connecting, Open, Closed, Errored];

    #[test]
    fn test_legal_transitions() {
        assert!(Connecting.can_transition_to(Open));
        assert!(Connecting.can_transition_to(Errored));
        assert!(Open.can_transition_to(Closed));
        assert!(Open.can_transition_to(Errored));
    }

    #[test]
    fn test_no_transition_leaves_terminal() {
        for next in ALL {
            assert!(!Closed.can_transition_to(next));
            assert!(!Errored.can_transition_to(next));
        }
    }

    #[test]
    fn test_connecting_never_revisited() {
        for from in ALL {
            assert!(!from.can_transition_to(Connecting));
        }
        assert!(!Connecting.can_transition_to(Closed));
    }

    #[test]
    fn test_display() {
        assert_eq!(Open.to_string(), "open");
        assert_eq!(Errored.to_string(), "errored");
    }

    #[test]
    fn test_fail_records_fault() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.fail(Fault::ConnectFailure {
            reason: "refused".into()
        }));
        assert_eq!(lifecycle.state(), Errored);
        assert_eq!(
            lifecycle.fault(),
            Some(Fault::ConnectFailure {
                reason: "refused".into()
            })
        );
    }

    #[test]
    fn test_second_terminal_rejected() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.advance(Open));
        assert!(lifecycle.advance(Closed));
        assert!(!lifecycle.advance(Closed));
        assert!(!lifecycle.fail(Fault::TransportDrop {
            reason: "late".into()
        }));
        assert_eq!(lifecycle.path(), vec![Connecting, Open, Closed]);
        assert_eq!(lifecycle.fault(), None);
    }

    #[tokio::test]
    async fn test_subscriber_replays_full_path() {
        let lifecycle = Lifecycle::new();
        lifecycle.advance(Open);
        lifecycle.advance(Closed);

        let states: Vec<_> = lifecycle.subscribe().into_stream().collect().await;
        assert_eq!(states, vec![Connecting, Open, Closed]);
    }

    #[tokio::test]
    async fn test_subscriber_sees_live_transitions() {
        let lifecycle = std::sync::Arc::new(Lifecycle::new());
        let mut events = lifecycle.subscribe();
        assert_eq!(events.next().await, Some(Connecting));

        let writer = std::sync::Arc::clone(&lifecycle);
        tokio::spawn(async move {
            writer.advance(Open);
            tokio::task::yield_now().await;
            writer.fail(Fault::TransportDrop {
                reason: "reset".into(),
            });
        });

        assert_eq!(events.next().await, Some(Open));
        assert_eq!(events.next().await, Some(Errored));
        assert_eq!(events.next().await, None);
    }

    #[tokio::test]
    async fn test_subscriber_ends_when_writer_dropped() {
        let lifecycle = Lifecycle::new();
        let mut events = lifecycle.subscribe();
        lifecycle.advance(Open);
        drop(lifecycle);

        assert_eq!(events.next().await, Some(Connecting));
        assert_eq!(events.next().await, Some(Open));
        assert_eq!(events.next().await, None);
    }

    fn any_state() -> impl Strategy<Value = LifecycleState> {
        prop::sample::select(ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_observed_path_is_monotonic(requests in prop::collection::vec(any_state(), 0..12)) {
            let lifecycle = Lifecycle::new();
            for next in requests {
                lifecycle.advance(next);
            }

            let path = lifecycle.path();
            prop_assert_eq!(path[0], Connecting);
            prop_assert!(path.len() <= 3);
            prop_assert!(path[1..].iter().all(|s| *s != Connecting));
            for pair in path.windows(2) {
                prop_assert!(pair[0].can_transition_to(pair[1]));
            }
            let terminals = path.iter().filter(|s| s.is_terminal()).count();
            prop_assert!(terminals <= 1);
            if terminals == 1 {
                prop_assert!(path.last().is_some_and(LifecycleState::is_terminal));
            }
        }
    }
}
