//! Synchronous, unbuffered rendezvous channel.
//!
//! A [`Channel`] moves exactly one value from one sender to one receiver per
//! hand-off. Neither side proceeds until both have met: [`Channel::send`]
//! returns only after a receiver has taken the value, and [`Channel::recv`]
//! returns only once a sender has staged one. There is no buffer, no closing
//! and no ordering among competing waiters.
//!
//! The channel is a monitor: one [`Mutex`] guarding the channel state and
//! three [`Condvar`]s for "a sender may stage", "a value is staged" and "the
//! staged value was taken".
//!
//! # Example
//!
//! ```rust
//! use std::{sync::Arc, thread};
//!
//! use rendezvous::Channel;
//!
//! let channel = Arc::new(Channel::new());
//!
//! let sender = thread::spawn({
//!     let channel = channel.clone();
//!     move || {
//!         for i in 1..=3 {
//!             // Blocks until the receiver below has taken `i`
//!             channel.send(i);
//!         }
//!     }
//! });
//!
//! let received = (0..3).map(|_| channel.recv()).collect::<Vec<_>>();
//! sender.join().unwrap();
//!
//! assert_eq!(received, vec![1, 2, 3]);
//! ```
//!
//! # Liveness
//!
//! The base operations never time out and never fail. A `send` with no
//! receiver ever arriving, or a `recv` with no sender ever arriving, blocks
//! forever; nothing detects that a channel is no longer served. Callers that
//! need bounded waits use the deadline variants in [`timeout`], which are a
//! separate contract.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::{
    fmt,
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
};

use state::State;

#[cfg(feature = "fan-out")]
pub mod fan_out;
mod state;
#[cfg(feature = "timeout")]
pub mod timeout;

#[cfg(feature = "fan-out")]
pub use fan_out::{FanOut, FanOutError};
#[cfg(feature = "timeout")]
pub use timeout::{RecvTimeoutError, SendTimeoutError};

/// A synchronous rendezvous channel carrying values of type `T`.
///
/// Any number of threads may call [`send`](Self::send) and
/// [`recv`](Self::recv) on the same channel concurrently; share it through an
/// [`Arc`](std::sync::Arc) or a scoped borrow. Each completed `send` matches
/// exactly one completed `recv`.
///
/// When several receivers (or several senders) are waiting, which one is
/// matched next is up to the scheduler.
pub struct Channel<T> {
    state: Mutex<State<T>>,
    can_send: Condvar,
    can_recv: Condvar,
    ack: Condvar,
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Channel")
            .field("has_message", &state.has_message())
            .field("waiting_receivers", &state.waiting_receivers())
            .field("handoffs", &state.delivered())
            .finish_non_exhaustive()
    }
}

impl<T> Channel<T> {
    /// Creates an empty channel with no registered receivers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            can_send: Condvar::new(),
            can_recv: Condvar::new(),
            ack: Condvar::new(),
        }
    }

    /// Hands `value` to exactly one receiver.
    ///
    /// Blocks until a receiver is registered and no other value is in flight,
    /// stages `value`, then blocks again until a receiver has taken it. The
    /// call never returns after merely staging.
    ///
    /// Blocks forever if no receiver ever arrives.
    pub fn send(&self, value: T) {
        let state = self.lock();
        let mut state = self
            .can_send
            .wait_while(state, |state| !state.can_stage())
            .unwrap_or_else(PoisonError::into_inner);

        let ticket = state.stage(value);
        log::trace!(
            "send: staged ticket={ticket} waiting_receivers={}",
            state.waiting_receivers()
        );
        self.can_recv.notify_one();

        let state = self
            .ack
            .wait_while(state, |state| !state.is_delivered(ticket))
            .unwrap_or_else(PoisonError::into_inner);
        drop(state);

        log::trace!("send: ticket={ticket} acknowledged");
    }

    /// Takes one value from exactly one sender.
    ///
    /// Registers the caller as a waiting receiver, blocks until a value is
    /// staged, takes it and acknowledges the matched sender.
    ///
    /// Blocks forever if no sender ever arrives.
    pub fn recv(&self) -> T {
        let mut state = self.lock();
        state.register();
        log::trace!(
            "recv: registered waiting_receivers={}",
            state.waiting_receivers()
        );
        self.can_send.notify_one();

        loop {
            if let Some(value) = state.take() {
                log::trace!("recv: took handoff={}", state.delivered());
                drop(state);
                self.acknowledge();
                return value;
            }
            state = self
                .can_recv
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Number of receivers currently registered and waiting for a value.
    #[must_use]
    pub fn waiting_receivers(&self) -> usize {
        self.lock().waiting_receivers()
    }

    /// Whether a value is currently staged and waiting to be taken.
    #[must_use]
    pub fn has_message(&self) -> bool {
        self.lock().has_message()
    }

    /// Number of rendezvous completed on this channel so far.
    #[must_use]
    pub fn handoffs(&self) -> u64 {
        self.lock().delivered()
    }

    /// Wakes the senders parked on the acknowledgment and lets the next
    /// sender stage.
    ///
    /// Every sender waiting on `ack` rechecks its own ticket, so all of them
    /// are woken: more than one may have had its value taken before being
    /// rescheduled.
    fn acknowledge(&self) {
        self.ack.notify_all();
        self.can_send.notify_one();
    }

    /// No caller code ever runs under this lock, so a poisoned guard still
    /// protects a consistent state.
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
