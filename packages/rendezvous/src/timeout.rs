//! Deadline-bounded variants of [`Channel::send`] and [`Channel::recv`].
//!
//! These are an extension on top of the blocking contract, not a change to
//! it: the plain `send`/`recv` never time out. A call here gives up only
//! while its own wait condition is still false when the deadline passes, and
//! when it gives up it leaves the channel as if it had never been called:
//!
//! * a receiver retracts its registration
//! * a sender hands its value back, taking it out of the slot first if it had
//!   already been staged but not yet taken

use std::{
    sync::{Condvar, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use thiserror::Error;

use crate::{Channel, state::State};

/// Returned by [`Channel::send_timeout`] and [`Channel::send_deadline`] when
/// no receiver took the value in time. Carries the unsent value.
#[derive(Clone, Copy, PartialEq, Eq, Error)]
#[error("timed out before a receiver took the value")]
pub struct SendTimeoutError<T>(pub T);

impl<T> SendTimeoutError<T> {
    /// Returns the value that was not delivered.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::fmt::Debug for SendTimeoutError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SendTimeoutError(..)")
    }
}

/// Returned by [`Channel::recv_timeout`] and [`Channel::recv_deadline`] when
/// no sender staged a value in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("timed out waiting for a sender")]
pub struct RecvTimeoutError;

impl<T> Channel<T> {
    /// Like [`Channel::send`], but gives up after `timeout`.
    ///
    /// A `timeout` too large to be represented as a deadline blocks like
    /// [`Channel::send`].
    ///
    /// # Errors
    ///
    /// * If no receiver took the value within `timeout`. The value is returned
    ///   inside the error and was not observed by any receiver.
    pub fn send_timeout(&self, value: T, timeout: Duration) -> Result<(), SendTimeoutError<T>> {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.send_deadline(value, deadline),
            None => {
                self.send(value);
                Ok(())
            }
        }
    }

    /// Like [`Channel::send`], but gives up at `deadline`.
    ///
    /// # Errors
    ///
    /// * If no receiver took the value by `deadline`. The value is returned
    ///   inside the error and was not observed by any receiver.
    pub fn send_deadline(&self, value: T, deadline: Instant) -> Result<(), SendTimeoutError<T>> {
        let mut state = self.lock();

        while !state.can_stage() {
            if Instant::now() >= deadline {
                log::debug!(
                    "send_deadline: no receiver before deadline waiting_receivers={}",
                    state.waiting_receivers()
                );
                return Err(SendTimeoutError(value));
            }
            state = wait_until(&self.can_send, state, deadline);
        }

        let ticket = state.stage(value);
        log::trace!("send_deadline: staged ticket={ticket}");
        self.can_recv.notify_one();

        while !state.is_delivered(ticket) {
            if Instant::now() >= deadline {
                if let Some(value) = state.retract(ticket) {
                    log::debug!("send_deadline: retracted ticket={ticket} before pickup");
                    let can_stage = state.can_stage();
                    drop(state);
                    if can_stage {
                        self.can_send.notify_one();
                    }
                    return Err(SendTimeoutError(value));
                }
                break;
            }
            state = wait_until(&self.ack, state, deadline);
        }
        drop(state);

        log::trace!("send_deadline: ticket={ticket} acknowledged");
        Ok(())
    }

    /// Like [`Channel::recv`], but gives up after `timeout`.
    ///
    /// A `timeout` too large to be represented as a deadline blocks like
    /// [`Channel::recv`].
    ///
    /// # Errors
    ///
    /// * If no sender staged a value within `timeout`
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.recv_deadline(deadline),
            None => Ok(self.recv()),
        }
    }

    /// Like [`Channel::recv`], but gives up at `deadline`.
    ///
    /// # Errors
    ///
    /// * If no sender staged a value by `deadline`
    pub fn recv_deadline(&self, deadline: Instant) -> Result<T, RecvTimeoutError> {
        let mut state = self.lock();
        state.register();
        self.can_send.notify_one();

        loop {
            if let Some(value) = state.take() {
                log::trace!("recv_deadline: took handoff={}", state.delivered());
                drop(state);
                self.acknowledge();
                return Ok(value);
            }
            if Instant::now() >= deadline {
                state.deregister();
                log::debug!(
                    "recv_deadline: no sender before deadline waiting_receivers={}",
                    state.waiting_receivers()
                );
                return Err(RecvTimeoutError);
            }
            state = wait_until(&self.can_recv, state, deadline);
        }
    }
}

fn wait_until<'a, T>(
    condvar: &Condvar,
    state: MutexGuard<'a, State<T>>,
    deadline: Instant,
) -> MutexGuard<'a, State<T>> {
    let timeout = deadline.saturating_duration_since(Instant::now());
    let (state, _) = condvar
        .wait_timeout(state, timeout)
        .unwrap_or_else(PoisonError::into_inner);
    state
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test_log::test]
    fn test_recv_timeout_without_sender() {
        let channel = Channel::<u8>::new();
        let start = Instant::now();

        let result = channel.recv_timeout(Duration::from_millis(50));

        assert_eq!(result, Err(RecvTimeoutError));
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(channel.waiting_receivers(), 0);
    }

    #[test_log::test]
    fn test_send_timeout_without_receiver_returns_value() {
        let channel = Channel::new();

        let result = channel.send_timeout(String::from("unsent"), Duration::from_millis(50));

        assert_eq!(result.map_err(SendTimeoutError::into_inner), Err("unsent".to_string()));
        assert!(!channel.has_message());
        assert_eq!(channel.handoffs(), 0);
    }

    #[test_log::test]
    fn test_send_deadline_in_past_with_no_receiver() {
        let channel = Channel::new();

        let result = channel.send_deadline(3, Instant::now());

        assert_eq!(result, Err(SendTimeoutError(3)));
    }

    #[test_log::test]
    fn test_recv_timeout_receives_value() {
        let channel = Arc::new(Channel::new());

        let sender = thread::spawn({
            let channel = channel.clone();
            move || channel.send(9_u32)
        });

        assert_eq!(channel.recv_timeout(Duration::from_secs(10)), Ok(9));
        sender.join().unwrap();
        assert_eq!(channel.handoffs(), 1);
    }

    #[test_log::test]
    fn test_send_timeout_to_waiting_receiver() {
        let channel = Arc::new(Channel::new());

        let receiver = thread::spawn({
            let channel = channel.clone();
            move || channel.recv()
        });

        assert_eq!(channel.send_timeout(4_u32, Duration::from_secs(10)), Ok(()));
        assert_eq!(receiver.join().unwrap(), 4);
    }

    #[test_log::test]
    fn test_expired_receiver_does_not_attract_sender() {
        let channel = Channel::new();

        assert_eq!(
            channel.recv_timeout(Duration::from_millis(10)),
            Err(RecvTimeoutError)
        );

        // The retracted registration must not let a sender stage into the void
        assert_eq!(
            channel.send_timeout(1_u8, Duration::from_millis(50)),
            Err(SendTimeoutError(1))
        );
        assert!(!channel.has_message());
    }

    #[test_log::test]
    fn test_huge_timeout_falls_back_to_blocking() {
        let channel = Arc::new(Channel::new());

        let sender = thread::spawn({
            let channel = channel.clone();
            move || channel.send_timeout(6_u8, Duration::MAX)
        });

        assert_eq!(channel.recv_timeout(Duration::MAX), Ok(6));
        assert_eq!(sender.join().unwrap(), Ok(()));
    }

    #[test_log::test]
    fn test_error_display() {
        assert_eq!(
            SendTimeoutError(1).to_string(),
            "timed out before a receiver took the value"
        );
        assert_eq!(RecvTimeoutError.to_string(), "timed out waiting for a sender");
        assert_eq!(format!("{:?}", SendTimeoutError(1)), "SendTimeoutError(..)");
    }
}
