//! Lock-protected state of a [`Channel`](crate::Channel).
//!
//! Every method here runs with the channel lock held. None of them block or
//! notify; the caller decides which condition to signal after a transition.

/// Sequence number of a staged value. A value staged under ticket `n` is the
/// `n`-th value to be handed off on its channel.
pub(crate) type Ticket = u64;

#[derive(Debug)]
pub(crate) struct State<T> {
    /// The in-flight value. `Some` exactly while a message is staged.
    staged: Option<T>,
    /// Receivers that entered `recv` and have not yet taken a value.
    waiting_receivers: usize,
    /// Number of values taken by receivers so far.
    delivered: u64,
}

impl<T> Default for State<T> {
    fn default() -> Self {
        Self {
            staged: None,
            waiting_receivers: 0,
            delivered: 0,
        }
    }
}

impl<T> State<T> {
    #[must_use]
    pub(crate) const fn has_message(&self) -> bool {
        self.staged.is_some()
    }

    #[must_use]
    pub(crate) const fn waiting_receivers(&self) -> usize {
        self.waiting_receivers
    }

    #[must_use]
    pub(crate) const fn delivered(&self) -> u64 {
        self.delivered
    }

    /// A sender may stage only when a receiver is registered and the slot is
    /// empty.
    #[must_use]
    pub(crate) const fn can_stage(&self) -> bool {
        self.waiting_receivers > 0 && self.staged.is_none()
    }

    pub(crate) const fn register(&mut self) {
        self.waiting_receivers += 1;
    }

    /// Drops a registration that never took a value.
    pub(crate) fn deregister(&mut self) {
        debug_assert!(self.waiting_receivers > 0, "deregister without register");
        self.waiting_receivers = self.waiting_receivers.saturating_sub(1);
    }

    /// Places `value` in the slot and returns the ticket the sender waits on.
    ///
    /// Must only be called when [`Self::can_stage`] holds.
    pub(crate) fn stage(&mut self, value: T) -> Ticket {
        debug_assert!(self.can_stage(), "staged without a receiver or over a pending value");
        self.staged = Some(value);
        self.delivered + 1
    }

    /// Takes the staged value, if any, completing one hand-off for a
    /// registered receiver.
    pub(crate) fn take(&mut self) -> Option<T> {
        let value = self.staged.take()?;
        self.waiting_receivers = self.waiting_receivers.saturating_sub(1);
        self.delivered += 1;
        Some(value)
    }

    #[must_use]
    pub(crate) const fn is_delivered(&self, ticket: Ticket) -> bool {
        self.delivered >= ticket
    }

    /// Takes back the value staged under `ticket` if no receiver has taken it
    /// yet.
    pub(crate) fn retract(&mut self, ticket: Ticket) -> Option<T> {
        if self.is_delivered(ticket) {
            return None;
        }
        self.staged.take()
    }
}
