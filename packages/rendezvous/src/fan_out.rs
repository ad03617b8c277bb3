//! Addressed delivery on top of the unaddressed [`Channel`].
//!
//! A [`Channel`] has no notion of "who" receives: any registered receiver may
//! take the next value. To deliver to one particular participant, every
//! participant gets its own channel. [`FanOut`] keeps that set of channels,
//! keyed by recipient id.

use std::{collections::BTreeMap, sync::Arc};

use thiserror::Error;

use crate::Channel;

/// Error returned by [`FanOut::send_to`].
#[derive(Clone, PartialEq, Eq, Error)]
pub enum FanOutError<T> {
    /// No channel exists for the requested recipient. Carries the unsent
    /// value.
    #[error("no channel for the requested recipient")]
    UnknownRecipient(T),
}

impl<T> FanOutError<T> {
    /// Returns the value that was not delivered.
    #[must_use]
    pub fn into_inner(self) -> T {
        match self {
            Self::UnknownRecipient(value) => value,
        }
    }
}

impl<T> std::fmt::Debug for FanOutError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownRecipient(_) => f.write_str("UnknownRecipient(..)"),
        }
    }
}

/// One dedicated [`Channel`] per recipient id.
///
/// The sending side addresses a recipient with [`FanOut::send_to`]; each
/// recipient receives on the handle returned by [`FanOut::channel`].
#[derive(Debug)]
pub struct FanOut<K, T> {
    channels: BTreeMap<K, Arc<Channel<T>>>,
}

impl<K: Ord, T> FanOut<K, T> {
    /// Creates one channel for each distinct id in `ids`.
    #[must_use]
    pub fn new(ids: impl IntoIterator<Item = K>) -> Self {
        Self {
            channels: ids
                .into_iter()
                .map(|id| (id, Arc::new(Channel::new())))
                .collect(),
        }
    }

    /// The channel dedicated to `id`, for the recipient to
    /// [`recv`](Channel::recv) on.
    #[must_use]
    pub fn channel(&self, id: &K) -> Option<Arc<Channel<T>>> {
        self.channels.get(id).cloned()
    }

    /// Rendezvous with recipient `id`, blocking until it has taken `value`.
    ///
    /// # Errors
    ///
    /// * If there is no channel for `id`. The value is returned inside the
    ///   error.
    pub fn send_to(&self, id: &K, value: T) -> Result<(), FanOutError<T>> {
        let Some(channel) = self.channels.get(id) else {
            return Err(FanOutError::UnknownRecipient(value));
        };
        channel.send(value);
        Ok(())
    }

    /// Recipient ids in ascending order.
    pub fn recipients(&self) -> impl Iterator<Item = &K> {
        self.channels.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
