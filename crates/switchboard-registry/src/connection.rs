//! Connection handle abstraction.
//!
//! The transport layer implements [`Connection`] for whatever it uses to talk
//! to a peer. The registry stores clones of these handles and calls `send` on
//! them; it never owns or closes the underlying transport.

use std::fmt;
use std::hash::Hash;

use tokio::sync::mpsc;

use crate::error::DeliveryError;
use crate::types::ShortId;

/// Full identifier of a connection.
///
/// Must be stable for the connection's lifetime and map deterministically to
/// a [`ShortId`].
pub trait ConnectionIdentifier:
    Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Derive the compact lookup key for this identifier.
    fn short_id(&self) -> ShortId;
}

/// A handle to an established connection.
pub trait Connection: Clone + Send + Sync + 'static {
    /// Identifier type
    type Id: ConnectionIdentifier;
    /// Outbound message type accepted by `send`
    type Message: Clone + Send;

    /// The connection's identifier.
    fn id(&self) -> &Self::Id;

    /// Hand a message to the connection for delivery.
    ///
    /// Must not block: implementations queue the message and let the
    /// transport flush it on its own task.
    fn send(&self, message: Self::Message) -> Result<(), DeliveryError>;

    /// Whether the transport side is still accepting messages.
    fn is_open(&self) -> bool {
        true
    }

    /// Short id of this connection.
    fn short_id(&self) -> ShortId {
        self.id().short_id()
    }
}

/// Connection handle backed by a bounded `mpsc` queue.
///
/// The transport keeps the receiving half and drains it into the socket.
#[derive(Debug)]
pub struct ChannelConnection<I, M> {
    id: I,
    sender: mpsc::Sender<M>,
}

impl<I, M> ChannelConnection<I, M> {
    /// Create a handle around an outbound sender.
    pub fn new(id: I, sender: mpsc::Sender<M>) -> Self {
        Self { id, sender }
    }

    /// Create a handle together with its queue.
    pub fn channel(id: I, capacity: usize) -> (Self, mpsc::Receiver<M>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self::new(id, sender), receiver)
    }
}

// Manual impl: deriving would require `M: Clone`.
impl<I: Clone, M> Clone for ChannelConnection<I, M> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            sender: self.sender.clone(),
        }
    }
}

impl<I, M> Connection for ChannelConnection<I, M>
where
    I: ConnectionIdentifier,
    M: Clone + Send + 'static,
{
    type Id = I;
    type Message = M;

    fn id(&self) -> &I {
        &self.id
    }

    fn send(&self, message: M) -> Result<(), DeliveryError> {
        self.sender.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }
}
