//! Venue Port (Driven Port)
//!
//! Dispatches baskets of child orders and reports their outcome
//! asynchronously through a [`NotificationSink`].

use async_trait::async_trait;

use crate::domain::routing::{OrderBasket, VenueNotification};
use crate::domain::shared::VenueId;

/// Venue dispatch errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VenueError {
    /// A venue is not connected. Orders for other venues may have been sent.
    #[error("venue unavailable: {venue}")]
    Unavailable {
        /// Venue that could not be reached.
        venue: VenueId,
    },

    /// The venue layer refused the basket before sending any order.
    #[error("basket rejected: {message}")]
    Rejected {
        /// Reason given by the venue layer.
        message: String,
    },

    /// Transport failure. Any subset of the basket may have been accepted.
    #[error("venue connection error: {message}")]
    ConnectionError {
        /// Transport error details.
        message: String,
    },
}

impl VenueError {
    /// Returns true if no order of the basket reached a venue.
    #[must_use]
    pub const fn nothing_accepted(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Port for sending child orders to venues.
///
/// After a successful `dispatch`, exactly one terminal notification per
/// order is raised on the sink, at an unspecified later time and possibly
/// on another task.
///
/// An adapter that refuses some orders while accepting others must return
/// `Ok` and report the refused orders as failed notifications. `Err` is
/// reserved for baskets whose fate is unknown or that were refused whole;
/// only [`VenueError::Rejected`] promises that nothing was accepted.
#[async_trait]
pub trait VenuePort: Send + Sync {
    /// Dispatch every order in the basket.
    async fn dispatch(&self, basket: &OrderBasket) -> Result<(), VenueError>;
}

/// Receiver of venue notifications.
pub trait NotificationSink: Send + Sync {
    /// Hand over one notification. Must not block.
    fn notify(&self, notification: VenueNotification);
}
