//! Error types for fleetwatch-watchdog.

use fleetwatch_types::MemberId;
use thiserror::Error;

/// Errors raised by the supervisor, the poller, or a member's event processing.
#[derive(Debug, Error)]
pub enum WatchdogError {
    /// Member not part of this fleet.
    #[error("member not found: {0}")]
    MemberNotFound(MemberId),

    /// Two members registered under one id.
    #[error("duplicate member: {0}")]
    DuplicateMember(MemberId),

    /// `start` called on a member that is already monitoring.
    #[error("member already started: {0}")]
    AlreadyStarted(MemberId),

    /// Operation requires an active member.
    #[error("member already retired: {0}")]
    AlreadyRetired(MemberId),

    /// The handle no longer hands out its event stream.
    #[error("event stream unavailable for member {0}")]
    SubscriptionUnavailable(MemberId),

    /// Event or state discriminant outside the known vocabulary.
    #[error("unrecognized event for member {member_id}: {discriminant}")]
    UnrecognizedEvent {
        member_id: MemberId,
        discriminant: String,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}

/// Result type for watchdog operations.
pub type WatchdogResult<T> = Result<T, WatchdogError>;
