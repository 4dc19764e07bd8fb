//! Error taxonomy for the trading robot.
//!
//! Collaborator traits return `anyhow::Result`; adapters wrap the typed
//! errors below so the robot loop can recover them with
//! [`RobotError::classify`] and pick the right response: stop on
//! configuration errors, back off on venue errors, skip the operation on
//! invariant errors, reconcile-and-continue on everything else.

use crate::types::MarketType;
use thiserror::Error;

/// Fatal configuration problems. The robot loop stops on these.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A strategy parameter failed validation.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// The configured market type has no sizing rules here.
    #[error("unsupported market type {0:?}: only contract markets are tradeable")]
    UnsupportedMarketType(MarketType),
}

impl ConfigError {
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Failures at the venue boundary. Recoverable: the cycle is abandoned and
/// retried after a backoff.
#[derive(Debug, Error)]
pub enum VenueError {
    /// Transport-level failure (connection, timeout, decode).
    #[error("venue transport error: {0}")]
    Transport(String),

    /// The venue understood the request and refused it.
    #[error("rejected by venue: {0}")]
    Rejected(String),

    /// Rate limit hit.
    #[error("venue rate limit: {0}")]
    RateLimited(String),
}

/// Internal preconditions that did not hold. The responsible operation is
/// suppressed and the loop continues.
#[derive(Debug, Error)]
pub enum InvariantError {
    /// Protective orders were requested for a flat position.
    #[error("protective orders requested for a flat position")]
    FlatProtection,

    /// The candle history is too short for the indicator.
    #[error("not enough candles: got {got}, need at least {need}")]
    NotEnoughCandles { got: usize, need: usize },
}

/// Top-level dispatch type for the robot loop.
#[derive(Debug, Error)]
pub enum RobotError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Venue(#[from] VenueError),

    #[error(transparent)]
    Invariant(#[from] InvariantError),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl RobotError {
    /// Recovers the typed taxonomy from an `anyhow::Error` chain.
    #[must_use]
    pub fn classify(err: anyhow::Error) -> Self {
        let err = match err.downcast::<ConfigError>() {
            Ok(config) => return Self::Config(config),
            Err(err) => err,
        };
        let err = match err.downcast::<VenueError>() {
            Ok(venue) => return Self::Venue(venue),
            Err(err) => err,
        };
        match err.downcast::<InvariantError>() {
            Ok(invariant) => Self::Invariant(invariant),
            Err(err) => Self::Unexpected(err),
        }
    }

    /// Whether the robot loop must stop instead of retrying.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_recovers_typed_errors() {
        let err = anyhow::Error::new(VenueError::Transport("connection reset".into()));
        assert!(matches!(RobotError::classify(err), RobotError::Venue(_)));

        let err = anyhow::Error::new(InvariantError::NotEnoughCandles { got: 5, need: 22 });
        assert!(matches!(RobotError::classify(err), RobotError::Invariant(_)));

        let err = anyhow::anyhow!("something else");
        assert!(matches!(RobotError::classify(err), RobotError::Unexpected(_)));
    }

    #[test]
    fn config_errors_are_fatal() {
        let err = RobotError::classify(anyhow::Error::new(ConfigError::invalid_parameter(
            "maxLeverage",
            "must be positive",
        )));
        assert!(err.is_fatal());

        let err = RobotError::classify(anyhow::anyhow!("boom"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn classify_sees_through_context() {
        let err = anyhow::Error::new(VenueError::RateLimited("slow down".into()))
            .context("placing ladder");
        assert!(matches!(RobotError::classify(err), RobotError::Venue(_)));
    }
}
