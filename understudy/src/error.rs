// vim: tw=80
//! Error types.

use std::sync::Arc;

use thiserror::Error;

use crate::{
    invocation::{listing, Invocation},
    verify::VerificationReport
};

/// Everything that can go wrong when stubbing or verifying.
#[derive(Debug, Error)]
pub enum Error {
    /// A verification's mode was not satisfied.
    #[error("{0}")]
    VerificationFailure(Box<VerificationReport>),

    /// `verify_no_more_interactions` found calls that no verification
    /// accounted for.
    #[error("No more interactions wanted, but found unverified \
             interactions:\n{}", listing(.invocations))]
    UnverifiedInteractions { invocations: Vec<Arc<Invocation>> },

    /// `verify_zero_interactions` found calls.
    #[error("No interactions wanted, but found:\n{}", listing(.invocations))]
    UnexpectedInteraction { invocations: Vec<Arc<Invocation>> },

    /// A stubbing could not be set up as written.
    #[error("Misconfigured stubbing: {0}")]
    StubbingConfiguration(String),

    /// The requested mock or method does not exist.
    #[error("Unsupported mock target: {0}")]
    UnsupportedMockTarget(String),

    /// `InOrder::verify` was given a mock that its session does not cover.
    #[error("{mock} is not part of this in-order verification")]
    NotInSession { mock: String },
}

impl Error {
    /// The failure report, if this is a verification failure.
    pub fn report(&self) -> Option<&VerificationReport> {
        match self {
            Error::VerificationFailure(report) => Some(report),
            _ => None
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
