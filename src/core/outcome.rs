//! Operation outcomes.
//!
//! Every administrative operation reports a message and a [`Status`]
//! instead of aborting, so a batch caller can keep going after a failure.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

/// Completion status of an operation. The discriminant is the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success = 0,
    PartialSuccess = 1,
    Failure = 2,
}

impl Status {
    /// Process exit code for this status.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// The worse of two statuses.
    pub fn worst(self, other: Status) -> Status {
        self.max(other)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Success => "success",
            Status::PartialSuccess => "partial",
            Status::Failure => "failure",
        };
        f.write_str(s)
    }
}

/// Message plus status returned by every operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub message: String,
    pub status: Status,
}

impl Outcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: Status::Success,
        }
    }

    pub fn partial(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: Status::PartialSuccess,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: Status::Failure,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Fold a fallible operation into an outcome; errors become failures.
    pub fn from_result(result: Result<Outcome>) -> Self {
        result.unwrap_or_else(Outcome::from)
    }
}

impl From<Error> for Outcome {
    fn from(err: Error) -> Self {
        Outcome::failure(err.to_string())
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
