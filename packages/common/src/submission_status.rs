#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a stored submission.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "PascalCase")]
pub enum SubmissionStatus {
    /// Waiting to be picked up by a worker.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Pending"))]
    Pending,
    /// A worker is running test cases.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Running"))]
    Running,
    /// Judging finished with a verdict.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Completed"))]
    Completed,
    /// Judging failed before a verdict could be produced.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Error"))]
    Error,
}

impl SubmissionStatus {
    /// Returns true once no further transition is allowed.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Whether moving from `self` to `next` respects the monotonic lifecycle.
    pub fn can_transition_to(&self, next: SubmissionStatus) -> bool {
        match self {
            Self::Pending => next != Self::Pending,
            Self::Running => next.is_final(),
            Self::Completed | Self::Error => false,
        }
    }

    pub const ALL: &'static [SubmissionStatus] =
        &[Self::Pending, Self::Running, Self::Completed, Self::Error];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Completed => "Completed",
            Self::Error => "Error",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for SubmissionStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Outcome classification of one execution or of a whole judging pass.
///
/// `Success` is the executor-level state for a normal exit whose output has not
/// been compared; it is also the terminal verdict of unjudged playground runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
pub enum Verdict {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Success"))]
    Success,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Accepted"))]
    Accepted,
    #[serde(rename = "Wrong Answer")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Wrong Answer"))]
    WrongAnswer,
    #[serde(rename = "Runtime Error")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Runtime Error"))]
    RuntimeError,
    #[serde(rename = "Compilation Error")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Compilation Error"))]
    CompilationError,
    #[serde(rename = "Time Limit Exceeded")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Time Limit Exceeded"))]
    TimeLimitExceeded,
    #[serde(rename = "Internal Error")]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Internal Error"))]
    InternalError,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "Error"))]
    Error,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    pub const ALL: &'static [Verdict] = &[
        Self::Success,
        Self::Accepted,
        Self::WrongAnswer,
        Self::RuntimeError,
        Self::CompilationError,
        Self::TimeLimitExceeded,
        Self::InternalError,
        Self::Error,
    ];

    /// Human-readable form, identical to the wire and database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Accepted => "Accepted",
            Self::WrongAnswer => "Wrong Answer",
            Self::RuntimeError => "Runtime Error",
            Self::CompilationError => "Compilation Error",
            Self::TimeLimitExceeded => "Time Limit Exceeded",
            Self::InternalError => "Internal Error",
            Self::Error => "Error",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an invalid status or verdict string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid: String,
    valid: Vec<&'static str>,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid value '{}'. Valid values: {}",
            self.invalid,
            self.valid.join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for SubmissionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|status| status.as_str() == s)
            .copied()
            .ok_or_else(|| ParseStatusError {
                invalid: s.to_string(),
                valid: Self::ALL.iter().map(|s| s.as_str()).collect(),
            })
    }
}

impl FromStr for Verdict {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|verdict| verdict.as_str() == s)
            .copied()
            .ok_or_else(|| ParseStatusError {
                invalid: s.to_string(),
                valid: Self::ALL.iter().map(|v| v.as_str()).collect(),
            })
    }
}
