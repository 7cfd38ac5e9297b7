//! Visualization parameters supplied by the embedder.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parameters shared by identity.
///
/// The relay compares successive values by pointer identity, never by
/// content, so embedders replace the whole value rather than mutating it.
pub type SharedParams = Arc<VizParams>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VizParamsError {
    #[error("time window must be positive")]
    ZeroTimeWindow,
    #[error("code must not be empty")]
    EmptyCode,
}

/// The bundle sent to a rendering surface: a time budget in milliseconds,
/// the code to run, and an optional reference solution.
///
/// Field names on the wire are camelCase (`timeWindow`), matching the
/// sandbox protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawVizParams", rename_all = "camelCase")]
pub struct VizParams {
    time_window: u64,
    code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    solution: Option<String>,
}

/// Unvalidated mirror used as the deserialization boundary.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVizParams {
    time_window: u64,
    code: String,
    #[serde(default)]
    solution: Option<String>,
}

impl TryFrom<RawVizParams> for VizParams {
    type Error = VizParamsError;

    fn try_from(raw: RawVizParams) -> Result<Self, Self::Error> {
        Self::new(raw.time_window, raw.code, raw.solution)
    }
}

impl VizParams {
    /// Construct validated parameters.
    ///
    /// This is the single construction path; deserialization funnels
    /// through it via `try_from`.
    pub fn new(
        time_window: u64,
        code: impl Into<String>,
        solution: Option<String>,
    ) -> Result<Self, VizParamsError> {
        let code = code.into();
        if time_window == 0 {
            return Err(VizParamsError::ZeroTimeWindow);
        }
        if code.trim().is_empty() {
            return Err(VizParamsError::EmptyCode);
        }
        Ok(Self {
            time_window,
            code,
            solution,
        })
    }

    /// Time budget for the visualization, in milliseconds.
    #[must_use]
    pub fn time_window(&self) -> u64 {
        self.time_window
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub fn solution(&self) -> Option<&str> {
        self.solution.as_deref()
    }

    /// The variant sent to the solution surface: same time window, `code`
    /// replaced by the solution text, solution field dropped.
    ///
    /// Returns `None` when there is no solution to show.
    #[must_use]
    pub fn solution_variant(&self) -> Option<Self> {
        let solution = self.solution.as_ref()?;
        Some(Self {
            time_window: self.time_window,
            code: solution.clone(),
            solution: None,
        })
    }

    /// Wrap in an [`Arc`] for identity-compared sharing.
    #[must_use]
    pub fn into_shared(self) -> SharedParams {
        Arc::new(self)
    }
}
