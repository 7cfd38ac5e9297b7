//! Wire messages exchanged with a sandbox surface.
//!
//! Both directions use a tagged union with an external `type` tag in
//! kebab-case and camelCase field names, e.g.
//! `{"type":"visualize","vizParams":{"timeWindow":5000,"code":"..."}}`.

use marble_types::VizParams;
use serde::{Deserialize, Serialize};

/// Messages the host sends to a surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HostMessage {
    /// Run the supplied parameters and render a diagram.
    Visualize {
        #[serde(rename = "vizParams")]
        viz_params: VizParams,
    },
    /// Blank the surface.
    Clear,
}

impl HostMessage {
    /// The message for the solution surface: `code` replaced by the
    /// reference solution. `None` when this message carries no solution.
    #[must_use]
    pub fn solution_variant(&self) -> Option<Self> {
        match self {
            Self::Visualize { viz_params } => {
                viz_params.solution_variant().map(|variant| Self::Visualize {
                    viz_params: variant,
                })
            }
            Self::Clear => None,
        }
    }
}

/// Replies a surface sends to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SurfaceMessage {
    /// The user code ran without failing.
    Success,
    /// The user code failed; `error` is displayed verbatim.
    Error { error: String },
    /// The rendered diagram settled.
    SvgReady { svg: String },
}
