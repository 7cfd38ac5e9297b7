//! Public types consumed by embedders of the relay.

use serde::Deserialize;

use crate::protocol::SurfaceMessage;

/// Configuration for a sandbox rendering surface.
///
/// The sandbox is an opaque collaborator: an executable that reads host
/// messages on stdin and writes replies on stdout, both as framed JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct SurfaceConfig {
    /// Executable command (e.g. "marble-sandbox").
    pub command: String,
    /// Arguments to pass to the command.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Which rendering surface a message concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceRole {
    /// Runs the user's code.
    Primary,
    /// Runs the reference solution, when one is present.
    Solution,
}

impl SurfaceRole {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Solution => "solution",
        }
    }
}

/// An event emitted by a surface's background tasks.
#[derive(Debug)]
pub enum SurfaceEvent {
    /// The surface sent a protocol reply.
    Reply {
        role: SurfaceRole,
        message: SurfaceMessage,
    },
    /// The surface process is gone.
    Stopped { role: SurfaceRole, reason: StopReason },
}

/// Why a surface stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Clean exit: the sandbox closed its stdout.
    Exited,
    /// Read failure or crash.
    Failed(String),
}

/// Errors surfaced across the relay's public boundary.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("sandbox command '{command}' not found in PATH")]
    CommandNotFound {
        command: String,
        #[source]
        source: which::Error,
    },

    #[error("failed to spawn sandbox '{command}'")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("sandbox '{command}' exposed no {stream} pipe")]
    MissingPipe {
        command: String,
        stream: &'static str,
    },

    #[error("surface writer channel closed")]
    ChannelClosed,

    #[error("relay is not mounted")]
    Unmounted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_config_defaults_args() {
        let config: SurfaceConfig =
            serde_json::from_value(serde_json::json!({ "command": "marble-sandbox" })).unwrap();
        assert_eq!(config.command, "marble-sandbox");
        assert!(config.args.is_empty());
    }

    #[test]
    fn test_surface_config_with_args() {
        let config: SurfaceConfig = serde_json::from_value(serde_json::json!({
            "command": "node",
            "args": ["sandbox.js", "--headless"]
        }))
        .unwrap();
        assert_eq!(config.args, vec!["sandbox.js", "--headless"]);
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(SurfaceRole::Primary.label(), "primary");
        assert_eq!(SurfaceRole::Solution.label(), "solution");
    }
}
