//! Visualization relay for sandboxed rendering surfaces.
//!
//! The embedder hands the relay a set of visualization parameters; the relay
//! forwards them to one or two sandbox processes over a framed JSON protocol
//! and surfaces their replies: an error string, or the finished SVG diagram.

pub mod codec;
pub mod protocol;
pub mod types;

pub(crate) mod surface;

mod relay;

pub use protocol::{HostMessage, SurfaceMessage};
pub use relay::{Relay, SvgCallback};
pub use types::{RelayError, StopReason, SurfaceConfig, SurfaceEvent, SurfaceRole};
