//! Relay facade — public API consumed by the embedder.
//!
//! The embedder supplies visualization parameters; the relay owns the
//! rendering surfaces, translates parameter changes into protocol messages,
//! and holds the replies: the current error text and the SVG callback.

use std::sync::Arc;

use tokio::sync::mpsc;

use marble_types::SharedParams;

use crate::protocol::{HostMessage, SurfaceMessage};
use crate::surface::Surface;
use crate::types::{RelayError, SurfaceConfig, SurfaceEvent, SurfaceRole};

/// Channel capacity for surface replies. Two surfaces at most, a handful of
/// messages per run.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Callback invoked with the rendered SVG markup when the primary surface
/// reports readiness.
pub type SvgCallback = Box<dyn FnMut(&str) + Send>;

/// Owns the primary rendering surface and, once a solution has been shown,
/// the solution surface.
///
/// Mounting spawns the primary sandbox; the solution sandbox is spawned the
/// first time visualized parameters carry a solution and lives until
/// unmount. Surface handles are state-as-location: a surface that stopped is
/// removed from its slot.
pub struct Relay {
    config: SurfaceConfig,
    primary: Option<Surface>,
    solution: Option<Surface>,
    last_params: Option<SharedParams>,
    error: Option<String>,
    on_svg: SvgCallback,
    event_rx: mpsc::Receiver<SurfaceEvent>,
    event_tx: mpsc::Sender<SurfaceEvent>,
}

impl Relay {
    /// Mount the relay: spawn the primary sandbox and attach the reply
    /// listener. Construction IS initialization — there is no started flag.
    pub fn mount(config: SurfaceConfig, on_svg: SvgCallback) -> Result<Self, RelayError> {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let primary = Surface::spawn(SurfaceRole::Primary, &config, event_tx.clone())?;

        Ok(Self {
            config,
            primary: Some(primary),
            solution: None,
            last_params: None,
            error: None,
            on_svg,
            event_rx,
            event_tx,
        })
    }

    /// Supply the next parameter value.
    ///
    /// Values are compared by identity with the previous call; an unchanged
    /// `Arc` sends nothing. On change, `None` clears the primary surface and
    /// `Some` visualizes — fanning out to the solution surface only when the
    /// parameters carry a solution.
    pub async fn set_params(&mut self, params: Option<SharedParams>) -> Result<(), RelayError> {
        let changed = match (&self.last_params, &params) {
            (Some(prev), Some(next)) => !Arc::ptr_eq(prev, next),
            (None, None) => false,
            _ => true,
        };
        if !changed {
            return Ok(());
        }
        self.last_params.clone_from(&params);

        match params {
            None => self.send_to_primary(HostMessage::Clear).await,
            Some(params) => {
                let message = HostMessage::Visualize {
                    viz_params: (*params).clone(),
                };
                let solution_message = message.solution_variant();
                self.send_to_primary(message).await?;

                if let Some(solution_message) = solution_message {
                    if self.solution.is_none() {
                        self.solution = Some(Surface::spawn(
                            SurfaceRole::Solution,
                            &self.config,
                            self.event_tx.clone(),
                        )?);
                    }
                    if let Some(solution) = self.solution.as_ref() {
                        solution.send(solution_message).await?;
                    }
                }
                Ok(())
            }
        }
    }

    async fn send_to_primary(&self, message: HostMessage) -> Result<(), RelayError> {
        let Some(primary) = self.primary.as_ref() else {
            return Err(RelayError::Unmounted);
        };
        primary.send(message).await
    }

    /// Drain pending surface replies, up to `budget`.
    ///
    /// Non-blocking; returns the number of events handled. After unmount
    /// this is a no-op — delivered events update nothing.
    pub fn poll_events(&mut self, budget: usize) -> usize {
        if self.primary.is_none() && self.solution.is_none() {
            return 0;
        }
        let mut count = 0;
        while count < budget {
            match self.event_rx.try_recv() {
                Ok(event) => {
                    self.handle_event(event);
                    count += 1;
                }
                Err(mpsc::error::TryRecvError::Empty | mpsc::error::TryRecvError::Disconnected) => {
                    break;
                }
            }
        }
        count
    }

    fn handle_event(&mut self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::Reply { role, message } => match message {
                SurfaceMessage::Success => {
                    self.error = None;
                }
                SurfaceMessage::Error { error } => {
                    tracing::debug!(surface = role.label(), "sandbox reported error: {error}");
                    self.error = Some(error);
                }
                SurfaceMessage::SvgReady { svg } => {
                    if role == SurfaceRole::Primary {
                        (self.on_svg)(&svg);
                    } else {
                        tracing::trace!("solution surface settled; not forwarded");
                    }
                }
            },
            SurfaceEvent::Stopped { role, reason } => {
                // State-as-location: removal IS the state transition.
                tracing::info!(surface = role.label(), ?reason, "surface stopped");
                match role {
                    SurfaceRole::Primary => self.primary = None,
                    SurfaceRole::Solution => self.solution = None,
                }
            }
        }
    }

    /// The error text currently on display, if any.
    ///
    /// Set verbatim from the sandbox's error reply; cleared only by a
    /// success reply.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether the primary surface is alive.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.primary.is_some()
    }

    /// Unmount: detach the reply listener and stop both surfaces.
    pub async fn unmount(&mut self) {
        self.event_rx.close();
        if let Some(primary) = self.primary.take() {
            primary.shutdown().await;
        }
        if let Some(solution) = self.solution.take() {
            solution.shutdown().await;
        }
        self.last_params = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::surface::WriterCommand;
    use marble_types::VizParams;

    /// Relay with fake surfaces; outbound messages land in the returned
    /// receivers, replies are injected through the relay's own event sender.
    fn test_relay() -> (
        Relay,
        mpsc::Receiver<WriterCommand>,
        mpsc::Receiver<WriterCommand>,
        Arc<Mutex<Vec<String>>>,
    ) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (primary, primary_rx) = Surface::test_handle(SurfaceRole::Primary);
        let (solution, solution_rx) = Surface::test_handle(SurfaceRole::Solution);

        let svgs = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&svgs);
        let relay = Relay {
            config: serde_json::from_value(serde_json::json!({ "command": "marble-sandbox" }))
                .unwrap(),
            primary: Some(primary),
            solution: Some(solution),
            last_params: None,
            error: None,
            on_svg: Box::new(move |svg| sink.lock().unwrap().push(svg.to_string())),
            event_rx,
            event_tx,
        };
        (relay, primary_rx, solution_rx, svgs)
    }

    fn params(solution: Option<&str>) -> SharedParams {
        VizParams::new(5000, "interval(1000)", solution.map(String::from))
            .unwrap()
            .into_shared()
    }

    fn drain(rx: &mut mpsc::Receiver<WriterCommand>) -> Vec<HostMessage> {
        let mut out = Vec::new();
        while let Ok(cmd) = rx.try_recv() {
            if let WriterCommand::Send(message) = cmd {
                out.push(message);
            }
        }
        out
    }

    async fn reply(relay: &mut Relay, role: SurfaceRole, message: SurfaceMessage) {
        relay
            .event_tx
            .clone()
            .send(SurfaceEvent::Reply { role, message })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_one_message_per_identity_change() {
        let (mut relay, mut primary_rx, _solution_rx, _svgs) = test_relay();

        let first = params(None);
        relay.set_params(Some(Arc::clone(&first))).await.unwrap();
        assert_eq!(drain(&mut primary_rx).len(), 1);

        // Same Arc again: no message.
        relay.set_params(Some(Arc::clone(&first))).await.unwrap();
        assert!(drain(&mut primary_rx).is_empty());

        // Equal content, different identity: one message.
        relay.set_params(Some(params(None))).await.unwrap();
        assert_eq!(drain(&mut primary_rx).len(), 1);
    }

    #[tokio::test]
    async fn test_null_params_clear_primary() {
        let (mut relay, mut primary_rx, mut solution_rx, _svgs) = test_relay();

        relay.set_params(Some(params(Some("zip(a, b)")))).await.unwrap();
        drain(&mut primary_rx);
        drain(&mut solution_rx);

        relay.set_params(None).await.unwrap();
        let sent = drain(&mut primary_rx);
        assert_eq!(sent, vec![HostMessage::Clear]);
        assert!(
            drain(&mut solution_rx).is_empty(),
            "clear goes to the primary surface only"
        );

        // None again: identity unchanged, nothing sent.
        relay.set_params(None).await.unwrap();
        assert!(drain(&mut primary_rx).is_empty());
    }

    #[tokio::test]
    async fn test_initial_none_sends_nothing() {
        let (mut relay, mut primary_rx, _solution_rx, _svgs) = test_relay();
        relay.set_params(None).await.unwrap();
        assert!(drain(&mut primary_rx).is_empty());
    }

    #[tokio::test]
    async fn test_solution_fans_out_two_messages() {
        let (mut relay, mut primary_rx, mut solution_rx, _svgs) = test_relay();

        relay.set_params(Some(params(Some("zip(a, b)")))).await.unwrap();

        let to_primary = drain(&mut primary_rx);
        assert_eq!(to_primary.len(), 1);
        let HostMessage::Visualize { viz_params } = &to_primary[0] else {
            panic!("expected visualize, got {to_primary:?}");
        };
        assert_eq!(viz_params.code(), "interval(1000)");
        assert_eq!(viz_params.solution(), Some("zip(a, b)"));

        let to_solution = drain(&mut solution_rx);
        assert_eq!(to_solution.len(), 1);
        let HostMessage::Visualize { viz_params } = &to_solution[0] else {
            panic!("expected visualize, got {to_solution:?}");
        };
        assert_eq!(viz_params.code(), "zip(a, b)");
        assert!(viz_params.solution().is_none());
    }

    #[tokio::test]
    async fn test_without_solution_exactly_one_message() {
        let (mut relay, mut primary_rx, mut solution_rx, _svgs) = test_relay();

        relay.set_params(Some(params(None))).await.unwrap();

        assert_eq!(drain(&mut primary_rx).len(), 1);
        assert!(drain(&mut solution_rx).is_empty());
    }

    #[tokio::test]
    async fn test_error_reply_displayed_until_success() {
        let (mut relay, _primary_rx, _solution_rx, _svgs) = test_relay();

        reply(
            &mut relay,
            SurfaceRole::Primary,
            SurfaceMessage::Error {
                error: "Oh no...".to_string(),
            },
        )
        .await;
        relay.poll_events(16);
        assert_eq!(relay.error(), Some("Oh no..."));

        // A later error replaces the first.
        reply(
            &mut relay,
            SurfaceRole::Primary,
            SurfaceMessage::Error {
                error: "worse".to_string(),
            },
        )
        .await;
        relay.poll_events(16);
        assert_eq!(relay.error(), Some("worse"));

        reply(&mut relay, SurfaceRole::Primary, SurfaceMessage::Success).await;
        relay.poll_events(16);
        assert_eq!(relay.error(), None);
    }

    #[tokio::test]
    async fn test_svg_ready_invokes_callback_once() {
        let (mut relay, _primary_rx, _solution_rx, svgs) = test_relay();

        // Prior error state must not suppress the callback.
        reply(
            &mut relay,
            SurfaceRole::Primary,
            SurfaceMessage::Error {
                error: "Oh no...".to_string(),
            },
        )
        .await;
        reply(
            &mut relay,
            SurfaceRole::Primary,
            SurfaceMessage::SvgReady {
                svg: "<svg/>".to_string(),
            },
        )
        .await;
        relay.poll_events(16);

        assert_eq!(*svgs.lock().unwrap(), vec!["<svg/>".to_string()]);
        assert_eq!(relay.error(), Some("Oh no..."));
    }

    #[tokio::test]
    async fn test_solution_svg_not_forwarded() {
        let (mut relay, _primary_rx, _solution_rx, svgs) = test_relay();

        reply(
            &mut relay,
            SurfaceRole::Solution,
            SurfaceMessage::SvgReady {
                svg: "<svg/>".to_string(),
            },
        )
        .await;
        relay.poll_events(16);

        assert!(svgs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_solution_error_updates_shared_error() {
        let (mut relay, _primary_rx, _solution_rx, _svgs) = test_relay();

        reply(
            &mut relay,
            SurfaceRole::Solution,
            SurfaceMessage::Error {
                error: "solution broke".to_string(),
            },
        )
        .await;
        relay.poll_events(16);
        assert_eq!(relay.error(), Some("solution broke"));
    }

    #[tokio::test]
    async fn test_poll_respects_budget() {
        let (mut relay, _primary_rx, _solution_rx, _svgs) = test_relay();

        for _ in 0..5 {
            reply(&mut relay, SurfaceRole::Primary, SurfaceMessage::Success).await;
        }
        assert_eq!(relay.poll_events(3), 3);
        assert_eq!(relay.poll_events(16), 2);
        assert_eq!(relay.poll_events(16), 0);
    }

    #[tokio::test]
    async fn test_stopped_primary_unmounts() {
        let (mut relay, _primary_rx, _solution_rx, _svgs) = test_relay();
        assert!(relay.is_mounted());

        relay
            .event_tx
            .clone()
            .send(SurfaceEvent::Stopped {
                role: SurfaceRole::Primary,
                reason: crate::types::StopReason::Failed("crash".to_string()),
            })
            .await
            .unwrap();
        relay.poll_events(16);

        assert!(!relay.is_mounted());
        let err = relay.set_params(Some(params(None))).await.unwrap_err();
        assert!(matches!(err, RelayError::Unmounted));
    }

    #[tokio::test]
    async fn test_unmount_detaches_listener() {
        let (mut relay, _primary_rx, _solution_rx, svgs) = test_relay();
        let event_tx = relay.event_tx.clone();

        relay.unmount().await;
        assert!(!relay.is_mounted());

        // Events delivered after unmount update nothing.
        let _ = event_tx
            .try_send(SurfaceEvent::Reply {
                role: SurfaceRole::Primary,
                message: SurfaceMessage::SvgReady {
                    svg: "<svg/>".to_string(),
                },
            });
        assert_eq!(relay.poll_events(16), 0);
        assert!(svgs.lock().unwrap().is_empty());
        assert_eq!(relay.error(), None);
    }
}
