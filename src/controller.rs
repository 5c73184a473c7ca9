//! The task that owns the [`Session`].
//!
//! Transport events, operator actions and cooldown expiries are serialized
//! through one `select!` loop, so every session transition runs to
//! completion before the next one starts. After each transition the
//! controller publishes a fresh [`Snapshot`] on a `watch` channel.
//!
//! ```text
//!  transport ──TransportEvent──┐
//!                              ▼
//!  views ────UserAction────> Controller ──OutboundCommand──> transport
//!    ▲                         │
//!    └──────watch<Snapshot>────┘
//! ```

use crate::error::{ConsoleError, Result};
use crate::protocol::OutboundCommand;
use crate::session::{Effect, Event, ScheduledRelease, Session, Snapshot, TransportEvent, UserAction};
use crate::transport::{spawn_transport, TransportConfig};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

/// Capacity of the transport event and command channels.
const CHANNEL_CAPACITY: usize = 64;

/// Cloneable handle used by views to drive the controller.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    actions: mpsc::UnboundedSender<UserAction>,
    snapshots: watch::Receiver<Snapshot>,
}

impl ControllerHandle {
    /// Queue an operator action. Never blocks.
    pub fn send(&self, action: UserAction) -> Result<()> {
        self.actions
            .send(action)
            .map_err(|_| ConsoleError::ChannelClosed("controller"))
    }

    /// Most recently published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that is notified on every transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }
}

/// Owns the session and runs its event loop.
pub struct Controller {
    session: Session,
    transport_events: mpsc::Receiver<TransportEvent>,
    transport_open: bool,
    actions: mpsc::UnboundedReceiver<UserAction>,
    commands: mpsc::Sender<OutboundCommand>,
    snapshots: watch::Sender<Snapshot>,
    pending_release: Option<ScheduledRelease>,
}

impl Controller {
    /// Wire a controller to a transport's event and command channels.
    #[must_use]
    pub fn new(
        session: Session,
        transport_events: mpsc::Receiver<TransportEvent>,
        commands: mpsc::Sender<OutboundCommand>,
    ) -> (Self, ControllerHandle) {
        let (actions_tx, actions_rx) = mpsc::unbounded_channel();
        let (snapshots_tx, snapshots_rx) = watch::channel(session.snapshot());

        let controller = Self {
            session,
            transport_events,
            transport_open: true,
            actions: actions_rx,
            commands,
            snapshots: snapshots_tx,
            pending_release: None,
        };
        let handle = ControllerHandle {
            actions: actions_tx,
            snapshots: snapshots_rx,
        };
        (controller, handle)
    }

    /// Run until every [`ControllerHandle`] has been dropped.
    pub async fn run(mut self) {
        tracing::debug!("Controller started");

        loop {
            let release = self.pending_release;
            let release_at = release.map_or_else(Instant::now, |r| r.at);

            let event = tokio::select! {
                () = sleep_until(release_at), if release.is_some() => {
                    self.pending_release = None;
                    match release {
                        Some(release) => Event::CooldownElapsed(release.ticket),
                        None => continue,
                    }
                }
                event = self.transport_events.recv(), if self.transport_open => match event {
                    Some(event) => Event::Transport(event),
                    None => {
                        tracing::warn!("Transport stopped; console stays offline");
                        self.transport_open = false;
                        continue;
                    }
                },
                action = self.actions.recv() => match action {
                    Some(action) => Event::User(action),
                    None => break,
                },
            };

            self.apply(event);
        }

        tracing::debug!("Controller stopped");
    }

    /// Run one transition. Never waits on the transport: a command that does
    /// not fit in the channel is dropped, like one issued while offline.
    fn apply(&mut self, event: Event) {
        let effects = self.session.handle(event, Instant::now());

        for effect in effects {
            match effect {
                Effect::Send(command) => match self.commands.try_send(command) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::warn!(command = command.name(), "Transport busy; command dropped");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        tracing::warn!(command = command.name(), "Transport gone; command dropped");
                    }
                },
                Effect::ScheduleRelease(release) => {
                    tracing::debug!(ticket = ?release.ticket, "Calibration release armed");
                    self.pending_release = Some(release);
                }
            }
        }

        self.snapshots.send_replace(self.session.snapshot());
    }
}

/// A running console: controller and transport tasks plus the view handle.
pub struct Console {
    /// Handle for views.
    pub handle: ControllerHandle,
    /// Controller task.
    pub controller: JoinHandle<()>,
    /// Transport task.
    pub transport: JoinHandle<()>,
}

/// Spawn the transport and controller on the current runtime.
#[must_use]
pub fn spawn_console(session: Session, transport: TransportConfig) -> Console {
    let (events_tx, events_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (commands_tx, commands_rx) = mpsc::channel(CHANNEL_CAPACITY);

    let transport = spawn_transport(transport, events_tx, commands_rx);
    let (controller, handle) = Controller::new(session, events_rx, commands_tx);
    let controller = tokio::spawn(controller.run());

    Console {
        handle,
        controller,
        transport,
    }
}
