//! Sensor Sink (receiver role)
//!
//! Connection state machine, advanced one transition per tick:
//!
//! ```text
//! SCANNING ─► DISCOVERED ─► NAME_CHECKED ─► CONNECTED ─► ATTRS_DISCOVERED
//!    ▲             │              │             │               │
//!    │◄── wrong ───┘              │             │               ▼
//!    │    name/service            │             │        SUBSCRIBING (field 0..n)
//!    │◄── connect failed ─────────┘             │               │
//!    │◄── discovery failed (disconnect) ────────┘               │
//!    │◄── field missing / not subscribable / refused ───────────┤
//!    │                                                          ▼
//!    └───────────── link lost ◄──────────────────────────── STREAMING
//! ```
//!
//! Validation is fail-closed: the receiver streams only after every
//! registry field has been found and subscribed. Any failure disconnects and
//! starts over from scanning, with no retry counter.

use crate::domain::mirror::Mirror;
use crate::domain::models::{
    Advertisement, BdAddr, MessageSeverity, SinkEvent, SinkPhase, StatusMessage,
};
use crate::domain::registry::{FieldKey, ServiceSpec};
use crate::error::Result;
use crate::infrastructure::bluetooth::connection::BleConnection;
use crate::infrastructure::bluetooth::link::CentralLink;
use crate::infrastructure::bluetooth::protocol;
use crate::infrastructure::bluetooth::scanner::BleScanner;
use crate::presentation::terminal::{OperatorCommand, PrintMode};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
enum SinkState {
    Idle,
    Scanning,
    Discovered(Advertisement),
    NameChecked(Advertisement),
    Connected(BdAddr),
    AttributesDiscovered(BdAddr),
    /// `next` indexes the registry field to validate next
    Subscribing { peer: BdAddr, next: usize },
    Streaming(BdAddr),
    Halted,
}

impl SinkState {
    fn phase(&self) -> SinkPhase {
        match self {
            Self::Idle => SinkPhase::Idle,
            Self::Scanning => SinkPhase::Scanning,
            Self::Discovered(_) => SinkPhase::Discovered,
            Self::NameChecked(_) => SinkPhase::NameChecked,
            Self::Connected(_) => SinkPhase::Connected,
            Self::AttributesDiscovered(_) => SinkPhase::AttributesDiscovered,
            Self::Subscribing { .. } => SinkPhase::Subscribing,
            Self::Streaming(_) => SinkPhase::Streaming,
            Self::Halted => SinkPhase::Halted,
        }
    }
}

pub struct SensorSink<C> {
    link: C,
    scanner: BleScanner,
    state: SinkState,
    mirror: Mirror,
    print_mode: PrintMode,
    poll_delay: Duration,
    last_poll: Option<Instant>,
    event_sender: mpsc::UnboundedSender<SinkEvent>,
    commands: mpsc::UnboundedReceiver<OperatorCommand>,
}

impl<C: CentralLink> SensorSink<C> {
    pub fn new(
        link: C,
        expected: ServiceSpec,
        poll_delay: Duration,
        event_sender: mpsc::UnboundedSender<SinkEvent>,
        commands: mpsc::UnboundedReceiver<OperatorCommand>,
    ) -> Self {
        Self {
            link,
            scanner: BleScanner::new(expected),
            state: SinkState::Idle,
            mirror: Mirror::default(),
            print_mode: PrintMode::default(),
            poll_delay,
            last_poll: None,
            event_sender,
            commands,
        }
    }

    pub fn with_print_mode(mut self, print_mode: PrintMode) -> Self {
        self.print_mode = print_mode;
        self
    }

    /// Start the radio stack and begin scanning. A stack failure halts the
    /// role.
    pub fn start(&mut self) -> Result<()> {
        if let Err(e) = self.link.begin() {
            error!("Starting BLE module failed! {}", e);
            self.send_log(format!("Receiver halted: {e}"), MessageSeverity::Error);
            self.set_state(SinkState::Halted);
            return Err(e.into());
        }
        info!("***Started BLE module***");
        self.restart_scan();
        Ok(())
    }

    /// Run one step of the state machine
    pub fn tick(&mut self) -> SinkPhase {
        let next = match self.state.clone() {
            SinkState::Idle | SinkState::Halted => None,
            SinkState::Scanning => self
                .scanner
                .poll(&mut self.link)
                .map(SinkState::Discovered),
            SinkState::Discovered(candidate) => {
                if self.scanner.matches(&candidate) {
                    Some(SinkState::NameChecked(candidate))
                } else {
                    Some(SinkState::Scanning)
                }
            }
            SinkState::NameChecked(candidate) => {
                self.link.stop_scan();
                match BleConnection::connect(&mut self.link, &candidate) {
                    Ok(()) => Some(SinkState::Connected(candidate.address)),
                    Err(_) => {
                        self.restart_scan();
                        return self.phase();
                    }
                }
            }
            SinkState::Connected(peer) => match BleConnection::discover(&mut self.link) {
                Ok(()) => Some(SinkState::AttributesDiscovered(peer)),
                Err(_) => {
                    self.abandon(peer);
                    return self.phase();
                }
            },
            SinkState::AttributesDiscovered(peer) => Some(SinkState::Subscribing { peer, next: 0 }),
            SinkState::Subscribing { peer, next } => match FieldKey::ALL.get(next) {
                None => {
                    info!("All {} fields subscribed, streaming", FieldKey::ALL.len());
                    self.send_log("Controller connected".into(), MessageSeverity::Success);
                    self.mirror = Mirror::default();
                    Some(SinkState::Streaming(peer))
                }
                Some(key) => match BleConnection::validate_and_subscribe(&mut self.link, *key) {
                    Ok(()) => Some(SinkState::Subscribing {
                        peer,
                        next: next + 1,
                    }),
                    Err(rejection) => {
                        self.send_log(rejection.to_string(), MessageSeverity::Warning);
                        self.abandon(peer);
                        return self.phase();
                    }
                },
            },
            SinkState::Streaming(peer) => {
                if self.link.connected() {
                    self.stream();
                    None
                } else {
                    info!("***Peripheral device {} disconnected***", peer);
                    let _ = self.event_sender.send(SinkEvent::Disconnected);
                    self.restart_scan();
                    return self.phase();
                }
            }
        };

        if let Some(state) = next {
            self.set_state(state);
        }
        self.phase()
    }

    /// One streaming iteration, skipped until the poll delay has elapsed
    fn stream(&mut self) {
        let now = Instant::now();
        if let Some(last) = self.last_poll {
            if now.duration_since(last) < self.poll_delay {
                return;
            }
        }
        self.last_poll = Some(now);

        for key in FieldKey::ALL {
            let Some(bytes) = self.link.take_update(key.uuid()) else {
                continue;
            };
            match protocol::decode(key.kind(), &bytes) {
                Ok(value) => {
                    if self.mirror.apply(key, value) {
                        let _ = self.event_sender.send(SinkEvent::FieldUpdated(key, value));
                    }
                }
                // keep the stale value
                Err(e) => warn!("Dropping {} update: {}", key.spec().label, e),
            }
        }

        while let Ok(command) = self.commands.try_recv() {
            debug!("Operator command {:?}", command);
            self.print_mode.apply(command);
        }

        let line = self.print_mode.render(&self.mirror);
        let _ = self.event_sender.send(SinkEvent::Telemetry(line));
    }

    /// Drop the current candidate and go back to scanning
    fn abandon(&mut self, peer: BdAddr) {
        warn!("Abandoning peripheral {}", peer);
        self.link.disconnect();
        self.restart_scan();
    }

    fn restart_scan(&mut self) {
        if let Err(e) = self.scanner.start(&mut self.link) {
            // next abandon or disconnect restarts it
            error!("Failed to start scanning: {}", e);
        }
        self.set_state(SinkState::Scanning);
    }

    fn set_state(&mut self, state: SinkState) {
        let (old, new) = (self.state.phase(), state.phase());
        self.state = state;
        if old != new {
            debug!("Receiver {} -> {}", old, new);
            let _ = self.event_sender.send(SinkEvent::PhaseChanged(new));
        }
    }

    fn send_log(&self, message: String, severity: MessageSeverity) {
        let _ = self
            .event_sender
            .send(SinkEvent::LogMessage(StatusMessage { message, severity }));
    }

    pub fn phase(&self) -> SinkPhase {
        self.state.phase()
    }

    /// Last values received; stale if the link has gone quiet
    pub fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    pub fn print_mode(&self) -> PrintMode {
        self.print_mode
    }
}
