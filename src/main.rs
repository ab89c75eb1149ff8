use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use vr_handheld_link::application::{SensorSink, SensorSource};
use vr_handheld_link::domain::models::{
    BdAddr, MessageSeverity, SinkEvent, SinkPhase, SourcePhase,
};
use vr_handheld_link::domain::settings::{Settings, SettingsService};
use vr_handheld_link::infrastructure::bluetooth::SimRadio;
use vr_handheld_link::infrastructure::imu::{SimulatedButton, SimulatedImu};
use vr_handheld_link::infrastructure::logging;
use vr_handheld_link::presentation::terminal::OperatorCommand;

const TICK_INTERVAL: Duration = Duration::from_millis(1);

fn main() -> anyhow::Result<()> {
    let settings = SettingsService::new()
        .map(|service| service.get().clone())
        .unwrap_or_else(|e| {
            eprintln!("Failed to load settings, using defaults: {}", e);
            Settings::default()
        });

    let _logging_guard = logging::init_logger(&settings.log_settings)
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    info!("Starting VR handheld link");

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    rt.block_on(async move {
        if settings.source.startup_delay_ms > 0 {
            info!("Waiting {} ms before start", settings.source.startup_delay_ms);
            tokio::time::sleep(Duration::from_millis(settings.source.startup_delay_ms)).await;
        }

        let radio = SimRadio::new();
        let mut source = SensorSource::new(
            radio.peripheral(BdAddr(settings.simulation.controller_address)),
            SimulatedImu::new(&settings.simulation),
            SimulatedButton::new(&settings.simulation),
            settings.link.service_spec(),
        );

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let mut sink = SensorSink::new(
            radio.central(),
            settings.link.service_spec(),
            Duration::from_millis(settings.sink.poll_delay_ms),
            event_tx,
            command_rx,
        )
        .with_print_mode(settings.sink.print_mode);

        // A failed start leaves the role halted; its ticks become no-ops
        if let Err(e) = source.start() {
            error!("Controller failed to start: {}", e);
        }
        if let Err(e) = sink.start() {
            error!("Receiver failed to start: {}", e);
        }

        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                for command in line.chars().filter_map(OperatorCommand::from_char) {
                    if command_tx.send(command).is_err() {
                        return;
                    }
                }
            }
        });

        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut halted_reported = false;
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let source_phase = source.tick();
                    let sink_phase = sink.tick();
                    if !halted_reported
                        && (source_phase == SourcePhase::Halted || sink_phase == SinkPhase::Halted)
                    {
                        error!("Halted (controller {:?}, receiver {})", source_phase, sink_phase);
                        halted_reported = true;
                    }
                }
                Some(event) = event_rx.recv() => match event {
                    SinkEvent::Telemetry(line) => println!("{}", line),
                    SinkEvent::PhaseChanged(phase) => info!("Receiver phase {}", phase),
                    SinkEvent::FieldUpdated(key, value) => {
                        tracing::trace!("{:?} = {:?}", key, value)
                    }
                    SinkEvent::Disconnected => warn!("Controller disconnected"),
                    SinkEvent::LogMessage(status) => match status.severity {
                        MessageSeverity::Error => error!("{}", status.message),
                        MessageSeverity::Warning => warn!("{}", status.message),
                        MessageSeverity::Success => info!("{}", status.message),
                    },
                },
                _ = &mut shutdown => {
                    info!("Shutting down");
                    break;
                }
            }
        }
    });

    Ok(())
}
