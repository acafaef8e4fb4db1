use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::Relaxed;
use std::time::Duration;

use async_broadcast::{broadcast, InactiveReceiver, Receiver, Sender};
use tokio::time::{interval, Instant, Interval, MissedTickBehavior};

use crate::config::MissionConfig;
use crate::mission::cooldown::CooldownGate;
use crate::mission::phase::{FlightPlan, MissionPhase};
use crate::types::{Pose, VehicleStatus};
use crate::{Result, Vehicle};

const EVENT_CAPACITY: usize = 64;
const PUBLISH_ERROR_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Notable moments of a mission run
///
/// Events carry the instant they happened at, read from the tokio clock.
#[derive(Debug, Clone, PartialEq)]
pub enum MissionEvent {
    /// The flight stack reported a connected autopilot, the warm-up stream starts
    Connected {
        /// When the connection was seen
        at: Instant,
    },
    /// Offboard mode was requested
    OffboardRequested {
        /// When the request completed
        at: Instant,
        /// Whether the autopilot accepted it
        accepted: bool,
    },
    /// Arming was requested
    ArmRequested {
        /// When the request completed
        at: Instant,
        /// Whether the autopilot accepted it
        accepted: bool,
    },
    /// The land mode was requested, this happens at most once
    LandRequested {
        /// When the request completed
        at: Instant,
        /// Whether the autopilot accepted it
        accepted: bool,
    },
    /// The mission moved to a new phase
    PhaseChanged {
        /// When the transition happened, also the start of the new phase
        at: Instant,
        /// Phase that ended
        from: MissionPhase,
        /// Phase that started
        to: MissionPhase,
    },
}

/// Summary returned when a mission run stops
#[derive(Debug, Clone, PartialEq)]
pub struct MissionReport {
    /// Phase reached
    pub phase: MissionPhase,
    /// Number of setpoints handed to the commander, warm-up included
    pub setpoints_published: u64,
    /// Time since the end of the warm-up, zero if the mission never started
    pub elapsed: Duration,
}

/// # The figure-8 mission
///
/// Drives a [Vehicle] through takeoff, one figure-8 loop and landing by streaming position setpoints at a fixed
/// rate. A run goes through three stages:
///  - wait for the flight stack to report a connected autopilot
///  - stream `warmup_setpoints` setpoints at the takeoff point, the autopilot refuses offboard mode without them
///  - the control loop: request offboard mode and arming (at most one request per `command_cooldown`, the land
///    request included), and once both are active advance the [FlightPlan] and publish its target
///
/// The run lasts until `stop` is set, or until the mission is complete if `exit_on_complete` is configured.
///
/// ``` no_run
/// # use std::sync::atomic::AtomicBool;
/// # use std::sync::Arc;
/// # use offboard_mission::{Mission, MissionConfig, Vehicle};
/// # async fn fly(link: Arc<dyn offboard_mission::FlightLink>) -> offboard_mission::Result<()> {
/// let vehicle = Vehicle::from_link(link);
/// let mission = Mission::new(MissionConfig { exit_on_complete: true, ..Default::default() })?;
///
/// let stop = AtomicBool::new(false);
/// let report = mission.run(&vehicle, &stop).await?;
/// println!("Mission ended in phase {}", report.phase);
///
/// vehicle.disconnect().await;
/// # Ok(())
/// # }
/// ```
pub struct Mission {
    config: MissionConfig,
    events: Sender<MissionEvent>,
    events_rx: InactiveReceiver<MissionEvent>,
}

/// Mutable state of one run
struct MissionContext {
    plan: FlightPlan,
    status: VehicleStatus,
    local_pose: Pose,
    mission_start: Option<Instant>,
    phase_start: Instant,
    command_gate: CooldownGate,
    progress_log: CooldownGate,
    publish_error_log: CooldownGate,
    setpoints_published: u64,
}

impl MissionContext {
    fn new(config: &MissionConfig, now: Instant) -> Self {
        Self {
            plan: FlightPlan::new(config),
            status: VehicleStatus::default(),
            local_pose: Pose::default(),
            mission_start: None,
            phase_start: now,
            command_gate: CooldownGate::started_at(config.command_interval(), now),
            progress_log: CooldownGate::new(config.progress_interval()),
            publish_error_log: CooldownGate::new(PUBLISH_ERROR_LOG_INTERVAL),
            setpoints_published: 0,
        }
    }

    fn start(&mut self, config: &MissionConfig, now: Instant) {
        self.mission_start = Some(now);
        self.phase_start = now;
        self.command_gate = CooldownGate::started_at(config.command_interval(), now);
    }

    fn ingest(&mut self, vehicle: &Vehicle) {
        self.status = vehicle.supervisor.status();
        self.local_pose = vehicle.localization.local_pose();
    }

    fn report(&self) -> MissionReport {
        MissionReport {
            phase: self.plan.phase(),
            setpoints_published: self.setpoints_published,
            elapsed: self
                .mission_start
                .map(|start| Instant::now().saturating_duration_since(start))
                .unwrap_or_default(),
        }
    }
}

impl Mission {
    /// Create a mission from a configuration
    ///
    /// Returns [Error::ConfigError](crate::Error::ConfigError) if the configuration is not valid.
    pub fn new(config: MissionConfig) -> Result<Self> {
        config.validate()?;

        let (mut events, events_rx) = broadcast(EVENT_CAPACITY);
        // Drop the oldest events rather than stalling the control loop on a slow subscriber
        events.set_overflow(true);

        Ok(Self {
            config,
            events,
            events_rx: events_rx.deactivate(),
        })
    }

    /// Mission configuration
    pub fn config(&self) -> &MissionConfig {
        &self.config
    }

    /// Subscribe to the events of the following runs
    ///
    /// Only events emitted after this call are received. If the receiver lags more than 64 events behind, the oldest
    /// ones are dropped.
    pub fn subscribe(&self) -> Receiver<MissionEvent> {
        self.events_rx.activate_cloned()
    }

    /// Fly the mission
    ///
    /// `stop` is checked once per loop iteration, setting it ends the run within one period. An error is only
    /// returned for problems outside of the flight itself: failed commands are logged and retried, failed
    /// setpoints are logged.
    pub async fn run(&self, vehicle: &Vehicle, stop: &AtomicBool) -> Result<MissionReport> {
        let mut ticker = interval(self.config.period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut ctx = MissionContext::new(&self.config, Instant::now());

        if !self.wait_connected(vehicle, stop, &mut ticker).await {
            return Ok(ctx.report());
        }
        if !self.warm_up(vehicle, &mut ctx, stop, &mut ticker).await {
            return Ok(ctx.report());
        }

        ctx.start(&self.config, Instant::now());
        log::info!(
            "Calculated duration for one full figure-8 loop: {:.2} seconds",
            ctx.plan.loop_duration().as_secs_f64()
        );

        while !stop.load(Relaxed) {
            ctx.ingest(vehicle);

            self.arbitrate_commands(vehicle, &mut ctx).await;

            if ctx.status.is_flying_offboard(&self.config.offboard_mode) {
                self.evaluate_phase(vehicle, &mut ctx).await;
            }

            if ctx.plan.should_publish() {
                self.publish(vehicle, &mut ctx).await;
            }

            if self.config.exit_on_complete && ctx.plan.phase() == MissionPhase::Complete {
                break;
            }

            ticker.tick().await;
        }

        Ok(ctx.report())
    }

    async fn wait_connected(&self, vehicle: &Vehicle, stop: &AtomicBool, ticker: &mut Interval) -> bool {
        while !vehicle.supervisor.is_connected() {
            if stop.load(Relaxed) {
                return false;
            }
            ticker.tick().await;
        }

        log::info!("Flight stack connected, starting figure-8 mission");
        self.emit(MissionEvent::Connected { at: Instant::now() });
        true
    }

    async fn warm_up(
        &self,
        vehicle: &Vehicle,
        ctx: &mut MissionContext,
        stop: &AtomicBool,
        ticker: &mut Interval,
    ) -> bool {
        for _ in 0..self.config.warmup_setpoints {
            if stop.load(Relaxed) {
                return false;
            }
            self.publish(vehicle, ctx).await;
            ticker.tick().await;
        }

        !stop.load(Relaxed)
    }

    /// Request offboard mode, then arming, sharing one cooldown window
    async fn arbitrate_commands(&self, vehicle: &Vehicle, ctx: &mut MissionContext) {
        let now = Instant::now();

        if ctx.status.mode != self.config.offboard_mode && ctx.command_gate.is_ready(now) {
            let result = vehicle.supervisor.set_mode(&self.config.offboard_mode).await;
            let accepted = command_outcome("Offboard mode", result);
            let now = Instant::now();

            if accepted {
                log::info!("Offboard enabled");
                ctx.phase_start = now;
            }
            ctx.command_gate.mark(now);
            self.emit(MissionEvent::OffboardRequested { at: now, accepted });
        } else if !ctx.status.armed && ctx.command_gate.is_ready(now) {
            let result = vehicle.supervisor.send_arming_request(true).await;
            let accepted = command_outcome("Arming", result);
            let now = Instant::now();

            if accepted {
                log::info!("Vehicle armed");
            }
            ctx.command_gate.mark(now);
            self.emit(MissionEvent::ArmRequested { at: now, accepted });
        }
    }

    async fn evaluate_phase(&self, vehicle: &Vehicle, ctx: &mut MissionContext) {
        let now = Instant::now();
        let time_in_phase = now.saturating_duration_since(ctx.phase_start);
        let step = ctx.plan.evaluate(time_in_phase);

        // One shot, the phase moves on whatever the answer
        if let Some(mode) = &step.request {
            let accepted = command_outcome("Land mode", vehicle.supervisor.set_mode(mode).await);
            let now = Instant::now();

            if accepted {
                log::info!("Phase {}: {} mode initiated", u8::from(ctx.plan.phase()), mode);
            }
            // Counts as a command: no offboard request may follow before the cooldown
            ctx.command_gate.mark(now);
            self.emit(MissionEvent::LandRequested { at: now, accepted });
        }

        match ctx.plan.apply(&step) {
            Some(previous) => {
                let now = Instant::now();
                ctx.phase_start = now;
                self.log_transition(ctx, previous);
                self.emit(MissionEvent::PhaseChanged {
                    at: now,
                    from: previous,
                    to: ctx.plan.phase(),
                });
            }
            None if ctx.plan.phase() == MissionPhase::Figure8 => {
                if ctx.progress_log.try_acquire(now) {
                    let target = ctx.plan.target();
                    let remaining = ctx.plan.loop_duration().saturating_sub(time_in_phase);
                    log::info!(
                        "Figure-8: x={:.1}, y={:.1}, vehicle at ({:.1}, {:.1}, {:.1}). Remaining time for one loop: {:.1} s",
                        target.x,
                        target.y,
                        ctx.local_pose.x,
                        ctx.local_pose.y,
                        ctx.local_pose.z,
                        remaining.as_secs_f64()
                    );
                }
            }
            None => (),
        }
    }

    fn log_transition(&self, ctx: &MissionContext, previous: MissionPhase) {
        let number = u8::from(previous);

        match ctx.plan.phase() {
            MissionPhase::Figure8 => log::info!(
                "Phase {} complete: reached {:.1} m. Starting single figure-8 loop",
                number,
                self.config.takeoff_altitude
            ),
            MissionPhase::Land => log::info!(
                "Phase {} complete: single figure-8 loop finished. Initiating landing",
                number
            ),
            MissionPhase::Complete => log::info!(
                "Mission complete after {:.1} s",
                ctx.report().elapsed.as_secs_f64()
            ),
            MissionPhase::Takeoff => (),
        }
    }

    async fn publish(&self, vehicle: &Vehicle, ctx: &mut MissionContext) {
        match vehicle.commander.setpoint_position(&ctx.plan.target()).await {
            Ok(()) => ctx.setpoints_published += 1,
            Err(e) => {
                if ctx.publish_error_log.try_acquire(Instant::now()) {
                    log::warn!("Failed to queue setpoint: {}", e);
                }
            }
        }
    }

    fn emit(&self, event: MissionEvent) {
        // Nobody listening or channel full in overflow mode, both are fine
        let _ = self.events.try_broadcast(event);
    }
}

fn command_outcome(what: &str, result: Result<bool>) -> bool {
    match result {
        Ok(true) => true,
        Ok(false) => {
            log::warn!("{} request rejected", what);
            false
        }
        Err(e) => {
            log::warn!("{} request failed: {}", what, e);
            false
        }
    }
}
