//! Focus/rest interval timer layered over the playback engine.
//!
//! Timers are deadlines owned by the scheduler rather than callbacks, so arming
//! a new timer simply overwrites the old one and a cancelled timer can never
//! fire late. The host calls [`IntervalScheduler::poll`] periodically; every due
//! event is then processed in time order.

use crate::audio_io::AudioBackend;
use crate::engine::NoiseEngine;
use crate::error::Result;
use crate::models::{format_remaining, NoiseVariant};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

const DISPLAY_TICK: Duration = Duration::from_secs(1);

pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Stopped,
    Focusing,
    Resting,
}

/// Phase changes performed by [`IntervalScheduler::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Focus timer elapsed, noise silenced for the rest phase
    RestStarted,
    /// Rest timer elapsed, noise resumed
    FocusResumed,
    /// Focus timer elapsed with no rest configured
    CycleRestarted,
    /// Noise could not be resumed after a rest
    Stopped,
}

pub struct IntervalScheduler<B: AudioBackend, C: Clock> {
    engine: NoiseEngine<B>,
    clock: C,
    phase: Phase,
    active_variant: Option<NoiseVariant>,
    focus_duration: Option<Duration>,
    rest_duration: Option<Duration>,
    time_remaining: Duration,
    phase_deadline: Option<Instant>,
    next_display_tick: Option<Instant>,
}

impl<B: AudioBackend, C: Clock> IntervalScheduler<B, C> {
    pub fn new(
        engine: NoiseEngine<B>,
        clock: C,
        focus_duration: Option<Duration>,
        rest_duration: Option<Duration>,
    ) -> Self {
        Self {
            engine,
            clock,
            phase: Phase::Stopped,
            active_variant: None,
            focus_duration: non_zero(focus_duration),
            rest_duration: non_zero(rest_duration),
            time_remaining: Duration::ZERO,
            phase_deadline: None,
            next_display_tick: None,
        }
    }

    /// Select `variant` and start a focus cycle.
    ///
    /// Selecting the variant that is already active does nothing. Selecting a
    /// new one while resting ends the rest early.
    pub fn activate(&mut self, variant: NoiseVariant) -> Result<()> {
        if self.active_variant == Some(variant) && self.phase != Phase::Stopped {
            return Ok(());
        }
        if let Err(e) = self.engine.play(variant) {
            self.reset();
            return Err(e);
        }
        self.active_variant = Some(variant);
        let now = self.clock.now();
        self.start_cycle(now);
        Ok(())
    }

    /// Turn the noise off and cancel every timer.
    pub fn deactivate(&mut self) {
        self.engine.stop();
        self.reset();
    }

    /// Exclusive selection: the active variant turns off, any other turns on.
    pub fn toggle(&mut self, variant: NoiseVariant) -> Result<()> {
        if self.active_variant == Some(variant) {
            self.deactivate();
            Ok(())
        } else {
            self.activate(variant)
        }
    }

    pub fn set_volume(&self, volume: f64) {
        self.engine.set_volume(volume as f32);
    }

    /// Restarts the focus timer from the full new duration when focusing.
    pub fn set_focus_duration(&mut self, duration: Option<Duration>) {
        self.focus_duration = non_zero(duration);
        if self.phase == Phase::Focusing {
            let now = self.clock.now();
            self.start_cycle(now);
        }
    }

    /// Takes effect at the next rest; a rest in progress keeps its length.
    pub fn set_rest_duration(&mut self, duration: Option<Duration>) {
        self.rest_duration = non_zero(duration);
    }

    /// Process every timer event that is due, oldest first.
    pub fn poll(&mut self) -> Vec<Transition> {
        let now = self.clock.now();
        let mut transitions = Vec::new();
        loop {
            let tick = self.next_display_tick.filter(|t| *t <= now);
            let deadline = self.phase_deadline.filter(|t| *t <= now);
            match (tick, deadline) {
                (None, None) => break,
                // Display ticks win ties so the countdown reaches zero first.
                (Some(t), Some(d)) if t <= d => self.display_tick(t),
                (Some(t), None) => self.display_tick(t),
                (_, Some(d)) => {
                    if let Some(transition) = self.phase_elapsed(d) {
                        transitions.push(transition);
                    }
                }
            }
        }
        transitions
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_playing(&self) -> bool {
        self.engine.is_playing()
    }

    pub fn is_resting(&self) -> bool {
        self.phase == Phase::Resting
    }

    pub fn time_remaining(&self) -> Duration {
        self.time_remaining
    }

    pub fn formatted_time_remaining(&self) -> String {
        format_remaining(self.time_remaining)
    }

    pub fn active_variant(&self) -> Option<NoiseVariant> {
        self.active_variant
    }

    pub fn has_cycle_timer(&self) -> bool {
        self.focus_duration.is_some()
    }

    pub fn focus_duration(&self) -> Option<Duration> {
        self.focus_duration
    }

    pub fn rest_duration(&self) -> Option<Duration> {
        self.rest_duration
    }

    pub fn engine(&self) -> &NoiseEngine<B> {
        &self.engine
    }

    fn start_cycle(&mut self, at: Instant) {
        self.phase = Phase::Focusing;
        match self.focus_duration {
            Some(focus) => {
                self.time_remaining = focus;
                self.phase_deadline = Some(at + focus);
                self.next_display_tick = Some(at + DISPLAY_TICK);
                log::debug!("Focus cycle armed for {}", format_remaining(focus));
            }
            None => {
                self.time_remaining = Duration::ZERO;
                self.phase_deadline = None;
                self.next_display_tick = None;
            }
        }
    }

    /// Countdown only; never changes phase.
    fn display_tick(&mut self, at: Instant) {
        self.time_remaining = self.time_remaining.saturating_sub(DISPLAY_TICK);
        self.next_display_tick = Some(at + DISPLAY_TICK);
    }

    fn phase_elapsed(&mut self, at: Instant) -> Option<Transition> {
        self.phase_deadline = None;
        match self.phase {
            Phase::Focusing => match self.rest_duration {
                Some(rest) => {
                    self.engine.stop();
                    self.phase = Phase::Resting;
                    self.time_remaining = rest;
                    self.phase_deadline = Some(at + rest);
                    log::info!("Focus cycle complete, resting for {}", format_remaining(rest));
                    Some(Transition::RestStarted)
                }
                None => {
                    self.start_cycle(at);
                    log::info!("Focus cycle complete, starting next cycle");
                    Some(Transition::CycleRestarted)
                }
            },
            Phase::Resting => {
                let Some(variant) = self.active_variant else {
                    self.reset();
                    return Some(Transition::Stopped);
                };
                match self.engine.play(variant) {
                    Ok(()) => {
                        self.start_cycle(at);
                        log::info!("Rest complete, resuming {} noise", variant);
                        Some(Transition::FocusResumed)
                    }
                    Err(e) => {
                        log::warn!("Could not resume noise after rest: {e}");
                        self.reset();
                        Some(Transition::Stopped)
                    }
                }
            }
            Phase::Stopped => None,
        }
    }

    fn reset(&mut self) {
        self.phase = Phase::Stopped;
        self.active_variant = None;
        self.time_remaining = Duration::ZERO;
        self.phase_deadline = None;
        self.next_display_tick = None;
    }
}

/// A zero-length phase is treated as no timer at all.
fn non_zero(duration: Option<Duration>) -> Option<Duration> {
    duration.filter(|d| !d.is_zero())
}
