use crate::audio_io::AudioBackend;
use crate::command::Command;
use crate::engine::NoiseEngine;
use crate::launch::LaunchAtLogin;
use crate::models::{format_remaining, CycleDuration, NoiseVariant, RestDuration};
use crate::scheduler::{Clock, IntervalScheduler, Transition};
use crate::settings::{Settings, SettingsStore};
use std::fmt;
use std::time::Duration;

/// Snapshot of everything a display layer shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub active_variant: Option<NoiseVariant>,
    pub is_playing: bool,
    pub is_resting: bool,
    pub time_remaining: Duration,
    /// Countdown is only meaningful with a finite focus length
    pub has_cycle_timer: bool,
    pub volume: f64,
    pub focus_duration: CycleDuration,
    pub rest_duration: RestDuration,
    pub launch_at_login: bool,
}

impl Status {
    pub fn shows_countdown(&self) -> bool {
        self.active_variant.is_some() && self.has_cycle_timer && !self.time_remaining.is_zero()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.active_variant {
            Some(variant) if self.is_resting => write!(f, "{variant} noise (resting)")?,
            Some(variant) if self.is_playing => write!(f, "{variant} noise playing")?,
            Some(variant) => write!(f, "{variant} noise selected, not playing")?,
            None => f.write_str("noise off")?,
        }
        write!(
            f,
            " | volume {:.0}% | focus {} | rest {}",
            self.volume * 100.0,
            self.focus_duration.display_name(),
            self.rest_duration.display_name()
        )?;
        if self.shows_countdown() {
            let label = if self.is_resting { "Rest" } else { "Focus" };
            write!(f, " | {label} {}", format_remaining(self.time_remaining))?;
        }
        Ok(())
    }
}

/// Ties the scheduler to persisted settings and the login-item hook.
pub struct NoiseApp<B, C, S, L>
where
    B: AudioBackend,
    C: Clock,
    S: SettingsStore,
    L: LaunchAtLogin,
{
    scheduler: IntervalScheduler<B, C>,
    settings: Settings,
    store: S,
    launch_agent: L,
}

impl<B, C, S, L> NoiseApp<B, C, S, L>
where
    B: AudioBackend,
    C: Clock,
    S: SettingsStore,
    L: LaunchAtLogin,
{
    /// Load settings and resume the saved noise, if any.
    pub fn new(engine: NoiseEngine<B>, clock: C, store: S, launch_agent: L) -> Self {
        let settings = store.load().unwrap_or_else(|e| {
            log::warn!("Failed to load settings, using defaults: {e}");
            Settings::default()
        });
        Self::with_settings(engine, clock, settings, store, launch_agent)
    }

    pub fn with_settings(
        engine: NoiseEngine<B>,
        clock: C,
        mut settings: Settings,
        store: S,
        launch_agent: L,
    ) -> Self {
        let mut scheduler = IntervalScheduler::new(
            engine,
            clock,
            settings.focus_duration.duration(),
            settings.rest_duration.duration(),
        );
        scheduler.set_volume(settings.volume);
        if let Some(variant) = settings.active_variant {
            if scheduler.activate(variant).is_err() {
                settings.active_variant = None;
            }
        }
        Self {
            scheduler,
            settings,
            store,
            launch_agent,
        }
    }

    pub fn toggle_noise(&mut self, variant: NoiseVariant) {
        // Start failures are already logged by the engine; the noise just stays off.
        let _ = self.scheduler.toggle(variant);
        self.sync_variant();
    }

    pub fn turn_off(&mut self) {
        self.scheduler.deactivate();
        self.sync_variant();
    }

    pub fn set_volume(&mut self, volume: f64) {
        let volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        self.scheduler.set_volume(volume);
        self.settings.volume = volume;
        self.save();
    }

    pub fn set_focus_duration(&mut self, duration: CycleDuration) {
        self.settings.focus_duration = duration;
        self.save();
        self.scheduler.set_focus_duration(duration.duration());
    }

    pub fn set_rest_duration(&mut self, duration: RestDuration) {
        self.settings.rest_duration = duration;
        self.save();
        self.scheduler.set_rest_duration(duration.duration());
    }

    pub fn set_launch_at_login(&mut self, enabled: bool) {
        self.settings.launch_at_login = enabled;
        if let Err(e) = self.launch_agent.register(enabled) {
            log::error!("Failed to update launch at login: {e}");
        }
        self.save();
    }

    /// Apply a state-changing command; display-only commands are ignored.
    pub fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Toggle(variant) => self.toggle_noise(variant),
            Command::Off => self.turn_off(),
            Command::SetVolume(v) => self.set_volume(v),
            Command::SetFocus(d) => self.set_focus_duration(d),
            Command::SetRest(d) => self.set_rest_duration(d),
            Command::SetLaunchAtLogin(enabled) => self.set_launch_at_login(enabled),
            Command::Status | Command::Help | Command::Quit => {}
        }
    }

    /// Drive the interval timers. Call regularly from the control loop.
    pub fn poll(&mut self) -> Vec<Transition> {
        let transitions = self.scheduler.poll();
        if transitions.contains(&Transition::Stopped) {
            self.sync_variant();
        }
        transitions
    }

    pub fn status(&self) -> Status {
        Status {
            active_variant: self.scheduler.active_variant(),
            is_playing: self.scheduler.is_playing(),
            is_resting: self.scheduler.is_resting(),
            time_remaining: self.scheduler.time_remaining(),
            has_cycle_timer: self.scheduler.has_cycle_timer(),
            volume: self.settings.volume,
            focus_duration: self.settings.focus_duration,
            rest_duration: self.settings.rest_duration,
            launch_at_login: self.settings.launch_at_login,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn scheduler(&self) -> &IntervalScheduler<B, C> {
        &self.scheduler
    }

    fn sync_variant(&mut self) {
        self.settings.active_variant = self.scheduler.active_variant();
        self.save();
    }

    fn save(&self) {
        if let Err(e) = self.store.save(&self.settings) {
            log::error!("Failed to save settings: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_io::testing::RecordingBackend;
    use crate::error::{Error, Result};
    use crate::generator::NoiseGenerator;
    use crate::scheduler::ManualClock;
    use crate::settings::MemoryStore;

    #[derive(Default)]
    struct FailingLaunchAgent {
        calls: Vec<bool>,
    }

    impl LaunchAtLogin for FailingLaunchAgent {
        fn register(&mut self, enabled: bool) -> Result<()> {
            self.calls.push(enabled);
            Err(Error::LaunchAtLoginRegistration("not permitted".to_string()))
        }
    }

    type TestApp = NoiseApp<RecordingBackend, ManualClock, MemoryStore, FailingLaunchAgent>;

    fn app(settings: Settings) -> (TestApp, RecordingBackend, ManualClock, MemoryStore) {
        let backend = RecordingBackend::default();
        let clock = ManualClock::new();
        let store = MemoryStore::with_settings(settings);
        let engine = NoiseEngine::with_generator(backend.clone(), NoiseGenerator::seeded(21));
        let app = NoiseApp::new(engine, clock.clone(), store.clone(), FailingLaunchAgent::default());
        (app, backend, clock, store)
    }

    #[test]
    fn startup_resumes_saved_noise_and_volume() {
        let (app, backend, _, _) = app(Settings {
            active_variant: Some(NoiseVariant::Pink),
            volume: 0.3,
            ..Settings::default()
        });
        assert_eq!(backend.starts(), 1);
        let status = app.status();
        assert!(status.is_playing);
        assert_eq!(status.active_variant, Some(NoiseVariant::Pink));
        assert!((app.scheduler().engine().volume() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn startup_failure_clears_saved_noise() {
        let backend = RecordingBackend::default();
        backend.fail_next_start();
        let engine = NoiseEngine::with_generator(backend.clone(), NoiseGenerator::seeded(1));
        let settings = Settings {
            active_variant: Some(NoiseVariant::Brown),
            ..Settings::default()
        };
        let app = NoiseApp::with_settings(
            engine,
            ManualClock::new(),
            settings,
            MemoryStore::default(),
            FailingLaunchAgent::default(),
        );
        assert_eq!(app.settings().active_variant, None);
        assert!(!app.status().is_playing);
    }

    #[test]
    fn every_mutation_is_saved() {
        let (mut app, _, _, store) = app(Settings::default());
        app.toggle_noise(NoiseVariant::Brown);
        assert_eq!(store.saved().unwrap().active_variant, Some(NoiseVariant::Brown));

        app.set_volume(1.7);
        assert_eq!(store.saved().unwrap().volume, 1.0);
        assert_eq!(app.scheduler().engine().volume(), 1.0);

        app.set_focus_duration(CycleDuration::Sixty);
        app.set_rest_duration(RestDuration::Ten);
        let saved = store.saved().unwrap();
        assert_eq!(saved.focus_duration, CycleDuration::Sixty);
        assert_eq!(saved.rest_duration, RestDuration::Ten);

        app.toggle_noise(NoiseVariant::Brown);
        assert_eq!(store.saved().unwrap().active_variant, None);
        assert_eq!(store.save_count(), 5);
    }

    #[test]
    fn launch_at_login_failure_is_not_fatal() {
        let (mut app, _, _, store) = app(Settings::default());
        app.toggle_noise(NoiseVariant::White);
        app.set_launch_at_login(true);
        assert_eq!(app.launch_agent.calls, vec![true]);
        assert!(store.saved().unwrap().launch_at_login);
        assert!(app.status().is_playing);
    }

    #[test]
    fn focus_change_restarts_countdown() {
        let (mut app, _, clock, _) = app(Settings {
            active_variant: Some(NoiseVariant::White),
            focus_duration: CycleDuration::Thirty,
            ..Settings::default()
        });
        clock.advance(Duration::from_secs(600));
        app.poll();
        assert_eq!(app.status().time_remaining, Duration::from_secs(1200));
        app.handle_command(Command::SetFocus(CycleDuration::Forty));
        assert_eq!(app.status().time_remaining, Duration::from_secs(2400));
    }

    #[test]
    fn failed_resume_clears_saved_noise() {
        let (mut app, backend, clock, store) = app(Settings {
            active_variant: Some(NoiseVariant::Pink),
            focus_duration: CycleDuration::Thirty,
            rest_duration: RestDuration::Five,
            ..Settings::default()
        });
        clock.advance(Duration::from_secs(30 * 60));
        assert_eq!(app.poll(), vec![Transition::RestStarted]);
        assert_eq!(store.saved().unwrap().active_variant, Some(NoiseVariant::Pink));
        assert!(app.status().is_resting);

        backend.fail_next_start();
        clock.advance(Duration::from_secs(5 * 60));
        assert_eq!(app.poll(), vec![Transition::Stopped]);
        assert_eq!(store.saved().unwrap().active_variant, None);
    }

    #[test]
    fn status_line_shows_countdown_only_with_timer() {
        let (mut app, _, _, _) = app(Settings::default());
        app.toggle_noise(NoiseVariant::Pink);
        let line = app.status().to_string();
        assert!(line.starts_with("Pink noise playing"));
        assert!(!line.contains("Focus "));

        app.set_focus_duration(CycleDuration::Thirty);
        let status = app.status();
        assert!(status.shows_countdown());
        assert!(status.to_string().ends_with("| Focus 30:00"));

        app.turn_off();
        assert_eq!(app.status().to_string(), "noise off | volume 70% | focus 30 | rest N/A");
    }
}
