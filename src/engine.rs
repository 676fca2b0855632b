use crate::audio_io::{AudioBackend, FrameRenderer};
use crate::error::Result;
use crate::generator::{GeneratorState, NoiseGenerator};
use crate::models::NoiseVariant;
use parking_lot::Mutex;
use std::sync::Arc;

pub const DEFAULT_VOLUME: f32 = 0.7;

/// Everything the audio callback and the control thread both touch.
/// Only accessed through the engine's guard.
pub struct SharedState {
    pub active_variant: Option<NoiseVariant>,
    pub volume: f32,
    /// Set only once the backend has actually started
    pub is_playing: bool,
    pub generator: NoiseGenerator,
}

/// Playback controller: owns the backend and the shared generator state.
pub struct NoiseEngine<B: AudioBackend> {
    shared: Arc<Mutex<SharedState>>,
    backend: B,
}

impl<B: AudioBackend> NoiseEngine<B> {
    pub fn new(backend: B) -> Self {
        Self::with_generator(backend, NoiseGenerator::new())
    }

    pub fn with_generator(backend: B, generator: NoiseGenerator) -> Self {
        Self {
            shared: Arc::new(Mutex::new(SharedState {
                active_variant: None,
                volume: DEFAULT_VOLUME,
                is_playing: false,
                generator,
            })),
            backend,
        }
    }

    /// Start playing `variant`. Already playing the same variant is a no-op.
    ///
    /// On backend failure the engine is left stopped and can be retried.
    pub fn play(&mut self, variant: NoiseVariant) -> Result<()> {
        {
            let st = self.shared.lock();
            if st.is_playing && st.active_variant == Some(variant) {
                return Ok(());
            }
        }

        self.stop();

        {
            let mut st = self.shared.lock();
            st.active_variant = Some(variant);
            st.generator.reset();
        }

        let renderer = self.renderer();
        match self.backend.start(renderer) {
            Ok(()) => {
                self.shared.lock().is_playing = true;
                log::info!("Playing {} noise", variant);
                Ok(())
            }
            Err(e) => {
                {
                    let mut st = self.shared.lock();
                    st.is_playing = false;
                    st.active_variant = None;
                }
                log::error!("Failed to start audio engine: {e}");
                Err(e)
            }
        }
    }

    pub fn stop(&mut self) {
        let was_playing = {
            let mut st = self.shared.lock();
            let was_playing = st.is_playing;
            st.active_variant = None;
            st.is_playing = false;
            was_playing
        };
        // Joins the audio thread, so it must run without the guard held.
        self.backend.stop();
        if was_playing {
            log::info!("Noise stopped");
        }
    }

    /// Clamped to [0, 1]; picked up by the very next rendered frame.
    pub fn set_volume(&self, volume: f32) {
        let volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        self.shared.lock().volume = volume;
    }

    pub fn volume(&self) -> f32 {
        self.shared.lock().volume
    }

    pub fn is_playing(&self) -> bool {
        self.shared.lock().is_playing
    }

    pub fn active_variant(&self) -> Option<NoiseVariant> {
        self.shared.lock().active_variant
    }

    pub fn generator_state(&self) -> GeneratorState {
        self.shared.lock().generator.state().clone()
    }

    pub(crate) fn renderer(&self) -> FrameRenderer {
        FrameRenderer::new(Arc::clone(&self.shared))
    }
}

impl<B: AudioBackend> Drop for NoiseEngine<B> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_io::testing::RecordingBackend;

    fn engine() -> (NoiseEngine<RecordingBackend>, RecordingBackend) {
        let backend = RecordingBackend::default();
        let engine = NoiseEngine::with_generator(backend.clone(), NoiseGenerator::seeded(1234));
        (engine, backend)
    }

    #[test]
    fn play_same_variant_twice_starts_backend_once() {
        let (mut engine, backend) = engine();
        engine.play(NoiseVariant::Pink).unwrap();
        engine.play(NoiseVariant::Pink).unwrap();
        assert_eq!(backend.starts(), 1);
        assert_eq!(backend.stops(), 0);
        assert!(engine.is_playing());
        assert_eq!(engine.active_variant(), Some(NoiseVariant::Pink));
    }

    #[test]
    fn switching_variant_restarts_backend_and_resets_state() {
        let (mut engine, backend) = engine();
        engine.play(NoiseVariant::Brown).unwrap();
        backend.render(4096, 2);
        assert_ne!(engine.generator_state().last_output, 0.0);

        engine.play(NoiseVariant::Pink).unwrap();
        assert_eq!(backend.starts(), 2);
        assert_eq!(backend.stops(), 1);
        assert_eq!(engine.generator_state(), GeneratorState::default());

        backend.render(100, 2);
        let st = engine.generator_state();
        assert_eq!(st.sample_counter, 100);
        assert_eq!(st.last_output, 0.0);
    }

    #[test]
    fn output_after_switch_ignores_previous_history() {
        let (mut engine, backend) = engine();
        engine.play(NoiseVariant::Brown).unwrap();
        backend.render(10_000, 1);
        engine.play(NoiseVariant::Pink).unwrap();
        engine.play(NoiseVariant::Brown).unwrap();

        // First brown sample after a reset is a single step away from zero.
        engine.set_volume(1.0);
        let out = backend.render(1, 1);
        assert!(out[0].abs() <= 0.02 * 3.5 + 1e-6);
    }

    #[test]
    fn volume_is_clamped() {
        let (engine, _) = engine();
        assert_eq!(engine.volume(), DEFAULT_VOLUME);
        engine.set_volume(-0.5);
        assert_eq!(engine.volume(), 0.0);
        engine.set_volume(1.7);
        assert_eq!(engine.volume(), 1.0);
        engine.set_volume(f32::NAN);
        assert_eq!(engine.volume(), 0.0);
    }

    #[test]
    fn volume_change_applies_to_next_frame() {
        let (mut engine, backend) = engine();
        engine.play(NoiseVariant::White).unwrap();
        engine.set_volume(1.0);
        let loud = backend.render(256, 2);
        assert!(loud.iter().any(|s| s.abs() > 0.0));
        engine.set_volume(0.0);
        let silent = backend.render(1, 2);
        assert_eq!(silent, vec![0.0, 0.0]);
    }

    #[test]
    fn mono_sample_is_fanned_to_every_channel() {
        let (mut engine, backend) = engine();
        engine.play(NoiseVariant::White).unwrap();
        engine.set_volume(0.5);
        let out = backend.render(64, 4);
        assert_eq!(out.len(), 256);
        for frame in out.chunks(4) {
            assert!(frame.iter().all(|s| *s == frame[0]));
            assert!(frame[0].abs() <= 0.5);
        }
    }

    #[test]
    fn failed_start_leaves_engine_stopped_and_retryable() {
        let (mut engine, backend) = engine();
        backend.fail_next_start();
        assert!(engine.play(NoiseVariant::White).is_err());
        assert!(!engine.is_playing());
        assert_eq!(engine.active_variant(), None);

        engine.play(NoiseVariant::White).unwrap();
        assert!(engine.is_playing());
        assert_eq!(backend.starts(), 1);
    }

    #[test]
    fn stop_is_idempotent() {
        let (mut engine, backend) = engine();
        engine.stop();
        engine.play(NoiseVariant::Brown).unwrap();
        engine.stop();
        engine.stop();
        assert_eq!(backend.stops(), 1);
        assert!(!engine.is_playing());
        assert_eq!(engine.active_variant(), None);
        assert!(!backend.is_running());
    }

    #[test]
    fn stopped_renderer_writes_silence() {
        let (mut engine, _) = engine();
        let mut renderer = engine.renderer();
        engine.play(NoiseVariant::White).unwrap();
        engine.stop();
        let mut buf = vec![1.0f32; 32];
        renderer.render(&mut buf, 2);
        assert!(buf.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn concurrent_volume_changes_do_not_tear_output() {
        let (mut engine, _) = engine();
        engine.play(NoiseVariant::Pink).unwrap();
        let mut renderer = engine.renderer();
        let audio = std::thread::spawn(move || {
            let mut buf = vec![0.0f32; 512];
            for _ in 0..200 {
                renderer.render(&mut buf, 2);
                assert!(buf.iter().all(|s| s.abs() <= 1.0));
            }
        });
        for i in 0..2000 {
            engine.set_volume((i % 11) as f32 / 10.0);
        }
        audio.join().unwrap();
    }

    #[test]
    fn dropping_engine_releases_backend() {
        let (mut engine, backend) = engine();
        engine.play(NoiseVariant::Pink).unwrap();
        drop(engine);
        assert!(!backend.is_running());
    }
}
