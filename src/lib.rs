//! Ambient noise generator with a focus/rest interval timer.
//!
//! - [`generator`]: white, brown and Voss-McCartney pink noise, one sample at a time
//! - [`engine`]: playback controller sharing volume and generator state with the
//!   real-time callback behind a single guard
//! - [`scheduler`]: focus/rest state machine that starts and stops the engine
//! - [`app`]: settings persistence and the login-item hook around the scheduler

pub mod app;
pub mod audio_io;
pub mod command;
pub mod engine;
pub mod error;
pub mod generator;
pub mod launch;
pub mod logging;
pub mod models;
pub mod scheduler;
pub mod settings;

pub use app::{NoiseApp, Status};
pub use audio_io::{AudioBackend, BackendConfig, CpalBackend, FrameRenderer};
pub use command::Command;
pub use engine::NoiseEngine;
pub use error::{Error, Result};
pub use generator::NoiseGenerator;
pub use models::{CycleDuration, NoiseVariant, RestDuration};
pub use scheduler::{Clock, IntervalScheduler, ManualClock, Phase, SystemClock, Transition};
pub use settings::{MemoryStore, Settings, SettingsStore, TomlSettingsStore};
