use crate::audio_io::AUDIO_THREAD_NAME;
use std::panic::{self, PanicInfo};
use std::sync::Once;

static INIT: Once = Once::new();

/// Install the logger and panic hook. Safe to call more than once.
pub fn init_logging(verbose: bool) {
    INIT.call_once(|| {
        let default_filter = if verbose { "debug" } else { "info" };
        // Another logger may already be installed when embedded or under test.
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
            .format_timestamp_millis()
            .try_init();

        install_panic_hook();

        log::debug!("Logging initialized");
    });
}

fn install_panic_hook() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let thread = std::thread::current();
        let summary = panic_summary(thread.name(), info);
        let bt = backtrace::Backtrace::new();
        if is_audio_thread(thread.name()) {
            // The stream dies with its thread; the engine still reports playing until stopped.
            log::error!("{summary}\nAudio output has stopped\nBacktrace:\n{bt:?}");
        } else {
            log::error!("{summary}\nBacktrace:\n{bt:?}");
        }
        default_hook(info);
    }));
}

fn is_audio_thread(name: Option<&str>) -> bool {
    name == Some(AUDIO_THREAD_NAME)
}

fn panic_message<'a>(info: &'a PanicInfo<'_>) -> &'a str {
    let payload = info.payload();
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string payload>")
}

fn panic_summary(thread: Option<&str>, info: &PanicInfo<'_>) -> String {
    let origin = if is_audio_thread(thread) { "audio callback" } else { "control" };
    let location = info
        .location()
        .map(|l| format!("{}:{}", l.file(), l.line()))
        .unwrap_or_else(|| "unknown location".to_string());
    format!(
        "Panic on {origin} thread '{}' at {location}: {}",
        thread.unwrap_or("<unnamed>"),
        panic_message(info)
    )
}
