use crate::error::Result;

/// OS hook that starts the app at login.
pub trait LaunchAtLogin {
    fn register(&mut self, enabled: bool) -> Result<()>;
}

/// Records the request in the log; for hosts without a login-item service.
#[derive(Debug, Default)]
pub struct LoggingLaunchAgent;

impl LaunchAtLogin for LoggingLaunchAgent {
    fn register(&mut self, enabled: bool) -> Result<()> {
        log::info!(
            "Launch at login {} (no login item service on this host)",
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }
}
