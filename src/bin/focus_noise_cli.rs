use anyhow::Context;
use clap::Parser;
use crossbeam::channel::{unbounded, RecvTimeoutError, Sender};
use focus_noise::audio_io::{list_output_devices, BackendConfig, CpalBackend};
use focus_noise::command::{Command, HELP};
use focus_noise::launch::LoggingLaunchAgent;
use focus_noise::logging::init_logging;
use focus_noise::{NoiseApp, NoiseEngine, SystemClock, TomlSettingsStore};
use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;

/// How often the control loop drives the interval timers.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(name = "focus_noise", about = "Ambient noise with a focus/rest interval timer")]
struct Args {
    /// Settings file (defaults to the platform config directory)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Output device name
    #[arg(short, long)]
    device: Option<String>,

    /// Fixed output buffer size in frames
    #[arg(long)]
    buffer_frames: Option<u32>,

    /// List output devices and exit
    #[arg(short, long)]
    list_devices: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn spawn_stdin_reader(tx: Sender<Command>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Command>() {
                Ok(cmd) => {
                    if tx.send(cmd).is_err() {
                        return;
                    }
                }
                Err(e) => eprintln!("{e}"),
            }
        }
        let _ = tx.send(Command::Quit);
    });
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.list_devices {
        for name in list_output_devices().context("failed to list output devices")? {
            println!("{name}");
        }
        return Ok(());
    }

    let store = match args.settings {
        Some(path) => TomlSettingsStore::new(path),
        None => TomlSettingsStore::default_location()?,
    };
    log::info!("Using settings file {}", store.path().display());

    let backend = CpalBackend::new(BackendConfig {
        device_name: args.device,
        buffer_frames: args.buffer_frames,
    });
    let mut app = NoiseApp::new(NoiseEngine::new(backend), SystemClock, store, LoggingLaunchAgent);

    let (cmd_tx, cmd_rx) = unbounded();
    let quit_tx = cmd_tx.clone();
    ctrlc::set_handler(move || {
        let _ = quit_tx.send(Command::Quit);
    })
    .context("failed to install Ctrl-C handler")?;
    spawn_stdin_reader(cmd_tx);

    println!("{HELP}");
    println!("{}", app.status());

    loop {
        match cmd_rx.recv_timeout(POLL_INTERVAL) {
            Ok(Command::Quit) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(Command::Status) => println!("{}", app.status()),
            Ok(Command::Help) => println!("{HELP}"),
            Ok(cmd) => {
                app.handle_command(cmd);
                println!("{}", app.status());
            }
            Err(RecvTimeoutError::Timeout) => {}
        }

        if !app.poll().is_empty() {
            println!("{}", app.status());
        }
    }

    // Dropping the app stops the stream; the saved noise resumes next launch.
    drop(app);
    log::info!("Exiting");
    Ok(())
}
