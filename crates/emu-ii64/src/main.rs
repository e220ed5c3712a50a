//! II/64 cartridge bridge binary.
//!
//! Connects a MAME Apple IIe (through a FIFO pair) to a VICE C64 (through
//! its binary monitor) and serves cartridge commands until MAME closes
//! its end of the event FIFO.

use std::path::PathBuf;
use std::process;
use std::thread;
use std::time::Duration;

use emu_ii64::{BridgeConfig, Cartridge, LaunchConfig, launch, logger};
use ii64_wire::{MonotonicClock, PipeLink, WireEngine};
use vice_monitor::MonitorClient;

/// VICE needs a moment to open its monitor port after a launch.
const CONNECT_ATTEMPTS: u32 = 20;
const CONNECT_DELAY: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

#[derive(Default)]
struct CliArgs {
    config_path: Option<PathBuf>,
    monitor_addr: Option<String>,
    pipe_in: Option<PathBuf>,
    pipe_out: Option<PathBuf>,
    launch: bool,
    no_step: bool,
    no_resume: bool,
    reset_window: Option<f64>,
    verbose: u8,
    quiet: bool,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                cli.config_path = args.get(i).map(PathBuf::from);
            }
            "--monitor" => {
                i += 1;
                cli.monitor_addr = args.get(i).cloned();
            }
            "--pipe-in" => {
                i += 1;
                cli.pipe_in = args.get(i).map(PathBuf::from);
            }
            "--pipe-out" => {
                i += 1;
                cli.pipe_out = args.get(i).map(PathBuf::from);
            }
            "--launch" => {
                cli.launch = true;
            }
            "--no-step" => {
                cli.no_step = true;
            }
            "--no-resume" => {
                cli.no_resume = true;
            }
            "--reset-window" => {
                i += 1;
                match args.get(i).map(|s| s.parse::<f64>()) {
                    Some(Ok(secs)) if secs >= 0.0 && secs.is_finite() => {
                        cli.reset_window = Some(secs);
                    }
                    _ => {
                        eprintln!("--reset-window needs a number of seconds");
                        process::exit(1);
                    }
                }
            }
            "-v" => {
                cli.verbose = cli.verbose.saturating_add(1);
            }
            "-q" => {
                cli.quiet = true;
            }
            "--help" | "-h" => {
                eprintln!("Usage: emu-ii64 [OPTIONS]");
                eprintln!();
                eprintln!("Options:");
                eprintln!("  --config <file>       Load settings from a JSON file");
                eprintln!("  --monitor <addr>      VICE binary monitor [default: localhost:6502]");
                eprintln!("  --pipe-in <path>      FIFO MAME writes events to [default: mameout]");
                eprintln!("  --pipe-out <path>     FIFO MAME reads status from [default: mamein]");
                eprintln!("  --launch              Start VICE and MAME first");
                eprintln!("  --no-step             Get status without single-stepping");
                eprintln!("  --no-resume           Leave the C64 stopped after commands");
                eprintln!("  --reset-window <s>    Ignore repeated resets for this long [default: 1.0]");
                eprintln!("  -v                    More logging (repeat for trace)");
                eprintln!("  -q                    Errors only");
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

/// File settings first, then command-line overrides.
fn make_config(cli: &CliArgs) -> BridgeConfig {
    let mut config = match cli.config_path {
        Some(ref path) => match BridgeConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Config error: {e}");
                process::exit(1);
            }
        },
        None => BridgeConfig::default(),
    };

    if let Some(ref addr) = cli.monitor_addr {
        config.monitor_addr.clone_from(addr);
    }
    if let Some(ref path) = cli.pipe_in {
        config.pipe_in.clone_from(path);
    }
    if let Some(ref path) = cli.pipe_out {
        config.pipe_out.clone_from(path);
    }
    if let Some(secs) = cli.reset_window {
        config.cart.reset_suppression_window = Duration::from_secs_f64(secs);
    }
    if cli.no_step {
        config.cart.single_step = false;
    }
    if cli.no_resume {
        config.cart.auto_resume = false;
    }
    if cli.launch && config.launch.is_none() {
        config.launch = Some(LaunchConfig::default());
    }
    config
}

fn connect(addr: &str, attempts: u32) -> MonitorClient<std::net::TcpStream> {
    let mut tries = 0;
    loop {
        tries += 1;
        match MonitorClient::connect(addr) {
            Ok(client) => return client,
            Err(e) if tries < attempts => {
                log::debug!("monitor not up yet ({e}), retrying");
                thread::sleep(CONNECT_DELAY);
            }
            Err(e) => {
                log::error!("cannot connect to {addr}: {e}");
                process::exit(1);
            }
        }
    }
}

fn main() {
    let cli = parse_args();
    // Fails only if a logger is already installed
    let _ = logger::init(logger::level_for(cli.verbose, cli.quiet));
    let config = make_config(&cli);

    let mut attempts = 1;
    if let Some(ref launch_config) = config.launch {
        if let Err(e) = launch::launch(launch_config, &config.pipe_in, &config.pipe_out) {
            log::error!("{e}");
            process::exit(1);
        }
        attempts = CONNECT_ATTEMPTS;
    }

    let (events, status) = match launch::open_pipes(&config.pipe_in, &config.pipe_out) {
        Ok(pipes) => pipes,
        Err(e) => {
            log::error!("{e}");
            process::exit(1);
        }
    };
    let wire = WireEngine::new(
        PipeLink::new(events, status),
        MonotonicClock::new(),
        config.cart.reset_suppression_window,
    );

    let monitor = connect(&config.monitor_addr, attempts);
    log::info!("connected to {}", config.monitor_addr);

    let mut cart = match Cartridge::attach(wire, monitor, config.cart) {
        Ok(cart) => cart,
        Err(e) => {
            log::error!("{e}");
            process::exit(1);
        }
    };
    if let Err(e) = cart.run() {
        log::error!("{e}");
        process::exit(1);
    }
}
