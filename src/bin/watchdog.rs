//! ANR Watchdog Probe
//!
//! Runs the watchdog inside a stand-alone process so the interception can be
//! exercised from a shell. A thread named "Signal Catcher" stands in for the
//! platform dump thread and reports every signal forwarded to it.
//!
//! Usage:
//!   watchdog [--signal <NAME>] [--config <PATH>] [--exit-after <N>]
//!
//! Then, from another shell:
//!   kill -QUIT <pid>
//!
//! The probe will:
//! 1. Register the watchdog for the watched signal
//! 2. Log each ANR report and each forwarded dump request
//! 3. Unregister and print delivery statistics after N dump requests

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{bail, Context, Result};
use nix::sys::signal::{SigSet, Signal};
use parking_lot::{Condvar, Mutex};

use anr_watchdog::config::SIGNAL_CATCHER_THREAD_NAME;
use anr_watchdog::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
use anr_watchdog::os::{block_in_current_thread, current_pid, ThreadSignaler, TgkillSignaler};
use anr_watchdog::{Watchdog, WatchdogConfig};

/// Command line arguments
struct Args {
    /// Watched signal, overrides the config file
    signal: Option<String>,
    /// JSON config file
    config: Option<PathBuf>,
    /// Exit after this many forwarded dump requests (0 = run forever)
    exit_after: u64,
    /// JSON log output
    json: bool,
    /// Enable verbose logging
    verbose: bool,
}

impl Args {
    fn parse() -> Result<Self> {
        let mut args = std::env::args().skip(1);
        let mut parsed = Self {
            signal: None,
            config: None,
            exit_after: 0,
            json: false,
            verbose: false,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--signal" | "-s" => {
                    parsed.signal = Some(args.next().context("--signal needs a value")?);
                }
                "--config" | "-c" => {
                    parsed.config = Some(args.next().context("--config needs a value")?.into());
                }
                "--exit-after" | "-n" => {
                    let value = args.next().context("--exit-after needs a value")?;
                    parsed.exit_after = value
                        .parse()
                        .with_context(|| format!("Invalid --exit-after value: {}", value))?;
                }
                "--json" => parsed.json = true,
                "--verbose" | "-v" => parsed.verbose = true,
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                _ => bail!("Unknown argument: {}", arg),
            }
        }

        Ok(parsed)
    }
}

fn print_help() {
    println!(
        r#"ANR Watchdog Probe

USAGE:
    watchdog [OPTIONS]

OPTIONS:
    -s, --signal <NAME>      Watched signal (default: SIGQUIT)
    -c, --config <PATH>      Load configuration from a JSON file
    -n, --exit-after <N>     Exit after N dump requests reached the catcher
        --json               Log as JSON
    -v, --verbose            Enable verbose logging
    -h, --help               Print this help message

DESCRIPTION:
    Registers the ANR watchdog in this process next to a stand-in
    "Signal Catcher" thread. Signals sent from outside the process are
    reported as ANRs and then forwarded to the catcher; signals the process
    sends itself are forwarded only.
"#
    );
}

/// Counts dump requests that reached the stand-in catcher
#[derive(Default)]
struct DumpCounter {
    count: Mutex<u64>,
    reached: Condvar,
}

impl DumpCounter {
    fn record(&self) -> u64 {
        let mut count = self.count.lock();
        *count += 1;
        self.reached.notify_all();
        *count
    }

    fn wait_for(&self, target: u64) {
        let mut count = self.count.lock();
        while *count < target {
            self.reached.wait(&mut count);
        }
    }
}

/// Stand-in for the platform dump thread
struct SignalCatcher {
    tid: libc::pid_t,
    stopping: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    signal: Signal,
}

impl SignalCatcher {
    fn spawn(signal: Signal, dumps: Arc<DumpCounter>) -> Result<Self> {
        let stopping = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stopping);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        let handle = std::thread::Builder::new()
            .name(SIGNAL_CATCHER_THREAD_NAME.to_string())
            .spawn(move || {
                let ready = block_in_current_thread(signal)
                    .map(|_| unsafe { libc::syscall(libc::SYS_gettid) as libc::pid_t });
                let failed = ready.is_err();
                let _ = ready_tx.send(ready);
                if failed {
                    return;
                }

                let mut set = SigSet::empty();
                set.add(signal);
                loop {
                    let received = set.wait();
                    if stop_flag.load(Ordering::SeqCst) {
                        break;
                    }
                    match received {
                        Ok(sig) => {
                            let count = dumps.record();
                            tracing::info!("Signal Catcher: writing dump #{} for {}", count, sig);
                        }
                        Err(e) => tracing::warn!("Signal Catcher: sigwait failed: {}", e),
                    }
                }
            })
            .context("Failed to spawn the Signal Catcher thread")?;

        let tid = ready_rx
            .recv()
            .context("Signal Catcher exited before it was ready")?
            .context("Failed to block the watched signal in the Signal Catcher")?;

        Ok(Self {
            tid,
            stopping,
            handle: Some(handle),
            signal,
        })
    }
}

impl Drop for SignalCatcher {
    fn drop(&mut self) {
        self.stopping.store(true, Ordering::SeqCst);
        if let Err(e) = TgkillSignaler::new().signal_thread(self.tid, self.signal) {
            tracing::warn!("Failed to wake the Signal Catcher: {}", e);
            return;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn load_config(args: &Args) -> Result<WatchdogConfig> {
    let mut config = match &args.config {
        Some(path) => WatchdogConfig::load(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => WatchdogConfig::default(),
    };

    if let Some(signal) = &args.signal {
        config.signal = signal.clone();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    let signal = config.watched_signal()?;

    let dumps = Arc::new(DumpCounter::default());
    let catcher = SignalCatcher::spawn(signal, Arc::clone(&dumps))?;

    let mut watchdog = Watchdog::with_listener(config, || {
        tracing::warn!("ANR reported by the platform");
    })?;
    watchdog.start().context("Failed to register the watchdog")?;

    tracing::info!("ANR watchdog probe running (PID: {})", current_pid());
    tracing::info!("Send `kill -{} {}` to simulate an ANR", signal.as_str(), current_pid());

    if args.exit_after == 0 {
        loop {
            std::thread::park();
        }
    }

    dumps.wait_for(args.exit_after);
    watchdog.stop();
    drop(catcher);

    let stats = watchdog.stats();
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse()?;

    let logging = LoggingConfig::new()
        .with_level(if args.verbose { LogLevel::Debug } else { LogLevel::Info })
        .with_format(if args.json { LogFormat::Json } else { LogFormat::Text })
        .with_target(false);
    let _logging = init_logging(logging).context("Failed to initialize logging")?;

    run(args)
}
