//! inev - print inotify events for a set of paths
//!
//! One line per event, straight from the kernel queue.

use anyhow::{bail, Context};
use clap::Parser;
use inotify_events::{EventRecord, InterestMask, Session, WatchDescriptor};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "inev")]
#[command(version)]
#[command(about = "Print inotify events for files and directories", long_about = None)]
struct Args {
    /// Paths to watch
    #[arg(value_name = "PATH", required = true)]
    paths: Vec<PathBuf>,

    /// Event categories to report (create, delete, modify, attrib, move, moved-from,
    /// moved-to, close-write, close-nowrite, close, open, access, delete-self,
    /// move-self, all). Defaults to create, delete, modify and move.
    #[arg(short = 'e', long = "event", value_name = "EVENT")]
    events: Vec<String>,

    /// Do not follow symbolic links
    #[arg(long = "dont-follow")]
    dont_follow: bool,

    /// Only watch paths that are directories
    #[arg(long = "onlydir")]
    onlydir: bool,

    /// Remove each watch after its first event
    #[arg(long = "oneshot")]
    oneshot: bool,

    /// Exit quietly when no event arrives within this many seconds
    #[arg(short = 't', long = "timeout", value_name = "SECS")]
    timeout: Option<u64>,

    /// Exit after this many events
    #[arg(short = 'n', long = "count", value_name = "N")]
    count: Option<u64>,

    /// Output format: 'default' (EVENTS + path), 'name' (path only), 'silent' (no output)
    #[arg(short = 'f', long = "format", value_name = "FORMAT", default_value = "default")]
    format: String,

    /// Initial read buffer size in bytes
    #[arg(long = "buffer", value_name = "BYTES")]
    buffer: Option<usize>,

    /// Run shell command on each event (sets $INEV_FILE and $INEV_EVENT)
    #[arg(short = 'r', long = "run", value_name = "COMMAND")]
    run_command: Option<String>,

    /// Quiet mode (suppress initial status messages)
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum OutputFormat {
    Default,
    Name,
    Silent,
}

impl OutputFormat {
    fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "default" => Ok(OutputFormat::Default),
            "name" => Ok(OutputFormat::Name),
            "silent" => Ok(OutputFormat::Silent),
            _ => Err(format!(
                "Invalid format '{}'. Valid options: default, name, silent",
                s
            )),
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn interest_mask(args: &Args) -> anyhow::Result<InterestMask> {
    let mut mask = if args.events.is_empty() {
        InterestMask::CREATE | InterestMask::DELETE | InterestMask::MODIFY | InterestMask::MOVE
    } else {
        let mut mask = InterestMask::empty();
        for name in &args.events {
            match InterestMask::from_category(name) {
                Some(bits) => mask |= bits,
                None => bail!("Unknown event '{}'", name),
            }
        }
        mask
    };

    if args.dont_follow {
        mask |= InterestMask::DONT_FOLLOW;
    }
    if args.onlydir {
        mask |= InterestMask::ONLYDIR;
    }
    if args.oneshot {
        mask |= InterestMask::ONESHOT;
    }
    Ok(mask)
}

fn event_path(watches: &HashMap<WatchDescriptor, PathBuf>, event: &EventRecord) -> PathBuf {
    let base = watches.get(&event.wd).cloned().unwrap_or_default();
    match event.name() {
        Some(name) => base.join(name),
        None => base,
    }
}

fn run_shell_command(cmd: &str, file: &str, event: &str) {
    let _ = std::process::Command::new("/bin/sh")
        .arg("-c")
        .arg(cmd)
        .env("INEV_FILE", file)
        .env("INEV_EVENT", event)
        .status();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let format = OutputFormat::from_str(&args.format).map_err(|e| anyhow::anyhow!(e))?;
    let mask = interest_mask(&args)?;

    let mut builder = Session::builder();
    if let Some(bytes) = args.buffer {
        builder = builder.buffer_capacity(bytes);
    }
    let mut session = builder.open().context("Failed to open inotify")?;

    let mut watches = HashMap::new();
    for path in &args.paths {
        let wd = session.add_watch(path, mask)?;
        watches.insert(wd, path.clone());
    }

    if !args.quiet {
        eprintln!("Watching: {:?}", args.paths);
        eprintln!("Events: {:?}", mask);
        eprintln!("Format: {:?}", format);
        if let Some(secs) = args.timeout {
            eprintln!("Timeout: {}s", secs);
        }
        if let Some(count) = args.count {
            eprintln!("Exit after: {} events", count);
        }
        if let Some(ref cmd) = args.run_command {
            eprintln!("Run command: {}", cmd);
        }
        eprintln!("---");
    }

    let mut seen = 0u64;
    while args.count.map_or(true, |count| seen < count) {
        let deadline = args
            .timeout
            .map(|secs| Instant::now() + Duration::from_secs(secs));

        let event = match session.next_event(deadline).await {
            Ok(event) => event,
            Err(e) if e.is_timeout() => break,
            Err(e) => return Err(e.into()),
        };
        seen += 1;

        let path = event_path(&watches, &event);
        let names = event.mask.names().join(",").to_uppercase();
        match format {
            OutputFormat::Default => println!("{} {}", names, path.display()),
            OutputFormat::Name => println!("{}", path.display()),
            OutputFormat::Silent => {}
        }

        if let Some(ref cmd) = args.run_command {
            run_shell_command(cmd, &path.to_string_lossy(), &names);
        }

        if event.is_removed() {
            watches.remove(&event.wd);
            if watches.is_empty() {
                break;
            }
        }
    }

    session.close();
    Ok(())
}
