//! Terminal front end for the reading assistant.
//!
//! - Parse command-line arguments.
//! - Load `conf/config.toml` (or `--config <path>`) and the persisted settings.
//! - Upload the document, then read it aloud while accepting commands on
//!   stdin until the document ends or Ctrl-C is pressed.

use anyhow::{Context, Result, anyhow, bail};
use readit::api::HttpApi;
use readit::audio::RodioOutput;
use readit::cancellation::CancellationToken;
use readit::config::load_config;
use readit::settings::SettingsStore;
use readit::{Command, ReaderApp};
use std::collections::HashSet;
use std::env;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);
const LOOP_WAIT: Duration = Duration::from_millis(50);

struct Args {
    document: PathBuf,
    config: PathBuf,
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let args = parse_args()?;
    let config = load_config(&args.config);
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        path = %args.document.display(),
        api = %config.api_base_url,
        level = %config.log_level,
        "Starting reader"
    );

    let settings = SettingsStore::load(&config.settings_path);
    let api = HttpApi::new(config.api_base_url.clone()).context("Failed to build API client")?;
    let output = RodioOutput::try_default(Duration::from_millis(config.tick_interval_ms))
        .context("Failed to open the audio device")?;
    let answer_output = output.clone();

    let interrupted = CancellationToken::new();
    let handler_token = interrupted.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .context("Failed to install Ctrl-C handler")?;

    let mut app = ReaderApp::new(api, config, settings, output, answer_output);
    app.dispatch(Command::RefreshVoices);
    app.open_document(args.document.clone());
    if !app.pump_until_idle(UPLOAD_TIMEOUT) {
        bail!("Timed out uploading {}", args.document.display());
    }
    let mut shown_notices = HashSet::new();
    print_new_notices(&app, &mut shown_notices);
    let snapshot = app.snapshot();
    if snapshot.session_id.is_none() {
        bail!("Could not open {}", args.document.display());
    }
    info!(
        segments = snapshot.segment_count,
        pages = snapshot.total_pages,
        voices = app.voices().len(),
        "Document ready"
    );

    let commands = spawn_stdin_reader();
    app.dispatch(Command::Play);
    let mut last_segment = None;
    let mut last_status = None;
    let mut answers_seen = 0;

    loop {
        if interrupted.is_cancelled() {
            info!("Interrupted; stopping playback");
            app.dispatch(Command::Stop);
            break;
        }
        while let Ok(line) = commands.try_recv() {
            match Command::parse(&line) {
                Some(command) => app.dispatch(command),
                None if line.trim().is_empty() => {}
                None => warn!(input = %line.trim(), "Unrecognized command"),
            }
        }
        app.wait(LOOP_WAIT);

        let snapshot = app.snapshot();
        if last_segment != Some(snapshot.playback.active_segment) {
            last_segment = Some(snapshot.playback.active_segment);
            println!(
                "[{}/{} | page {}/{}] {}",
                snapshot.playback.active_segment + 1,
                snapshot.segment_count,
                snapshot.current_page,
                snapshot.total_pages,
                snapshot.active_text.as_deref().unwrap_or("")
            );
        }
        let status = (
            snapshot.playback.phase.label(),
            snapshot.settings.playback_speed,
        );
        if last_status != Some(status) {
            last_status = Some(status);
            println!("({} @ {:.1}x)", status.0, status.1);
        }
        for exchange in app.answers().iter().skip(answers_seen) {
            println!("Q: {}\nA: {}", exchange.question, exchange.answer);
        }
        answers_seen = app.answers().len();
        print_new_notices(&app, &mut shown_notices);

        if app.is_finished() && app.pending_requests() == 0 {
            info!("Reached the end of the document");
            break;
        }
    }
    Ok(())
}

fn print_new_notices<A, O>(app: &ReaderApp<A, O>, shown: &mut HashSet<u64>)
where
    A: readit::api::ReaderApi + 'static,
    O: readit::audio::AudioOutput,
{
    for notice in app.notices() {
        if shown.insert(notice.id) {
            eprintln!("! [{}] {} (dismiss {})", notice.kind, notice.message, notice.id);
        }
    }
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn parse_args() -> Result<Args> {
    let mut document = None;
    let mut config = PathBuf::from("conf/config.toml");
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow!("--config needs a path"))?;
                config = PathBuf::from(path);
            }
            _ if document.is_none() => document = Some(PathBuf::from(arg)),
            _ => bail!("Unexpected argument: {arg}"),
        }
    }
    let document =
        document.ok_or_else(|| anyhow!("Usage: readit <document> [--config <path>]"))?;
    if !document.exists() {
        return Err(anyhow!("File not found: {}", document.display()));
    }
    Ok(Args { document, config })
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(io::stderr)
                .with_filter(filter_layer),
        )
        .init();
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    if env::var_os("RUST_LOG").is_some() {
        info!("RUST_LOG is set; ignoring configured log level");
        return;
    }
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = handle.modify(|filter| *filter = parsed) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}
