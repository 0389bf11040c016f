mod app;
mod cli;
mod config;
mod engine;
mod input;
mod logs;
mod model;
mod projector;
mod scheduler;
mod search;
mod ui;

use anyhow::{Context, Result};
use app::{App, Event, Outcome, SessionSettings, Task};
use clap::Parser;
use cli::CliArgs;
use crossterm::event::{
    Event as TermEvent, EventStream, KeyEventKind, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use engine::DockerEngine;
use futures::StreamExt;
use input::KeyMap;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use scheduler::{Scheduler, compact_error};
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::{self, Stdout};
use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::process::Command as TokioCommand;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter, args.log_file.as_deref())?;

    let (config, config_error) = match config::load(args.config.as_deref()) {
        Ok(loaded) => {
            if let Some(source) = &loaded.source {
                info!("loaded config from {}", source.display());
            }
            (loaded.config, None)
        }
        Err(error) => {
            warn!("config ignored: {error:#}");
            (config::AppConfig::default(), Some(compact_error(&error)))
        }
    };
    let keymap = KeyMap::from_bindings(&config.keybindings);

    let engine = match DockerEngine::connect().await {
        Ok(engine) => engine,
        Err(error) => {
            eprintln!("error: {}", compact_error(&error));
            std::process::exit(1);
        }
    };

    let settings = SessionSettings {
        refresh_interval: Duration::from_secs(args.refresh_secs.max(1)),
        log_tail: args.log_tail.max(1),
    };
    let mut app = App::new(settings, config.ui);
    if let Some(error) = config_error {
        app.set_status(format!("Config ignored: {error}"));
    } else if !keymap.invalid_specs().is_empty() {
        warn!("invalid key specs: {:?}", keymap.invalid_specs());
        app.set_status(format!(
            "Ignored invalid key bindings: {}",
            keymap.invalid_specs().join(", ")
        ));
    }

    run(&mut app, &keymap, Arc::new(engine)).await
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();
    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::sink).try_init();
        }
    }

    Ok(())
}

async fn run(app: &mut App, keymap: &KeyMap, engine: Arc<DockerEngine>) -> Result<()> {
    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    let scheduler = Scheduler::new(engine, tx);

    let (mut terminal, keyboard_enhanced) = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, keymap, &scheduler, rx).await;
    let restore_result = restore_terminal(&mut terminal, keyboard_enhanced);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<(TuiTerminal, bool)> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    if keyboard_enhanced {
        execute!(
            stdout,
            EnterAlternateScreen,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_ALTERNATE_KEYS
            )
        )
        .context("failed to enter alternate screen with keyboard enhancement")?;
    } else {
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok((terminal, keyboard_enhanced))
}

fn restore_terminal(terminal: &mut TuiTerminal, keyboard_enhanced: bool) -> Result<()> {
    if keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("failed to pop keyboard enhancement flags")?;
    }
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    keymap: &KeyMap,
    scheduler: &Scheduler,
    mut rx: mpsc::UnboundedReceiver<Event>,
) -> Result<()> {
    let size = terminal.size().context("failed to read terminal size")?;
    let tasks = app.apply(Event::Resize {
        width: size.width,
        height: size.height,
    });
    dispatch(terminal, app, scheduler, tasks).await;
    let tasks = app.bootstrap();
    dispatch(terminal, app, scheduler, tasks).await;

    let mut reader = EventStream::new();
    loop {
        terminal
            .draw(|frame| ui::render(frame, app, keymap))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(TermEvent::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(action) =
                            input::map_key(keymap, app.mode(), app.view_mode(), key)
                        {
                            debug!("action={action:?}");
                            let tasks = app.apply(Event::Action(action));
                            dispatch(terminal, app, scheduler, tasks).await;
                        }
                    }
                    Some(Ok(TermEvent::Resize(width, height))) => {
                        let tasks = app.apply(Event::Resize { width, height });
                        dispatch(terminal, app, scheduler, tasks).await;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        app.set_status(format!("terminal event error: {error}"));
                    }
                    None => {
                        app.set_status("terminal event stream closed");
                        break;
                    }
                }
            }
            maybe_event = rx.recv() => {
                if let Some(event) = maybe_event {
                    let tasks = app.apply(event);
                    dispatch(terminal, app, scheduler, tasks).await;
                }
            }
        }
    }

    Ok(())
}

/// Hands tasks to the scheduler. The interactive shell needs the terminal, so
/// it runs here in the foreground and its outcome is applied immediately.
async fn dispatch(
    terminal: &mut TuiTerminal,
    app: &mut App,
    scheduler: &Scheduler,
    tasks: Vec<Task>,
) {
    let mut queue = VecDeque::from(tasks);
    while let Some(task) = queue.pop_front() {
        match task {
            Task::Shell { container_id, name } => {
                let result = run_docker_shell(terminal, &container_id)
                    .await
                    .map_err(|error| compact_error(&error));
                queue.extend(app.apply(Event::Completed(Outcome::Shell { name, result })));
            }
            task => scheduler.submit(task),
        }
    }
}

async fn run_docker_shell(terminal: &mut TuiTerminal, container_id: &str) -> Result<()> {
    let shell = engine::detect_shell(container_id).await;
    debug!("exec {shell} in {container_id}");
    suspend_terminal_for_subprocess(terminal)?;

    let run_result = TokioCommand::new("docker")
        .arg("exec")
        .arg("-it")
        .arg(container_id)
        .arg(&shell)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .with_context(|| format!("failed to run docker exec for {container_id}"));
    let restore_result = resume_terminal_after_subprocess(terminal);

    let status = match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => {
            return Err(anyhow::anyhow!(
                "{run_error:#}\nterminal resume error: {restore_error:#}"
            ));
        }
        (Err(error), _) => return Err(error),
        (_, Err(error)) => return Err(error),
        (Ok(status), Ok(())) => status,
    };

    if status.success() {
        Ok(())
    } else {
        Err(anyhow::anyhow!("{shell} exited with {status}"))
    }
}

fn suspend_terminal_for_subprocess(terminal: &mut TuiTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode for subprocess")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen for subprocess")?;
    terminal
        .show_cursor()
        .context("failed to show cursor for subprocess")?;
    Ok(())
}

fn resume_terminal_after_subprocess(terminal: &mut TuiTerminal) -> Result<()> {
    enable_raw_mode().context("failed to re-enable raw mode after subprocess")?;
    execute!(terminal.backend_mut(), EnterAlternateScreen)
        .context("failed to re-enter alternate screen after subprocess")?;
    terminal
        .clear()
        .context("failed to clear terminal after subprocess")?;
    Ok(())
}
