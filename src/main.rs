mod app;
mod model;
mod msg;

use std::io;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use app::App;
use model::config::AppConfig;
use msg::Msg;

fn main() -> Result<()> {
    // Initialize logging to file (never stdout)
    let log_dir = directories::ProjectDirs::from("", "", "ecoinstall")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| std::path::PathBuf::from("/tmp"));
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "ecoinstall.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter("ecoinstall=info")
        .init();

    tracing::info!("ecoinstall starting");

    let config = AppConfig::load()?;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, config);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    match result {
        // The accepted command is the only thing this program ever
        // writes to stdout.
        Ok(Some(command)) => println!("{command}"),
        Ok(None) => {}
        Err(e) => eprintln!("ecoinstall error: {e:?}"),
    }

    Ok(())
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: AppConfig,
) -> Result<Option<String>> {
    let (tx, rx) = mpsc::channel::<Msg>();
    let tick_ms = config.ui.tick_ms;
    let mut app = App::new(config)?;

    // Input thread — reads terminal events and forwards as Msg
    let tx_input = tx.clone();
    thread::spawn(move || {
        loop {
            if let Ok(event) = event::read() {
                let msg = match event {
                    Event::Key(k) => Msg::Key(k),
                    Event::Resize(w, h) => Msg::Resize(w, h),
                    _ => continue,
                };
                if tx_input.send(msg).is_err() {
                    break;
                }
            }
        }
    });

    // Tick thread — periodic tick for notification expiry
    let tx_tick = tx.clone();
    thread::spawn(move || {
        loop {
            thread::sleep(Duration::from_millis(tick_ms));
            if tx_tick.send(Msg::Tick).is_err() {
                break;
            }
        }
    });

    // Config watcher thread — emits ConfigChanged when the user config
    // file is created or edited while the picker is open.
    if let Some(config_path) = AppConfig::user_config_path() {
        spawn_config_watcher(config_path, tx.clone());
    }

    // First frame before any message arrives, so the command preview is
    // correct prior to any user interaction.
    terminal.draw(|f| app.view(f))?;

    // ── Main event loop ──
    loop {
        // Batch-drain all pending messages
        let first = rx.recv()?;
        app.update(first)?;

        while let Ok(msg) = rx.try_recv() {
            app.update(msg)?;
        }

        if app.should_quit {
            break;
        }

        terminal.draw(|f| app.view(f))?;
    }

    Ok(app.accepted_command().map(|c| c.to_string()))
}

fn spawn_config_watcher(config_path: PathBuf, tx: mpsc::Sender<Msg>) {
    thread::spawn(move || {
        // Watch the parent directory; the file itself may not exist yet.
        let Some(watch_dir) = config_path.parent().map(|p| p.to_path_buf()) else {
            return;
        };
        if !watch_dir.exists() {
            return;
        }

        let tx_watch = tx.clone();
        let mut watcher: RecommendedWatcher =
            match notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                        for path in event.paths {
                            if tx_watch.send(Msg::ConfigChanged(path)).is_err() {
                                return;
                            }
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!("config watcher error: {err}");
                }
            }) {
                Ok(w) => w,
                Err(err) => {
                    tracing::warn!("failed to initialize config watcher: {err}");
                    return;
                }
            };

        if let Err(err) = watcher.watch(&watch_dir, RecursiveMode::NonRecursive) {
            tracing::warn!("failed to watch config dir {}: {err}", watch_dir.display());
            return;
        }

        loop {
            thread::park();
        }
    });
}
