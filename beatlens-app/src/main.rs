//! beatlens - live tempo, key and chord display
//!
//! Plays a playlist on a simulated clock and shows the analysis panel in
//! the terminal, in sync with the playback position.

mod player;

use std::fs::{self, File};
use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use tracing_subscriber::EnvFilter;

use beatlens_core::{
    AnalysisPanel, Config, Field, FileConfigStore, PlaybackHost, TickOutcome, Ticker,
};
use beatlens_tui::{
    centered_rect, AnalysisStripWidget, AnalysisView, Command, ContextMenuWidget, InputHandler,
    Mode, SettingsWidget, StatusBarWidget, Theme,
};
use player::{Player, PlayerEvent};

/// Longest wait for input between render ticks
const MAX_POLL: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(name = "beatlens", version, about = "Live tempo, key and chord display")]
struct Args {
    /// Audio files to play, in order
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Render rate override, in ticks per second
    #[arg(long)]
    fps: Option<u32>,

    /// Configuration file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Color theme: phosphor or amber
    #[arg(long, default_value = "phosphor")]
    theme: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let log_path = init_logging()?;
    tracing::info!("beatlens starting, logging to {}", log_path.display());

    // Worker panics are contained; keep their reports out of the terminal
    std::panic::set_hook(Box::new(|info| tracing::error!("{}", info)));

    let theme = Theme::by_name(&args.theme).unwrap_or_else(|| {
        tracing::warn!("unknown theme {:?}, using default", args.theme);
        Theme::default()
    });

    // Unreadable config falls back to defaults and is not written back
    let config_path = args.config.clone().unwrap_or_else(FileConfigStore::default_path);
    let mut store = match FileConfigStore::open(&config_path) {
        Ok(store) => Some(store),
        Err(e) => {
            tracing::warn!("{}", e);
            None
        }
    };
    let mut config = store
        .as_ref()
        .map(|s| Config::load(s))
        .unwrap_or_default();
    if let Some(fps) = args.fps {
        let (lo, hi, _) = Field::UpdateFps.range().unwrap_or((1.0, 1000.0, 1.0));
        config.update_fps = fps.clamp(lo as u32, hi as u32);
    }

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, args.files, config, &theme);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    let final_config = result?;
    if let Some(store) = store.as_mut() {
        final_config.save(store);
        if let Err(e) = store.flush() {
            tracing::warn!("{}", e);
        }
    }
    tracing::info!("beatlens exiting");
    Ok(())
}

/// Log to a file; the terminal belongs to the UI
fn init_logging() -> anyhow::Result<PathBuf> {
    let dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("beatlens");
    fs::create_dir_all(&dir)?;
    let path = dir.join("beatlens.log");
    let file = File::create(&path)?;

    let filter = EnvFilter::try_from_env("BEATLENS_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_thread_names(true)
        .init();
    Ok(path)
}

/// Run the UI loop; returns the configuration in effect on exit
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    files: Vec<PathBuf>,
    config: Config,
    theme: &Theme,
) -> anyhow::Result<Config> {
    let mut player = Player::new(files, Instant::now());
    let player_events = player.events();
    let titles = player.titles();

    let mut panel = AnalysisPanel::native(config);
    let mut view = AnalysisView::new();
    let mut input = InputHandler::new();
    let mut ticker = Ticker::new(panel.config().tick_period(), Instant::now());

    panel.on_track_changed(&player);

    loop {
        // Host notifications
        while let Ok(event) = player_events.try_recv() {
            tracing::debug!("player event {:?}", event);
            match event {
                PlayerEvent::TrackChanged(_) | PlayerEvent::Seeked(_) => {
                    panel.on_track_changed(&player)
                }
                PlayerEvent::Paused(_) => {}
            }
        }

        panel.pump_completions();

        let now = Instant::now();
        player.update(now);

        if ticker.poll(now) {
            if let TickOutcome::Reschedule(period) = panel.tick(player.position_at(now), &mut view)
            {
                ticker.reschedule(period, now);
            }
            terminal.draw(|frame| {
                render_ui(frame, &panel, &view, &player, &titles, &input, theme);
            })?;
        }

        let timeout = ticker.until_next(Instant::now()).min(MAX_POLL);
        if !event::poll(timeout)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let Some(cmd) = input.handle_key(key) else {
            continue;
        };

        let now = Instant::now();
        match cmd {
            Command::Quit => break,
            Command::NextTrack => player.next(now),
            Command::PrevTrack => player.prev(now),
            Command::TogglePause => player.toggle_pause(now),
            Command::Seek(delta) => player.seek(delta, now),
            Command::OpenMenu | Command::CloseMenu => {}
            Command::Menu(action) => {
                tracing::debug!("menu: {}", action.label());
                panel.menu(action);
            }
            Command::FormNext => {
                if let Some(form) = panel.form_mut() {
                    form.select_next();
                }
            }
            Command::FormPrev => {
                if let Some(form) = panel.form_mut() {
                    form.select_prev();
                }
            }
            Command::FormAdjust(direction) => {
                if let Some(form) = panel.form_mut() {
                    form.adjust(direction);
                }
            }
            Command::FormRespond(response) => panel.respond_form(response),
        }
    }

    Ok(panel.config().clone())
}

fn render_ui(
    frame: &mut Frame,
    panel: &AnalysisPanel,
    view: &AnalysisView,
    player: &Player,
    titles: &[String],
    input: &InputHandler,
    theme: &Theme,
) {
    let area = frame.area();
    let chunks = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(3),
        Constraint::Length(1),
    ])
    .split(area);

    let title = titles.get(player.index()).map(String::as_str);
    frame.render_widget(
        AnalysisStripWidget::new(view.state(), theme).title(title),
        chunks[0],
    );

    render_playlist(frame, chunks[1], titles, player.index(), theme);

    frame.render_widget(
        StatusBarWidget::new(input.mode(), theme).track(
            title,
            player.position_secs(),
            player.is_paused(),
        ),
        chunks[2],
    );

    match input.mode() {
        Mode::Menu => {
            let (w, h) = ContextMenuWidget::size();
            frame.render_widget(
                ContextMenuWidget::new(input.menu_index(), theme),
                centered_rect(w, h, area),
            );
        }
        Mode::Settings => {
            if let Some(form) = panel.form() {
                frame.render_widget(
                    SettingsWidget::new(form, theme),
                    centered_rect(60, SettingsWidget::height(), area),
                );
            }
        }
        Mode::Normal => {}
    }
}

fn render_playlist(frame: &mut Frame, area: Rect, titles: &[String], current: usize, theme: &Theme) {
    let lines: Vec<Line> = titles
        .iter()
        .enumerate()
        .map(|(i, t)| {
            if i == current {
                Line::from(Span::styled(format!("▶ {}", t), theme.highlight()))
            } else {
                Line::from(Span::styled(format!("  {}", t), theme.normal()))
            }
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border())
        .title(Span::styled(
            format!(" playlist ({}) ", titles.len()),
            theme.title(),
        ));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
