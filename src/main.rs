mod app;
mod audio;
mod config;
mod event;
mod games;
mod runtime;
mod ui;

use std::fs::File;
use std::io::{self, Stdout};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use app::App;
use audio::AudioOut;
use config::Args;
use event::CrosstermInput;
use runtime::FramePacer;

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("creating log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Raw mode plus the alternate screen. Returns whether key release
/// reporting was switched on.
fn setup_terminal() -> Result<(Terminal<CrosstermBackend<Stdout>>, bool)> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    // Release events let held keys end exactly instead of timing out
    let enhanced = supports_keyboard_enhancement().unwrap_or(false);
    if enhanced {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }
    log::info!("keyboard release events: {enhanced}");
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;
    Ok((terminal, enhanced))
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>, enhanced: bool) -> Result<()> {
    if enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_file)?;

    let audio = if args.mute {
        AudioOut::muted()
    } else {
        AudioOut::open()
    };
    let mut app = App::new(audio, FramePacer::new(args.fps), args.rng());

    let (mut terminal, enhanced) = setup_terminal()?;
    let mut input = CrosstermInput::new();
    let result = app.run(&mut terminal, &mut input, args.game);

    // Restore even when the run failed
    restore_terminal(&mut terminal, enhanced)?;
    result.context("terminal I/O failed")
}
