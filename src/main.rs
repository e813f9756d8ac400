mod app;
mod backdrop;
mod board;
mod logging;
mod reader;
mod task;
mod ui;

use crate::app::App;
use crate::backdrop::Backdrop;
use crate::board::Board;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{error, info};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;

const TASKS_FILE: &str = "flowboard_tasks.json";
const POSTS_FILE: &str = "flowboard_posts.json";

fn main() -> anyhow::Result<()> {
    let _logger = logging::init()?;
    info!("flowboard {} starting", env!("CARGO_PKG_VERSION"));

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let board = Board::load_from_file(TASKS_FILE);
    let posts = reader::load_posts(POSTS_FILE);
    let mut rng = rand::rng();
    let backdrop = Backdrop::new(&mut rng);
    let viewport = crossterm::terminal::size()?;
    let mut app = App::new(board, posts, backdrop, viewport);

    let result = app::run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = app.board.save_to_file(TASKS_FILE) {
        error!("failed to save the board to {TASKS_FILE}: {err}");
    }

    if let Err(err) = result {
        error!("main loop failed: {err}");
        return Err(err.into());
    }
    Ok(())
}
