use anyhow::{anyhow, Result};
use chrono::Local;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::clock::{Clock, Shutdown};
use crate::display::{Canvas, Display, PixelColor};

const TICK: Duration = Duration::from_millis(50);

pub fn init_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

pub fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

pub struct TerminalDisplay<B: Backend> {
    terminal: Terminal<B>,
    canvas: Canvas,
}

impl<B: Backend> TerminalDisplay<B> {
    pub fn new(terminal: Terminal<B>, canvas: Canvas) -> Self {
        Self { terminal, canvas }
    }

    #[cfg(test)]
    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut Terminal<B> {
        &mut self.terminal
    }
}

impl<B: Backend> Display for TerminalDisplay<B> {
    fn clear(&mut self) -> Result<()> {
        self.canvas.clear()
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32) -> Result<()> {
        self.canvas.draw_text(text, x, y)
    }

    fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: PixelColor) -> Result<()> {
        self.canvas.fill_rect(x, y, w, h, color)
    }

    fn commit(&mut self) -> Result<()> {
        let canvas = &self.canvas;
        let title = format!("FLIGHTWATCH {}", Local::now().format("%H:%M:%S"));
        self.terminal
            .draw(|f| {
                let area = panel_rect(f.area(), canvas);
                let lines: Vec<Line> = canvas.lines().into_iter().map(Line::from).collect();
                let block = Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .title(title);
                let paragraph = Paragraph::new(lines)
                    .block(block)
                    .style(Style::default().fg(Color::LightCyan).bg(Color::Black));
                f.render_widget(paragraph, area);
            })
            .map_err(|err| anyhow!("terminal draw failed: {err}"))?;
        Ok(())
    }
}

pub fn panel_rect(area: Rect, canvas: &Canvas) -> Rect {
    let width = (canvas.cols() as u16 + 2).min(area.width);
    let height = (canvas.rows() as u16 + 2).min(area.height);
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;
    Rect::new(x, y, width, height)
}

pub struct TerminalClock {
    shutdown: Shutdown,
}

impl TerminalClock {
    pub fn new(shutdown: Shutdown) -> Self {
        Self { shutdown }
    }
}

impl Clock for TerminalClock {
    fn sleep(&mut self, duration: Duration) {
        let deadline = Instant::now() + duration;
        loop {
            if self.shutdown.is_requested() {
                return;
            }
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return;
            }
            match event::poll(left.min(TICK)) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if is_quit_key(&key) => {
                        debug!("quit key pressed");
                        self.shutdown.request();
                    }
                    Ok(_) => {}
                    Err(err) => warn!("terminal read failed: {err}"),
                },
                Ok(false) => {}
                Err(err) => {
                    warn!("terminal poll failed: {err}");
                    thread::sleep(left);
                    return;
                }
            }
        }
    }
}

pub fn is_quit_key(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}
