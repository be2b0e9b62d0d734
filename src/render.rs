use crate::display::{Filter, Frame, Pixel, FADE_DELAY};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use log::warn;
use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

/// Renderer is handed a snapshot of the display once per refresh. It should
/// abstract the implementation details, so a variety of kinds of screen would
/// work.
pub trait Renderer {
    fn draw(&mut self, frame: &Frame) -> Result<(), io::Error>;
}

// store useful metadata about the frame being drawn
struct Viewport(usize, usize);

impl Viewport {
    fn of(frame: &Frame) -> Self {
        Viewport(frame.width, frame.height)
    }

    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// cells needed to show every pixel with one block per pixel, border
    /// included
    fn block_size(&self) -> (u16, u16) {
        (2 + self.0 as u16, 2 + self.1 as u16)
    }

    /// split the frame into one list of canvas coords per shade, skipping
    /// pixels that are fully off
    fn shades(&self, frame: &Frame) -> Vec<Vec<(f64, f64)>> {
        let mut shades = vec![Vec::new(); FADE_DELAY as usize + 1];
        for (n, pixel) in frame.pixels.iter().enumerate() {
            let level = shade(pixel, frame.filter);
            if level > 0 {
                shades[level as usize].push((
                    (n % self.0) as f64,        // x
                    -1.0 * (n / self.0) as f64, // y
                ));
            }
        }
        shades
    }
}

/// 0 (dark) to FADE_DELAY (fully lit)
fn shade(pixel: &Pixel, filter: Filter) -> u8 {
    match filter {
        _ if pixel.on => FADE_DELAY,
        Filter::Fade => pixel.frames_until_off.min(FADE_DELAY),
        _ if pixel.is_lit() => FADE_DELAY,
        _ => 0,
    }
}

fn colour(level: u8) -> Color {
    if level >= FADE_DELAY {
        return Color::White;
    }
    let grey = (255 * level as u16 / FADE_DELAY as u16) as u8;
    Color::Rgb(grey, grey, grey)
}

/// monochrome display in a terminal, rendered using TUI and crossterm
pub struct TermRenderer {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    title: String,
}

impl TermRenderer {
    pub fn new(title: &str) -> Result<TermRenderer, io::Error> {
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.hide_cursor()?;
        terminal.clear()?;
        Ok(TermRenderer {
            terminal,
            title: title.to_string(),
        })
    }
}

impl Drop for TermRenderer {
    fn drop(&mut self) {
        if let Err(e) = self.terminal.show_cursor() {
            warn!("couldn't restore the cursor: {}", e);
        }
        if let Err(e) = execute!(io::stdout(), LeaveAlternateScreen) {
            warn!("couldn't leave the alternate screen: {}", e);
        }
    }
}

impl Renderer for TermRenderer {
    fn draw(&mut self, frame: &Frame) -> Result<(), io::Error> {
        let viewport = Viewport::of(frame);
        let shades = viewport.shades(frame);
        let title = self.title.as_str();
        self.terminal.draw(|f| {
            let available = f.size();
            let (w, h) = viewport.block_size();
            // braille packs 2x4 pixels into a cell when blocks won't fit
            let (size, marker) = if w <= available.width && h <= available.height {
                (Rect::new(0, 0, w, h), Marker::Block)
            } else {
                let bw = (2 + (w - 2) / 2).min(available.width);
                let bh = (2 + (h - 2 + 3) / 4).min(available.height);
                (Rect::new(0, 0, bw, bh), Marker::Braille)
            };

            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title(title)
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds(viewport.x_bounds())
                .y_bounds(viewport.y_bounds())
                .marker(marker)
                .paint(|ctx| {
                    for (level, coords) in shades.iter().enumerate() {
                        if !coords.is_empty() {
                            ctx.draw(&Points {
                                coords,
                                color: colour(level as u8),
                            });
                        }
                    }
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }
}

/// useful for testing non-display routines: keeps the most recent frame
#[derive(Default)]
pub struct DummyRenderer {
    pub frames_drawn: usize,
    pub last: Option<Frame>,
}

impl DummyRenderer {
    pub fn new() -> DummyRenderer {
        DummyRenderer::default()
    }
}

impl Renderer for DummyRenderer {
    fn draw(&mut self, frame: &Frame) -> Result<(), io::Error> {
        self.frames_drawn += 1;
        self.last = Some(frame.clone());
        Ok(())
    }
}
