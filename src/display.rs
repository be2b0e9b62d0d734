//! # display
//!
//! The pixel model the interpreter draws into. There is a single 128x64
//! backing grid whatever the active resolution; low-res and VIP hi-res
//! pixels are blocks of backing cells, so switching resolution never
//! reallocates. Rendering is somebody else's problem: once per refresh we
//! hand out a [`Frame`] snapshot and age the fade counters.
use std::fmt;
use std::str::FromStr;

use crate::error::Chip8Error;

pub const GRID_WIDTH: usize = 128;
pub const GRID_HEIGHT: usize = 64;

/// frames a pixel stays lit after turning off with [`Filter::FixFlicker`]
pub const OFF_DELAY: u8 = 2;
/// frames a pixel takes to fade out with [`Filter::Fade`]
pub const FADE_DELAY: u8 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// 64x32, the COSMAC VIP screen
    Low,
    /// 64x64, hybrid VIP programs booted via 1260
    VipHigh,
    /// 128x64, SUPER-CHIP
    High,
}

impl Resolution {
    /// logical (width, height)
    pub fn size(self) -> (usize, usize) {
        let (sx, sy) = self.scale();
        (GRID_WIDTH / sx, GRID_HEIGHT / sy)
    }

    /// backing cells per logical pixel
    fn scale(self) -> (usize, usize) {
        match self {
            Resolution::Low => (2, 2),
            Resolution::VipHigh => (2, 1),
            Resolution::High => (1, 1),
        }
    }
}

/// how a pixel turning off is shown
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Filter {
    #[default]
    None,
    FixFlicker,
    Fade,
}

impl Filter {
    fn off_delay(self) -> u8 {
        match self {
            Filter::None => 0,
            Filter::FixFlicker => OFF_DELAY,
            Filter::Fade => FADE_DELAY,
        }
    }
}

impl FromStr for Filter {
    type Err = Chip8Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Filter::None),
            "fix-flicker" | "fixflicker" => Ok(Filter::FixFlicker),
            "fade" => Ok(Filter::Fade),
            _ => Err(Chip8Error::UnknownFilter(s.to_string())),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Filter::None => "none",
            Filter::FixFlicker => "fix-flicker",
            Filter::Fade => "fade",
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pixel {
    pub on: bool,
    pub frames_until_off: u8,
}

impl Pixel {
    fn turn_on(&mut self) {
        self.on = true;
        self.frames_until_off = 0;
    }

    fn turn_off(&mut self, filter: Filter) {
        if self.on {
            self.on = false;
            self.frames_until_off = filter.off_delay();
        }
    }

    /// whether a renderer should still show this pixel in the "on" colour
    pub fn is_lit(&self) -> bool {
        self.on || self.frames_until_off > 0
    }
}

/// A snapshot of the active resolution, row-major, handed to the renderer
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub resolution: Resolution,
    pub filter: Filter,
    pub pixels: Vec<Pixel>,
}

impl Frame {
    pub fn get(&self, x: usize, y: usize) -> Pixel {
        self.pixels[y * self.width + x]
    }
}

pub struct Display {
    cells: Vec<Pixel>,
    resolution: Resolution,
    filter: Filter,
}

impl Display {
    pub fn new(filter: Filter) -> Self {
        Display {
            cells: vec![Pixel::default(); GRID_WIDTH * GRID_HEIGHT],
            resolution: Resolution::Low,
            filter,
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.resolution = resolution;
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    /// turn everything off, honouring the filter
    pub fn clear(&mut self) {
        let filter = self.filter;
        self.cells.iter_mut().for_each(|c| c.turn_off(filter));
    }

    /// backing cell indices covered by logical pixel (x, y)
    fn cells_of(&self, x: usize, y: usize) -> impl Iterator<Item = usize> {
        let (sx, sy) = self.resolution.scale();
        (0..sy).flat_map(move |dy| (0..sx).map(move |dx| (y * sy + dy) * GRID_WIDTH + x * sx + dx))
    }

    pub fn is_on(&self, x: usize, y: usize) -> bool {
        let (sx, sy) = self.resolution.scale();
        self.cells[y * sy * GRID_WIDTH + x * sx].on
    }

    /// XOR one logical pixel, returning true on collision
    fn flip(&mut self, x: usize, y: usize) -> bool {
        let was_on = self.is_on(x, y);
        let filter = self.filter;
        for i in self.cells_of(x, y) {
            if was_on {
                self.cells[i].turn_off(filter);
            } else {
                self.cells[i].turn_on();
            }
        }
        was_on
    }

    /// Draw a sprite whose rows are MSB-aligned in a u16 (8-wide sprites sit
    /// in the high byte). The origin always wraps; pixels past the edge wrap
    /// or get clipped depending on `wrap`. Returns the collision flag for
    /// this draw only.
    pub fn draw_sprite(&mut self, x: usize, y: usize, rows: &[u16], width: usize, wrap: bool) -> bool {
        let (w, h) = self.resolution.size();
        let (x0, y0) = (x % w, y % h);
        let mut collision = false;
        for (row, &bits) in rows.iter().enumerate() {
            let mut py = y0 + row;
            if py >= h {
                if !wrap {
                    break;
                }
                py %= h;
            }
            for col in 0..width {
                if bits & (0x8000u16 >> col) == 0 {
                    continue;
                }
                let mut px = x0 + col;
                if px >= w {
                    if !wrap {
                        break;
                    }
                    px %= w;
                }
                collision |= self.flip(px, py);
            }
        }
        collision
    }

    /// scroll down `n` logical rows
    pub fn scroll_down(&mut self, n: usize) {
        let rows = (n * self.resolution.scale().1).min(GRID_HEIGHT);
        self.cells.copy_within(0..(GRID_HEIGHT - rows) * GRID_WIDTH, rows * GRID_WIDTH);
        self.cells[..rows * GRID_WIDTH].fill(Pixel::default());
    }

    /// scroll right `n` logical columns
    pub fn scroll_right(&mut self, n: usize) {
        let cols = (n * self.resolution.scale().0).min(GRID_WIDTH);
        for row in self.cells.chunks_mut(GRID_WIDTH) {
            row.copy_within(0..GRID_WIDTH - cols, cols);
            row[..cols].fill(Pixel::default());
        }
    }

    /// scroll left `n` logical columns
    pub fn scroll_left(&mut self, n: usize) {
        let cols = (n * self.resolution.scale().0).min(GRID_WIDTH);
        for row in self.cells.chunks_mut(GRID_WIDTH) {
            row.copy_within(cols.., 0);
            row[GRID_WIDTH - cols..].fill(Pixel::default());
        }
    }

    /// snapshot of the active resolution
    pub fn frame(&self) -> Frame {
        let (width, height) = self.resolution.size();
        let (sx, sy) = self.resolution.scale();
        let pixels = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| self.cells[y * sy * GRID_WIDTH + x * sx])
            .collect();
        Frame {
            width,
            height,
            resolution: self.resolution,
            filter: self.filter,
            pixels,
        }
    }

    /// one refresh has gone by
    pub fn age(&mut self) {
        for c in self.cells.iter_mut() {
            c.frames_until_off = c.frames_until_off.saturating_sub(1);
        }
    }
}
