//! CHIP-8 virtual machine
//!
//! ## Design
//!
//! * instructions per second are configurable per program; no attempt at
//!   cycle-exact COSMAC VIP timing
//! * timers and display refresh always run at 60Hz
//! * run as many instructions as are due, then sleep out the frame
//! * display, input and sound sit behind traits so alternatives can be
//!   plugged in; the default is TUI in-console
//! * platform differences are data (a quirks table), not code paths
//!
//! Model
//!
//! Chip8Interpreter (the environment)
//!  |-- renderer, input, sound
//!  |-- Cpu(metadata)
//!  |    |-- memory map, with fonts baked in
//!  |    |-- display model (128x64 backing grid)
//!  |    |-- timers, keypad
//!  |    `-- quirks(platform)
//!  |-- Scheduler(ips)
//!  |    `-- running / waiting for key / waiting for vblank / halted
//!  `-- main loop
//!       |-- poll input
//!       |-- scheduler.tick(elapsed) -> instructions, timer ticks, frames
//!       |-- tone edges -> sound; latest frame -> renderer
//!       `-- sleep until the next frame is due
pub mod cpu;
pub mod display;
pub mod error;
pub mod input;
pub mod interpreter;
pub mod memory;
pub mod quirks;
pub mod render;
pub mod scheduler;
pub mod sound;
pub mod timer;

pub use error::Chip8Error;
pub use interpreter::Chip8Interpreter;
pub use quirks::{Platform, ProgramMetadata, Quirks};
