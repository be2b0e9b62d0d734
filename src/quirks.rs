//! # quirks
//!
//! CHIP-8 never had one canonical implementation. The COSMAC VIP interpreter,
//! CHIP-48 on the HP-48 and SUPER-CHIP all disagree on a handful of
//! instructions, and programs written for one platform often break on the
//! others. A `Quirks` record captures those disagreements; it is built once
//! per program load and never changes afterwards.
use crate::error::Chip8Error;
use std::fmt;
use std::str::FromStr;

/// what happens to I after Fx55/Fx65
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryIndexing {
    /// I += X + 1 (COSMAC VIP)
    IncrementByXPlusOne,
    /// I += X (CHIP-48)
    IncrementByX,
    /// I is left alone (SUPER-CHIP 1.1 onwards)
    Unchanged,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quirks {
    /// 8xy1/8xy2/8xy3 zero VF
    pub logic_clears_vf: bool,
    /// 8xy6/8xyE copy VY into VX before shifting
    pub shift_reads_vy: bool,
    /// Bnnn jumps to nnn + VX instead of nnn + V0
    pub jump_uses_vx: bool,
    /// sprites wrap around the screen edges instead of being clipped
    pub wrap_sprites: bool,
    /// Dxyn waits for the next display refresh before drawing
    pub vblank_wait: bool,
    pub memory: MemoryIndexing,
    /// Fx1E sets VF when I leaves the 12-bit address space. Off everywhere
    /// by default; only a few programs (e.g. Spacefight 2091!) expect it.
    pub index_overflow_flag: bool,
}

impl Default for Quirks {
    fn default() -> Self {
        Platform::OriginalChip8.quirks()
    }
}

/// Platforms from the CHIP-8 program database that we know how to run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    OriginalChip8,
    HybridVip,
    ModernChip8,
    Chip8x,
    Chip48,
    SuperChip,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::OriginalChip8,
        Platform::HybridVip,
        Platform::ModernChip8,
        Platform::Chip8x,
        Platform::Chip48,
        Platform::SuperChip,
    ];

    pub fn quirks(self) -> Quirks {
        let vip = Quirks {
            logic_clears_vf: true,
            shift_reads_vy: true,
            jump_uses_vx: false,
            wrap_sprites: false,
            vblank_wait: true,
            memory: MemoryIndexing::IncrementByXPlusOne,
            index_overflow_flag: false,
        };
        match self {
            Platform::OriginalChip8 | Platform::HybridVip | Platform::Chip8x => vip,
            Platform::ModernChip8 => Quirks {
                logic_clears_vf: false,
                vblank_wait: false,
                ..vip
            },
            Platform::Chip48 => Quirks {
                logic_clears_vf: false,
                shift_reads_vy: false,
                jump_uses_vx: true,
                vblank_wait: false,
                memory: MemoryIndexing::IncrementByX,
                ..vip
            },
            Platform::SuperChip => Quirks {
                logic_clears_vf: false,
                shift_reads_vy: false,
                jump_uses_vx: true,
                vblank_wait: false,
                memory: MemoryIndexing::Unchanged,
                ..vip
            },
        }
    }

    /// instructions per second a typical program for this platform expects
    pub fn default_ips(self) -> u32 {
        match self {
            Platform::OriginalChip8 | Platform::HybridVip | Platform::Chip8x => 900,
            Platform::ModernChip8 => 720,
            Platform::Chip48 | Platform::SuperChip => 1800,
        }
    }

    /// 0230 and the 1260 boot trick for 64x64 programs
    pub fn has_vip_hires(self) -> bool {
        self == Platform::HybridVip
    }

    /// 00Cn, 00FB-00FF, Dxy0, Fx30, Fx75, Fx85
    pub fn has_superchip_opcodes(self) -> bool {
        self == Platform::SuperChip
    }

    pub fn id(self) -> &'static str {
        match self {
            Platform::OriginalChip8 => "originalChip8",
            Platform::HybridVip => "hybridVIP",
            Platform::ModernChip8 => "modernChip8",
            Platform::Chip8x => "chip8x",
            Platform::Chip48 => "chip48",
            Platform::SuperChip => "superchip",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Platform {
    type Err = Chip8Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .iter()
            .copied()
            .find(|p| p.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| Chip8Error::UnknownPlatform(s.to_string()))
    }
}

/// Everything that comes alongside the program bytes. Only `quirks`,
/// `platform` and `ips` matter to execution.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgramMetadata {
    pub title: String,
    pub authors: Vec<String>,
    pub release: Option<String>,
    pub description: Option<String>,
    pub platform: Platform,
    pub quirks: Quirks,
    pub ips: u32,
}

impl ProgramMetadata {
    pub fn new(title: &str, platform: Platform) -> Self {
        ProgramMetadata {
            title: title.to_string(),
            authors: Vec::new(),
            release: None,
            description: None,
            platform,
            quirks: platform.quirks(),
            ips: platform.default_ips(),
        }
    }

    pub fn with_ips(mut self, ips: u32) -> Self {
        self.ips = ips.max(1);
        self
    }

    pub fn with_quirks(mut self, quirks: Quirks) -> Self {
        self.quirks = quirks;
        self
    }
}
