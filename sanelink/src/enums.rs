//! The enum registry: wire-value mappings for frame type, option value
//! type, units, constraint type, RPC opcode, and the capability bit-set.
//!
//! Each type is a plain Rust enum with a `from_word`/`to_word` pair built
//! from a compile-time match table, no reflection, no process-wide cache.
//! Unknown wire values resolve to an explicit `Unknown`/`None`-shaped
//! variant; callers decide whether that is a protocol error.

use bitflags::bitflags;

/// SANE RPC opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcOp {
    Init,
    GetDevices,
    Open,
    Close,
    GetOptionDescriptors,
    ControlOption,
    GetParameters,
    Start,
    Cancel,
    Authorize,
    Exit,
}

impl RpcOp {
    pub const fn to_word(self) -> u32 {
        match self {
            Self::Init => 0,
            Self::GetDevices => 1,
            Self::Open => 2,
            Self::Close => 3,
            Self::GetOptionDescriptors => 4,
            Self::ControlOption => 5,
            Self::GetParameters => 6,
            Self::Start => 7,
            Self::Cancel => 8,
            Self::Authorize => 9,
            Self::Exit => 10,
        }
    }
}

/// Frame type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    Gray,
    Rgb,
    Red,
    Green,
    Blue,
}

impl FrameType {
    pub const fn from_word(word: u32) -> Option<Self> {
        match word {
            0 => Some(Self::Gray),
            1 => Some(Self::Rgb),
            2 => Some(Self::Red),
            3 => Some(Self::Green),
            4 => Some(Self::Blue),
            _ => None,
        }
    }

    pub const fn to_word(self) -> u32 {
        match self {
            Self::Gray => 0,
            Self::Rgb => 1,
            Self::Red => 2,
            Self::Green => 3,
            Self::Blue => 4,
        }
    }

    pub const fn is_color_channel(self) -> bool {
        matches!(self, Self::Red | Self::Green | Self::Blue)
    }
}

/// Option value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Int,
    Fixed,
    String,
    Button,
    Group,
    Unknown(u32),
}

impl ValueType {
    pub const fn from_word(word: u32) -> Self {
        match word {
            0 => Self::Bool,
            1 => Self::Int,
            2 => Self::Fixed,
            3 => Self::String,
            4 => Self::Button,
            5 => Self::Group,
            other => Self::Unknown(other),
        }
    }

    pub const fn to_word(self) -> u32 {
        match self {
            Self::Bool => 0,
            Self::Int => 1,
            Self::Fixed => 2,
            Self::String => 3,
            Self::Button => 4,
            Self::Group => 5,
            Self::Unknown(word) => word,
        }
    }

    /// Whether the range constraint shape applies to this type.
    pub const fn supports_range(self) -> bool {
        matches!(self, Self::Int | Self::Fixed)
    }

    /// Whether values of this type are transported as a vector of words.
    pub const fn is_word_sized(self) -> bool {
        matches!(self, Self::Bool | Self::Int | Self::Fixed)
    }
}

/// Option units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    None,
    Pixel,
    Bit,
    Mm,
    Dpi,
    Percent,
    Microsecond,
    Unknown(u32),
}

impl Unit {
    pub const fn from_word(word: u32) -> Self {
        match word {
            0 => Self::None,
            1 => Self::Pixel,
            2 => Self::Bit,
            3 => Self::Mm,
            4 => Self::Dpi,
            5 => Self::Percent,
            6 => Self::Microsecond,
            other => Self::Unknown(other),
        }
    }

    pub const fn to_word(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Pixel => 1,
            Self::Bit => 2,
            Self::Mm => 3,
            Self::Dpi => 4,
            Self::Percent => 5,
            Self::Microsecond => 6,
            Self::Unknown(word) => word,
        }
    }
}

/// The tag of an option's constraint shape. The body carrying the actual
/// bounds/list lives in `codec::Constraint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintType {
    None,
    Range,
    WordList,
    StringList,
    Unknown(u32),
}

impl ConstraintType {
    pub const fn from_word(word: u32) -> Self {
        match word {
            0 => Self::None,
            1 => Self::Range,
            2 => Self::WordList,
            3 => Self::StringList,
            other => Self::Unknown(other),
        }
    }

    pub const fn to_word(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Range => 1,
            Self::WordList => 2,
            Self::StringList => 3,
            Self::Unknown(word) => word,
        }
    }
}

/// The action word of a CONTROL_OPTION request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Get,
    Set,
    SetAuto,
}

impl ControlAction {
    pub const fn to_word(self) -> u32 {
        match self {
            Self::Get => 0,
            Self::Set => 1,
            Self::SetAuto => 2,
        }
    }
}

bitflags! {
    /// Option capability bits. Decoding a bit-set iterates members and
    /// includes those whose bit is set; encoding ORs them back together,
    /// which `bitflags` already implements.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u32 {
        const SOFT_SELECT = 1;
        const HARD_SELECT = 2;
        const SOFT_DETECT = 4;
        const EMULATED = 8;
        const AUTOMATIC = 16;
        const INACTIVE = 32;
        const ADVANCED = 64;
    }
}

impl Capabilities {
    /// Readable iff soft-detect is set and inactive is not.
    pub const fn is_readable(self) -> bool {
        self.contains(Self::SOFT_DETECT) && !self.contains(Self::INACTIVE)
    }

    /// Writable iff soft-select is set and inactive is not.
    pub const fn is_writable(self) -> bool {
        self.contains(Self::SOFT_SELECT) && !self.contains(Self::INACTIVE)
    }

    /// May be auto-set iff automatic is present.
    pub const fn supports_auto(self) -> bool {
        self.contains(Self::AUTOMATIC)
    }
}

bitflags! {
    /// CONTROL_OPTION response info bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ControlInfo: u32 {
        const INEXACT = 1;
        const RELOAD_OPTIONS = 2;
        const RELOAD_PARAMS = 4;
    }
}
