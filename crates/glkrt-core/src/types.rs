#![forbid(unsafe_code)]

//! Enumerations and numeric constants of the display API.
//!
//! Every enum keeps the numeric value the interpreters expect (`as_raw`) and
//! can be decoded from a raw value (`from_raw`), since interpreters and peers
//! speak in plain integers.

/// Window kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WinType {
    /// Internal split node; never opened directly.
    Pair,
    /// Empty region.
    Blank,
    /// Scrolling text.
    TextBuffer,
    /// Fixed character grid.
    TextGrid,
    /// Pixel canvas.
    Graphics,
}

impl WinType {
    /// Raw value for "any window type" in style-hint calls.
    pub const ALL_TYPES_RAW: u32 = 0;

    /// Decode a raw window type.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(Self::Pair),
            2 => Some(Self::Blank),
            3 => Some(Self::TextBuffer),
            4 => Some(Self::TextGrid),
            5 => Some(Self::Graphics),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_raw(self) -> u32 {
        match self {
            Self::Pair => 1,
            Self::Blank => 2,
            Self::TextBuffer => 3,
            Self::TextGrid => 4,
            Self::Graphics => 5,
        }
    }

    /// TextBuffer and TextGrid windows carry keyboard and output state.
    #[must_use]
    pub const fn is_text(self) -> bool {
        matches!(self, Self::TextBuffer | Self::TextGrid)
    }

    /// Windows that have something on screen to draw into.
    #[must_use]
    pub const fn is_output(self) -> bool {
        matches!(self, Self::TextBuffer | Self::TextGrid | Self::Graphics)
    }

    /// Leaf types a caller may open.
    #[must_use]
    pub const fn is_openable(self) -> bool {
        !matches!(self, Self::Pair)
    }
}

/// Side of the split target the new window appears on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
    Above,
    Below,
}

impl Direction {
    /// Left/Right splits divide the width.
    #[must_use]
    pub const fn is_vertical(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }
}

/// How the key window's size is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Division {
    /// Size in the key window's natural units (rows, columns, pixels).
    Fixed,
    /// Size as a percentage of the pair's extent.
    Proportional,
}

/// Split method: direction, division and border bits packed as the
/// interpreters pass them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WinMethod(u32);

impl WinMethod {
    pub const LEFT: u32 = 0x00;
    pub const RIGHT: u32 = 0x01;
    pub const ABOVE: u32 = 0x02;
    pub const BELOW: u32 = 0x03;
    pub const DIR_MASK: u32 = 0x0f;

    pub const FIXED: u32 = 0x10;
    pub const PROPORTIONAL: u32 = 0x20;
    pub const DIVISION_MASK: u32 = 0xf0;

    pub const BORDER: u32 = 0x000;
    pub const NO_BORDER: u32 = 0x100;
    pub const BORDER_MASK: u32 = 0x100;

    /// Wrap a raw method value without validating it.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Build a well-formed method.
    #[must_use]
    pub const fn new(direction: Direction, division: Division) -> Self {
        let dir = match direction {
            Direction::Left => Self::LEFT,
            Direction::Right => Self::RIGHT,
            Direction::Above => Self::ABOVE,
            Direction::Below => Self::BELOW,
        };
        let div = match division {
            Division::Fixed => Self::FIXED,
            Division::Proportional => Self::PROPORTIONAL,
        };
        Self(dir | div)
    }

    /// Same method with the border bit set or cleared.
    #[must_use]
    pub const fn with_border(self, border: bool) -> Self {
        if border {
            Self(self.0 & !Self::BORDER_MASK)
        } else {
            Self(self.0 | Self::NO_BORDER)
        }
    }

    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    /// Direction, if the direction bits hold exactly one known value.
    #[must_use]
    pub const fn direction(self) -> Option<Direction> {
        match self.0 & Self::DIR_MASK {
            Self::LEFT => Some(Direction::Left),
            Self::RIGHT => Some(Direction::Right),
            Self::ABOVE => Some(Direction::Above),
            Self::BELOW => Some(Direction::Below),
            _ => None,
        }
    }

    /// Division, if the division bits hold exactly one known value.
    #[must_use]
    pub const fn division(self) -> Option<Division> {
        match self.0 & Self::DIVISION_MASK {
            Self::FIXED => Some(Division::Fixed),
            Self::PROPORTIONAL => Some(Division::Proportional),
            _ => None,
        }
    }

    /// Whether the split divides the width (Left/Right).
    ///
    /// Malformed direction bits count as horizontal, matching the way the
    /// axis check compares old and new methods.
    #[must_use]
    pub const fn is_vertical(self) -> bool {
        matches!(self.0 & Self::DIR_MASK, Self::LEFT | Self::RIGHT)
    }

    #[must_use]
    pub const fn has_border(self) -> bool {
        self.0 & Self::BORDER_MASK == Self::BORDER
    }
}

/// Text styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Style {
    #[default]
    Normal,
    Emphasized,
    Preformatted,
    Header,
    Subheader,
    Alert,
    Note,
    BlockQuote,
    Input,
    User1,
    User2,
}

impl Style {
    /// Number of defined styles.
    pub const COUNT: u32 = 11;

    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Normal),
            1 => Some(Self::Emphasized),
            2 => Some(Self::Preformatted),
            3 => Some(Self::Header),
            4 => Some(Self::Subheader),
            5 => Some(Self::Alert),
            6 => Some(Self::Note),
            7 => Some(Self::BlockQuote),
            8 => Some(Self::Input),
            9 => Some(Self::User1),
            10 => Some(Self::User2),
            _ => None,
        }
    }

    /// Decode, coercing out-of-range values to [`Style::Normal`].
    #[must_use]
    pub const fn from_raw_or_normal(raw: u32) -> Self {
        match Self::from_raw(raw) {
            Some(style) => style,
            None => Self::Normal,
        }
    }

    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self as u32
    }
}

/// Style hint selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleHint {
    Indentation,
    ParaIndentation,
    Justification,
    Size,
    Weight,
    Oblique,
    Proportional,
    TextColor,
    BackColor,
    ReverseColor,
}

impl StyleHint {
    /// Number of defined hints.
    pub const COUNT: u32 = 10;

    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Indentation),
            1 => Some(Self::ParaIndentation),
            2 => Some(Self::Justification),
            3 => Some(Self::Size),
            4 => Some(Self::Weight),
            5 => Some(Self::Oblique),
            6 => Some(Self::Proportional),
            7 => Some(Self::TextColor),
            8 => Some(Self::BackColor),
            9 => Some(Self::ReverseColor),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self as u32
    }

    /// Whether `value` is acceptable for this hint.
    #[must_use]
    pub const fn accepts(self, value: i32) -> bool {
        match self {
            Self::Justification => Justification::from_raw(value).is_some(),
            Self::Weight => matches!(value, -1..=1),
            Self::Oblique | Self::Proportional | Self::ReverseColor => matches!(value, 0 | 1),
            Self::TextColor | Self::BackColor => value as u32 & 0xFF00_0000 == 0,
            Self::Indentation | Self::ParaIndentation | Self::Size => true,
        }
    }
}

/// Values of the justification hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Justification {
    LeftFlush,
    LeftRight,
    Centered,
    RightFlush,
}

impl Justification {
    #[must_use]
    pub const fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::LeftFlush),
            1 => Some(Self::LeftRight),
            2 => Some(Self::Centered),
            3 => Some(Self::RightFlush),
            _ => None,
        }
    }
}

/// Stream/file open modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileMode {
    Write,
    Read,
    ReadWrite,
    WriteAppend,
}

impl FileMode {
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0x01 => Some(Self::Write),
            0x02 => Some(Self::Read),
            0x03 => Some(Self::ReadWrite),
            0x05 => Some(Self::WriteAppend),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_raw(self) -> u32 {
        match self {
            Self::Write => 0x01,
            Self::Read => 0x02,
            Self::ReadWrite => 0x03,
            Self::WriteAppend => 0x05,
        }
    }

    #[must_use]
    pub const fn is_readable(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    #[must_use]
    pub const fn is_writable(self) -> bool {
        !matches!(self, Self::Read)
    }
}

/// Seek origins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeekMode {
    Start,
    Current,
    End,
}

impl SeekMode {
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Start),
            1 => Some(Self::Current),
            2 => Some(Self::End),
            _ => None,
        }
    }
}

/// Purpose of a file reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FileType {
    #[default]
    Data,
    SavedGame,
    Transcript,
    InputRecord,
}

/// Usage flags of a file reference: purpose plus text/binary mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FileUsage {
    pub file_type: FileType,
    pub text_mode: bool,
}

impl FileUsage {
    pub const TYPE_MASK: u32 = 0x0f;
    pub const TEXT_MODE: u32 = 0x100;
    pub const BINARY_MODE: u32 = 0x000;

    #[must_use]
    pub const fn new(file_type: FileType, text_mode: bool) -> Self {
        Self {
            file_type,
            text_mode,
        }
    }

    /// Decode raw usage bits. Unknown type bits decode as [`FileType::Data`].
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        let file_type = match raw & Self::TYPE_MASK {
            0x01 => FileType::SavedGame,
            0x02 => FileType::Transcript,
            0x03 => FileType::InputRecord,
            _ => FileType::Data,
        };
        Self {
            file_type,
            text_mode: raw & Self::TEXT_MODE != 0,
        }
    }

    #[must_use]
    pub const fn as_raw(self) -> u32 {
        let kind = match self.file_type {
            FileType::Data => 0x00,
            FileType::SavedGame => 0x01,
            FileType::Transcript => 0x02,
            FileType::InputRecord => 0x03,
        };
        kind | if self.text_mode {
            Self::TEXT_MODE
        } else {
            Self::BINARY_MODE
        }
    }
}

/// Event kinds, shared by raw peer signals and caller-facing events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EventType {
    #[default]
    None,
    Timer,
    CharInput,
    LineInput,
    MouseInput,
    Arrange,
    Redraw,
    SoundNotify,
    Hyperlink,
}

impl EventType {
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::Timer),
            2 => Some(Self::CharInput),
            3 => Some(Self::LineInput),
            4 => Some(Self::MouseInput),
            5 => Some(Self::Arrange),
            6 => Some(Self::Redraw),
            7 => Some(Self::SoundNotify),
            8 => Some(Self::Hyperlink),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self as u32
    }
}

/// Special key codes delivered with character input.
pub mod keycode {
    pub const UNKNOWN: u32 = 0xffff_ffff;
    pub const LEFT: u32 = 0xffff_fffe;
    pub const RIGHT: u32 = 0xffff_fffd;
    pub const UP: u32 = 0xffff_fffc;
    pub const DOWN: u32 = 0xffff_fffb;
    pub const RETURN: u32 = 0xffff_fffa;
    pub const DELETE: u32 = 0xffff_fff9;
    pub const ESCAPE: u32 = 0xffff_fff8;
    pub const TAB: u32 = 0xffff_fff7;

    /// Key values at or above this are special keys, never characters.
    pub const SPECIAL_FLOOR: u32 = 0xffff_ff00;

    #[must_use]
    pub const fn is_special(value: u32) -> bool {
        value >= SPECIAL_FLOOR
    }
}

/// Gestalt selectors.
pub mod gestalt {
    pub const VERSION: u32 = 0;
    pub const CHAR_INPUT: u32 = 1;
    pub const LINE_INPUT: u32 = 2;
    pub const CHAR_OUTPUT: u32 = 3;
    pub const MOUSE_INPUT: u32 = 4;
    pub const TIMER: u32 = 5;
    pub const GRAPHICS: u32 = 6;
    pub const DRAW_IMAGE: u32 = 7;
    pub const HYPERLINKS: u32 = 11;
    pub const HYPERLINK_INPUT: u32 = 12;
    pub const UNICODE: u32 = 15;

    /// API version this runtime implements.
    pub const VERSION_VALUE: u32 = 0x0000_0700;
}
