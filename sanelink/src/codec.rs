//! The codec: typed read/write of device entries, scan parameters, and
//! option descriptors built on top of `wire` and `enums`.

use std::io::{self, Read, Write};

use log::warn;

use crate::enums::{Capabilities, ConstraintType, FrameType, Unit, ValueType};
use crate::error::FramingError;
use crate::fixed::Fixed;
use crate::wire;

/// A device as returned by `GET_DEVICES` or `GET_DEVICE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    pub name: String,
    pub vendor: String,
    pub model: String,
    pub kind: String,
}

impl DeviceEntry {
    pub fn read(r: &mut impl Read) -> io::Result<Self> {
        Ok(Self {
            name: wire::read_string(r)?,
            vendor: wire::read_string(r)?,
            model: wire::read_string(r)?,
            kind: wire::read_string(r)?,
        })
    }

    pub fn write(&self, w: &mut impl Write) -> io::Result<()> {
        wire::write_string(w, &self.name)?;
        wire::write_string(w, &self.vendor)?;
        wire::write_string(w, &self.model)?;
        wire::write_string(w, &self.kind)
    }
}

/// Decodes a GET_DEVICES reply body, starting right after the status
/// word. The length word counts slots including a trailing terminator;
/// each of the first `length - 1` slots is preceded by a pointer word
/// that the wire quirk says to always treat as present, but a genuine
/// zero is still a framing error here, not a silent skip.
pub fn read_device_list(r: &mut impl Read) -> Result<Vec<DeviceEntry>, crate::Error> {
    let len = wire::read_word(r)? as usize;
    let mut devices = Vec::with_capacity(len.saturating_sub(1));
    for i in 0..len.saturating_sub(1) {
        if !wire::read_pointer(r)? {
            return Err(FramingError::NullDevicePointer(i).into());
        }
        devices.push(DeviceEntry::read(r)?);
    }
    // Trailing terminator slot; always discarded regardless of value.
    let _ = wire::read_word(r)?;
    Ok(devices)
}

/// Scan parameters: `lines` is `None` when the line count is
/// unknown in advance and only becomes known once the frame is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanParameters {
    pub format: FrameType,
    pub last_frame: bool,
    pub bytes_per_line: u32,
    pub pixels_per_line: u32,
    pub lines: Option<u32>,
    pub depth: u32,
}

impl ScanParameters {
    pub fn read(r: &mut impl Read) -> io::Result<Self> {
        let format_word = wire::read_word(r)?;
        let format = FrameType::from_word(format_word).unwrap_or(FrameType::Gray);
        let last_frame = wire::read_bool(r)?;
        let bytes_per_line = wire::read_word(r)?;
        let pixels_per_line = wire::read_word(r)?;
        let lines_word = wire::read_word(r)? as i32;
        let depth = wire::read_word(r)?;
        Ok(Self {
            format,
            last_frame,
            bytes_per_line,
            pixels_per_line,
            lines: if lines_word <= 0 {
                None
            } else {
                Some(lines_word as u32)
            },
            depth,
        })
    }

    pub fn write(&self, w: &mut impl Write) -> io::Result<()> {
        wire::write_word(w, self.format.to_word())?;
        wire::write_bool(w, self.last_frame)?;
        wire::write_word(w, self.bytes_per_line)?;
        wire::write_word(w, self.pixels_per_line)?;
        wire::write_word(w, self.lines.map_or(0, |l| l as i32 as u32))?;
        wire::write_word(w, self.depth)
    }

    /// The total byte size of the frame, if the line count is known.
    pub const fn expected_size(&self) -> Option<u32> {
        match self.lines {
            Some(lines) => Some(self.bytes_per_line * lines),
            None => None,
        }
    }
}

/// The body of an option's constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    None,
    RangeInt { min: i32, max: i32, quant: i32 },
    RangeFixed { min: Fixed, max: Fixed, quant: Fixed },
    WordList(Vec<i32>),
    FixedList(Vec<Fixed>),
    StringList(Vec<String>),
}

/// An option descriptor. `group` names the most recent group descriptor
/// seen before this one in the same response, resolved by the caller's
/// parser-local accumulator, never a module-level cache.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionDescriptor {
    pub name: String,
    pub title: String,
    pub description: String,
    pub group: Option<String>,
    pub value_type: ValueType,
    pub unit: Unit,
    pub element_size: u32,
    pub capabilities: Capabilities,
    pub constraint: Constraint,
}

impl OptionDescriptor {
    /// Decodes one descriptor following its fixed field sequence.
    /// `current_group` is the parser-local accumulator that tracks the most
    /// recently seen group descriptor's title; a `Group`-typed descriptor
    /// updates it but is otherwise returned like any other.
    pub fn read(r: &mut impl Read, current_group: &mut Option<String>) -> io::Result<Self> {
        // Step 1: discard the leading pointer word.
        let _ = wire::read_pointer(r)?;

        // Step 2: name, title, description.
        let name = wire::read_string(r)?;
        let title = wire::read_string(r)?;
        let description = wire::read_string(r)?;

        // Step 3: value-type, units, element-size, capability-word,
        // constraint-type.
        let value_type = ValueType::from_word(wire::read_word(r)?);
        let unit = Unit::from_word(wire::read_word(r)?);
        let element_size = wire::read_word(r)?;
        let capabilities = Capabilities::from_bits_retain(wire::read_word(r)?);
        let constraint_type = ConstraintType::from_word(wire::read_word(r)?);

        // Step 4: branch on constraint-type.
        let constraint = match constraint_type {
            ConstraintType::None => Constraint::None,
            ConstraintType::Range => {
                // One word preceding the range struct must be discarded.
                let _ = wire::read_word(r)?;
                let min = wire::read_word(r)? as i32;
                let max = wire::read_word(r)? as i32;
                let quant = wire::read_word(r)? as i32;
                match value_type {
                    ValueType::Int => Constraint::RangeInt { min, max, quant },
                    ValueType::Fixed => Constraint::RangeFixed {
                        min: Fixed::from_word(min as u32),
                        max: Fixed::from_word(max as u32),
                        quant: Fixed::from_word(quant as u32),
                    },
                    other => {
                        warn!(
                            "option {name:?} has a range constraint but value type {other:?}; dropping the range"
                        );
                        Constraint::None
                    }
                }
            }
            ConstraintType::WordList => {
                let values = wire::read_word_array(r)?;
                // The first word is a count, discarded; keep the rest.
                let values = values.into_iter().skip(1);
                match value_type {
                    ValueType::Fixed => {
                        Constraint::FixedList(values.map(|v| Fixed::from_word(v)).collect())
                    }
                    _ => Constraint::WordList(values.map(|v| v as i32).collect()),
                }
            }
            ConstraintType::StringList => {
                let len = wire::read_word(r)? as usize;
                let mut values = Vec::with_capacity(len.saturating_sub(1));
                for i in 0..len {
                    let s = wire::read_string(r)?;
                    // The last entry is an empty terminator, discarded.
                    if i + 1 < len {
                        values.push(s);
                    }
                }
                Constraint::StringList(values)
            }
            ConstraintType::Unknown(word) => {
                warn!("option {name:?} has unknown constraint type {word}; treating as unconstrained");
                Constraint::None
            }
        };

        if value_type == ValueType::Group {
            *current_group = Some(title.clone());
        }

        Ok(Self {
            name,
            title,
            description,
            group: current_group.clone(),
            value_type,
            unit,
            element_size,
            capabilities,
            constraint,
        })
    }
}
