//! The image assembler: collects 1 or 3 frames into a finished raster,
//! enforcing the singleton-vs-three-pass shape and the write-once
//! geometry fields.

use crate::codec::ScanParameters;
use crate::enums::FrameType;
use crate::Error;

/// One decoded frame, as produced by [`crate::device::scan::read_frame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub params: ScanParameters,
    pub data: Vec<u8>,
}

/// A finished image: either a single gray/rgb frame, or the three color
/// planes in a fixed red, green, blue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub planes: Vec<(FrameType, Vec<u8>)>,
    pub width: u32,
    pub height: u32,
    pub bytes_per_line: u32,
    pub bits_per_sample: u32,
}

/// Accumulates frames belonging to one image. State machine: Empty →
/// Partial → Complete; a rejected `add` leaves the builder unchanged.
#[derive(Debug, Default)]
pub struct ImageBuilder {
    frames: Vec<Frame>,
    geometry: Option<Geometry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Geometry {
    width: u32,
    height: u32,
    bytes_per_line: u32,
    bits_per_sample: u32,
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The frames accumulated so far, for introspection (e.g. verifying
    /// the fixed red/green/blue emission order in tests).
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn add(&mut self, frame: Frame) -> Result<(), Error> {
        let frame_type = frame.params.format;

        if self.frames.iter().any(|f| f.params.format == frame_type) {
            return Err(Error::invalid_state("duplicate frame type for this image"));
        }

        let adding_singleton = !frame_type.is_color_channel();
        let has_singleton = self
            .frames
            .iter()
            .any(|f| !f.params.format.is_color_channel());
        if !self.frames.is_empty() && (adding_singleton || has_singleton) {
            return Err(Error::invalid_state(
                "cannot mix a singleton frame with any other frame",
            ));
        }

        let lines = frame.params.lines.ok_or_else(|| {
            Error::invalid_state("frame added to an image builder with an unknown line count")
        })?;
        let geometry = Geometry {
            width: frame.params.pixels_per_line,
            height: lines,
            bytes_per_line: frame.params.bytes_per_line,
            bits_per_sample: frame.params.depth,
        };

        match self.geometry {
            None => self.geometry = Some(geometry),
            Some(existing) if existing == geometry => {}
            Some(_) => {
                return Err(Error::invalid_state(
                    "frame geometry disagrees with the image's first frame",
                ))
            }
        }

        if let Some(first) = self.frames.first() {
            if first.data.len() != frame.data.len() {
                return Err(Error::invalid_state(
                    "frame buffer length disagrees with the first frame",
                ));
            }
        }

        self.frames.push(frame);
        Ok(())
    }

    /// Succeeds only when the collection is exactly one singleton frame or
    /// exactly the three-color set. Frames are emitted in the fixed order
    /// red, green, blue, rgb, gray regardless of arrival order.
    pub fn build(self) -> Result<Image, Error> {
        let geometry = self
            .geometry
            .ok_or_else(|| Error::invalid_state("image builder has no frames"))?;

        let is_singleton = self.frames.len() == 1
            && matches!(
                self.frames[0].params.format,
                FrameType::Gray | FrameType::Rgb
            );
        let is_three_pass = self.frames.len() == 3
            && [FrameType::Red, FrameType::Green, FrameType::Blue]
                .iter()
                .all(|ty| self.frames.iter().any(|f| f.params.format == *ty));

        if !is_singleton && !is_three_pass {
            return Err(Error::invalid_state(
                "image builder does not hold a complete singleton or three-color set",
            ));
        }

        const EMIT_ORDER: [FrameType; 5] = [
            FrameType::Red,
            FrameType::Green,
            FrameType::Blue,
            FrameType::Rgb,
            FrameType::Gray,
        ];
        let mut planes = Vec::with_capacity(self.frames.len());
        for ty in EMIT_ORDER {
            if let Some(frame) = self.frames.iter().find(|f| f.params.format == ty) {
                planes.push((ty, frame.data.clone()));
            }
        }

        Ok(Image {
            planes,
            width: geometry.width,
            height: geometry.height,
            bytes_per_line: geometry.bytes_per_line,
            bits_per_sample: geometry.bits_per_sample,
        })
    }
}
