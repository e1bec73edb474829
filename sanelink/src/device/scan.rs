//! The frame reader and the acquire-image loop that drives
//! START/GET_PARAMETERS/data-socket-connect once per frame.

use std::io::Read;
use std::net::TcpStream;

use log::warn;

use crate::auth::CredentialProvider;
use crate::codec::ScanParameters;
use crate::enums::RpcOp;
use crate::error::{FramingError, Status};
use crate::image::{Frame, Image, ImageBuilder};
use crate::session::Session;
use crate::wire;
use crate::Error;

/// The byte-order word sent back by START : `0x4321` means
/// the data channel carries big-endian 16-bit samples; anything else
/// means little-endian.
const BIG_ENDIAN_BYTE_ORDER: u32 = 0x4321;

/// One event on the record-framed data channel.
enum RecordEvent {
    Record(Vec<u8>),
    EndOfRecords,
}

/// Reads one record: a length word followed by that many bytes, or the
/// `0xFFFFFFFF` sentinel optionally followed by a one-byte status.
fn next_record(r: &mut impl Read) -> Result<RecordEvent, Error> {
    let len = wire::read_word(r)?;
    if len == 0xFFFF_FFFF {
        let mut status_byte = [0u8; 1];
        return match r.read(&mut status_byte) {
            Ok(0) => Ok(RecordEvent::EndOfRecords),
            Ok(_) => {
                let status = Status::from_word(status_byte[0] as u32);
                if status == Status::Eof {
                    Ok(RecordEvent::EndOfRecords)
                } else {
                    Err(FramingError::UnexpectedStatus(status).into())
                }
            }
            Err(e) => Err(e.into()),
        };
    }
    // TODO: widen once a streaming, rather than buffer-all, frame reader
    // exists; for now a record this large cannot be safely preallocated.
    if len > i32::MAX as u32 {
        return Err(FramingError::RecordTooLarge(len).into());
    }
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    Ok(RecordEvent::Record(buf))
}

/// Reads one complete frame off `stream`. `params.lines` is updated in
/// place if it was unknown going in.
pub fn read_frame(
    stream: &mut impl Read,
    params: &mut ScanParameters,
    big_endian_samples: bool,
) -> Result<Frame, Error> {
    let expected = params.expected_size();
    let mut buffer = Vec::with_capacity(expected.unwrap_or(4096) as usize);

    loop {
        match next_record(stream)? {
            RecordEvent::Record(bytes) => buffer.extend_from_slice(&bytes),
            RecordEvent::EndOfRecords => break,
        }
    }

    if let Some(expected) = expected {
        let actual = buffer.len() as u32;
        if actual < expected {
            warn!(
                "frame short by {} bytes; padding with zeros",
                expected - actual
            );
            buffer.resize(expected as usize, 0);
        } else if actual > expected {
            return Err(FramingError::TruncatedRead {
                expected,
                actual,
            }
            .into());
        }
    }

    if params.depth == 16 && !big_endian_samples {
        if buffer.len() % 2 != 0 {
            return Err(FramingError::UnalignedSamples(buffer.len()).into());
        }
        for pair in buffer.chunks_exact_mut(2) {
            pair.swap(0, 1);
        }
    }

    if params.lines.is_none() && params.bytes_per_line > 0 {
        params.lines = Some(buffer.len() as u32 / params.bytes_per_line);
    }

    Ok(Frame {
        params: *params,
        data: buffer,
    })
}

impl<C: CredentialProvider> Session<C> {
    /// Runs the acquire-image loop: START, GET_PARAMETERS,
    /// connect the data socket, read one frame, repeat until the
    /// daemon marks a frame as last. Three iterations for a three-pass
    /// color scan, one for gray/rgb.
    pub fn scan(&mut self, device: &mut crate::device::DeviceHandle) -> Result<Image, Error> {
        let handle = self.require_device_open()?;
        self.set_state(crate::session::SessionState::Scanning(handle));

        let mut builder = ImageBuilder::new();
        loop {
            let (port, big_endian_samples) = self.start(handle)?;
            let mut params = self.get_parameters(handle)?;

            let mut data_socket = TcpStream::connect((self.host.as_str(), port))?;
            data_socket.set_read_timeout(self.config.read_timeout)?;
            data_socket.set_nodelay(true)?;

            let frame = read_frame(&mut data_socket, &mut params, big_endian_samples)?;
            drop(data_socket);

            let last_frame = frame.params.last_frame;
            builder.add(frame)?;

            if last_frame {
                break;
            }
        }

        self.set_state(crate::session::SessionState::DeviceOpen(handle));
        builder.build()
    }

    /// START: returns the data port and the byte-order
    /// hint for 16-bit samples, driving one authorization re-drive if the
    /// reply carries a resource challenge.
    fn start(&mut self, handle: u32) -> Result<(u16, bool), Error> {
        self.send_start(handle)?;
        let (mut status, mut port, mut byte_order, mut resource) = self.read_start_reply()?;
        if !resource.is_empty() {
            self.authorize(&resource)?;
            self.send_start(handle)?;
            let retried = self.read_start_reply()?;
            status = retried.0;
            port = retried.1;
            byte_order = retried.2;
            resource = retried.3;
        }
        let _ = resource;
        status.into_result()?;
        Ok((port as u16, byte_order == BIG_ENDIAN_BYTE_ORDER))
    }

    fn send_start(&mut self, handle: u32) -> Result<(), Error> {
        use std::io::Write;
        log::debug!("dispatching {:?}", RpcOp::Start);
        wire::write_word(&mut self.control, RpcOp::Start.to_word())?;
        wire::write_word(&mut self.control, handle)?;
        self.control.flush()?;
        Ok(())
    }

    fn read_start_reply(&mut self) -> Result<(Status, u32, u32, String), Error> {
        let status = Status::from_word(wire::read_word(&mut self.control)?);
        let port = wire::read_word(&mut self.control)?;
        let byte_order = wire::read_word(&mut self.control)?;
        let resource = wire::read_string(&mut self.control)?;
        Ok((status, port, byte_order, resource))
    }

    /// GET_PARAMETERS.
    fn get_parameters(&mut self, handle: u32) -> Result<ScanParameters, Error> {
        use std::io::Write;
        log::debug!("dispatching {:?}", RpcOp::GetParameters);
        wire::write_word(&mut self.control, RpcOp::GetParameters.to_word())?;
        wire::write_word(&mut self.control, handle)?;
        self.control.flush()?;

        let status = Status::from_word(wire::read_word(&mut self.control)?);
        let params = ScanParameters::read(&mut self.control)?;
        status.into_result()?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::FrameType;
    use std::io::Cursor;

    #[test]
    fn single_frame_with_known_line_count() {
        let mut bytes = Vec::new();
        wire::write_word(&mut bytes, 20).unwrap();
        bytes.extend(std::iter::repeat(0x7Fu8).take(20));
        wire::write_word(&mut bytes, 0xFFFF_FFFF).unwrap();

        let mut params = ScanParameters {
            format: FrameType::Gray,
            last_frame: true,
            bytes_per_line: 10,
            pixels_per_line: 10,
            lines: Some(2),
            depth: 8,
        };
        let mut cursor = Cursor::new(bytes);
        let frame = read_frame(&mut cursor, &mut params, true).unwrap();
        assert_eq!(frame.data, vec![0x7F; 20]);
    }

    #[test]
    fn short_read_is_zero_padded() {
        let mut bytes = Vec::new();
        wire::write_word(&mut bytes, 10).unwrap();
        bytes.extend(std::iter::repeat(0xAAu8).take(10));
        wire::write_word(&mut bytes, 0xFFFF_FFFF).unwrap();

        let mut params = ScanParameters {
            format: FrameType::Gray,
            last_frame: true,
            bytes_per_line: 10,
            pixels_per_line: 10,
            lines: Some(2),
            depth: 8,
        };
        let mut cursor = Cursor::new(bytes);
        let frame = read_frame(&mut cursor, &mut params, true).unwrap();
        assert_eq!(frame.data.len(), 20);
        assert_eq!(&frame.data[..10], &[0xAA; 10]);
        assert_eq!(&frame.data[10..], &[0; 10]);
    }

    #[test]
    fn oversized_record_is_refused() {
        let mut bytes = Vec::new();
        wire::write_word(&mut bytes, 0x8000_0000).unwrap();
        let mut cursor = Cursor::new(bytes);
        let err = next_record(&mut cursor).unwrap_err();
        assert!(matches!(
            err,
            Error::Framing(FramingError::RecordTooLarge(_))
        ));
    }

    #[test]
    fn unknown_line_count_is_derived_from_buffer_length() {
        let mut bytes = Vec::new();
        wire::write_word(&mut bytes, 20).unwrap();
        bytes.extend(std::iter::repeat(0u8).take(20));
        wire::write_word(&mut bytes, 0xFFFF_FFFF).unwrap();

        let mut params = ScanParameters {
            format: FrameType::Gray,
            last_frame: true,
            bytes_per_line: 10,
            pixels_per_line: 10,
            lines: None,
            depth: 8,
        };
        let mut cursor = Cursor::new(bytes);
        let frame = read_frame(&mut cursor, &mut params, true).unwrap();
        assert_eq!(frame.params.lines, Some(2));
    }

    #[test]
    fn sixteen_bit_little_endian_samples_are_swapped() {
        let mut bytes = Vec::new();
        wire::write_word(&mut bytes, 4).unwrap();
        bytes.extend([0x01, 0x02, 0x03, 0x04]);
        wire::write_word(&mut bytes, 0xFFFF_FFFF).unwrap();

        let mut params = ScanParameters {
            format: FrameType::Gray,
            last_frame: true,
            bytes_per_line: 4,
            pixels_per_line: 2,
            lines: Some(1),
            depth: 16,
        };
        let mut cursor = Cursor::new(bytes);
        let frame = read_frame(&mut cursor, &mut params, false).unwrap();
        assert_eq!(frame.data, vec![0x02, 0x01, 0x04, 0x03]);
    }

    #[test]
    fn swap_is_its_own_inverse() {
        let original = vec![0x01u8, 0x02, 0x03, 0x04];
        let mut once = original.clone();
        for pair in once.chunks_exact_mut(2) {
            pair.swap(0, 1);
        }
        let mut twice = once.clone();
        for pair in twice.chunks_exact_mut(2) {
            pair.swap(0, 1);
        }
        assert_eq!(twice, original);
    }

    #[test]
    fn truncated_read_over_expected_size_is_an_error() {
        let mut bytes = Vec::new();
        wire::write_word(&mut bytes, 25).unwrap();
        bytes.extend(std::iter::repeat(0u8).take(25));
        wire::write_word(&mut bytes, 0xFFFF_FFFF).unwrap();

        let mut params = ScanParameters {
            format: FrameType::Gray,
            last_frame: true,
            bytes_per_line: 10,
            pixels_per_line: 10,
            lines: Some(2),
            depth: 8,
        };
        let mut cursor = Cursor::new(bytes);
        let err = read_frame(&mut cursor, &mut params, true).unwrap_err();
        assert!(matches!(
            err,
            Error::Framing(FramingError::TruncatedRead { .. })
        ));
    }
}
