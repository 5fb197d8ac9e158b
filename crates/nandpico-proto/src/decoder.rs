//! Two-phase command decoder.
//!
//! The transport delivers bytes with no message boundaries; frame length
//! depends on the opcode in the first header byte. [`Decoder`] owns the
//! reassembly buffer and moves through three phases:
//!
//! 1. `AwaitingHeader` - collecting the 5 header bytes. Once the header is
//!    complete the opcode fixes the total frame length.
//! 2. `AwaitingPayload` - collecting the opcode's payload, if it has one.
//! 3. `Complete` - a frame was returned from [`Decoder::push`]; the buffer
//!    is recycled on the next push.
//!
//! A frame is never dispatched early and partial input is never
//! misinterpreted: bytes accumulate until the full frame is present, however
//! the transport chunks them.

use heapless::Vec;

use crate::frame::{Command, Opcode, BLOCK_DATA_LEN, HEADER_LEN, MAX_FRAME_LEN, VOICE_WRITE_LEN};

/// Errors produced while framing the inbound byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Header carried an opcode this protocol version does not define.
    ///
    /// The five header bytes are consumed and the decoder awaits a fresh
    /// header; any payload the host sent after an unknown opcode is framed
    /// as new commands.
    UnknownOpcode(u8),
    /// A frame would overflow the reassembly buffer, which is sized for the
    /// largest defined frame. The decoder has reset itself.
    Overflow,
}

impl core::fmt::Display for FrameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownOpcode(opcode) => write!(f, "unknown opcode {:#04x}", opcode),
            Self::Overflow => write!(f, "frame exceeds the reassembly buffer"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FrameError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingHeader,
    AwaitingPayload,
    Complete,
}

/// Reassembles command frames from a streamed byte channel.
///
/// Push received bytes in arrival order; the decoder yields a [`Command`]
/// exactly when its final byte arrives. The returned command borrows the
/// decoder's buffer, so it must be handled before the next push.
#[derive(Debug)]
pub struct Decoder {
    buf: Vec<u8, MAX_FRAME_LEN>,
    phase: Phase,
    /// Total frame length; known once the header is complete.
    need: usize,
}

impl Decoder {
    /// A decoder awaiting the first header byte.
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            phase: Phase::AwaitingHeader,
            need: HEADER_LEN,
        }
    }

    /// Push one received byte.
    ///
    /// Returns `Ok(Some(_))` when this byte completes a frame and `Ok(None)`
    /// when more bytes are required. On `Err` the offending bytes have been
    /// discarded and the decoder awaits a fresh header.
    pub fn push(&mut self, byte: u8) -> Result<Option<Command<'_>>, FrameError> {
        if self.phase == Phase::Complete {
            self.restart();
        }
        if self.buf.push(byte).is_err() {
            self.restart();
            return Err(FrameError::Overflow);
        }
        match self.phase {
            Phase::AwaitingHeader => {
                if self.buf.len() < HEADER_LEN {
                    return Ok(None);
                }
                let raw = self.buf[0];
                let Some(opcode) = Opcode::from_u8(raw) else {
                    self.restart();
                    return Err(FrameError::UnknownOpcode(raw));
                };
                self.need = HEADER_LEN + opcode.payload_len();
                if self.buf.len() == self.need {
                    self.phase = Phase::Complete;
                    return Ok(self.parse());
                }
                self.phase = Phase::AwaitingPayload;
                Ok(None)
            }
            Phase::AwaitingPayload => {
                if self.buf.len() < self.need {
                    return Ok(None);
                }
                self.phase = Phase::Complete;
                Ok(self.parse())
            }
            Phase::Complete => Ok(None),
        }
    }

    /// Bytes buffered for the frame currently being assembled.
    pub fn pending(&self) -> usize {
        match self.phase {
            Phase::Complete => 0,
            _ => self.buf.len(),
        }
    }

    fn restart(&mut self) {
        self.buf.clear();
        self.phase = Phase::AwaitingHeader;
        self.need = HEADER_LEN;
    }

    /// Interpret the completed frame in `buf`. Total over its input: a
    /// malformed buffer yields `None` rather than panicking.
    fn parse(&self) -> Option<Command<'_>> {
        let header = self.buf.get(..HEADER_LEN)?;
        let opcode = Opcode::from_u8(header[0])?;
        let parameter = u32::from_le_bytes([header[1], header[2], header[3], header[4]]);
        let payload = self.buf.get(HEADER_LEN..)?;

        let command = match opcode {
            Opcode::GetVersion => Command::GetVersion,
            Opcode::GetFlashConfig => Command::GetFlashConfig,
            Opcode::ReadFlash => Command::ReadFlash { lba: parameter },
            Opcode::WriteFlash => {
                let (data, rest) = payload.split_first_chunk::<BLOCK_DATA_LEN>()?;
                let (spare, _) = rest.split_first_chunk()?;
                Command::WriteFlash {
                    lba: parameter,
                    data,
                    spare,
                }
            }
            Opcode::ReadFlashStream => Command::ReadFlashStream { blocks: parameter },
            Opcode::IsdInit => Command::IsdInit,
            Opcode::IsdDeinit => Command::IsdDeinit,
            Opcode::IsdReadId => Command::IsdReadId,
            Opcode::IsdReadFlash => Command::IsdReadFlash { address: parameter },
            Opcode::IsdEraseFlash => Command::IsdEraseFlash,
            Opcode::IsdWriteFlash => {
                let (data, _) = payload.split_first_chunk::<VOICE_WRITE_LEN>()?;
                Command::IsdWriteFlash {
                    address: parameter,
                    data,
                }
            }
            Opcode::IsdPlayVoice => Command::IsdPlayVoice { index: parameter },
            Opcode::IsdExecMacro => Command::IsdExecMacro { index: parameter },
            Opcode::IsdReset => Command::IsdReset,
            Opcode::RebootToBootloader => Command::RebootToBootloader,
        };
        Some(command)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{encode_header, BLOCK_RAW_LEN};

    /// Push a byte slice, panicking on framing errors; returns completed
    /// frame count.
    fn push_all(decoder: &mut Decoder, bytes: &[u8]) -> usize {
        let mut frames = 0;
        for &byte in bytes {
            match decoder.push(byte) {
                Ok(Some(_)) => frames += 1,
                Ok(None) => {}
                Err(e) => panic!("unexpected framing error: {}", e),
            }
        }
        frames
    }

    #[test]
    fn test_short_header_never_yields() {
        let mut decoder = Decoder::new();
        let header = encode_header(Opcode::GetVersion, 0);
        assert_eq!(push_all(&mut decoder, &header[..HEADER_LEN - 1]), 0);
        assert_eq!(decoder.pending(), 4);
    }

    #[test]
    fn test_header_only_opcode_completes_on_fifth_byte() {
        let mut decoder = Decoder::new();
        let header = encode_header(Opcode::IsdReset, 0);
        for &byte in &header[..4] {
            assert!(matches!(decoder.push(byte), Ok(None)));
        }
        assert!(matches!(
            decoder.push(header[4]),
            Ok(Some(Command::IsdReset))
        ));
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn test_parameter_is_little_endian() {
        let mut decoder = Decoder::new();
        for &byte in &[0x02, 0x01, 0x02, 0x03, 0x04] {
            if let Ok(Some(cmd)) = decoder.push(byte) {
                assert_eq!(cmd, Command::ReadFlash { lba: 0x0403_0201 });
                return;
            }
        }
        panic!("header never completed");
    }

    #[test]
    fn test_write_flash_waits_for_full_payload() {
        let mut decoder = Decoder::new();
        let header = encode_header(Opcode::WriteFlash, 7);
        assert_eq!(push_all(&mut decoder, &header), 0);

        let mut payload = [0u8; BLOCK_RAW_LEN];
        payload[0] = 0xAA;
        payload[511] = 0xBB;
        payload[512] = 0xCC;
        payload[527] = 0xDD;

        // Deliver in uneven chunks; nothing may complete early.
        assert_eq!(push_all(&mut decoder, &payload[..100]), 0);
        assert_eq!(push_all(&mut decoder, &payload[100..527]), 0);

        match decoder.push(payload[527]) {
            Ok(Some(Command::WriteFlash { lba, data, spare })) => {
                assert_eq!(lba, 7);
                assert_eq!(data[0], 0xAA);
                assert_eq!(data[511], 0xBB);
                assert_eq!(spare[0], 0xCC);
                assert_eq!(spare[15], 0xDD);
            }
            other => panic!("expected WriteFlash, got {:?}", other),
        }
    }

    #[test]
    fn test_isd_write_flash_waits_for_full_payload() {
        let mut decoder = Decoder::new();
        let header = encode_header(Opcode::IsdWriteFlash, 0x40);
        assert_eq!(push_all(&mut decoder, &header), 0);

        let payload = [0x11u8; VOICE_WRITE_LEN];
        assert_eq!(push_all(&mut decoder, &payload[..15]), 0);

        match decoder.push(payload[15]) {
            Ok(Some(Command::IsdWriteFlash { address, data })) => {
                assert_eq!(address, 0x40);
                assert_eq!(data, &payload);
            }
            other => panic!("expected IsdWriteFlash, got {:?}", other),
        }
    }

    #[test]
    fn test_back_to_back_frames() {
        let mut decoder = Decoder::new();
        let mut burst = [0u8; 2 * HEADER_LEN];
        burst[..HEADER_LEN].copy_from_slice(&encode_header(Opcode::GetVersion, 0));
        burst[HEADER_LEN..].copy_from_slice(&encode_header(Opcode::GetFlashConfig, 0));
        assert_eq!(push_all(&mut decoder, &burst), 2);
    }

    #[test]
    fn test_unknown_opcode_resyncs_at_header_boundary() {
        let mut decoder = Decoder::new();
        let bogus = [0x99, 0x00, 0x00, 0x00, 0x00];
        for &byte in &bogus[..4] {
            assert!(matches!(decoder.push(byte), Ok(None)));
        }
        assert_eq!(
            decoder.push(bogus[4]),
            Err(FrameError::UnknownOpcode(0x99))
        );
        assert_eq!(decoder.pending(), 0);

        // The next well-formed header decodes normally.
        let header = encode_header(Opcode::GetVersion, 0);
        assert_eq!(push_all(&mut decoder, &header), 1);
    }

    #[test]
    fn test_buffer_recycled_between_frames() {
        let mut decoder = Decoder::new();
        let header = encode_header(Opcode::WriteFlash, 1);
        let payload = [0x5Au8; BLOCK_RAW_LEN];
        assert_eq!(push_all(&mut decoder, &header), 0);
        assert_eq!(push_all(&mut decoder, &payload), 1);

        // A full-size frame fits again after the first one completed.
        assert_eq!(push_all(&mut decoder, &header), 0);
        assert_eq!(push_all(&mut decoder, &payload), 1);
    }
}
