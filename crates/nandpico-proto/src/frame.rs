//! Frame layout: sizes, opcodes and the decoded command model.
//!
//! The numeric opcode values and field widths are a wire contract shared
//! with existing host tools and must not change between releases.

// ============================================================================
// Wire sizes
// ============================================================================

/// Length of every command header: one opcode byte and a 4-byte LE parameter.
pub const HEADER_LEN: usize = 5;
/// Length of a status word in responses.
pub const STATUS_LEN: usize = 4;
/// Data bytes in one raw NAND block.
pub const BLOCK_DATA_LEN: usize = 512;
/// Spare-area bytes in one raw NAND block.
pub const BLOCK_SPARE_LEN: usize = 16;
/// One raw block on the wire: data followed by spare.
pub const BLOCK_RAW_LEN: usize = BLOCK_DATA_LEN + BLOCK_SPARE_LEN;
/// One streaming-read frame: status word followed by a raw block.
pub const STREAM_FRAME_LEN: usize = STATUS_LEN + BLOCK_RAW_LEN;
/// Voice-chip flash page returned by [`Opcode::IsdReadFlash`].
pub const VOICE_PAGE_LEN: usize = 512;
/// Voice-chip write chunk carried by [`Opcode::IsdWriteFlash`].
pub const VOICE_WRITE_LEN: usize = 16;
/// Largest possible frame: header plus the [`Opcode::WriteFlash`] payload.
pub const MAX_FRAME_LEN: usize = HEADER_LEN + BLOCK_RAW_LEN;

/// Version reported in response to [`Opcode::GetVersion`].
pub const PROTOCOL_VERSION: u32 = 2;

// ============================================================================
// Opcodes
// ============================================================================

/// Command opcodes understood by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Opcode {
    /// Report the protocol version ([`PROTOCOL_VERSION`]).
    GetVersion = 0x00,
    /// Report the NAND controller configuration word.
    GetFlashConfig = 0x01,
    /// Read one raw NAND block.
    ReadFlash = 0x02,
    /// Write one raw NAND block.
    WriteFlash = 0x03,
    /// Begin a streaming read of sequential NAND blocks.
    ReadFlashStream = 0x04,
    /// Initialize the voice chip.
    IsdInit = 0xA0,
    /// Shut the voice chip down.
    IsdDeinit = 0xA1,
    /// Report the voice chip's device id.
    IsdReadId = 0xA2,
    /// Read one voice-chip flash page.
    IsdReadFlash = 0xA3,
    /// Erase the whole voice-chip flash.
    IsdEraseFlash = 0xA4,
    /// Write one 16-byte chunk of voice-chip flash.
    IsdWriteFlash = 0xA5,
    /// Play a voice prompt.
    IsdPlayVoice = 0xA6,
    /// Execute a voice macro.
    IsdExecMacro = 0xA7,
    /// Reset the voice chip.
    IsdReset = 0xA8,
    /// Reset the device into its maintenance bootloader.
    RebootToBootloader = 0xFE,
}

impl Opcode {
    /// Decode a raw opcode byte. Returns `None` for undefined values.
    pub const fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::GetVersion),
            0x01 => Some(Self::GetFlashConfig),
            0x02 => Some(Self::ReadFlash),
            0x03 => Some(Self::WriteFlash),
            0x04 => Some(Self::ReadFlashStream),
            0xA0 => Some(Self::IsdInit),
            0xA1 => Some(Self::IsdDeinit),
            0xA2 => Some(Self::IsdReadId),
            0xA3 => Some(Self::IsdReadFlash),
            0xA4 => Some(Self::IsdEraseFlash),
            0xA5 => Some(Self::IsdWriteFlash),
            0xA6 => Some(Self::IsdPlayVoice),
            0xA7 => Some(Self::IsdExecMacro),
            0xA8 => Some(Self::IsdReset),
            0xFE => Some(Self::RebootToBootloader),
            _ => None,
        }
    }

    /// Number of payload bytes that follow the header for this opcode.
    pub const fn payload_len(self) -> usize {
        match self {
            Self::WriteFlash => BLOCK_RAW_LEN,
            Self::IsdWriteFlash => VOICE_WRITE_LEN,
            _ => 0,
        }
    }
}

// ============================================================================
// Decoded frames
// ============================================================================

/// One complete command frame.
///
/// Produced by [`Decoder::push`](crate::Decoder::push); payload fields borrow
/// the decoder's reassembly buffer and are valid until the next push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command<'a> {
    /// Report the protocol version.
    GetVersion,
    /// Report the NAND controller configuration word.
    GetFlashConfig,
    /// Read the raw NAND block at `lba`.
    ReadFlash {
        /// Logical block address to read.
        lba: u32,
    },
    /// Write one raw NAND block at `lba`.
    WriteFlash {
        /// Logical block address to write.
        lba: u32,
        /// Block data.
        data: &'a [u8; BLOCK_DATA_LEN],
        /// Spare-area bytes.
        spare: &'a [u8; BLOCK_SPARE_LEN],
    },
    /// Stream blocks `0..blocks` to the host.
    ReadFlashStream {
        /// Number of blocks requested (exclusive upper bound).
        blocks: u32,
    },
    /// Initialize the voice chip.
    IsdInit,
    /// Shut the voice chip down.
    IsdDeinit,
    /// Report the voice chip's device id.
    IsdReadId,
    /// Read the voice-chip flash page at `address`.
    IsdReadFlash {
        /// Page address to read.
        address: u32,
    },
    /// Erase the whole voice-chip flash.
    IsdEraseFlash,
    /// Write 16 bytes of voice-chip flash at `address`.
    IsdWriteFlash {
        /// Address to program.
        address: u32,
        /// Bytes to program.
        data: &'a [u8; VOICE_WRITE_LEN],
    },
    /// Play voice prompt `index`.
    IsdPlayVoice {
        /// Prompt index.
        index: u32,
    },
    /// Execute voice macro `index`.
    IsdExecMacro {
        /// Macro index.
        index: u32,
    },
    /// Reset the voice chip.
    IsdReset,
    /// Reset the device into its maintenance bootloader.
    RebootToBootloader,
}

/// Encode a command header as it appears on the wire.
///
/// Host-side helper; any payload bytes follow the header with no further
/// framing.
pub fn encode_header(opcode: Opcode, parameter: u32) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    header[0] = opcode as u8;
    header[1..].copy_from_slice(&parameter.to_le_bytes());
    header
}
