//! nandpico-proto - Wire protocol for the nandpico NAND programmer
//!
//! This crate defines the command surface a nandpico device presents on its
//! serial channel: the opcode set, the frame layout, and a push decoder that
//! reassembles frames from an unframed byte stream. It contains no peripheral
//! or transport code and is `no_std`.
//!
//! Every request starts with a 5-byte header (1 opcode byte, 4-byte
//! little-endian parameter). Two opcodes carry a fixed trailing payload:
//! [`Opcode::WriteFlash`] (512 data + 16 spare bytes) and
//! [`Opcode::IsdWriteFlash`] (16 bytes). Responses are raw concatenated
//! fields with no envelope; the host knows the expected shape from the
//! opcode it sent.
//!
//! # Features
//!
//! - `std` - Implement `std::error::Error` for error types
//! - `defmt` - Derive `defmt::Format` on the wire types
//!
//! # Example
//!
//! ```
//! use nandpico_proto::{encode_header, Command, Decoder, Opcode};
//!
//! let mut decoder = Decoder::new();
//! let header = encode_header(Opcode::GetVersion, 0);
//! for &byte in &header[..4] {
//!     assert!(matches!(decoder.push(byte), Ok(None)));
//! }
//! let cmd = decoder.push(header[4]).unwrap();
//! assert!(matches!(cmd, Some(Command::GetVersion)));
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "std")]
extern crate std;

pub mod decoder;
pub mod frame;

pub use decoder::{Decoder, FrameError};
pub use frame::{
    encode_header, Command, Opcode, BLOCK_DATA_LEN, BLOCK_RAW_LEN, BLOCK_SPARE_LEN, HEADER_LEN,
    MAX_FRAME_LEN, PROTOCOL_VERSION, STATUS_LEN, STREAM_FRAME_LEN, VOICE_PAGE_LEN, VOICE_WRITE_LEN,
};
