//! nandpico-core - Command dispatch and peripheral facades
//!
//! This crate contains the transport-independent half of a USB NAND
//! programmer: a [`Service`] that frames inbound bytes into commands,
//! executes them against pluggable peripherals, and writes responses back
//! through a [`HostTx`] sink. It is `no_std` compatible so the same code
//! runs on the device and inside host-side tests.
//!
//! The board support layer supplies the four peripheral implementations and
//! drives the service from its event loop:
//!
//! ```ignore
//! use nandpico_core::Service;
//!
//! let mut service = Service::new(nand, voice, power, device);
//!
//! loop {
//!     if let Some(chunk) = cdc.read() {
//!         service.on_bytes(chunk, &mut cdc);
//!     }
//!     service.poll_stream(&mut cdc);
//! }
//! ```
//!
//! # Features
//!
//! - `std` - Implement `std::error::Error` for error types
//! - `defmt` - Derive `defmt::Format` on public types

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod error;
pub mod link;
pub mod peripherals;
pub mod service;
pub mod stream;

pub use error::{NandError, NandResult};
pub use link::HostTx;
pub use peripherals::{DeviceControl, NandFlash, PowerController, VoiceChip};
pub use service::Service;
pub use stream::ReadStream;
