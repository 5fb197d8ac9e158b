//! Error types for nandpico-core
//!
//! NAND operations report a device-defined status word where zero means
//! success. This module keeps that convention while giving callers an
//! ordinary `Result` to match on.

use core::fmt;
use core::num::NonZeroU32;

/// Status word reported by a failed NAND operation.
///
/// The controller's status codes are opaque to this crate; they are relayed
/// to the host verbatim. Zero is reserved for success, so the code is held
/// as [`NonZeroU32`] and `NandResult` stays a single word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NandError(NonZeroU32);

impl NandError {
    /// Wraps a non-zero device status word.
    pub const fn new(status: NonZeroU32) -> Self {
        Self(status)
    }

    /// Builds from a raw status word; zero means success and yields `None`.
    pub const fn from_status(status: u32) -> Option<Self> {
        match NonZeroU32::new(status) {
            Some(code) => Some(Self(code)),
            None => None,
        }
    }

    /// The status word exactly as it is sent on the wire.
    pub const fn status(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for NandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NAND controller status {:#010x}", self.status())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for NandError {}

/// Result of a NAND operation, carrying the device status on failure.
pub type NandResult<T = ()> = core::result::Result<T, NandError>;

/// Wire status word for a completed operation; zero on success.
pub fn status_word(result: NandResult) -> u32 {
    match result {
        Ok(()) => 0,
        Err(e) => e.status(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_status_is_success() {
        assert_eq!(NandError::from_status(0), None);
        assert_eq!(status_word(Ok(())), 0);
    }

    #[test]
    fn test_status_survives_round_trip() {
        let err = NandError::from_status(0x8000_0001).unwrap();
        assert_eq!(err.status(), 0x8000_0001);
        assert_eq!(status_word(Err(err)), 0x8000_0001);
    }
}
