//! Peripheral facade traits
//!
//! The service executes commands against these four facades. Firmware
//! implements them over the real buses; the dummy crate implements them in
//! memory so the whole protocol stack runs in host-side tests. All methods
//! are blocking, matching the bit-banged drivers they stand in for.

use nandpico_proto::{BLOCK_DATA_LEN, BLOCK_SPARE_LEN, VOICE_PAGE_LEN, VOICE_WRITE_LEN};

use crate::error::NandResult;

/// Raw NAND array behind the target's flash controller.
///
/// Blocks are addressed by logical block address and transferred as a
/// 512-byte data area plus its 16-byte spare area. A failed transfer carries
/// the controller's status word, which the service relays to the host
/// unchanged.
pub trait NandFlash {
    /// The controller's flash-config word identifying geometry and timing.
    fn config(&mut self) -> u32;

    /// Read the block at `address` into `data` and `spare`.
    fn read_block(
        &mut self,
        address: u32,
        data: &mut [u8; BLOCK_DATA_LEN],
        spare: &mut [u8; BLOCK_SPARE_LEN],
    ) -> NandResult;

    /// Program the block at `address` from `data` and `spare`.
    fn write_block(
        &mut self,
        address: u32,
        data: &[u8; BLOCK_DATA_LEN],
        spare: &[u8; BLOCK_SPARE_LEN],
    ) -> NandResult;
}

/// ISD1200-series voice recorder.
///
/// Only [`init`](VoiceChip::init) has an acknowledgement path; the rest of
/// the chip's command set reports nothing back, and the service answers the
/// host with a fixed success byte for those operations.
pub trait VoiceChip {
    /// Wake the chip and verify it responds.
    fn init(&mut self) -> bool;

    /// Return the chip to power-down.
    fn deinit(&mut self);

    /// Read the device ID byte.
    fn read_id(&mut self) -> u8;

    /// Read one 512-byte span of voice flash starting at `address`.
    fn flash_read(&mut self, address: u32, out: &mut [u8; VOICE_PAGE_LEN]);

    /// Erase the entire voice flash.
    fn chip_erase(&mut self);

    /// Program 16 bytes of voice flash starting at `address`.
    fn flash_write(&mut self, address: u32, data: &[u8; VOICE_WRITE_LEN]);

    /// Play voice prompt `index`.
    fn play(&mut self, index: u32);

    /// Execute voice macro `index`.
    fn exec_macro(&mut self, index: u32);

    /// Pulse the chip's reset line.
    fn reset(&mut self);
}

/// Power sequencing for the companion system-management controller.
///
/// While a host session is open the companion controller must stay off the
/// shared flash bus. The service drives these from the transport lifecycle
/// hooks, never from a command opcode.
pub trait PowerController {
    /// Hold the companion controller in reset, taking the flash bus.
    fn suspend(&mut self);

    /// Release the companion controller, giving the flash bus back.
    fn resume(&mut self);
}

/// Device-level reset into the maintenance bootloader.
pub trait DeviceControl {
    /// Reboot into the bootloader. On hardware this never returns; test
    /// doubles do return, and the service halts itself right after the call.
    fn reboot_to_bootloader(&mut self);
}

// Forwarding impls so the embedding can hand the service `&mut` references
// and keep ownership of the underlying peripherals.
impl<T: NandFlash + ?Sized> NandFlash for &mut T {
    fn config(&mut self) -> u32 {
        (**self).config()
    }

    fn read_block(
        &mut self,
        address: u32,
        data: &mut [u8; BLOCK_DATA_LEN],
        spare: &mut [u8; BLOCK_SPARE_LEN],
    ) -> NandResult {
        (**self).read_block(address, data, spare)
    }

    fn write_block(
        &mut self,
        address: u32,
        data: &[u8; BLOCK_DATA_LEN],
        spare: &[u8; BLOCK_SPARE_LEN],
    ) -> NandResult {
        (**self).write_block(address, data, spare)
    }
}

impl<T: VoiceChip + ?Sized> VoiceChip for &mut T {
    fn init(&mut self) -> bool {
        (**self).init()
    }

    fn deinit(&mut self) {
        (**self).deinit()
    }

    fn read_id(&mut self) -> u8 {
        (**self).read_id()
    }

    fn flash_read(&mut self, address: u32, out: &mut [u8; VOICE_PAGE_LEN]) {
        (**self).flash_read(address, out)
    }

    fn chip_erase(&mut self) {
        (**self).chip_erase()
    }

    fn flash_write(&mut self, address: u32, data: &[u8; VOICE_WRITE_LEN]) {
        (**self).flash_write(address, data)
    }

    fn play(&mut self, index: u32) {
        (**self).play(index)
    }

    fn exec_macro(&mut self, index: u32) {
        (**self).exec_macro(index)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

impl<T: PowerController + ?Sized> PowerController for &mut T {
    fn suspend(&mut self) {
        (**self).suspend()
    }

    fn resume(&mut self) {
        (**self).resume()
    }
}

impl<T: DeviceControl + ?Sized> DeviceControl for &mut T {
    fn reboot_to_bootloader(&mut self) {
        (**self).reboot_to_bootloader()
    }
}
