//! nandpico-dummy - In-memory peripheral emulators for testing
//!
//! This crate provides emulated versions of every peripheral the nandpico
//! service drives: a NAND array, the ISD voice chip, the companion-controller
//! power sequencer, the reboot hook and the outbound host channel. With them
//! the whole protocol stack runs in host-side tests without hardware; the
//! integration suite at the bottom of this file exercises the service
//! end-to-end through the wire format.

use std::collections::BTreeMap;

use nandpico_core::{
    DeviceControl, HostTx, NandError, NandFlash, NandResult, PowerController, VoiceChip,
};
use nandpico_proto::{BLOCK_DATA_LEN, BLOCK_SPARE_LEN, VOICE_PAGE_LEN, VOICE_WRITE_LEN};

/// Status word the dummy NAND reports for an access past the end of the
/// array.
pub const STATUS_OUT_OF_RANGE: u32 = 0x8000_0001;

/// Configuration for the dummy NAND array
#[derive(Debug, Clone)]
pub struct NandConfig {
    /// Flash-config word returned to the host
    pub config_word: u32,
    /// Number of addressable blocks
    pub blocks: u32,
}

impl Default for NandConfig {
    fn default() -> Self {
        Self {
            // 16 MiB small-block part, the common console configuration
            config_word: 0x0119_8010,
            blocks: 0x8000,
        }
    }
}

#[derive(Clone)]
struct Block {
    data: [u8; BLOCK_DATA_LEN],
    spare: [u8; BLOCK_SPARE_LEN],
}

/// Dummy NAND array
///
/// Blocks are stored sparsely; a block that was never written reads back
/// erased (all 0xFF), like real NAND. Every access is recorded, and reads or
/// writes can be made to fail with a chosen status word to test the error
/// paths.
pub struct DummyNand {
    config: NandConfig,
    blocks: BTreeMap<u32, Block>,
    reads: Vec<u32>,
    writes: Vec<u32>,
    config_reads: usize,
    fail_read: Option<(u32, u32)>,
    fail_write: Option<(u32, u32)>,
}

impl DummyNand {
    /// Create a dummy NAND with the given configuration
    pub fn new(config: NandConfig) -> Self {
        Self {
            config,
            blocks: BTreeMap::new(),
            reads: Vec::new(),
            writes: Vec::new(),
            config_reads: 0,
            fail_read: None,
            fail_write: None,
        }
    }

    /// Make the read of `block` fail with `status` (must be non-zero)
    pub fn fail_read_at(&mut self, block: u32, status: u32) {
        assert_ne!(status, 0, "zero status means success");
        self.fail_read = Some((block, status));
    }

    /// Make the write of `block` fail with `status` (must be non-zero)
    pub fn fail_write_at(&mut self, block: u32, status: u32) {
        assert_ne!(status, 0, "zero status means success");
        self.fail_write = Some((block, status));
    }

    /// Pre-fill a block, as if it had been programmed earlier
    pub fn fill_block(&mut self, address: u32, data: [u8; BLOCK_DATA_LEN], spare: [u8; BLOCK_SPARE_LEN]) {
        self.blocks.insert(address, Block { data, spare });
    }

    /// Contents of a block, or `None` if it was never written
    pub fn block(&self, address: u32) -> Option<(&[u8; BLOCK_DATA_LEN], &[u8; BLOCK_SPARE_LEN])> {
        self.blocks.get(&address).map(|b| (&b.data, &b.spare))
    }

    /// Addresses read, in order
    pub fn reads(&self) -> &[u32] {
        &self.reads
    }

    /// Addresses written, in order
    pub fn writes(&self) -> &[u32] {
        &self.writes
    }

    /// How many times the config word was queried
    pub fn config_reads(&self) -> usize {
        self.config_reads
    }
}

impl Default for DummyNand {
    fn default() -> Self {
        Self::new(NandConfig::default())
    }
}

impl NandFlash for DummyNand {
    fn config(&mut self) -> u32 {
        self.config_reads += 1;
        self.config.config_word
    }

    fn read_block(
        &mut self,
        address: u32,
        data: &mut [u8; BLOCK_DATA_LEN],
        spare: &mut [u8; BLOCK_SPARE_LEN],
    ) -> NandResult {
        self.reads.push(address);
        if let Some((failing, status)) = self.fail_read {
            if failing == address {
                return Err(NandError::from_status(status).unwrap());
            }
        }
        if address >= self.config.blocks {
            return Err(NandError::from_status(STATUS_OUT_OF_RANGE).unwrap());
        }
        match self.blocks.get(&address) {
            Some(block) => {
                data.copy_from_slice(&block.data);
                spare.copy_from_slice(&block.spare);
            }
            None => {
                data.fill(0xFF);
                spare.fill(0xFF);
            }
        }
        Ok(())
    }

    fn write_block(
        &mut self,
        address: u32,
        data: &[u8; BLOCK_DATA_LEN],
        spare: &[u8; BLOCK_SPARE_LEN],
    ) -> NandResult {
        self.writes.push(address);
        if let Some((failing, status)) = self.fail_write {
            if failing == address {
                return Err(NandError::from_status(status).unwrap());
            }
        }
        if address >= self.config.blocks {
            return Err(NandError::from_status(STATUS_OUT_OF_RANGE).unwrap());
        }
        self.blocks.insert(
            address,
            Block {
                data: *data,
                spare: *spare,
            },
        );
        Ok(())
    }
}

/// One recorded voice-chip operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceOp {
    /// `init` was called
    Init,
    /// `deinit` was called
    Deinit,
    /// `read_id` was called
    ReadId,
    /// `flash_read` at this address
    FlashRead(u32),
    /// `chip_erase` was called
    ChipErase,
    /// `flash_write` at this address with these bytes
    FlashWrite(u32, [u8; VOICE_WRITE_LEN]),
    /// `play` with this prompt index
    Play(u32),
    /// `exec_macro` with this macro index
    ExecMacro(u32),
    /// `reset` was called
    Reset,
}

/// Dummy ISD voice chip
///
/// Records every operation in order. The chip bus has no status path, so the
/// recorder is the only way a test can see whether an operation actually ran;
/// the wire reports success regardless.
pub struct DummyVoice {
    ops: Vec<VoiceOp>,
    /// Reported by `read_id`
    pub device_id: u8,
    /// Returned from `init`; set false to emulate a missing chip
    pub init_ok: bool,
}

impl DummyVoice {
    /// Create a dummy voice chip that answers id `device_id`
    pub fn new(device_id: u8) -> Self {
        Self {
            ops: Vec::new(),
            device_id,
            init_ok: true,
        }
    }

    /// Operations performed so far, in order
    pub fn ops(&self) -> &[VoiceOp] {
        &self.ops
    }
}

impl Default for DummyVoice {
    fn default() -> Self {
        // ISD1232 device id
        Self::new(0x32)
    }
}

impl VoiceChip for DummyVoice {
    fn init(&mut self) -> bool {
        self.ops.push(VoiceOp::Init);
        self.init_ok
    }

    fn deinit(&mut self) {
        self.ops.push(VoiceOp::Deinit);
    }

    fn read_id(&mut self) -> u8 {
        self.ops.push(VoiceOp::ReadId);
        self.device_id
    }

    fn flash_read(&mut self, address: u32, out: &mut [u8; VOICE_PAGE_LEN]) {
        self.ops.push(VoiceOp::FlashRead(address));
        // Deterministic fill so tests can tell pages apart
        out.fill(address as u8);
    }

    fn chip_erase(&mut self) {
        self.ops.push(VoiceOp::ChipErase);
    }

    fn flash_write(&mut self, address: u32, data: &[u8; VOICE_WRITE_LEN]) {
        self.ops.push(VoiceOp::FlashWrite(address, *data));
    }

    fn play(&mut self, index: u32) {
        self.ops.push(VoiceOp::Play(index));
    }

    fn exec_macro(&mut self, index: u32) {
        self.ops.push(VoiceOp::ExecMacro(index));
    }

    fn reset(&mut self) {
        self.ops.push(VoiceOp::Reset);
    }
}

/// Dummy companion-controller power sequencer
#[derive(Debug, Default)]
pub struct DummyPower {
    /// Calls to `suspend` so far
    pub suspends: usize,
    /// Calls to `resume` so far
    pub resumes: usize,
}

impl PowerController for DummyPower {
    fn suspend(&mut self) {
        self.suspends += 1;
    }

    fn resume(&mut self) {
        self.resumes += 1;
    }
}

/// Dummy reboot hook
///
/// On hardware `reboot_to_bootloader` never returns. The dummy just records
/// the call; the service's halt latch covers the "never returns" half.
#[derive(Debug, Default)]
pub struct DummyReboot {
    /// Whether the reboot was requested
    pub rebooted: bool,
}

impl DeviceControl for DummyReboot {
    fn reboot_to_bootloader(&mut self) {
        self.rebooted = true;
    }
}

/// Dummy outbound host channel
///
/// Emulates a transport FIFO with an adjustable amount of free space. Writes
/// beyond the free space are truncated, exactly as the `HostTx` contract
/// allows, so a test that forgets the capacity discipline loses bytes the
/// same way real hardware would.
pub struct DummyHost {
    sent: Vec<u8>,
    free: usize,
    flushes: usize,
}

impl DummyHost {
    /// A host channel that never runs out of space
    pub fn new() -> Self {
        Self::with_free(usize::MAX)
    }

    /// A host channel with `free` bytes of space to start with
    pub fn with_free(free: usize) -> Self {
        Self {
            sent: Vec::new(),
            free,
            flushes: 0,
        }
    }

    /// Make `extra` more bytes of space available, as if the transport
    /// drained its FIFO
    pub fn grant(&mut self, extra: usize) {
        self.free = self.free.saturating_add(extra);
    }

    /// Everything written so far
    pub fn sent(&self) -> &[u8] {
        &self.sent
    }

    /// Take the bytes written so far, leaving the channel empty
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.sent)
    }

    /// Number of flushes so far
    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl Default for DummyHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostTx for DummyHost {
    fn free_space(&self) -> usize {
        self.free
    }

    fn write(&mut self, bytes: &[u8]) {
        let taken = bytes.len().min(self.free);
        self.sent.extend_from_slice(&bytes[..taken]);
        if self.free != usize::MAX {
            self.free -= taken;
        }
    }

    fn flush(&mut self) {
        self.flushes += 1;
    }
}
