//! Protocol service: framing, dispatch and transport lifecycle.

use log::{debug, info, warn};

use nandpico_proto::{
    Command, Decoder, BLOCK_DATA_LEN, BLOCK_SPARE_LEN, PROTOCOL_VERSION, VOICE_PAGE_LEN,
};

use crate::error::status_word;
use crate::link::HostTx;
use crate::peripherals::{DeviceControl, NandFlash, PowerController, VoiceChip};
use crate::stream::ReadStream;

/// The complete protocol core: decoder, dispatcher, stream engine and
/// peripheral set behind one value.
///
/// The embedding owns exactly one `Service` and drives it from its
/// scheduling loop: received bytes go to [`on_bytes`](Service::on_bytes),
/// [`poll_stream`](Service::poll_stream) runs once per iteration, and the
/// four lifecycle hooks follow the transport's connect, disconnect, suspend
/// and resume events.
pub struct Service<F, V, P, D> {
    decoder: Decoder,
    handler: Handler<F, V, P, D>,
}

/// Dispatch state, split from the decoder so a frame borrowed from the
/// decoder's buffer and mutable handler state can coexist.
struct Handler<F, V, P, D> {
    flash: F,
    voice: V,
    power: P,
    device: D,
    stream: ReadStream,
    halted: bool,
}

impl<F, V, P, D> Service<F, V, P, D>
where
    F: NandFlash,
    V: VoiceChip,
    P: PowerController,
    D: DeviceControl,
{
    /// Builds the service around the board's peripherals.
    pub fn new(flash: F, voice: V, power: P, device: D) -> Self {
        Self {
            decoder: Decoder::new(),
            handler: Handler {
                flash,
                voice,
                power,
                device,
                stream: ReadStream::new(),
                halted: false,
            },
        }
    }

    /// Feed bytes received from the host, dispatching every command frame
    /// they complete. Responses are written to `host` and flushed once per
    /// command. Framing errors drop the offending header and carry on with
    /// the bytes that follow.
    pub fn on_bytes<H: HostTx>(&mut self, bytes: &[u8], host: &mut H) {
        for &byte in bytes {
            if self.handler.halted {
                return;
            }
            match self.decoder.push(byte) {
                Ok(Some(command)) => self.handler.dispatch(command, host),
                Ok(None) => {}
                Err(e) => warn!("dropped inbound frame: {}", e),
            }
        }
    }

    /// Give the stream engine one chance to make progress. Call once per
    /// scheduler iteration.
    pub fn poll_stream<H: HostTx>(&mut self, host: &mut H) {
        if self.handler.halted {
            return;
        }
        self.handler.poll_stream(host);
    }

    /// Whether a reboot command has been executed. On hardware the device
    /// is gone by then; test embeddings use this to stop driving the
    /// service.
    pub fn is_halted(&self) -> bool {
        self.handler.halted
    }

    /// Host session established: take the flash bus from the companion
    /// controller and log the flash configuration.
    pub fn on_connect(&mut self) {
        self.handler.power.suspend();
        let config = self.handler.flash.config();
        info!("host connected, flash config {:#010x}", config);
    }

    /// Host session torn down: give the flash bus back.
    pub fn on_disconnect(&mut self) {
        self.handler.power.resume();
        info!("host disconnected");
    }

    /// Transport suspended: give the flash bus back so the companion
    /// controller can run while the host is away.
    pub fn on_suspend(&mut self) {
        self.handler.power.resume();
        info!("bus suspended");
    }

    /// Transport resumed: reclaim the flash bus.
    pub fn on_resume(&mut self) {
        self.handler.power.suspend();
        let config = self.handler.flash.config();
        info!("bus resumed, flash config {:#010x}", config);
    }
}

impl<F, V, P, D> Handler<F, V, P, D>
where
    F: NandFlash,
    V: VoiceChip,
    P: PowerController,
    D: DeviceControl,
{
    fn poll_stream<H: HostTx>(&mut self, host: &mut H) {
        self.stream.poll(&mut self.flash, host);
    }

    /// Execute one complete frame and flush the response.
    fn dispatch<H: HostTx>(&mut self, command: Command<'_>, host: &mut H) {
        match command {
            Command::GetVersion => {
                host.write(&PROTOCOL_VERSION.to_le_bytes());
            }
            Command::GetFlashConfig => {
                let config = self.flash.config();
                host.write(&config.to_le_bytes());
            }
            Command::ReadFlash { lba } => {
                debug!("read block {}", lba);
                let mut data = [0u8; BLOCK_DATA_LEN];
                let mut spare = [0u8; BLOCK_SPARE_LEN];
                let result = self.flash.read_block(lba, &mut data, &mut spare);
                host.write(&status_word(result).to_le_bytes());
                match result {
                    Ok(()) => {
                        host.write(&data);
                        host.write(&spare);
                    }
                    Err(e) => warn!("block {} read failed: {}", lba, e),
                }
            }
            Command::WriteFlash { lba, data, spare } => {
                debug!("write block {}", lba);
                let result = self.flash.write_block(lba, data, spare);
                if let Err(e) = result {
                    warn!("block {} write failed: {}", lba, e);
                }
                host.write(&status_word(result).to_le_bytes());
            }
            Command::ReadFlashStream { blocks } => {
                self.stream.begin(blocks);
            }
            Command::IsdInit => {
                let ok = self.voice.init();
                if !ok {
                    warn!("voice chip did not respond to init");
                }
                host.write(&[u8::from(!ok)]);
            }
            Command::IsdDeinit => {
                self.voice.deinit();
                host.write(&[0]);
            }
            Command::IsdReadId => {
                let id = self.voice.read_id();
                host.write(&[id]);
            }
            Command::IsdReadFlash { address } => {
                let mut page = [0u8; VOICE_PAGE_LEN];
                self.voice.flash_read(address, &mut page);
                host.write(&page);
            }
            Command::IsdEraseFlash => {
                self.voice.chip_erase();
                host.write(&[0]);
            }
            Command::IsdWriteFlash { address, data } => {
                self.voice.flash_write(address, data);
                // The voice bus has no status path, but the host expects a
                // 4-byte word for this command.
                host.write(&0u32.to_le_bytes());
            }
            Command::IsdPlayVoice { index } => {
                self.voice.play(index);
                host.write(&[0]);
            }
            Command::IsdExecMacro { index } => {
                self.voice.exec_macro(index);
                host.write(&[0]);
            }
            Command::IsdReset => {
                self.voice.reset();
                host.write(&[0]);
            }
            Command::RebootToBootloader => {
                info!("rebooting to bootloader");
                self.device.reboot_to_bootloader();
                // On hardware the call above never returns; nothing may be
                // written or flushed once it has been issued.
                self.halted = true;
                return;
            }
        }
        host.flush();
    }
}
