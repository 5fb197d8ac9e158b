//! Streaming bulk-read engine.
//!
//! READ_FLASH_STREAM asks for a range of sequential blocks. Reading them
//! inside the command handler would stall the transport for the duration of
//! the dump, so the handler only records a session; the embedding's
//! scheduler then calls [`ReadStream::poll`] once per loop iteration and the
//! engine emits at most one frame per call, leaving the loop free to service
//! inbound traffic between blocks.

use log::{debug, warn};

use nandpico_proto::{BLOCK_DATA_LEN, BLOCK_SPARE_LEN, STREAM_FRAME_LEN};

use crate::error::status_word;
use crate::link::HostTx;
use crate::peripherals::NandFlash;

/// One in-progress bulk read.
#[derive(Debug, Clone, Copy)]
struct Session {
    /// Next block to read.
    cursor: u32,
    /// Exclusive end of the requested range.
    limit: u32,
}

/// Backpressure-aware engine draining sequential flash blocks to the host.
///
/// Each frame is a 4-byte little-endian status word followed, when the
/// status is zero, by the block's 512 data bytes and 16 spare bytes. A
/// non-zero status ends the frame after 4 bytes and aborts the rest of the
/// stream; the host detects termination from the status value, not from a
/// length field.
#[derive(Debug)]
pub struct ReadStream {
    session: Option<Session>,
    data: [u8; BLOCK_DATA_LEN],
    spare: [u8; BLOCK_SPARE_LEN],
}

impl ReadStream {
    /// An idle engine with no session.
    pub const fn new() -> Self {
        Self {
            session: None,
            data: [0; BLOCK_DATA_LEN],
            spare: [0; BLOCK_SPARE_LEN],
        }
    }

    /// Start a session covering blocks `0..blocks`, replacing any session
    /// already in progress. Zero blocks leaves the engine idle.
    pub fn begin(&mut self, blocks: u32) {
        debug!("read stream: {} blocks requested", blocks);
        self.session = if blocks > 0 {
            Some(Session {
                cursor: 0,
                limit: blocks,
            })
        } else {
            None
        };
    }

    /// Whether a session still has blocks to deliver.
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Advance the session by at most one block. Never blocks; call once
    /// per scheduler iteration so the loop stays responsive to inbound
    /// traffic between blocks.
    pub fn poll<F, H>(&mut self, flash: &mut F, host: &mut H)
    where
        F: NandFlash,
        H: HostTx,
    {
        let Some(Session { cursor, limit }) = self.session else {
            return;
        };
        if cursor >= limit {
            debug!("read stream complete: {} blocks", limit);
            self.session = None;
            return;
        }
        // The whole frame must fit up front so a frame is never split
        // across polls.
        if host.free_space() < STREAM_FRAME_LEN {
            return;
        }

        let result = flash.read_block(cursor, &mut self.data, &mut self.spare);
        host.write(&status_word(result).to_le_bytes());
        match result {
            Ok(()) => {
                host.write(&self.data);
                host.write(&self.spare);
                self.session = Some(Session {
                    cursor: cursor + 1,
                    limit,
                });
            }
            Err(e) => {
                warn!("read stream aborted at block {}: {}", cursor, e);
                self.session = None;
            }
        }
    }
}

impl Default for ReadStream {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NandError, NandResult};
    use std::vec::Vec;

    struct MockFlash {
        reads: Vec<u32>,
        fail_at: Option<(u32, u32)>,
    }

    impl MockFlash {
        fn new() -> Self {
            Self {
                reads: Vec::new(),
                fail_at: None,
            }
        }
    }

    impl NandFlash for MockFlash {
        fn config(&mut self) -> u32 {
            0
        }

        fn read_block(
            &mut self,
            address: u32,
            data: &mut [u8; BLOCK_DATA_LEN],
            spare: &mut [u8; BLOCK_SPARE_LEN],
        ) -> NandResult {
            self.reads.push(address);
            if let Some((failing, status)) = self.fail_at {
                if failing == address {
                    return Err(NandError::from_status(status).unwrap());
                }
            }
            data.fill(address as u8);
            spare.fill((address as u8).wrapping_add(1));
            Ok(())
        }

        fn write_block(
            &mut self,
            _address: u32,
            _data: &[u8; BLOCK_DATA_LEN],
            _spare: &[u8; BLOCK_SPARE_LEN],
        ) -> NandResult {
            Ok(())
        }
    }

    struct MockHost {
        sent: Vec<u8>,
        free: usize,
        flushes: usize,
    }

    impl MockHost {
        fn with_free(free: usize) -> Self {
            Self {
                sent: Vec::new(),
                free,
                flushes: 0,
            }
        }
    }

    impl HostTx for MockHost {
        fn free_space(&self) -> usize {
            self.free
        }

        fn write(&mut self, bytes: &[u8]) {
            let taken = bytes.len().min(self.free);
            self.sent.extend_from_slice(&bytes[..taken]);
            self.free -= taken;
        }

        fn flush(&mut self) {
            self.flushes += 1;
        }
    }

    fn frame(sent: &[u8], index: usize) -> &[u8] {
        &sent[index * STREAM_FRAME_LEN..(index + 1) * STREAM_FRAME_LEN]
    }

    #[test]
    fn test_emits_one_frame_per_poll() {
        let mut flash = MockFlash::new();
        let mut host = MockHost::with_free(10_000);
        let mut stream = ReadStream::new();

        stream.begin(3);
        assert!(stream.is_active());

        // Ample capacity still yields exactly one block per call, so the
        // scheduler gets back in between blocks.
        stream.poll(&mut flash, &mut host);
        assert_eq!(host.sent.len(), STREAM_FRAME_LEN);
        assert_eq!(flash.reads, [0]);

        stream.poll(&mut flash, &mut host);
        stream.poll(&mut flash, &mut host);
        assert_eq!(host.sent.len(), 3 * STREAM_FRAME_LEN);
        assert_eq!(flash.reads, [0, 1, 2]);

        // Completion is observed on the poll after the final frame.
        assert!(stream.is_active());
        stream.poll(&mut flash, &mut host);
        assert!(!stream.is_active());
        assert_eq!(host.sent.len(), 3 * STREAM_FRAME_LEN);

        for index in 0..3 {
            let bytes = frame(&host.sent, index);
            assert_eq!(&bytes[..4], &[0, 0, 0, 0]);
            assert!(bytes[4..516].iter().all(|&b| b == index as u8));
            assert!(bytes[516..].iter().all(|&b| b == index as u8 + 1));
        }
    }

    #[test]
    fn test_zero_length_stream_is_a_noop() {
        let mut flash = MockFlash::new();
        let mut host = MockHost::with_free(10_000);
        let mut stream = ReadStream::new();

        stream.begin(0);
        assert!(!stream.is_active());
        stream.poll(&mut flash, &mut host);

        assert!(host.sent.is_empty());
        assert!(flash.reads.is_empty());
    }

    #[test]
    fn test_read_failure_emits_short_frame_and_aborts() {
        let mut flash = MockFlash::new();
        flash.fail_at = Some((2, 0xDEAD_0001));
        let mut host = MockHost::with_free(10_000);
        let mut stream = ReadStream::new();

        stream.begin(5);
        for _ in 0..3 {
            stream.poll(&mut flash, &mut host);
        }

        assert!(!stream.is_active());
        assert_eq!(host.sent.len(), 2 * STREAM_FRAME_LEN + 4);
        let status = &host.sent[2 * STREAM_FRAME_LEN..];
        assert_eq!(status, 0xDEAD_0001u32.to_le_bytes());

        // Nothing more without a fresh session.
        stream.poll(&mut flash, &mut host);
        assert_eq!(host.sent.len(), 2 * STREAM_FRAME_LEN + 4);
        assert_eq!(flash.reads, [0, 1, 2]);
    }

    #[test]
    fn test_defers_until_capacity_frees_up() {
        let mut flash = MockFlash::new();
        let mut host = MockHost::with_free(STREAM_FRAME_LEN - 1);
        let mut stream = ReadStream::new();

        stream.begin(2);
        stream.poll(&mut flash, &mut host);
        assert!(host.sent.is_empty());
        assert!(flash.reads.is_empty());
        assert!(stream.is_active());

        host.free = STREAM_FRAME_LEN;
        stream.poll(&mut flash, &mut host);
        assert_eq!(host.sent.len(), STREAM_FRAME_LEN);
        assert!(stream.is_active());

        host.free = 10_000;
        stream.poll(&mut flash, &mut host);
        assert_eq!(host.sent.len(), 2 * STREAM_FRAME_LEN);

        stream.poll(&mut flash, &mut host);
        assert!(!stream.is_active());
    }

    #[test]
    fn test_throttled_run_yields_same_bytes_as_unthrottled() {
        let mut flash = MockFlash::new();
        let mut unthrottled = MockHost::with_free(10_000);
        let mut stream = ReadStream::new();
        stream.begin(4);
        for _ in 0..5 {
            stream.poll(&mut flash, &mut unthrottled);
        }
        assert!(!stream.is_active());

        let mut flash = MockFlash::new();
        let mut throttled = MockHost::with_free(0);
        let mut stream = ReadStream::new();
        stream.begin(4);
        for _ in 0..50 {
            throttled.free += 150;
            stream.poll(&mut flash, &mut throttled);
        }

        assert!(!stream.is_active());
        assert_eq!(throttled.sent, unthrottled.sent);
    }

    #[test]
    fn test_new_session_supersedes_active_one() {
        let mut flash = MockFlash::new();
        let mut host = MockHost::with_free(STREAM_FRAME_LEN);
        let mut stream = ReadStream::new();

        stream.begin(5);
        stream.poll(&mut flash, &mut host);
        assert_eq!(host.sent.len(), STREAM_FRAME_LEN);

        stream.begin(2);
        host.free = 10_000;
        stream.poll(&mut flash, &mut host);
        stream.poll(&mut flash, &mut host);

        assert_eq!(host.sent.len(), 3 * STREAM_FRAME_LEN);
        // The replacement session restarts at block zero.
        assert_eq!(flash.reads, [0, 0, 1]);
        assert_eq!(frame(&host.sent, 1)[4], 0);
        assert_eq!(frame(&host.sent, 2)[4], 1);
    }
}
