//! Outbound host channel.

/// Byte sink towards the host, typically a CDC-ACM endpoint FIFO.
///
/// Writes are buffered: bytes reach the host when the transport decides to
/// push a filled buffer or when [`flush`](HostTx::flush) forces one out. A
/// write beyond the remaining buffer may be truncated, so callers that
/// cannot tolerate truncation check [`free_space`](HostTx::free_space)
/// first, as the stream engine does before each frame.
pub trait HostTx {
    /// Bytes that can currently be written without truncation.
    fn free_space(&self) -> usize;

    /// Queue bytes for transmission.
    fn write(&mut self, bytes: &[u8]);

    /// Push any queued bytes to the host now.
    fn flush(&mut self);
}

impl<T: HostTx + ?Sized> HostTx for &mut T {
    fn free_space(&self) -> usize {
        (**self).free_space()
    }

    fn write(&mut self, bytes: &[u8]) {
        (**self).write(bytes)
    }

    fn flush(&mut self) {
        (**self).flush()
    }
}
