use crate::packet::Packet;
use log::{error, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Mutex;
use tokio::net::TcpStream;

/// Upper bound for a single frame; anything larger is treated as a corrupt
/// stream and surfaces as a disconnect.
pub const MAX_FRAME_LEN: usize = 4 * 1024 * 1024;

const LEN_PREFIX: usize = 4;

enum Frame {
    Ready(Packet),
    NeedMore,
    Corrupt,
}

/// Bidirectional packet channel over a TCP stream: length-prefixed bincode
/// frames. `send` is best-effort, `receive` returns `None` on any kind of
/// disconnect (graceful close, abrupt close, corrupt frame).
pub struct Connection {
    stream: TcpStream,
    read_buf: Mutex<Vec<u8>>,
    // Serializes writers so concurrent sends cannot interleave frames.
    write_lock: tokio::sync::Mutex<()>,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            read_buf: Mutex::new(Vec::new()),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.stream.peer_addr().ok()
    }

    /// Sends one packet. Failures are reported to the caller but the
    /// connection performs no retries.
    pub async fn send(&self, packet: &Packet) -> io::Result<()> {
        let body = bincode::serialize(packet)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut frame = Vec::with_capacity(LEN_PREFIX + body.len());
        frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
        frame.extend_from_slice(&body);

        let _guard = self.write_lock.lock().await;

        let mut written = 0;
        while written < frame.len() {
            self.stream.writable().await?;
            match self.stream.try_write(&frame[written..]) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Blocks until a full packet arrives. `None` means the peer is gone;
    /// callers must treat it as a disconnect, never as an empty packet.
    pub async fn receive(&self) -> Option<Packet> {
        loop {
            match self.buffered_frame() {
                Frame::Ready(packet) => return Some(packet),
                Frame::Corrupt => return None,
                Frame::NeedMore => {}
            }

            if self.stream.readable().await.is_err() {
                return None;
            }

            let mut chunk = [0u8; 4096];
            match self.stream.try_read(&mut chunk) {
                Ok(0) => return None,
                Ok(n) => {
                    let mut buf = self.read_buf.lock().unwrap();
                    buf.extend_from_slice(&chunk[..n]);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => {
                    warn!("connection read failed: {e}");
                    return None;
                }
            }
        }
    }

    /// Non-blocking readiness probe: drains whatever the socket currently
    /// holds into the internal buffer and reports the buffered byte count.
    pub fn available(&self) -> usize {
        loop {
            let mut chunk = [0u8; 4096];
            match self.stream.try_read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    let mut buf = self.read_buf.lock().unwrap();
                    buf.extend_from_slice(&chunk[..n]);
                }
                Err(_) => break,
            }
        }
        self.read_buf.lock().unwrap().len()
    }

    fn buffered_frame(&self) -> Frame {
        let mut buf = self.read_buf.lock().unwrap();

        if buf.len() < LEN_PREFIX {
            return Frame::NeedMore;
        }

        let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        if len > MAX_FRAME_LEN {
            error!("oversized frame ({len} bytes), dropping connection");
            return Frame::Corrupt;
        }

        if buf.len() < LEN_PREFIX + len {
            return Frame::NeedMore;
        }

        let body: Vec<u8> = buf.drain(..LEN_PREFIX + len).skip(LEN_PREFIX).collect();
        match bincode::deserialize(&body) {
            Ok(packet) => Frame::Ready(packet),
            Err(e) => {
                error!("failed to decode packet: {e}");
                Frame::Corrupt
            }
        }
    }
}
