//! The packet channel: one owned stream, ordered sends, one receive loop.
//!
//! ```text
//!  send() ──► unbounded FIFO ──► writer task ──► stream (write half)
//!                                                      │
//!  on_packet(raw, packet) ◄── receive loop ◄── stream (read half)
//! ```
//!
//! Sends never block: they encode on the caller's task and enqueue the frame.
//! A single writer task drains the queue, so frames reach the wire in the
//! order `send` was called. Closing flips a `watch` status that both tasks
//! select on, which is what unblocks a receive loop parked in a read.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use clashkit_protocol::frame::HEADER_LEN;
use clashkit_protocol::{FrameHeader, Packet, PacketCodec};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace};

use crate::{ChannelId, TransportError};

/// Counter for generating unique channel IDs.
static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ChannelStatus {
    Open,
    Closed,
    /// The writer hit an I/O error; the receive loop reports it.
    WriteFailed(String),
}

/// A connected stream turned into an ordered packet pipe.
///
/// Created by [`PacketChannel::open`], which spawns the writer task and must
/// therefore run inside a Tokio runtime. The receive loop starts separately
/// with [`start_receiving`](Self::start_receiving) so the owner can finish
/// its own bookkeeping before the first packet arrives.
pub struct PacketChannel {
    id: ChannelId,
    codec: Arc<dyn PacketCodec>,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    status: Arc<watch::Sender<ChannelStatus>>,
    /// Read half, taken by the receive loop when it starts.
    reader: Mutex<Option<BoxedReader>>,
}

impl PacketChannel {
    /// Takes ownership of `stream` and starts the writer task.
    pub fn open<S>(stream: S, codec: Arc<dyn PacketCodec>) -> Arc<Self>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let id = ChannelId::new(NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed));
        let (reader, writer) = tokio::io::split(stream);
        let (outbound, frames) = mpsc::unbounded_channel();
        let (status, _) = watch::channel(ChannelStatus::Open);
        let status = Arc::new(status);
        // Subscribed here so a close that lands before the task first runs
        // is still seen as a change.
        let shutdown = status.subscribe();

        tokio::spawn(write_loop(id, writer, frames, Arc::clone(&status), shutdown));
        debug!(%id, "packet channel opened");

        Arc::new(Self {
            id,
            codec,
            outbound,
            status,
            reader: Mutex::new(Some(Box::new(reader))),
        })
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Whether the channel still accepts sends.
    pub fn is_open(&self) -> bool {
        matches!(*self.status.borrow(), ChannelStatus::Open)
    }

    /// Encodes `packet` and queues it behind every earlier send.
    ///
    /// Returns as soon as the frame is queued; the writer task puts it on
    /// the wire. Frames still queued when the channel closes are dropped.
    ///
    /// # Errors
    /// - [`TransportError::NotConnected`]: the channel is closed or its
    ///   writer failed.
    /// - [`TransportError::Codec`]: the packet could not be encoded.
    pub fn send(&self, packet: &Packet) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotConnected);
        }
        let frame = self.codec.encode(packet)?;
        trace!(id = %self.id, packet = %packet, len = frame.len(), "queueing frame");
        self.outbound
            .send(frame)
            .map_err(|_| TransportError::NotConnected)
    }

    /// Starts the receive loop.
    ///
    /// Every decoded frame is passed to `on_packet` together with its raw
    /// bytes, on the loop's own task: the next frame is not read until
    /// `on_packet` returns. The first decode or transport failure (a clean
    /// EOF included) is passed to `on_error` and ends the loop. Closing the
    /// channel ends the loop without calling `on_error`.
    ///
    /// # Errors
    /// - [`TransportError::NotConnected`]: the channel is already closed.
    /// - [`TransportError::AlreadyReceiving`]: called a second time.
    pub fn start_receiving<P, E>(&self, on_packet: P, on_error: E) -> Result<(), TransportError>
    where
        P: FnMut(&[u8], Packet) + Send + 'static,
        E: FnOnce(TransportError) + Send + 'static,
    {
        if matches!(*self.status.borrow(), ChannelStatus::Closed) {
            return Err(TransportError::NotConnected);
        }
        let reader = self
            .reader
            .lock()
            .take()
            .ok_or(TransportError::AlreadyReceiving)?;

        tokio::spawn(read_loop(
            self.id,
            reader,
            Arc::clone(&self.codec),
            self.status.subscribe(),
            on_packet,
            on_error,
        ));
        Ok(())
    }

    /// Closes the channel. Safe to call any number of times, from any task.
    pub fn close(&self) {
        let closed_now = self.status.send_if_modified(|status| {
            if *status == ChannelStatus::Open {
                *status = ChannelStatus::Closed;
                true
            } else {
                false
            }
        });
        // Drop an unread read half right away rather than with the channel.
        self.reader.lock().take();
        if closed_now {
            debug!(id = %self.id, "packet channel closed");
        }
    }
}

impl Drop for PacketChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Reads one complete frame (header + body) from `reader`.
///
/// An end-of-stream in the middle of or before a frame is reported as
/// [`TransportError::ConnectionClosed`].
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut frame = vec![0u8; HEADER_LEN];
    reader.read_exact(&mut frame).await.map_err(read_error)?;
    let header = FrameHeader::parse(&frame)?;
    frame.resize(header.frame_len(), 0);
    reader
        .read_exact(&mut frame[HEADER_LEN..])
        .await
        .map_err(read_error)?;
    Ok(frame)
}

fn read_error(e: io::Error) -> TransportError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        TransportError::ConnectionClosed("peer closed the connection".into())
    } else {
        TransportError::ReceiveFailed(e)
    }
}

async fn write_loop<W>(
    id: ChannelId,
    mut writer: W,
    mut frames: mpsc::UnboundedReceiver<Vec<u8>>,
    status: Arc<watch::Sender<ChannelStatus>>,
    mut shutdown: watch::Receiver<ChannelStatus>,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        let frame = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            frame = frames.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        let written = async {
            writer.write_all(&frame).await?;
            writer.flush().await
        }
        .await;

        if let Err(e) = written {
            debug!(%id, error = %e, "write failed");
            status.send_if_modified(|s| {
                if *s == ChannelStatus::Open {
                    *s = ChannelStatus::WriteFailed(e.to_string());
                    true
                } else {
                    false
                }
            });
            break;
        }
    }
    let _ = writer.shutdown().await;
    trace!(%id, "writer task finished");
}

async fn read_loop<P, E>(
    id: ChannelId,
    mut reader: BoxedReader,
    codec: Arc<dyn PacketCodec>,
    mut status: watch::Receiver<ChannelStatus>,
    mut on_packet: P,
    on_error: E,
) where
    P: FnMut(&[u8], Packet) + Send + 'static,
    E: FnOnce(TransportError) + Send + 'static,
{
    let error = loop {
        let current = status.borrow_and_update().clone();
        match current {
            ChannelStatus::Open => {}
            ChannelStatus::Closed => {
                debug!(%id, "receive loop stopped by close");
                return;
            }
            ChannelStatus::WriteFailed(reason) => {
                break TransportError::SendFailed(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    reason,
                ));
            }
        }

        let frame = tokio::select! {
            biased;
            changed = status.changed() => {
                if changed.is_err() {
                    return;
                }
                continue;
            }
            frame = read_frame(&mut reader) => frame,
        };

        let decoded = frame.and_then(|raw| {
            let packet = codec.decode(&raw)?;
            Ok((raw, packet))
        });
        match decoded {
            Ok((raw, packet)) => {
                trace!(%id, packet = %packet, "frame received");
                on_packet(&raw, packet);
            }
            Err(e) => break e,
        }
    };

    debug!(%id, error = %error, "receive loop terminated");
    on_error(error);
}
