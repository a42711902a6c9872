//! Frame reading over byte streams.
//!
//! Frames are self-delimiting (fixed header, then `payload_size` bytes), so
//! any ordered byte stream carries them: QUIC streams in production, turmoil
//! TCP in simulation.

use bytes::BytesMut;
use screenwall_proto::{Frame, FrameHeader};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::ServerError;

/// Read one frame.
///
/// Returns `Ok(None)` when the stream ends cleanly on a frame boundary. The
/// header is validated before the payload is read, so an oversized length
/// never allocates.
///
/// # Errors
///
/// - `ServerError::Protocol` if the header is invalid
/// - `ServerError::Transport` on I/O failure or a stream cut mid-frame
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Frame>, ServerError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FrameHeader::SIZE];

    // EOF before the first byte is a clean close; anywhere later it is a cut.
    if reader.read(&mut header[..1]).await? == 0 {
        return Ok(None);
    }
    reader.read_exact(&mut header[1..]).await?;

    let payload_size = FrameHeader::from_bytes(&header)?.payload_size() as usize;

    let mut buf = BytesMut::with_capacity(FrameHeader::SIZE + payload_size);
    buf.extend_from_slice(&header);
    buf.resize(FrameHeader::SIZE + payload_size, 0);
    reader.read_exact(&mut buf[FrameHeader::SIZE..]).await?;

    Ok(Some(Frame::decode(&buf)?))
}
