//! The sending end of the framing layer.

use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{LEN_TYPE_SIZE, LenType, Serialize};

/// The sending end handle of the communication.
pub struct MsgSender<W>
where
    W: AsyncWrite + Unpin,
{
    tx: W,
    buf: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> MsgSender<W> {
    /// Creates a new `MsgSender` instance.
    ///
    /// # Arguments
    /// * `tx` - The underlying writer.
    pub(super) fn new(tx: W) -> Self {
        Self {
            tx,
            buf: Vec::new(),
        }
    }

    /// Sends `msg` through the inner writer, one length-prefixed frame per call.
    ///
    /// # Arguments
    /// * `msg` - A serializable object.
    ///
    /// # Returns
    /// A result object that returns `io::Error` on failure.
    pub async fn send<'a, T: Serialize<'a>>(&mut self, msg: &'a T) -> io::Result<()> {
        let Self { buf, tx } = self;

        buf.clear();
        buf.resize(LEN_TYPE_SIZE, 0);

        let tail = msg.serialize(buf);
        let len = buf.len() - LEN_TYPE_SIZE + tail.map(<[u8]>::len).unwrap_or_default();
        buf[..LEN_TYPE_SIZE].copy_from_slice(&(len as LenType).to_be_bytes());

        tx.write_all(buf).await?;

        if let Some(data) = tail {
            tx.write_all(data).await?;
        }

        tx.flush().await
    }
}
