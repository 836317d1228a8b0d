use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{Deserialize, LEN_TYPE_SIZE, LenType, msg};

/// Until the model dimension is known only control messages, reports and errors are expected.
const CONTROL_FRAME_LEN: usize = 1 << 16;

/// The receiving end handle of the communication.
///
/// Frames longer than the current limit are rejected before any allocation happens.
pub struct MsgReceiver<R: AsyncRead + Unpin> {
    rx: R,
    max_len: usize,
}

impl<R: AsyncRead + Unpin> MsgReceiver<R> {
    /// Creates a new `MsgReceiver` instance.
    ///
    /// # Arguments
    /// * `rx` - The underlying reader.
    pub(super) fn new(rx: R) -> Self {
        Self {
            rx,
            max_len: CONTROL_FRAME_LEN,
        }
    }

    /// Raises the frame limit to fit model messages of `num_params` parameters.
    ///
    /// Meant to be called once the join handshake settled the model dimension.
    pub fn limit_to_model(&mut self, num_params: usize) {
        self.max_len = CONTROL_FRAME_LEN.max(msg::model_frame_len(num_params));
    }

    /// Waits to receive a new message from the inner reader.
    ///
    /// The frame is read into `buf`, which is grown as needed and reused across calls.
    /// Numeric payloads are decoded in place, so the element type of `buf` must be at
    /// least as aligned as the numbers it carries (`Vec<f32>` is the usual choice).
    ///
    /// # Arguments
    /// * `buf` - The buffer to use for deserialization, the returned
    ///           `T`'s lifetimes will be tied to this buffer.
    ///
    /// # Returns
    /// A result object that returns `T` on success or `io::Error` on failure.
    pub async fn recv_into<'buf, T, B>(&mut self, buf: &'buf mut Vec<B>) -> io::Result<T>
    where
        T: Deserialize<'buf>,
        B: bytemuck::Pod,
    {
        let mut size_buf = [0; LEN_TYPE_SIZE];
        self.rx.read_exact(&mut size_buf).await?;
        let len = LenType::from_be_bytes(size_buf) as usize;

        if len > self.max_len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame of {len} bytes exceeds the limit of {} bytes", self.max_len),
            ));
        }

        let needed = len.div_ceil(size_of::<B>().max(1));
        buf.clear();
        buf.resize(needed, B::zeroed());

        let view: &mut [u8] = bytemuck::cast_slice_mut(buf.as_mut_slice());
        let slice = &mut view[..len];
        self.rx.read_exact(slice).await?;

        T::deserialize(slice)
    }
}
