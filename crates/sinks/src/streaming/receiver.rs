//! SensorFrameReceiver - client side of a streaming server

use std::net::SocketAddr;

use bytes::{Bytes, BytesMut};
use contracts::{
    ContractError, ImageBuffer, SensorFrame, SensorFrameStreamHeader, SharedFrame,
    STREAM_HEADER_LEN,
};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tracing::{debug, instrument, trace};

use crate::error::{Result, SinkError};

/// Largest payload accepted from the wire (64 MiB).
pub const MAX_PAYLOAD_LEN: usize = 64 * 1024 * 1024;

/// Reads header-prefixed frames from one streaming server.
///
/// Received frames carry no pose or intrinsics: the wire format has none.
pub struct SensorFrameReceiver {
    stream: TcpStream,
    header_buf: [u8; STREAM_HEADER_LEN],
}

impl SensorFrameReceiver {
    #[instrument(name = "receiver_connect")]
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| SinkError::Connect { addr, source })?;
        debug!("connected to streaming server");
        Ok(Self::from_stream(stream))
    }

    pub fn from_stream(stream: TcpStream) -> Self {
        Self {
            stream,
            header_buf: [0; STREAM_HEADER_LEN],
        }
    }

    /// Read and validate the next header.
    pub async fn receive_header(&mut self) -> Result<SensorFrameStreamHeader> {
        match self.stream.read_exact(&mut self.header_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(SinkError::Disconnected)
            }
            Err(e) => return Err(e.into()),
        }
        let header = SensorFrameStreamHeader::decode(&mut &self.header_buf[..])?;
        native_width(&header)?;
        if header.payload_len() > MAX_PAYLOAD_LEN {
            return Err(ContractError::protocol(format!(
                "payload of {} bytes exceeds {MAX_PAYLOAD_LEN}",
                header.payload_len()
            ))
            .into());
        }
        trace!(
            sensor = %header.sensor_type,
            width = header.image_width,
            height = header.image_height,
            pixel_stride = header.pixel_stride,
            timestamp = %header.timestamp,
            "header received"
        );
        Ok(header)
    }

    /// Read the payload described by `header` and rebuild the frame.
    ///
    /// Visible-light frames are unpacked to their native grayscale width.
    pub async fn receive_frame(&mut self, header: &SensorFrameStreamHeader) -> Result<SharedFrame> {
        let width = native_width(header)?;
        let mut payload = BytesMut::zeroed(header.payload_len());
        match self.stream.read_exact(&mut payload).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(SinkError::Disconnected)
            }
            Err(e) => return Err(e.into()),
        }

        let sensor = header.sensor_type;
        let image = ImageBuffer::new(
            width,
            header.image_height,
            sensor.stream_pixel_format(),
            Bytes::from(payload),
        )?;
        Ok(SensorFrame::new(sensor, header.timestamp, image).shared())
    }

    /// Next frame from the server.
    ///
    /// # Errors
    /// [`SinkError::Disconnected`] once the server closes the stream; a
    /// protocol error for a bad header or a payload that does not match it.
    pub async fn receive(&mut self) -> Result<SharedFrame> {
        let header = self.receive_header().await?;
        self.receive_frame(&header).await
    }
}

/// Grayscale width of the frame `header` announces.
///
/// The wire carries the stored image: visible-light rows arrive packed four
/// columns per BGRA pixel, so `row_stride` must equal both
/// `width * pixel_stride` and the native width times the stream format's
/// stride.
fn native_width(header: &SensorFrameStreamHeader) -> Result<u32> {
    let sensor = header.sensor_type;
    let geometry_error = || {
        SinkError::from(ContractError::protocol(format!(
            "{sensor} header with width {} pixel stride {} row stride {} is inconsistent",
            header.image_width, header.pixel_stride, header.row_stride
        )))
    };

    let row_stride = header
        .image_width
        .checked_mul(header.pixel_stride)
        .ok_or_else(geometry_error)?;
    let width = header
        .image_width
        .checked_mul(sensor.packed_width_multiplier())
        .ok_or_else(geometry_error)?;
    let native_row_stride = width
        .checked_mul(sensor.stream_pixel_format().pixel_stride())
        .ok_or_else(geometry_error)?;
    if row_stride != header.row_stride || native_row_stride != header.row_stride {
        return Err(geometry_error());
    }
    Ok(width)
}
