//! Streaming wire header
//!
//! Every streamed frame is a fixed 32-byte little-endian header followed by
//! `height * row_stride` bytes of raw pixels, no padding, no compression.
//!
//! | offset | size | field        |
//! |--------|------|--------------|
//! | 0      | 4    | cookie       |
//! | 4      | 1    | major        |
//! | 5      | 1    | minor        |
//! | 6      | 2    | sensor type  |
//! | 8      | 8    | timestamp    |
//! | 16     | 4    | width        |
//! | 20     | 4    | height       |
//! | 24     | 4    | pixel stride |
//! | 28     | 4    | row stride   |

use bytes::{Buf, BufMut, BytesMut};

use crate::{ContractError, SensorFrame, SensorType, Timestamp};

/// Magic cookie, "HLRM".
pub const STREAM_COOKIE: u32 = 0x484c_524d;
pub const STREAM_VERSION_MAJOR: u8 = 0x00;
pub const STREAM_VERSION_MINOR: u8 = 0x01;

/// Encoded header size in bytes.
pub const STREAM_HEADER_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorFrameStreamHeader {
    pub sensor_type: SensorType,
    pub timestamp: Timestamp,
    pub image_width: u32,
    pub image_height: u32,
    pub pixel_stride: u32,
    pub row_stride: u32,
}

impl SensorFrameStreamHeader {
    /// Header describing `frame`'s image as it is stored.
    pub fn for_frame(frame: &SensorFrame) -> Self {
        let image = frame.image();
        Self {
            sensor_type: frame.sensor_type(),
            timestamp: frame.timestamp(),
            image_width: image.width(),
            image_height: image.height(),
            pixel_stride: image.pixel_stride(),
            row_stride: image.row_stride(),
        }
    }

    /// Number of payload bytes following the header.
    pub fn payload_len(&self) -> usize {
        self.image_height as usize * self.row_stride as usize
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(STREAM_HEADER_LEN);
        dst.put_u32_le(STREAM_COOKIE);
        dst.put_u8(STREAM_VERSION_MAJOR);
        dst.put_u8(STREAM_VERSION_MINOR);
        dst.put_u16_le(self.sensor_type.wire_code());
        dst.put_u64_le(self.timestamp.ticks() as u64);
        dst.put_u32_le(self.image_width);
        dst.put_u32_le(self.image_height);
        dst.put_u32_le(self.pixel_stride);
        dst.put_u32_le(self.row_stride);
    }

    /// Parse a header, consuming exactly [`STREAM_HEADER_LEN`] bytes on success.
    ///
    /// # Errors
    /// Short input, wrong cookie or version, unknown sensor code.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ContractError> {
        if src.remaining() < STREAM_HEADER_LEN {
            return Err(ContractError::protocol(format!(
                "header needs {STREAM_HEADER_LEN} bytes, got {}",
                src.remaining()
            )));
        }
        let cookie = src.get_u32_le();
        if cookie != STREAM_COOKIE {
            return Err(ContractError::protocol(format!(
                "bad cookie {cookie:#010x}"
            )));
        }
        let major = src.get_u8();
        let minor = src.get_u8();
        if (major, minor) != (STREAM_VERSION_MAJOR, STREAM_VERSION_MINOR) {
            return Err(ContractError::protocol(format!(
                "unsupported version {major}.{minor}"
            )));
        }
        let sensor_type = SensorType::try_from(src.get_u16_le())?;
        let timestamp = Timestamp::from_ticks(src.get_u64_le() as i64);
        let image_width = src.get_u32_le();
        let image_height = src.get_u32_le();
        let pixel_stride = src.get_u32_le();
        let row_stride = src.get_u32_le();

        Ok(Self {
            sensor_type,
            timestamp,
            image_width,
            image_height,
            pixel_stride,
            row_stride,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ImageBuffer, PixelFormat};

    fn header() -> SensorFrameStreamHeader {
        SensorFrameStreamHeader {
            sensor_type: SensorType::LongThrowToFDepth,
            timestamp: Timestamp::from_ticks(132_000_000_000_000_000),
            image_width: 448,
            image_height: 450,
            pixel_stride: 2,
            row_stride: 896,
        }
    }

    #[test]
    fn test_encoded_layout() {
        let mut buf = BytesMut::new();
        header().encode(&mut buf);
        assert_eq!(buf.len(), STREAM_HEADER_LEN);
        assert_eq!(&buf[0..4], &[0x4d, 0x52, 0x4c, 0x48]);
        assert_eq!(buf[4], 0);
        assert_eq!(buf[5], 1);
        assert_eq!(&buf[6..8], &[3, 0]);
        assert_eq!(&buf[28..32], &896u32.to_le_bytes());
    }

    #[test]
    fn test_decode_consumes_header_only() {
        let mut buf = BytesMut::new();
        header().encode(&mut buf);
        buf.extend_from_slice(&[0xaa, 0xbb]);
        let mut bytes = buf.freeze();
        let decoded = SensorFrameStreamHeader::decode(&mut bytes).unwrap();
        assert_eq!(decoded, header());
        assert_eq!(decoded.payload_len(), 450 * 896);
        assert_eq!(bytes.remaining(), 2);
    }

    #[test]
    fn test_decode_rejects_bad_cookie_and_version() {
        let mut buf = BytesMut::new();
        header().encode(&mut buf);

        let mut bad_cookie = buf.clone();
        bad_cookie[0] = 0;
        assert!(matches!(
            SensorFrameStreamHeader::decode(&mut bad_cookie.freeze()),
            Err(ContractError::Protocol { .. })
        ));

        let mut bad_version = buf.clone();
        bad_version[5] = 9;
        assert!(SensorFrameStreamHeader::decode(&mut bad_version.freeze()).is_err());

        let mut short = buf.freeze().slice(0..10);
        assert!(SensorFrameStreamHeader::decode(&mut short).is_err());
    }

    #[test]
    fn test_header_for_frame() {
        let frame = SensorFrame::new(
            SensorType::PhotoVideo,
            Timestamp::from_ticks(9),
            ImageBuffer::blank(3, 2, PixelFormat::Bgra8),
        );
        let header = SensorFrameStreamHeader::for_frame(&frame);
        assert_eq!(header.pixel_stride, 4);
        assert_eq!(header.row_stride, 12);
        assert_eq!(header.payload_len(), 24);
    }
}
