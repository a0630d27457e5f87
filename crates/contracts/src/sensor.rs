//! Sensor type catalogue
//!
//! The fixed set of logical sensors a HoloLens capture session can expose, plus
//! the per-sensor constants shared by capture, streaming and recording.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::{ContractError, PixelFormat};

/// Number of known sensor types.
pub const SENSOR_TYPE_COUNT: usize = 9;

/// Logical sensor tag.
///
/// The declaration order is the ordinal used by [`SensorTable`] and by the
/// streaming wire header. Serialized as its recording name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SensorType {
    #[serde(rename = "pv")]
    PhotoVideo,
    #[serde(rename = "short_throw_depth")]
    ShortThrowToFDepth,
    #[serde(rename = "short_throw_reflectivity")]
    ShortThrowToFReflectivity,
    #[serde(rename = "long_throw_depth")]
    LongThrowToFDepth,
    #[serde(rename = "long_throw_reflectivity")]
    LongThrowToFReflectivity,
    #[serde(rename = "vlc_ll")]
    VisibleLightLeftLeft,
    #[serde(rename = "vlc_lf")]
    VisibleLightLeftFront,
    #[serde(rename = "vlc_rf")]
    VisibleLightRightFront,
    #[serde(rename = "vlc_rr")]
    VisibleLightRightRight,
}

impl SensorType {
    /// All sensor types in ordinal order.
    pub const ALL: [SensorType; SENSOR_TYPE_COUNT] = [
        SensorType::PhotoVideo,
        SensorType::ShortThrowToFDepth,
        SensorType::ShortThrowToFReflectivity,
        SensorType::LongThrowToFDepth,
        SensorType::LongThrowToFReflectivity,
        SensorType::VisibleLightLeftLeft,
        SensorType::VisibleLightLeftFront,
        SensorType::VisibleLightRightFront,
        SensorType::VisibleLightRightRight,
    ];

    /// Research-mode sensors, i.e. everything except photo/video.
    pub const RESEARCH_MODE: [SensorType; 8] = [
        SensorType::ShortThrowToFDepth,
        SensorType::ShortThrowToFReflectivity,
        SensorType::LongThrowToFDepth,
        SensorType::LongThrowToFReflectivity,
        SensorType::VisibleLightLeftLeft,
        SensorType::VisibleLightLeftFront,
        SensorType::VisibleLightRightFront,
        SensorType::VisibleLightRightRight,
    ];

    /// Ordinal of this sensor type.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Sensor type for an ordinal.
    ///
    /// # Panics
    /// An out-of-range ordinal is an integration bug and aborts immediately.
    pub fn from_index(index: usize) -> SensorType {
        assert!(
            index < SENSOR_TYPE_COUNT,
            "sensor type index {index} out of range (0..{SENSOR_TYPE_COUNT})"
        );
        Self::ALL[index]
    }

    /// Code written into the streaming header.
    pub const fn wire_code(self) -> u16 {
        self as u16
    }

    /// Short name used for recording folders and CSV files.
    pub const fn recording_name(self) -> &'static str {
        match self {
            SensorType::PhotoVideo => "pv",
            SensorType::ShortThrowToFDepth => "short_throw_depth",
            SensorType::ShortThrowToFReflectivity => "short_throw_reflectivity",
            SensorType::LongThrowToFDepth => "long_throw_depth",
            SensorType::LongThrowToFReflectivity => "long_throw_reflectivity",
            SensorType::VisibleLightLeftLeft => "vlc_ll",
            SensorType::VisibleLightLeftFront => "vlc_lf",
            SensorType::VisibleLightRightFront => "vlc_rf",
            SensorType::VisibleLightRightRight => "vlc_rr",
        }
    }

    /// Name a research-mode source advertises in its user-data blob.
    pub const fn device_name(self) -> &'static str {
        match self {
            SensorType::PhotoVideo => "Photo Video",
            SensorType::ShortThrowToFDepth => "Short Throw ToF Depth",
            SensorType::ShortThrowToFReflectivity => "Short Throw ToF Reflectivity",
            SensorType::LongThrowToFDepth => "Long Throw ToF Depth",
            SensorType::LongThrowToFReflectivity => "Long Throw ToF Reflectivity",
            SensorType::VisibleLightLeftLeft => "Visible Light Left-Left",
            SensorType::VisibleLightLeftFront => "Visible Light Left-Front",
            SensorType::VisibleLightRightFront => "Visible Light Right-Front",
            SensorType::VisibleLightRightRight => "Visible Light Right-Right",
        }
    }

    /// Inverse of [`device_name`](Self::device_name) for research-mode sensors.
    pub fn from_device_name(name: &str) -> Option<SensorType> {
        Self::RESEARCH_MODE
            .into_iter()
            .find(|sensor| sensor.device_name() == name)
    }

    /// Default TCP port of the per-sensor streaming server.
    pub const fn default_streaming_port(self) -> u16 {
        match self {
            SensorType::PhotoVideo => 23940,
            SensorType::ShortThrowToFDepth => 23941,
            SensorType::ShortThrowToFReflectivity => 23942,
            SensorType::VisibleLightLeftLeft => 23943,
            SensorType::VisibleLightLeftFront => 23944,
            SensorType::VisibleLightRightFront => 23945,
            SensorType::VisibleLightRightRight => 23946,
            SensorType::LongThrowToFDepth => 23947,
            SensorType::LongThrowToFReflectivity => 23948,
        }
    }

    pub const fn is_visible_light(self) -> bool {
        matches!(
            self,
            SensorType::VisibleLightLeftLeft
                | SensorType::VisibleLightLeftFront
                | SensorType::VisibleLightRightFront
                | SensorType::VisibleLightRightRight
        )
    }

    pub const fn is_depth(self) -> bool {
        matches!(
            self,
            SensorType::ShortThrowToFDepth | SensorType::LongThrowToFDepth
        )
    }

    /// Visible-light cameras pack four grayscale columns into one BGRA pixel.
    pub const fn packed_width_multiplier(self) -> u32 {
        if self.is_visible_light() {
            4
        } else {
            1
        }
    }

    /// Pixel format a streamed frame of this sensor is interpreted as.
    pub const fn stream_pixel_format(self) -> PixelFormat {
        match self {
            SensorType::PhotoVideo => PixelFormat::Bgra8,
            SensorType::ShortThrowToFDepth | SensorType::LongThrowToFDepth => PixelFormat::Gray16,
            _ => PixelFormat::Gray8,
        }
    }
}

impl TryFrom<u16> for SensorType {
    type Error = ContractError;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or(ContractError::UnknownSensorType { code })
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.recording_name())
    }
}

/// Fixed-size table with one slot per sensor type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorTable<T> {
    slots: [T; SENSOR_TYPE_COUNT],
}

impl<T> SensorTable<T> {
    /// Build a table by evaluating `f` for every sensor type.
    pub fn from_fn(mut f: impl FnMut(SensorType) -> T) -> Self {
        Self {
            slots: std::array::from_fn(|i| f(SensorType::from_index(i))),
        }
    }

    /// Iterate over `(sensor, slot)` in ordinal order.
    pub fn iter(&self) -> impl Iterator<Item = (SensorType, &T)> {
        SensorType::ALL.into_iter().zip(self.slots.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SensorType, &mut T)> {
        SensorType::ALL.into_iter().zip(self.slots.iter_mut())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.slots.iter()
    }
}

impl<T: Default> Default for SensorTable<T> {
    fn default() -> Self {
        Self::from_fn(|_| T::default())
    }
}

impl<T> Index<SensorType> for SensorTable<T> {
    type Output = T;

    fn index(&self, sensor: SensorType) -> &T {
        &self.slots[sensor.index()]
    }
}

impl<T> IndexMut<SensorType> for SensorTable<T> {
    fn index_mut(&mut self, sensor: SensorType) -> &mut T {
        &mut self.slots[sensor.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinals_round_trip() {
        for (i, sensor) in SensorType::ALL.iter().enumerate() {
            assert_eq!(sensor.index(), i);
            assert_eq!(SensorType::from_index(i), *sensor);
        }
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_from_index_out_of_range_panics() {
        let _ = SensorType::from_index(SENSOR_TYPE_COUNT);
    }

    #[test]
    fn test_unknown_wire_code_is_error() {
        assert!(matches!(
            SensorType::try_from(42u16),
            Err(ContractError::UnknownSensorType { code: 42 })
        ));
        assert_eq!(
            SensorType::try_from(3u16).unwrap(),
            SensorType::LongThrowToFDepth
        );
    }

    #[test]
    fn test_device_names() {
        assert_eq!(
            SensorType::from_device_name("Visible Light Left-Front"),
            Some(SensorType::VisibleLightLeftFront)
        );
        assert_eq!(SensorType::from_device_name("Photo Video"), None);
        assert_eq!(SensorType::from_device_name("bogus"), None);
    }

    #[test]
    fn test_streaming_ports_are_unique() {
        let mut ports: Vec<u16> = SensorType::ALL
            .iter()
            .map(|s| s.default_streaming_port())
            .collect();
        ports.sort_unstable();
        ports.dedup();
        assert_eq!(ports.len(), SENSOR_TYPE_COUNT);
    }

    #[test]
    fn test_sensor_table_indexing() {
        let mut table: SensorTable<u32> = SensorTable::default();
        table[SensorType::VisibleLightRightRight] = 7;
        assert_eq!(table[SensorType::VisibleLightRightRight], 7);
        assert_eq!(table.iter().filter(|(_, v)| **v != 0).count(), 1);
    }
}
