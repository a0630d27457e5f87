//! Source group selection and sensor matching.

use contracts::{FrameSourceInfo, SensorType, SourceGroupInfo, SourceGroupKind};

/// Display name of the photo/video camera group.
pub const PHOTO_VIDEO_GROUP_NAME: &str = "MN34150";

/// Pick the group of `kind` among the enumerated groups.
pub fn select_source_group(
    kind: SourceGroupKind,
    groups: &[SourceGroupInfo],
) -> Option<&SourceGroupInfo> {
    match kind {
        SourceGroupKind::PhotoVideo => groups
            .iter()
            .find(|group| group.display_name == PHOTO_VIDEO_GROUP_NAME),
        SourceGroupKind::ResearchMode => groups.iter().find(|group| {
            group
                .sources
                .iter()
                .any(|source| research_sensor_type(source).is_some())
        }),
    }
}

/// Logical sensor type of `source` within a group of `kind`.
///
/// Every source of the photo/video group is the photo/video sensor.
/// Research-mode sources carry their sensor name in the user-data blob.
pub fn sensor_type_for_source(kind: SourceGroupKind, source: &FrameSourceInfo) -> Option<SensorType> {
    match kind {
        SourceGroupKind::PhotoVideo => Some(SensorType::PhotoVideo),
        SourceGroupKind::ResearchMode => research_sensor_type(source),
    }
}

fn research_sensor_type(source: &FrameSourceInfo) -> Option<SensorType> {
    source
        .user_data_name()
        .and_then(|name| SensorType::from_device_name(&name))
}
