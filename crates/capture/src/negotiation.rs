//! Media format negotiation.

use contracts::{FrameSourceInfo, MediaFormat, SourceGroupKind, SourceKind};

/// Subtype color frames are converted to.
pub const COLOR_OUTPUT_SUBTYPE: &str = "BGRA8";
/// The only depth subtype accepted.
pub const DEPTH_SUBTYPE: &str = "D16";
/// Infrared subtypes accepted (case-insensitive).
pub const INFRARED_SUBTYPES: [&str; 2] = ["L8", "L16"];

/// Format chosen for a source.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatChoice {
    pub format: MediaFormat,
    /// Conversion requested from the reader, if any
    pub output_subtype: Option<&'static str>,
}

/// First acceptable format offered by `source`, or `None` to skip the source.
///
/// Color is always accepted and converted to BGRA8. Depth and infrared are
/// only accepted in research-mode groups.
pub fn negotiate_format(group: SourceGroupKind, source: &FrameSourceInfo) -> Option<FormatChoice> {
    source.formats.iter().find_map(|format| {
        accepts(group, source.kind, &format.subtype).then(|| FormatChoice {
            format: format.clone(),
            output_subtype: (source.kind == SourceKind::Color).then_some(COLOR_OUTPUT_SUBTYPE),
        })
    })
}

fn accepts(group: SourceGroupKind, kind: SourceKind, subtype: &str) -> bool {
    let research = group == SourceGroupKind::ResearchMode;
    match kind {
        SourceKind::Color => true,
        SourceKind::Depth => research && subtype == DEPTH_SUBTYPE,
        SourceKind::Infrared => {
            research
                && INFRARED_SUBTYPES
                    .iter()
                    .any(|accepted| subtype.eq_ignore_ascii_case(accepted))
        }
        SourceKind::Other => false,
    }
}
