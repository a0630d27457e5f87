//! On-disk recording of sensor frames

mod recorder;
mod writer;

pub use recorder::{
    RecordingSummary, SensorFrameRecorder, SensorFrameRecorderSink, DEFAULT_QUEUE_CAPACITY,
    RECORDING_FOLDER_PREFIX, RECORDING_VERSION_MAJOR, RECORDING_VERSION_MINOR,
};
pub use writer::{csv_header, csv_row, encode_pgm, encode_png, image_file_name, RecorderWriter};
