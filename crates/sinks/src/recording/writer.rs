//! Per-sensor recording output: one image file per frame plus a CSV index.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use contracts::{
    CoreIntrinsics, ImageBuffer, PixelFormat, SensorFrame, SensorType, Timestamp, Transform,
};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};

use crate::error::{Result, SinkError};
use crate::handle::{FrameWriter, WriteOutcome};

const MATRIX_NAMES: [&str; 3] = [
    "FrameToOrigin",
    "CameraViewTransform",
    "CameraProjectionTransform",
];

/// Header of a sensor's CSV index.
pub fn csv_header() -> String {
    let mut columns = vec!["Timestamp".to_string(), "ImageFileName".to_string()];
    for matrix in MATRIX_NAMES {
        for row in 1..=4 {
            for col in 1..=4 {
                columns.push(format!("{matrix}.m{row}{col}"));
            }
        }
    }
    columns.join(",")
}

fn push_matrix(line: &mut String, matrix: &Transform) {
    for row in 0..4 {
        for col in 0..4 {
            line.push(',');
            line.push_str(&matrix[(row, col)].to_string());
        }
    }
}

/// CSV row for `frame`; matrices are written row by row.
pub fn csv_row(frame: &SensorFrame, image_file: &str) -> String {
    let mut line = format!("{},{image_file}", frame.timestamp().ticks());
    push_matrix(&mut line, frame.frame_to_origin());
    push_matrix(&mut line, frame.camera_view_transform());
    push_matrix(&mut line, frame.camera_projection_transform());
    line
}

/// Whether frames of `sensor` in `format` are stored as PNG rather than PGM.
fn stored_as_png(sensor: SensorType, format: PixelFormat) -> bool {
    format == PixelFormat::Bgra8 && !sensor.is_visible_light()
}

/// Relative path of the image file of a frame.
pub fn image_file_name(sensor: SensorType, format: PixelFormat, timestamp: Timestamp) -> String {
    let extension = if stored_as_png(sensor, format) { "png" } else { "pgm" };
    format!(
        "{}/{:020}.{extension}",
        sensor.recording_name(),
        timestamp.ticks()
    )
}

/// Binary PGM (P5) with the payload bytes copied verbatim.
///
/// Packed visible-light frames are written at their native grayscale width.
pub fn encode_pgm(sensor: SensorType, image: &ImageBuffer) -> Vec<u8> {
    let (width, max_value) = match image.format() {
        PixelFormat::Bgra8 => (image.width() * sensor.packed_width_multiplier(), 255),
        format => (image.width(), format.max_value()),
    };
    let header = format!("P5\n{width} {}\n{max_value}\n", image.height());
    let mut bytes = Vec::with_capacity(header.len() + image.data().len());
    bytes.extend_from_slice(header.as_bytes());
    bytes.extend_from_slice(image.data());
    bytes
}

/// PNG of a BGRA8 image.
pub fn encode_png(image: &ImageBuffer) -> Result<Vec<u8>> {
    let mut rgba = image.data().to_vec();
    for pixel in rgba.chunks_exact_mut(4) {
        pixel.swap(0, 2);
    }
    let buffer = image::RgbaImage::from_raw(image.width(), image.height(), rgba)
        .ok_or_else(|| SinkError::encode("payload does not match image size"))?;
    let mut png = Vec::new();
    buffer
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| SinkError::encode(e.to_string()))?;
    Ok(png)
}

/// Writes the frames of one sensor into a recording folder.
pub struct RecorderWriter {
    name: String,
    sensor: SensorType,
    folder: PathBuf,
    csv: BufWriter<File>,
    previous: Option<Timestamp>,
    intrinsics: Option<CoreIntrinsics>,
}

impl RecorderWriter {
    /// Create `<folder>/<sensor>/` and `<folder>/<sensor>.csv`.
    #[instrument(name = "recorder_writer_create", skip(folder), fields(sensor = %sensor))]
    pub async fn create(sensor: SensorType, folder: &Path) -> Result<Self> {
        let image_dir = folder.join(sensor.recording_name());
        fs::create_dir_all(&image_dir)
            .await
            .map_err(|e| SinkError::recording(&image_dir, e))?;

        let csv_path = folder.join(format!("{}.csv", sensor.recording_name()));
        let file = File::create(&csv_path)
            .await
            .map_err(|e| SinkError::recording(&csv_path, e))?;
        let mut csv = BufWriter::new(file);
        csv.write_all(csv_header().as_bytes()).await?;
        csv.write_all(b"\n").await?;

        debug!(path = %csv_path.display(), "recorder sink ready");
        Ok(Self {
            name: format!("record_{}", sensor.recording_name()),
            sensor,
            folder: folder.to_path_buf(),
            csv,
            previous: None,
            intrinsics: None,
        })
    }

    pub fn sensor(&self) -> SensorType {
        self.sensor
    }

    /// Generic intrinsics of the first frame that carried them.
    pub fn intrinsics(&self) -> Option<&CoreIntrinsics> {
        self.intrinsics.as_ref()
    }
}

impl FrameWriter for RecorderWriter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, frame: &SensorFrame) -> Result<WriteOutcome> {
        if self.intrinsics.is_none() {
            self.intrinsics = frame.intrinsics().and_then(|i| i.as_core()).copied();
        }
        if self.previous == Some(frame.timestamp()) {
            return Ok(WriteOutcome::Duplicate);
        }
        self.previous = Some(frame.timestamp());

        let image = frame.image();
        let file_name = image_file_name(self.sensor, image.format(), frame.timestamp());
        let bytes = if stored_as_png(self.sensor, image.format()) {
            encode_png(image)?
        } else {
            encode_pgm(self.sensor, image)
        };
        let path = self.folder.join(&file_name);
        fs::write(&path, bytes)
            .await
            .map_err(|e| SinkError::recording(&path, e))?;

        let mut row = csv_row(frame, &file_name);
        row.push('\n');
        self.csv.write_all(row.as_bytes()).await?;
        Ok(WriteOutcome::Written)
    }

    async fn finish(&mut self) -> Result<()> {
        self.csv.flush().await?;
        Ok(())
    }
}
