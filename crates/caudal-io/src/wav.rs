//! Block-wise WAV file reading via hound.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::Result;

/// Stream parameters parsed from a WAV header.
#[derive(Debug, Clone, Copy)]
pub struct WavInfo {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// Bits per sample in the file.
    pub bits_per_sample: u16,
    /// Whether samples are stored as IEEE floats rather than integers.
    pub float: bool,
    /// Total frame count.
    pub total_frames: u64,
}

/// Reads just the header of a WAV file.
pub fn read_wav_info(path: impl AsRef<Path>) -> Result<WavInfo> {
    let reader = hound::WavReader::open(path)?;
    Ok(info_from(&reader))
}

fn info_from(reader: &hound::WavReader<BufReader<File>>) -> WavInfo {
    let spec = reader.spec();
    WavInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
        float: spec.sample_format == hound::SampleFormat::Float,
        total_frames: u64::from(reader.duration()),
    }
}

/// Incremental WAV decoder producing fixed-size blocks of normalized f32
/// samples.
///
/// Integer files are scaled by `2^(bits-1)` to the f32 range; float files
/// pass through. The reader keeps its position between calls, so a source
/// element can pull one block per iteration of its streaming loop.
pub struct WavBlockReader {
    reader: hound::WavReader<BufReader<File>>,
    info: WavInfo,
}

impl WavBlockReader {
    /// Opens a WAV file and parses its header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let reader = hound::WavReader::open(path)?;
        let info = info_from(&reader);
        Ok(Self { reader, info })
    }

    /// The stream parameters from the header.
    pub fn info(&self) -> WavInfo {
        self.info
    }

    /// Reads up to `frames` frames of interleaved samples.
    ///
    /// Returns `None` at end of file. The final block may be short.
    pub fn next_block(&mut self, frames: usize) -> Result<Option<Vec<f32>>> {
        let wanted = frames * usize::from(self.info.channels);
        let mut block = Vec::with_capacity(wanted);
        match self.reader.spec().sample_format {
            hound::SampleFormat::Float => {
                for sample in self.reader.samples::<f32>().take(wanted) {
                    block.push(sample?);
                }
            }
            hound::SampleFormat::Int => {
                let scale = (1i64 << (self.info.bits_per_sample - 1)) as f32;
                for sample in self.reader.samples::<i32>().take(wanted) {
                    block.push(sample? as f32 / scale);
                }
            }
        }
        if block.is_empty() {
            Ok(None)
        } else {
            Ok(Some(block))
        }
    }
}
