//! Audio test file generation
//!
//! Writes WAV files with known sample values so decoded PCM can be compared
//! byte for byte.

use hound::{WavSpec, WavWriter};
use std::f32::consts::PI;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Standard test sample rate (44.1 kHz)
pub const TEST_SAMPLE_RATE: u32 = 44100;

/// A WAV file in its own temporary directory
pub struct WavFixture {
    _dir: TempDir,
    path: PathBuf,
}

impl WavFixture {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 16-bit integer WAV; `frames` holds one slice of channel samples per frame
    pub fn s16(name: &str, sample_rate: u32, channels: u16, frames: &[Vec<i16>]) -> Self {
        let (dir, path) = temp_path(name);
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for frame in frames {
            assert_eq!(frame.len(), channels as usize);
            for &sample in frame {
                writer.write_sample(sample).unwrap();
            }
        }
        writer.finalize().unwrap();
        Self { _dir: dir, path }
    }

    /// 32-bit float WAV
    pub fn f32(name: &str, sample_rate: u32, channels: u16, frames: &[Vec<f32>]) -> Self {
        let (dir, path) = temp_path(name);
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for frame in frames {
            for &sample in frame {
                writer.write_sample(sample).unwrap();
            }
        }
        writer.finalize().unwrap();
        Self { _dir: dir, path }
    }

    /// Mono 16-bit sine at `frequency_hz`
    pub fn sine_mono(name: &str, duration_ms: u64, frequency_hz: f32) -> Self {
        Self::s16(name, TEST_SAMPLE_RATE, 1, &sine_frames(duration_ms, frequency_hz, 1))
    }

    /// Stereo 16-bit sine, same value on both channels
    pub fn sine_stereo(name: &str, duration_ms: u64, frequency_hz: f32) -> Self {
        Self::s16(name, TEST_SAMPLE_RATE, 2, &sine_frames(duration_ms, frequency_hz, 2))
    }
}

fn temp_path(name: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    (dir, path)
}

/// Sine frames at half amplitude
pub fn sine_frames(duration_ms: u64, frequency_hz: f32, channels: usize) -> Vec<Vec<i16>> {
    let total_frames = (TEST_SAMPLE_RATE as u64 * duration_ms) / 1000;
    let amplitude = i16::MAX as f32 * 0.5;

    (0..total_frames)
        .map(|i| {
            let t = i as f32 / TEST_SAMPLE_RATE as f32;
            let value = ((2.0 * PI * frequency_hz * t).sin() * amplitude) as i16;
            vec![value; channels]
        })
        .collect()
}

/// Little-endian bytes of interleaved s16 frames
pub fn s16_bytes(frames: &[Vec<i16>]) -> Vec<u8> {
    frames
        .iter()
        .flatten()
        .flat_map(|s| s.to_le_bytes())
        .collect()
}
