//! Core audio data types
//!
//! Defines the sample format tags, decoded frames and the flat PCM buffer
//! shared by the decoder, assembler and playback engine.
//!
//! **Byte order:** all PCM bytes held by these types are little-endian.

use crate::error::{Error, Result};
use std::fmt;

/// Numeric sample format of decoded audio, including its memory layout.
///
/// Interleaved variants store `[c0 s0, c1 s0, c0 s1, c1 s1, ...]` in one
/// run; planar variants (`*P`) store one contiguous run per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    U8,
    S16,
    S32,
    S64,
    F32,
    F64,
    U8P,
    S16P,
    S32P,
    S64P,
    F32P,
    F64P,
}

impl SampleFormat {
    /// Size of one sample of one channel
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::U8 | SampleFormat::U8P => 1,
            SampleFormat::S16 | SampleFormat::S16P => 2,
            SampleFormat::S32 | SampleFormat::S32P | SampleFormat::F32 | SampleFormat::F32P => 4,
            SampleFormat::S64 | SampleFormat::S64P | SampleFormat::F64 | SampleFormat::F64P => 8,
        }
    }

    pub fn is_planar(self) -> bool {
        matches!(
            self,
            SampleFormat::U8P
                | SampleFormat::S16P
                | SampleFormat::S32P
                | SampleFormat::S64P
                | SampleFormat::F32P
                | SampleFormat::F64P
        )
    }

    /// Interleaved counterpart (identity for interleaved formats)
    pub fn packed(self) -> SampleFormat {
        match self {
            SampleFormat::U8P => SampleFormat::U8,
            SampleFormat::S16P => SampleFormat::S16,
            SampleFormat::S32P => SampleFormat::S32,
            SampleFormat::S64P => SampleFormat::S64,
            SampleFormat::F32P => SampleFormat::F32,
            SampleFormat::F64P => SampleFormat::F64,
            packed => packed,
        }
    }

    /// Raw PCM codec describing an interleaved buffer of this format.
    ///
    /// Total over all formats: there is no fallback codec.
    pub fn raw_pcm_codec(self) -> RawPcmCodec {
        match self.packed() {
            SampleFormat::U8 => RawPcmCodec::PcmU8,
            SampleFormat::S16 => RawPcmCodec::PcmS16Le,
            SampleFormat::S32 => RawPcmCodec::PcmS32Le,
            SampleFormat::S64 => RawPcmCodec::PcmS64Le,
            SampleFormat::F32 => RawPcmCodec::PcmF32Le,
            _ => RawPcmCodec::PcmF64Le,
        }
    }

    /// Short name, e.g. `s16` or `fltp`
    pub fn name(self) -> &'static str {
        match self {
            SampleFormat::U8 => "u8",
            SampleFormat::S16 => "s16",
            SampleFormat::S32 => "s32",
            SampleFormat::S64 => "s64",
            SampleFormat::F32 => "flt",
            SampleFormat::F64 => "dbl",
            SampleFormat::U8P => "u8p",
            SampleFormat::S16P => "s16p",
            SampleFormat::S32P => "s32p",
            SampleFormat::S64P => "s64p",
            SampleFormat::F32P => "fltp",
            SampleFormat::F64P => "dblp",
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw-PCM-equivalent codec used to describe the assembled buffer to a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawPcmCodec {
    PcmU8,
    PcmS16Le,
    PcmS32Le,
    PcmS64Le,
    PcmF32Le,
    PcmF64Le,
}

impl RawPcmCodec {
    /// Interleaved sample format carried by this codec
    pub fn sample_format(self) -> SampleFormat {
        match self {
            RawPcmCodec::PcmU8 => SampleFormat::U8,
            RawPcmCodec::PcmS16Le => SampleFormat::S16,
            RawPcmCodec::PcmS32Le => SampleFormat::S32,
            RawPcmCodec::PcmS64Le => SampleFormat::S64,
            RawPcmCodec::PcmF32Le => SampleFormat::F32,
            RawPcmCodec::PcmF64Le => SampleFormat::F64,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RawPcmCodec::PcmU8 => "pcm_u8",
            RawPcmCodec::PcmS16Le => "pcm_s16le",
            RawPcmCodec::PcmS32Le => "pcm_s32le",
            RawPcmCodec::PcmS64Le => "pcm_s64le",
            RawPcmCodec::PcmF32Le => "pcm_f32le",
            RawPcmCodec::PcmF64Le => "pcm_f64le",
        }
    }
}

impl fmt::Display for RawPcmCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Channel layout advertised to the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    Mono,
    Stereo,
    /// Unnamed layout with the given channel count
    Default(u16),
}

impl ChannelLayout {
    pub fn for_channels(channels: u16) -> Self {
        match channels {
            1 => ChannelLayout::Mono,
            2 => ChannelLayout::Stereo,
            n => ChannelLayout::Default(n),
        }
    }

    pub fn channels(self) -> u16 {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
            ChannelLayout::Default(n) => n,
        }
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelLayout::Mono => f.write_str("mono"),
            ChannelLayout::Stereo => f.write_str("stereo"),
            ChannelLayout::Default(n) => write!(f, "{} channels", n),
        }
    }
}

/// Descriptive tags read from the container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioMetadata {
    pub title: Option<String>,
    pub artists: Vec<String>,
    pub album: Option<String>,
    /// Size in bytes of the first embedded picture, if any
    pub cover_art_bytes: Option<usize>,
}

impl AudioMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.artists.is_empty()
            && self.album.is_none()
            && self.cover_art_bytes.is_none()
    }
}

/// Format metadata of a decoded stream.
///
/// Fixed from the first decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioStreamInfo {
    pub sample_rate: u32,
    pub channels: u16,
    /// Format of the decoded frames (may be planar)
    pub sample_format: SampleFormat,
    /// Codec describing the assembled, interleaved buffer
    pub codec: RawPcmCodec,
    /// Bits per second of the assembled buffer; filled by the assembler
    pub bit_rate: Option<u64>,
    /// Short name of the source codec, e.g. `flac`
    pub source_codec: String,
    pub metadata: AudioMetadata,
}

impl AudioStreamInfo {
    pub fn new(sample_rate: u32, channels: u16, sample_format: SampleFormat) -> Self {
        Self {
            sample_rate,
            channels,
            sample_format,
            codec: sample_format.raw_pcm_codec(),
            bit_rate: None,
            source_codec: String::from("unknown"),
            metadata: AudioMetadata::default(),
        }
    }

    pub fn bytes_per_sample(&self) -> usize {
        self.sample_format.bytes_per_sample()
    }

    /// Bytes of one sample across all channels
    pub fn bytes_per_frame(&self) -> usize {
        self.bytes_per_sample() * self.channels as usize
    }

    /// `sample_rate * channels * bytes_per_sample * 8`
    pub fn computed_bit_rate(&self) -> u64 {
        self.sample_rate as u64 * self.channels as u64 * self.bytes_per_sample() as u64 * 8
    }

    /// Bytes covering `seconds` of playback
    pub fn bytes_for_seconds(&self, seconds: u64) -> usize {
        (seconds as usize)
            .saturating_mul(self.sample_rate as usize)
            .saturating_mul(self.bytes_per_frame())
    }
}

/// Sample storage of a decoded frame
#[derive(Debug, Clone, PartialEq)]
pub enum FrameData {
    /// One run holding all channels, sample by sample
    Interleaved(Vec<u8>),
    /// One run per channel
    Planar(Vec<Vec<u8>>),
}

/// One unit of decoded audio, owned independently of the codec.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    format: SampleFormat,
    channels: u16,
    sample_rate: u32,
    samples: usize,
    data: FrameData,
}

impl DecodedFrame {
    /// Build an interleaved frame; `data` must hold exactly
    /// `samples * channels` samples of `format`.
    pub fn interleaved(
        format: SampleFormat,
        channels: u16,
        sample_rate: u32,
        data: Vec<u8>,
    ) -> Result<Self> {
        if format.is_planar() {
            return Err(Error::InvalidArgument(format!(
                "planar format {} given interleaved data",
                format
            )));
        }
        if channels == 0 {
            return Err(Error::UnsupportedFormat("frame with zero channels".into()));
        }
        let frame_bytes = format.bytes_per_sample() * channels as usize;
        if data.len() % frame_bytes != 0 {
            return Err(Error::InvalidArgument(format!(
                "{} bytes is not a whole number of {}-byte sample frames",
                data.len(),
                frame_bytes
            )));
        }
        Ok(Self {
            format,
            channels,
            sample_rate,
            samples: data.len() / frame_bytes,
            data: FrameData::Interleaved(data),
        })
    }

    /// Build a planar frame from one byte run per channel; every plane must
    /// hold the same number of samples.
    pub fn planar(format: SampleFormat, sample_rate: u32, planes: Vec<Vec<u8>>) -> Result<Self> {
        if !format.is_planar() {
            return Err(Error::InvalidArgument(format!(
                "interleaved format {} given planar data",
                format
            )));
        }
        let channels = u16::try_from(planes.len())
            .map_err(|_| Error::UnsupportedFormat(format!("{} channels", planes.len())))?;
        if channels == 0 {
            return Err(Error::UnsupportedFormat("frame with zero channels".into()));
        }
        let bps = format.bytes_per_sample();
        let plane_len = planes[0].len();
        if plane_len % bps != 0 || planes.iter().any(|p| p.len() != plane_len) {
            return Err(Error::InvalidArgument(
                "planes differ in length or hold partial samples".into(),
            ));
        }
        Ok(Self {
            format,
            channels,
            sample_rate,
            samples: plane_len / bps,
            data: FrameData::Planar(planes),
        })
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples per channel
    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn data(&self) -> &FrameData {
        &self.data
    }

    /// Size of the frame's samples once interleaved
    pub fn byte_len(&self) -> usize {
        self.samples * self.format.bytes_per_sample() * self.channels as usize
    }
}

/// Initial slot count of a [`FrameSequence`]
pub const INITIAL_FRAME_CAPACITY: usize = 64;

/// Ordered collection of decoded frames.
///
/// Capacity doubles whenever it is exhausted. Growth is fallible so an
/// allocation failure surfaces as an error instead of an abort.
#[derive(Debug, Default)]
pub struct FrameSequence {
    frames: Vec<DecodedFrame>,
}

impl FrameSequence {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    pub fn push(&mut self, frame: DecodedFrame) -> Result<()> {
        if self.frames.len() == self.frames.capacity() {
            let additional = self.frames.capacity().max(INITIAL_FRAME_CAPACITY);
            self.frames.try_reserve_exact(additional).map_err(|e| {
                Error::MemoryAllocationFailed(format!(
                    "growing frame sequence beyond {} frames: {}",
                    self.frames.len(),
                    e
                ))
            })?;
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.frames.capacity()
    }

    pub fn first(&self) -> Option<&DecodedFrame> {
        self.frames.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DecodedFrame> {
        self.frames.iter()
    }

    /// Samples per channel across all frames
    pub fn total_samples(&self) -> usize {
        self.frames.iter().map(DecodedFrame::samples).sum()
    }
}

impl<'a> IntoIterator for &'a FrameSequence {
    type Item = &'a DecodedFrame;
    type IntoIter = std::slice::Iter<'a, DecodedFrame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

/// Allocate an empty byte vector able to hold `len` bytes without reallocating
pub(crate) fn try_alloc_bytes(len: usize, what: &str) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    bytes.try_reserve_exact(len).map_err(|e| {
        Error::MemoryAllocationFailed(format!("{} ({} bytes): {}", what, len, e))
    })?;
    Ok(bytes)
}

/// Flat interleaved PCM buffer with a playback cursor.
///
/// Invariant: `0 <= position <= len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmBuffer {
    data: Vec<u8>,
    position: usize,
}

impl PcmBuffer {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, position: 0 }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn is_at_end(&self) -> bool {
        self.position == self.data.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Bytes from the cursor, at most `max` of them. Does not move the cursor.
    pub fn peek(&self, max: usize) -> &[u8] {
        let end = self.position + max.min(self.remaining());
        &self.data[self.position..end]
    }

    /// Move the cursor forward by up to `count` bytes; returns the distance moved.
    pub fn advance(&mut self, count: usize) -> usize {
        let step = count.min(self.remaining());
        self.position += step;
        step
    }

    /// Place the cursor at `position`, clamped to the buffer end.
    pub fn seek_to(&mut self, position: usize) -> usize {
        self.position = position.min(self.data.len());
        self.position
    }

    pub fn rewind(&mut self) {
        self.position = 0;
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}
