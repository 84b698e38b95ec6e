//! Audio output sinks
//!
//! A sink receives a stream description, then a strictly ordered series of
//! PCM packets, and is finally closed. Seeking closes and reopens the
//! stream so the sink never sees a timestamp discontinuity.
//!
//! Sinks:
//! - [`CpalSink`]: an output device, fed through a bounded ring buffer
//! - [`NullSink`]: discards audio, optionally paced to real time
//!
//! [`open_preferred_sink`] tries an ordered preference list and returns
//! the first sink that accepts the stream.

use crate::audio::types::{AudioStreamInfo, ChannelLayout, RawPcmCodec, SampleFormat};
use crate::config::OutputConfig;
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, FromSample, Sample, Stream, StreamConfig};
use cpal::{SupportedBufferSize, SupportedStreamConfig, SupportedStreamConfigRange};
use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapRb,
};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Description of the PCM stream handed to a sink
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescription {
    pub codec: RawPcmCodec,
    pub sample_rate: u32,
    pub channels: u16,
    pub layout: ChannelLayout,
    /// Samples per channel in one full packet
    pub frame_size: usize,
}

impl StreamDescription {
    pub fn from_info(info: &AudioStreamInfo, frame_size: usize) -> Self {
        Self {
            codec: info.codec,
            sample_rate: info.sample_rate,
            channels: info.channels,
            layout: ChannelLayout::for_channels(info.channels),
            frame_size,
        }
    }

    /// Interleaved sample format of the stream
    pub fn sample_format(&self) -> SampleFormat {
        self.codec.sample_format()
    }

    pub fn bytes_per_frame(&self) -> usize {
        self.sample_format().bytes_per_sample() * self.channels as usize
    }

    /// Bytes in one full packet
    pub fn packet_bytes(&self) -> usize {
        self.frame_size * self.bytes_per_frame()
    }
}

impl fmt::Display for StreamDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} Hz {} ({} samples/packet)",
            self.codec, self.sample_rate, self.layout, self.frame_size
        )
    }
}

/// One chunk of interleaved PCM, timestamped in samples per channel
#[derive(Debug, Clone, Copy)]
pub struct PcmPacket<'a> {
    pub data: &'a [u8],
    pub pts: u64,
    pub dts: u64,
    /// Samples per channel in `data`
    pub duration: u64,
}

/// How a stream is closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseMode {
    /// Play out everything already queued
    Drain,
    /// Drop queued audio immediately
    Discard,
}

/// Destination for paced PCM packets
pub trait AudioSink {
    fn name(&self) -> &str;

    /// Packet size the sink requires, in samples per channel
    fn frame_size(&self) -> Option<usize> {
        None
    }

    /// Start a stream; required before any packet and after every close
    fn open_stream(&mut self, desc: &StreamDescription) -> Result<()>;

    /// Queue one packet, blocking while the sink's queue is full.
    ///
    /// Errors are `PlaybackWriteFailed` and end the session.
    fn write_packet(&mut self, packet: &PcmPacket<'_>) -> Result<()>;

    fn pause(&mut self) -> Result<()> {
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        Ok(())
    }

    fn close_stream(&mut self, mode: CloseMode) -> Result<()>;
}

/// Entry in the output preference list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkKind {
    /// Default device of the default host
    Default,
    /// Named device of the default host
    Device(String),
    /// Default device of a named host (e.g. `alsa`, `jack`)
    Host(String),
    /// Discarding sink paced to real time
    Null,
}

impl FromStr for SinkKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s {
            "default" => return Ok(SinkKind::Default),
            "null" => return Ok(SinkKind::Null),
            _ => {}
        }
        match s.split_once(':') {
            Some(("device", name)) if !name.is_empty() => Ok(SinkKind::Device(name.to_string())),
            Some(("host", name)) if !name.is_empty() => Ok(SinkKind::Host(name.to_string())),
            _ => Err(Error::Config(format!(
                "unknown output '{}' (expected default, null, device:<name> or host:<name>)",
                s
            ))),
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkKind::Default => f.write_str("default"),
            SinkKind::Device(name) => write!(f, "device:{}", name),
            SinkKind::Host(name) => write!(f, "host:{}", name),
            SinkKind::Null => f.write_str("null"),
        }
    }
}

/// Open the first sink in `preferences` that accepts `desc`.
///
/// # Errors
/// - `UnsupportedFormat` if every candidate rejected the stream format
/// - `NoOutputAvailable` otherwise
pub fn open_preferred_sink(
    preferences: &[SinkKind],
    desc: &StreamDescription,
    config: &OutputConfig,
) -> Result<Box<dyn AudioSink>> {
    let mut failures = Vec::new();
    let mut format_rejections = 0;

    for kind in preferences {
        match open_sink(kind, desc, config) {
            Ok(sink) => {
                info!("Using audio output {} ({})", kind, sink.name());
                return Ok(sink);
            }
            Err(e) => {
                warn!("Audio output {} unavailable: {}", kind, e);
                if matches!(e, Error::UnsupportedFormat(_)) {
                    format_rejections += 1;
                }
                failures.push(format!("{}: {}", kind, e));
            }
        }
    }

    if !preferences.is_empty() && format_rejections == preferences.len() {
        return Err(Error::UnsupportedFormat(format!(
            "no output accepts {}: {}",
            desc,
            failures.join("; ")
        )));
    }

    Err(Error::NoOutputAvailable(if failures.is_empty() {
        "no outputs configured".to_string()
    } else {
        failures.join("; ")
    }))
}

fn open_sink(
    kind: &SinkKind,
    desc: &StreamDescription,
    config: &OutputConfig,
) -> Result<Box<dyn AudioSink>> {
    match kind {
        SinkKind::Null => Ok(Box::new(NullSink::realtime())),
        SinkKind::Default => {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?;
            Ok(Box::new(CpalSink::open(device, desc, config)?))
        }
        SinkKind::Device(name) => {
            let host = cpal::default_host();
            let device = host
                .output_devices()
                .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
                .find(|d| d.name().ok().as_deref() == Some(name.as_str()))
                .ok_or_else(|| Error::AudioOutput(format!("Device '{}' not found", name)))?;
            Ok(Box::new(CpalSink::open(device, desc, config)?))
        }
        SinkKind::Host(name) => {
            let host_id = cpal::available_hosts()
                .into_iter()
                .find(|id| id.name().eq_ignore_ascii_case(name))
                .ok_or_else(|| Error::AudioOutput(format!("Audio host '{}' not available", name)))?;
            let host = cpal::host_from_id(host_id)
                .map_err(|e| Error::AudioOutput(format!("Failed to open host '{}': {}", name, e)))?;
            let device = host.default_output_device().ok_or_else(|| {
                Error::AudioOutput(format!("Host '{}' has no default output device", name))
            })?;
            Ok(Box::new(CpalSink::open(device, desc, config)?))
        }
    }
}

/// List output devices grouped by audio host.
pub fn list_devices() -> Vec<(String, Vec<String>)> {
    cpal::available_hosts()
        .into_iter()
        .filter_map(|id| {
            let host = cpal::host_from_id(id)
                .map_err(|e| debug!("Host {} unavailable: {}", id.name(), e))
                .ok()?;
            let devices = host
                .output_devices()
                .map(|devices| devices.filter_map(|d| d.name().ok()).collect())
                .unwrap_or_default();
            Some((id.name().to_string(), devices))
        })
        .collect()
}

fn cpal_sample_format(codec: RawPcmCodec) -> cpal::SampleFormat {
    match codec {
        RawPcmCodec::PcmU8 => cpal::SampleFormat::U8,
        RawPcmCodec::PcmS16Le => cpal::SampleFormat::I16,
        RawPcmCodec::PcmS32Le => cpal::SampleFormat::I32,
        RawPcmCodec::PcmS64Le => cpal::SampleFormat::I64,
        RawPcmCodec::PcmF32Le => cpal::SampleFormat::F32,
        RawPcmCodec::PcmF64Le => cpal::SampleFormat::F64,
    }
}

/// Device sample formats the converting callback can write
fn is_convertible(format: cpal::SampleFormat) -> bool {
    use cpal::SampleFormat as F;
    matches!(
        format,
        F::I8 | F::I16 | F::I32 | F::I64 | F::U8 | F::U16 | F::U32 | F::U64 | F::F32 | F::F64
    )
}

/// Device sample type decodable from little-endian PCM bytes
trait PcmSample: cpal::SizedSample + Send + 'static {
    const BYTES: usize;

    fn from_le(bytes: &[u8]) -> Self;

    /// Decode and convert to a float sample in `[-1.0, 1.0]`
    fn to_f32(bytes: &[u8]) -> f32;
}

macro_rules! impl_pcm_sample {
    ($($t:ty),*) => {$(
        impl PcmSample for $t {
            const BYTES: usize = std::mem::size_of::<$t>();

            fn from_le(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$t>()];
                raw.copy_from_slice(bytes);
                <$t>::from_le_bytes(raw)
            }

            fn to_f32(bytes: &[u8]) -> f32 {
                <Self as PcmSample>::from_le(bytes).to_sample::<f32>()
            }
        }
    )*};
}

impl_pcm_sample!(u8, i16, i32, i64, f32, f64);

fn source_reader(codec: RawPcmCodec) -> fn(&[u8]) -> f32 {
    match codec {
        RawPcmCodec::PcmU8 => <u8 as PcmSample>::to_f32,
        RawPcmCodec::PcmS16Le => <i16 as PcmSample>::to_f32,
        RawPcmCodec::PcmS32Le => <i32 as PcmSample>::to_f32,
        RawPcmCodec::PcmS64Le => <i64 as PcmSample>::to_f32,
        RawPcmCodec::PcmF32Le => <f32 as PcmSample>::to_f32,
        RawPcmCodec::PcmF64Le => <f64 as PcmSample>::to_f32,
    }
}

/// Write one source frame into a device frame of another channel count.
///
/// Device channel `i` takes source channel `i % source.len()`, so mono is
/// duplicated to every channel and surplus source channels are dropped.
/// A mono device gets the mean of all source channels.
fn remap_frame<D>(source: &[f32], out: &mut [D])
where
    D: Sample + FromSample<f32>,
{
    match (source.len(), out.len()) {
        (0, _) => out.fill(D::EQUILIBRIUM),
        (n, 1) if n > 1 => out[0] = D::from_sample(source.iter().sum::<f32>() / n as f32),
        (n, _) => {
            for (i, sample) in out.iter_mut().enumerate() {
                *sample = D::from_sample(source[i % n]);
            }
        }
    }
}

/// Device stream format chosen for a PCM stream
#[derive(Debug, Clone, Copy, PartialEq)]
struct DeviceFormat {
    channels: u16,
    sample_format: cpal::SampleFormat,
    buffer_range: Option<(u32, u32)>,
    /// Stream bytes can be copied to the device without conversion
    native: bool,
}

impl DeviceFormat {
    fn new(
        channels: u16,
        sample_format: cpal::SampleFormat,
        buffer_size: &SupportedBufferSize,
        desc: &StreamDescription,
    ) -> Self {
        Self {
            channels,
            sample_format,
            buffer_range: match buffer_size {
                SupportedBufferSize::Range { min, max } => Some((*min, *max)),
                SupportedBufferSize::Unknown => None,
            },
            native: channels == desc.channels && sample_format == cpal_sample_format(desc.codec),
        }
    }
}

/// Pick the device format for `desc`.
///
/// An exact match wins. Otherwise the device default is used when it runs
/// at the stream's rate, then any supported configuration at that rate,
/// preferring the stream's channel count and float samples. `None` means
/// no configuration supports the sample rate.
fn choose_device_format(
    ranges: &[SupportedStreamConfigRange],
    default: Option<&SupportedStreamConfig>,
    desc: &StreamDescription,
) -> Option<DeviceFormat> {
    let wanted = cpal_sample_format(desc.codec);
    let usable = |c: &&SupportedStreamConfigRange| {
        c.min_sample_rate().0 <= desc.sample_rate
            && c.max_sample_rate().0 >= desc.sample_rate
            && is_convertible(c.sample_format())
    };

    if let Some(exact) = ranges
        .iter()
        .filter(usable)
        .find(|c| c.channels() == desc.channels && c.sample_format() == wanted)
    {
        return Some(DeviceFormat::new(
            exact.channels(),
            exact.sample_format(),
            exact.buffer_size(),
            desc,
        ));
    }

    if let Some(default) = default.filter(|d| {
        d.sample_rate().0 == desc.sample_rate && is_convertible(d.sample_format())
    }) {
        return Some(DeviceFormat::new(
            default.channels(),
            default.sample_format(),
            default.buffer_size(),
            desc,
        ));
    }

    ranges
        .iter()
        .filter(usable)
        .max_by_key(|c| {
            (
                c.channels() == desc.channels,
                c.sample_format() == cpal::SampleFormat::F32,
            )
        })
        .map(|c| DeviceFormat::new(c.channels(), c.sample_format(), c.buffer_size(), desc))
}

/// Audio output device sink using cpal.
///
/// Packets are copied into a byte ring buffer sized to a few packets; the
/// device callback drains it one whole sample frame at a time and plays
/// silence on underrun. A full ring blocks `write_packet`, which is what
/// paces the playback loop.
///
/// When the device cannot take the stream's sample format or channel
/// count, the callback converts each frame. Only the sample rate must be
/// supported as is.
pub struct CpalSink {
    device: Device,
    name: String,
    config: StreamConfig,
    format: DeviceFormat,
    stream: Option<Stream>,
    producer: Option<ringbuf::HeapProd<u8>>,
    /// Set by the device error callback
    error_flag: Arc<AtomicBool>,
    queue_packets: usize,
    write_timeout: Duration,
    drain_timeout: Duration,
}

impl CpalSink {
    /// Select a device configuration that can play `desc`.
    ///
    /// # Errors
    /// `UnsupportedFormat` when the device has no configuration at the
    /// stream's sample rate.
    pub fn open(device: Device, desc: &StreamDescription, config: &OutputConfig) -> Result<Self> {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        let ranges: Vec<SupportedStreamConfigRange> = device
            .supported_output_configs()
            .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?
            .collect();
        let default = device
            .default_output_config()
            .map_err(|e| debug!("No default config on '{}': {}", name, e))
            .ok();

        let format = choose_device_format(&ranges, default.as_ref(), desc).ok_or_else(|| {
            Error::UnsupportedFormat(format!(
                "device '{}' has no configuration at {} Hz",
                name, desc.sample_rate
            ))
        })?;

        let stream_config = StreamConfig {
            channels: format.channels,
            sample_rate: cpal::SampleRate(desc.sample_rate),
            buffer_size: BufferSize::Default,
        };

        if format.native {
            debug!("Device '{}' plays {} natively", name, desc);
        } else {
            info!(
                "Device '{}' converts {} to {} channels of {:?}",
                name, desc, format.channels, format.sample_format
            );
        }

        Ok(Self {
            device,
            name,
            config: stream_config,
            format,
            stream: None,
            producer: None,
            error_flag: Arc::new(AtomicBool::new(false)),
            queue_packets: config.queue_packets.max(2),
            write_timeout: Duration::from_millis(config.write_timeout_ms),
            drain_timeout: Duration::from_millis(config.drain_timeout_ms),
        })
    }

    fn build_stream<T: PcmSample>(
        &self,
        mut consumer: ringbuf::HeapCons<u8>,
        bytes_per_frame: usize,
    ) -> Result<Stream> {
        let channels = self.config.channels as usize;
        let error_flag = Arc::clone(&self.error_flag);
        let mut scratch = vec![0u8; bytes_per_frame];

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        if consumer.occupied_len() >= bytes_per_frame {
                            consumer.pop_slice(&mut scratch);
                            let samples = scratch.chunks_exact(T::BYTES);
                            for (sample, bytes) in frame.iter_mut().zip(samples) {
                                *sample = T::from_le(bytes);
                            }
                        } else {
                            frame.fill(T::EQUILIBRIUM);
                        }
                    }
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    error_flag.store(true, Ordering::SeqCst);
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
    }

    fn build_converting_stream<D>(
        &self,
        mut consumer: ringbuf::HeapCons<u8>,
        desc: &StreamDescription,
    ) -> Result<Stream>
    where
        D: cpal::SizedSample + FromSample<f32> + Send + 'static,
    {
        let channels = self.config.channels as usize;
        let bytes_per_frame = desc.bytes_per_frame();
        let width = desc.sample_format().bytes_per_sample();
        let read = source_reader(desc.codec);
        let error_flag = Arc::clone(&self.error_flag);
        let mut scratch = vec![0u8; bytes_per_frame];
        let mut source = vec![0f32; desc.channels as usize];

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [D], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        if consumer.occupied_len() >= bytes_per_frame {
                            consumer.pop_slice(&mut scratch);
                            let samples = scratch.chunks_exact(width);
                            for (value, bytes) in source.iter_mut().zip(samples) {
                                *value = read(bytes);
                            }
                            remap_frame(&source, frame);
                        } else {
                            frame.fill(D::EQUILIBRIUM);
                        }
                    }
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    error_flag.store(true, Ordering::SeqCst);
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
    }
}

impl AudioSink for CpalSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn open_stream(&mut self, desc: &StreamDescription) -> Result<()> {
        if self.stream.is_some() {
            self.close_stream(CloseMode::Discard)?;
        }

        self.config.buffer_size = match self.format.buffer_range {
            Some((min, max)) if (min as usize..=max as usize).contains(&desc.frame_size) => {
                BufferSize::Fixed(desc.frame_size as u32)
            }
            _ => BufferSize::Default,
        };

        let ring = HeapRb::<u8>::new(desc.packet_bytes() * self.queue_packets);
        let (producer, consumer) = ring.split();
        let bytes_per_frame = desc.bytes_per_frame();

        self.error_flag.store(false, Ordering::SeqCst);
        let stream = if self.format.native {
            match desc.codec {
                RawPcmCodec::PcmU8 => self.build_stream::<u8>(consumer, bytes_per_frame)?,
                RawPcmCodec::PcmS16Le => self.build_stream::<i16>(consumer, bytes_per_frame)?,
                RawPcmCodec::PcmS32Le => self.build_stream::<i32>(consumer, bytes_per_frame)?,
                RawPcmCodec::PcmS64Le => self.build_stream::<i64>(consumer, bytes_per_frame)?,
                RawPcmCodec::PcmF32Le => self.build_stream::<f32>(consumer, bytes_per_frame)?,
                RawPcmCodec::PcmF64Le => self.build_stream::<f64>(consumer, bytes_per_frame)?,
            }
        } else {
            use cpal::SampleFormat as F;
            match self.format.sample_format {
                F::I8 => self.build_converting_stream::<i8>(consumer, desc)?,
                F::I16 => self.build_converting_stream::<i16>(consumer, desc)?,
                F::I32 => self.build_converting_stream::<i32>(consumer, desc)?,
                F::I64 => self.build_converting_stream::<i64>(consumer, desc)?,
                F::U8 => self.build_converting_stream::<u8>(consumer, desc)?,
                F::U16 => self.build_converting_stream::<u16>(consumer, desc)?,
                F::U32 => self.build_converting_stream::<u32>(consumer, desc)?,
                F::U64 => self.build_converting_stream::<u64>(consumer, desc)?,
                F::F32 => self.build_converting_stream::<f32>(consumer, desc)?,
                F::F64 => self.build_converting_stream::<f64>(consumer, desc)?,
                other => {
                    return Err(Error::UnsupportedFormat(format!(
                        "device '{}' sample format {:?}",
                        self.name, other
                    )))
                }
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;

        debug!("Opened stream on '{}': {}", self.name, desc);
        self.stream = Some(stream);
        self.producer = Some(producer);
        Ok(())
    }

    fn write_packet(&mut self, packet: &PcmPacket<'_>) -> Result<()> {
        let producer = self
            .producer
            .as_mut()
            .ok_or_else(|| Error::PlaybackWriteFailed("stream is not open".to_string()))?;

        let mut remaining = packet.data;
        let mut stalled_since: Option<Instant> = None;

        while !remaining.is_empty() {
            if self.error_flag.load(Ordering::SeqCst) {
                return Err(Error::PlaybackWriteFailed(format!(
                    "device '{}' reported a stream error at pts {}",
                    self.name, packet.pts
                )));
            }

            let written = producer.push_slice(remaining);
            if written > 0 {
                remaining = &remaining[written..];
                stalled_since = None;
                continue;
            }

            let since = *stalled_since.get_or_insert_with(Instant::now);
            if since.elapsed() > self.write_timeout {
                return Err(Error::PlaybackWriteFailed(format!(
                    "device '{}' stopped consuming audio for {:?}",
                    self.name, self.write_timeout
                )));
            }
            thread::sleep(Duration::from_millis(1));
        }

        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        if let Some(stream) = &self.stream {
            stream
                .pause()
                .map_err(|e| Error::AudioOutput(format!("Failed to pause stream: {}", e)))?;
        }
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        if let Some(stream) = &self.stream {
            stream
                .play()
                .map_err(|e| Error::AudioOutput(format!("Failed to resume stream: {}", e)))?;
        }
        Ok(())
    }

    fn close_stream(&mut self, mode: CloseMode) -> Result<()> {
        let Some(stream) = self.stream.take() else {
            self.producer = None;
            return Ok(());
        };

        if mode == CloseMode::Drain {
            if let Some(producer) = &self.producer {
                let started = Instant::now();
                while !producer.is_empty()
                    && !self.error_flag.load(Ordering::SeqCst)
                    && started.elapsed() < self.drain_timeout
                {
                    thread::sleep(Duration::from_millis(5));
                }
                if !producer.is_empty() {
                    warn!(
                        "Closing '{}' with {} bytes still queued",
                        self.name,
                        producer.occupied_len()
                    );
                }
            }
            // Let the device play out its own buffer
            thread::sleep(Duration::from_millis(50));
        }

        if let Err(e) = stream.pause() {
            debug!("Pause before close failed on '{}': {}", self.name, e);
        }
        drop(stream);
        self.producer = None;
        debug!("Closed stream on '{}' ({:?})", self.name, mode);
        Ok(())
    }
}

/// Sink that discards audio.
///
/// In real-time mode it sleeps so that it never runs more than a short
/// lead ahead of the wall clock, which keeps transport commands meaningful
/// without a device.
pub struct NullSink {
    realtime: bool,
    sample_rate: u32,
    clock_start: Option<Instant>,
    written: Duration,
    paused_at: Option<Instant>,
    max_lead: Duration,
}

impl NullSink {
    pub fn realtime() -> Self {
        Self {
            realtime: true,
            sample_rate: 0,
            clock_start: None,
            written: Duration::ZERO,
            paused_at: None,
            max_lead: Duration::from_millis(200),
        }
    }

    /// Discard without any pacing
    pub fn unpaced() -> Self {
        Self {
            realtime: false,
            ..Self::realtime()
        }
    }

    fn lead(&self) -> Duration {
        match self.clock_start {
            Some(start) => self.written.saturating_sub(start.elapsed()),
            None => Duration::ZERO,
        }
    }
}

impl AudioSink for NullSink {
    fn name(&self) -> &str {
        "null"
    }

    fn open_stream(&mut self, desc: &StreamDescription) -> Result<()> {
        self.sample_rate = desc.sample_rate;
        self.clock_start = Some(Instant::now());
        self.written = Duration::ZERO;
        self.paused_at = None;
        Ok(())
    }

    fn write_packet(&mut self, packet: &PcmPacket<'_>) -> Result<()> {
        if self.clock_start.is_none() || self.sample_rate == 0 {
            return Err(Error::PlaybackWriteFailed("stream is not open".to_string()));
        }
        self.written += Duration::from_secs_f64(packet.duration as f64 / self.sample_rate as f64);

        if self.realtime {
            let lead = self.lead();
            if lead > self.max_lead {
                thread::sleep(lead - self.max_lead);
            }
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.paused_at.get_or_insert_with(Instant::now);
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        if let (Some(paused_at), Some(start)) = (self.paused_at.take(), self.clock_start.as_mut()) {
            *start += paused_at.elapsed();
        }
        Ok(())
    }

    fn close_stream(&mut self, mode: CloseMode) -> Result<()> {
        if mode == CloseMode::Drain && self.realtime {
            thread::sleep(self.lead());
        }
        self.clock_start = None;
        Ok(())
    }
}
