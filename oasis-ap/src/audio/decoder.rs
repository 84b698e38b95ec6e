//! Audio decoder using symphonia
//!
//! Decodes a whole media file into a [`FrameSequence`] of independently
//! owned frames before playback starts.
//!
//! # Sample formats
//!
//! Symphonia hands out planar buffers. Each buffer is copied into a planar
//! [`DecodedFrame`], normalizing sample types without a direct
//! [`SampleFormat`] counterpart:
//! - `s8` becomes `u8` (offset binary)
//! - `u16` becomes `s16`, `u32` becomes `s32`
//! - 24-bit samples become left-justified `s32`
//!
//! There is no fallback format: a buffer that cannot be described fails
//! with `UnsupportedFormat`.

use crate::audio::metadata::read_tags;
use crate::audio::types::{
    try_alloc_bytes, AudioStreamInfo, DecodedFrame, FrameSequence, SampleFormat,
};
use crate::error::{Error, Result};
use std::fs::File;
use std::path::Path;
use std::sync::OnceLock;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{CodecRegistry, Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use tracing::{debug, info, warn};

/// Codec registry shared by every decode call
fn codec_registry() -> &'static CodecRegistry {
    static CODEC_REGISTRY: OnceLock<CodecRegistry> = OnceLock::new();
    CODEC_REGISTRY.get_or_init(|| {
        let mut registry = CodecRegistry::new();
        registry.register_all::<symphonia::default::codecs::MpaDecoder>();
        registry.register_all::<symphonia::default::codecs::PcmDecoder>();
        registry.register_all::<symphonia::default::codecs::VorbisDecoder>();
        registry.register_all::<symphonia::default::codecs::FlacDecoder>();
        registry.register_all::<symphonia::default::codecs::AdpcmDecoder>();
        registry.register_all::<symphonia::default::codecs::AacDecoder>();
        registry
    })
}

/// Outcome of asking a codec for its next frame
#[derive(Debug)]
pub enum Received {
    /// A decoded frame, owned by the caller
    Frame(DecodedFrame),
    /// Nothing available until more input is sent
    NeedInput,
    /// End of stream was signalled and all output has been handed out
    Drained,
}

/// Codec driven with a send/receive protocol.
///
/// Sending `None` signals end of stream; receives after that drain whatever
/// the codec still holds until it reports [`Received::Drained`].
pub trait FrameDecoder {
    type Packet;

    fn send_packet(&mut self, packet: Option<&Self::Packet>) -> Result<()>;

    fn receive_frame(&mut self) -> Result<Received>;
}

/// Drive `decoder` over `packets` and collect every frame it produces,
/// including those drained after end of stream.
///
/// On error the frames collected so far are dropped with the sequence.
pub fn collect_frames<D, I>(decoder: &mut D, packets: I) -> Result<FrameSequence>
where
    D: FrameDecoder,
    I: IntoIterator<Item = Result<D::Packet>>,
{
    let mut frames = FrameSequence::new();
    let mut packet_count = 0usize;

    for packet in packets {
        let packet = packet?;
        decoder.send_packet(Some(&packet))?;
        packet_count += 1;

        loop {
            match decoder.receive_frame()? {
                Received::Frame(frame) => frames.push(frame)?,
                Received::NeedInput | Received::Drained => break,
            }
        }
    }

    // Flush
    decoder.send_packet(None)?;
    loop {
        match decoder.receive_frame()? {
            Received::Frame(frame) => frames.push(frame)?,
            Received::NeedInput | Received::Drained => break,
        }
    }

    debug!(
        "Collected {} frames from {} packets ({} samples per channel)",
        frames.len(),
        packet_count,
        frames.total_samples()
    );
    Ok(frames)
}

/// Packets of one track, read in container order
pub struct TrackPackets {
    reader: Box<dyn FormatReader>,
    track_id: u32,
    done: bool,
}

impl TrackPackets {
    pub fn new(reader: Box<dyn FormatReader>, track_id: u32) -> Self {
        Self {
            reader,
            track_id,
            done: false,
        }
    }
}

impl Iterator for TrackPackets {
    type Item = Result<Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.reader.next_packet() {
                Ok(packet) if packet.track_id() != self.track_id => continue,
                Ok(packet) => return Some(Ok(packet)),
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    debug!("Reached end of file");
                    self.done = true;
                    return None;
                }
                Err(SymphoniaError::ResetRequired) => {
                    // Chained streams change parameters mid-file; only the first is decoded
                    warn!("Stream parameters changed mid-file, stopping at the first stream");
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(Error::DecodeFailed(format!(
                        "Failed to read packet: {}",
                        e
                    ))));
                }
            }
        }
    }
}

/// Adapts a symphonia decoder to the send/receive protocol.
///
/// Symphonia yields at most one buffer per packet and holds nothing back,
/// so the flush phase only finalizes the codec.
pub struct SymphoniaFrameDecoder {
    decoder: Box<dyn Decoder>,
    pending: Option<DecodedFrame>,
    finished: bool,
}

impl SymphoniaFrameDecoder {
    pub fn new(decoder: Box<dyn Decoder>) -> Self {
        Self {
            decoder,
            pending: None,
            finished: false,
        }
    }
}

impl FrameDecoder for SymphoniaFrameDecoder {
    type Packet = Packet;

    fn send_packet(&mut self, packet: Option<&Packet>) -> Result<()> {
        let Some(packet) = packet else {
            self.finished = true;
            let finalized = self.decoder.finalize();
            if finalized.verify_ok == Some(false) {
                warn!("Decoded audio failed codec verification");
            }
            return Ok(());
        };

        let mut was_reset = false;
        loop {
            match self.decoder.decode(packet) {
                Ok(decoded) if decoded.frames() == 0 => return Ok(()),
                Ok(decoded) => {
                    self.pending = Some(frame_from_buffer(&decoded)?);
                    return Ok(());
                }
                // Only one reset per packet
                Err(SymphoniaError::ResetRequired) if !was_reset => {
                    warn!("Decoder reset required at ts {}, decoding packet again", packet.ts());
                    self.decoder.reset();
                    was_reset = true;
                }
                Err(e) => return Err(Error::DecodeFailed(e.to_string())),
            }
        }
    }

    fn receive_frame(&mut self) -> Result<Received> {
        Ok(match self.pending.take() {
            Some(frame) => Received::Frame(frame),
            None if self.finished => Received::Drained,
            None => Received::NeedInput,
        })
    }
}

/// Copy a symphonia buffer into an owned planar frame.
pub fn frame_from_buffer(decoded: &AudioBufferRef) -> Result<DecodedFrame> {
    let rate = decoded.spec().rate;
    match decoded {
        AudioBufferRef::U8(buf) => planar_frame(&**buf, SampleFormat::U8P, rate, |s: u8| [s]),
        AudioBufferRef::S8(buf) => {
            planar_frame(&**buf, SampleFormat::U8P, rate, |s: i8| [(s as u8) ^ 0x80])
        }
        AudioBufferRef::U16(buf) => planar_frame(&**buf, SampleFormat::S16P, rate, |s: u16| {
            ((s ^ 0x8000) as i16).to_le_bytes()
        }),
        AudioBufferRef::S16(buf) => {
            planar_frame(&**buf, SampleFormat::S16P, rate, |s: i16| s.to_le_bytes())
        }
        AudioBufferRef::U24(buf) => planar_frame(&**buf, SampleFormat::S32P, rate, |s| {
            ((s.inner() as i32 - 0x80_0000) << 8).to_le_bytes()
        }),
        AudioBufferRef::S24(buf) => {
            planar_frame(&**buf, SampleFormat::S32P, rate, |s| (s.inner() << 8).to_le_bytes())
        }
        AudioBufferRef::U32(buf) => planar_frame(&**buf, SampleFormat::S32P, rate, |s: u32| {
            ((s ^ 0x8000_0000) as i32).to_le_bytes()
        }),
        AudioBufferRef::S32(buf) => {
            planar_frame(&**buf, SampleFormat::S32P, rate, |s: i32| s.to_le_bytes())
        }
        AudioBufferRef::F32(buf) => {
            planar_frame(&**buf, SampleFormat::F32P, rate, |s: f32| s.to_le_bytes())
        }
        AudioBufferRef::F64(buf) => {
            planar_frame(&**buf, SampleFormat::F64P, rate, |s: f64| s.to_le_bytes())
        }
    }
}

fn planar_frame<T, const N: usize>(
    buf: &AudioBuffer<T>,
    format: SampleFormat,
    sample_rate: u32,
    to_bytes: impl Fn(T) -> [u8; N],
) -> Result<DecodedFrame>
where
    T: Sample,
{
    let channels = buf.spec().channels.count();
    let frames = buf.frames();

    let mut planes = Vec::new();
    planes
        .try_reserve_exact(channels)
        .map_err(|e| Error::MemoryAllocationFailed(format!("frame planes: {}", e)))?;

    for ch_idx in 0..channels {
        let mut plane = try_alloc_bytes(frames * N, "frame plane")?;
        for &sample in buf.chan(ch_idx) {
            plane.extend_from_slice(&to_bytes(sample));
        }
        planes.push(plane);
    }

    DecodedFrame::planar(format, sample_rate, planes)
}

/// Decode an entire media file.
///
/// Opens the container, picks the first track with a known codec and
/// decodes it to the end. The stream format is taken from the first frame.
///
/// # Errors
/// - `OpenFailed`: empty path, unreadable file, or not a recognised container
/// - `NoAudioStream`: no track with a codec
/// - `UnsupportedCodec`: no decoder registered for the codec
/// - `DecoderInitFailed`: decoder rejected the track parameters
/// - `DecodeFailed`: malformed packet data
/// - `EmptyStream`: the stream produced no frames
/// - `MemoryAllocationFailed`: frame storage could not grow
pub fn decode<P: AsRef<Path>>(path: P) -> Result<(FrameSequence, AudioStreamInfo)> {
    let path = path.as_ref();
    debug!("Decoding entire file: {}", path.display());

    let open_failed = |reason: String| Error::OpenFailed {
        path: path.to_path_buf(),
        reason,
    };

    if path.as_os_str().is_empty() {
        return Err(open_failed("empty path".to_string()));
    }

    let file = File::open(path).map_err(|e| open_failed(e.to_string()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Create a hint to help the format registry guess the format
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let mut opened = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| open_failed(format!("Unrecognized container: {}", e)))?;

    let mut metadata = opened
        .metadata
        .get()
        .and_then(|m| m.current().map(read_tags))
        .unwrap_or_default();

    let mut format = opened.format;
    if metadata.is_empty() {
        if let Some(revision) = format.metadata().current() {
            metadata = read_tags(revision);
        }
    }

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::NoAudioStream(path.to_path_buf()))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let registry = codec_registry();
    let descriptor = registry
        .get_codec(codec_params.codec)
        .ok_or_else(|| Error::UnsupportedCodec(format!("{:?}", codec_params.codec)))?;

    let decoder = registry
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| Error::DecoderInitFailed(e.to_string()))?;

    debug!(
        "Audio track {}: codec={}, sample_rate={:?}, channels={:?}",
        track_id,
        descriptor.short_name,
        codec_params.sample_rate,
        codec_params.channels.map(|c| c.count())
    );

    let mut frame_decoder = SymphoniaFrameDecoder::new(decoder);
    let frames = collect_frames(&mut frame_decoder, TrackPackets::new(format, track_id))?;

    let first = frames
        .first()
        .ok_or_else(|| Error::EmptyStream(path.to_path_buf()))?;

    let mut info = AudioStreamInfo::new(first.sample_rate(), first.channels(), first.format());
    info.source_codec = descriptor.short_name.to_string();
    info.metadata = metadata;

    info!(
        "Decoded {}: {} frames, {} Hz, {} channels, {} ({})",
        path.display(),
        frames.len(),
        info.sample_rate,
        info.channels,
        info.sample_format,
        info.source_codec
    );

    Ok((frames, info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use std::collections::VecDeque;
    use symphonia::core::audio::{AsAudioBufferRef, Channels, SignalSpec};
    use symphonia::core::codecs::{CodecDescriptor, CodecParameters, FinalizeResult};
    use symphonia::core::sample::{i24, u24};

    /// Codec fake: each sent packet queues a scripted list of receive results
    struct ScriptedDecoder {
        per_packet: VecDeque<Vec<Received>>,
        on_flush: Vec<Received>,
        queue: VecDeque<Received>,
        flushed: bool,
    }

    impl ScriptedDecoder {
        fn new(per_packet: Vec<Vec<Received>>, on_flush: Vec<Received>) -> Self {
            Self {
                per_packet: per_packet.into(),
                on_flush,
                queue: VecDeque::new(),
                flushed: false,
            }
        }
    }

    impl FrameDecoder for ScriptedDecoder {
        type Packet = u32;

        fn send_packet(&mut self, packet: Option<&u32>) -> Result<()> {
            match packet {
                Some(_) => {
                    let script = self.per_packet.pop_front().unwrap_or_default();
                    self.queue.extend(script);
                }
                None => {
                    self.flushed = true;
                    self.queue.extend(std::mem::take(&mut self.on_flush));
                }
            }
            Ok(())
        }

        fn receive_frame(&mut self) -> Result<Received> {
            match self.queue.pop_front() {
                Some(Received::Frame(frame)) if frame.samples() == 99 => {
                    Err(Error::DecodeFailed("corrupt packet".into()))
                }
                Some(next) => Ok(next),
                None if self.flushed => Ok(Received::Drained),
                None => Ok(Received::NeedInput),
            }
        }
    }

    fn mono_frame(samples: usize) -> Received {
        Received::Frame(
            DecodedFrame::interleaved(SampleFormat::S16, 1, 8000, vec![0; samples * 2]).unwrap(),
        )
    }

    #[test]
    fn test_need_input_continues_and_flush_drains() {
        let mut decoder = ScriptedDecoder::new(
            vec![
                vec![Received::NeedInput],
                vec![mono_frame(10), mono_frame(20)],
                vec![],
            ],
            vec![mono_frame(5)],
        );
        let frames = collect_frames(&mut decoder, vec![Ok(1), Ok(2), Ok(3)]).unwrap();

        assert_eq!(frames.len(), 3);
        let sizes: Vec<usize> = frames.iter().map(|f| f.samples()).collect();
        assert_eq!(sizes, vec![10, 20, 5]);
    }

    #[test]
    fn test_decode_error_aborts() {
        let mut decoder = ScriptedDecoder::new(
            vec![vec![mono_frame(10)], vec![mono_frame(99)], vec![mono_frame(10)]],
            vec![],
        );
        let result = collect_frames(&mut decoder, vec![Ok(1), Ok(2), Ok(3)]);
        assert!(matches!(result, Err(Error::DecodeFailed(_))));
    }

    #[test]
    fn test_packet_read_error_aborts() {
        let mut decoder = ScriptedDecoder::new(vec![vec![mono_frame(10)]], vec![mono_frame(5)]);
        let packets = vec![Ok(1), Err(Error::DecodeFailed("truncated".into()))];
        assert!(collect_frames(&mut decoder, packets).is_err());
    }

    #[test]
    fn test_no_packets_still_flushes() {
        let mut decoder = ScriptedDecoder::new(vec![], vec![mono_frame(7)]);
        let frames = collect_frames(&mut decoder, Vec::<Result<u32>>::new()).unwrap();
        assert_eq!(frames.total_samples(), 7);
    }

    #[test]
    fn test_s16_buffer_copied_per_channel() {
        let spec = SignalSpec::new(44100, Channels::FRONT_LEFT | Channels::FRONT_RIGHT);
        let mut buf = AudioBuffer::<i16>::new(4, spec);
        buf.render_reserved(Some(3));
        buf.chan_mut(0).copy_from_slice(&[1, 2, 3]);
        buf.chan_mut(1).copy_from_slice(&[-1, -2, -3]);

        let frame = frame_from_buffer(&AudioBufferRef::S16(Cow::Borrowed(&buf))).unwrap();
        assert_eq!(frame.format(), SampleFormat::S16P);
        assert_eq!(frame.channels(), 2);
        assert_eq!(frame.samples(), 3);
        assert_eq!(frame.sample_rate(), 44100);

        let bytes = |s: &[i16]| s.iter().flat_map(|s| s.to_le_bytes()).collect::<Vec<u8>>();
        match frame.data() {
            crate::audio::types::FrameData::Planar(planes) => {
                assert_eq!(planes[0], bytes(&[1, 2, 3]));
                assert_eq!(planes[1], bytes(&[-1, -2, -3]));
            }
            other => panic!("expected planar data, got {:?}", other),
        }
    }

    fn first_plane(frame: &DecodedFrame) -> &[u8] {
        match frame.data() {
            crate::audio::types::FrameData::Planar(planes) => &planes[0],
            other => panic!("expected planar data, got {:?}", other),
        }
    }

    fn mono_buffer<T: Sample>(samples: &[T]) -> AudioBuffer<T> {
        let spec = SignalSpec::new(8000, Channels::FRONT_LEFT);
        let mut buf = AudioBuffer::<T>::new(samples.len() as u64, spec);
        buf.render_reserved(Some(samples.len()));
        buf.chan_mut(0).copy_from_slice(samples);
        buf
    }

    #[test]
    fn test_unsigned_16_normalized_to_signed() {
        let buf = mono_buffer(&[0x8000u16, 0]);

        let frame = frame_from_buffer(&AudioBufferRef::U16(Cow::Borrowed(&buf))).unwrap();
        assert_eq!(frame.format(), SampleFormat::S16P);
        let expected: Vec<u8> = [0i16, i16::MIN].iter().flat_map(|s| s.to_le_bytes()).collect();
        assert_eq!(first_plane(&frame), expected.as_slice());
    }

    #[test]
    fn test_signed_24_left_justified() {
        let buf = mono_buffer(&[i24::from(-1i32), i24::from(1i32)]);

        let frame = frame_from_buffer(&AudioBufferRef::S24(Cow::Borrowed(&buf))).unwrap();
        assert_eq!(frame.format(), SampleFormat::S32P);
        let expected: Vec<u8> = [0xFFFF_FF00u32, 0x100]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        assert_eq!(first_plane(&frame), expected.as_slice());
    }

    #[test]
    fn test_unsigned_24_normalized_to_signed_32() {
        let buf = mono_buffer(&[u24::from(0u32), u24::from(0x80_0000u32)]);

        let frame = frame_from_buffer(&AudioBufferRef::U24(Cow::Borrowed(&buf))).unwrap();
        assert_eq!(frame.format(), SampleFormat::S32P);
        let expected: Vec<u8> = [i32::MIN, 0].iter().flat_map(|s| s.to_le_bytes()).collect();
        assert_eq!(first_plane(&frame), expected.as_slice());
    }

    #[test]
    fn test_signed_8_offset_to_unsigned() {
        let buf = mono_buffer(&[-128i8, 0, 127]);

        let frame = frame_from_buffer(&AudioBufferRef::S8(Cow::Borrowed(&buf))).unwrap();
        assert_eq!(frame.format(), SampleFormat::U8P);
        assert_eq!(first_plane(&frame), &[0x00, 0x80, 0xFF]);
    }

    /// Codec that demands `required_resets` resets before it decodes
    struct ResettingCodec {
        params: CodecParameters,
        buf: AudioBuffer<i16>,
        required_resets: usize,
        resets: usize,
    }

    impl ResettingCodec {
        fn new(required_resets: usize) -> Self {
            Self {
                params: CodecParameters::new(),
                buf: mono_buffer(&[1i16, 2, 3]),
                required_resets,
                resets: 0,
            }
        }
    }

    impl Decoder for ResettingCodec {
        fn try_new(_: &CodecParameters, _: &DecoderOptions) -> symphonia::core::errors::Result<Self>
        where
            Self: Sized,
        {
            Err(SymphoniaError::Unsupported("test codec"))
        }

        fn supported_codecs() -> &'static [CodecDescriptor]
        where
            Self: Sized,
        {
            &[]
        }

        fn reset(&mut self) {
            self.resets += 1;
        }

        fn codec_params(&self) -> &CodecParameters {
            &self.params
        }

        fn decode(&mut self, _: &Packet) -> symphonia::core::errors::Result<AudioBufferRef<'_>> {
            if self.resets < self.required_resets {
                return Err(SymphoniaError::ResetRequired);
            }
            Ok(self.buf.as_audio_buffer_ref())
        }

        fn finalize(&mut self) -> FinalizeResult {
            FinalizeResult::default()
        }

        fn last_decoded(&self) -> AudioBufferRef<'_> {
            self.buf.as_audio_buffer_ref()
        }
    }

    #[test]
    fn test_reset_required_decodes_packet_again() {
        let mut decoder = SymphoniaFrameDecoder::new(Box::new(ResettingCodec::new(1)));
        let packet = Packet::new_from_slice(0, 0, 3, &[0u8; 4]);

        decoder.send_packet(Some(&packet)).unwrap();
        match decoder.receive_frame().unwrap() {
            Received::Frame(frame) => assert_eq!(frame.samples(), 3),
            other => panic!("expected a frame, got {:?}", other),
        }
    }

    #[test]
    fn test_repeated_reset_fails_decode() {
        let mut decoder = SymphoniaFrameDecoder::new(Box::new(ResettingCodec::new(2)));
        let packet = Packet::new_from_slice(0, 0, 3, &[0u8; 4]);

        let result = decoder.send_packet(Some(&packet));
        assert!(matches!(result, Err(Error::DecodeFailed(_))));
    }

    #[test]
    fn test_decode_empty_path() {
        assert!(matches!(decode(""), Err(Error::OpenFailed { .. })));
    }

    #[test]
    fn test_decode_nonexistent_file() {
        let result = decode("/nonexistent/file.mp3");
        assert!(matches!(result, Err(Error::OpenFailed { .. })));
    }
}
