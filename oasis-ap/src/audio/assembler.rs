//! PCM assembly
//!
//! Flattens a [`FrameSequence`] into one interleaved [`PcmBuffer`].
//!
//! # Layout
//!
//! Interleaved frames are copied as one run. Planar frames are interleaved
//! sample by sample, channel by channel:
//!
//! ```text
//! planes:  L0 L1 L2 | R0 R1 R2
//! output:  L0 R0 L1 R1 L2 R2
//! ```
//!
//! Every frame must share the first frame's format, channel count and
//! sample rate; a stream that changes format midway is rejected rather than
//! assembled into corrupt audio.

use crate::audio::types::{
    try_alloc_bytes, AudioStreamInfo, DecodedFrame, FrameData, FrameSequence, PcmBuffer,
};
use crate::error::{Error, Result};
use tracing::debug;

/// Assemble all frames into one interleaved PCM buffer.
///
/// The frames are only borrowed; the caller drops them afterwards. Fills
/// `info.bit_rate` if it is not yet known.
///
/// # Errors
/// - `InvalidArgument`: empty sequence
/// - `FormatMismatch`: a frame differs from the first in format, channels or rate
/// - `MemoryAllocationFailed`: the buffer size overflows or cannot be allocated
pub fn assemble(frames: &FrameSequence, info: &mut AudioStreamInfo) -> Result<PcmBuffer> {
    let first = frames
        .first()
        .ok_or_else(|| Error::InvalidArgument("cannot assemble an empty frame sequence".into()))?;

    for (index, frame) in frames.iter().enumerate().skip(1) {
        check_matches(index, first, frame)?;
    }

    let bytes_per_sample = first.format().bytes_per_sample();
    let channels = first.channels() as usize;
    let total_samples = frames.total_samples();

    let total_bytes = total_samples
        .checked_mul(bytes_per_sample)
        .and_then(|n| n.checked_mul(channels))
        .ok_or_else(|| {
            Error::MemoryAllocationFailed(format!(
                "{} samples x {} channels overflows the address space",
                total_samples, channels
            ))
        })?;

    let mut pcm = try_alloc_bytes(total_bytes, "PCM buffer")?;

    for frame in frames {
        append_frame(&mut pcm, frame, bytes_per_sample);
    }
    debug_assert_eq!(pcm.len(), total_bytes);

    if info.bit_rate.is_none() {
        info.bit_rate = Some(info.computed_bit_rate());
    }

    debug!(
        "Assembled {} frames into {} bytes ({} samples per channel, {} x {} bytes)",
        frames.len(),
        total_bytes,
        total_samples,
        channels,
        bytes_per_sample
    );

    Ok(PcmBuffer::new(pcm))
}

fn check_matches(index: usize, first: &DecodedFrame, frame: &DecodedFrame) -> Result<()> {
    let describe = |f: &DecodedFrame| {
        format!("{} {}ch {}Hz", f.format(), f.channels(), f.sample_rate())
    };

    if frame.format() != first.format()
        || frame.channels() != first.channels()
        || frame.sample_rate() != first.sample_rate()
    {
        return Err(Error::FormatMismatch {
            index,
            expected: describe(first),
            found: describe(frame),
        });
    }
    Ok(())
}

/// Append one frame's samples to `out` in interleaved order
fn append_frame(out: &mut Vec<u8>, frame: &DecodedFrame, bytes_per_sample: usize) {
    match frame.data() {
        FrameData::Interleaved(data) => out.extend_from_slice(data),
        FrameData::Planar(planes) => {
            for sample in 0..frame.samples() {
                let start = sample * bytes_per_sample;
                let end = start + bytes_per_sample;
                for plane in planes {
                    out.extend_from_slice(&plane[start..end]);
                }
            }
        }
    }
}
