//! Audio decoding, PCM assembly and output sinks

pub mod assembler;
pub mod decoder;
pub mod metadata;
pub mod output;
pub mod types;

pub use assembler::assemble;
pub use decoder::decode;
pub use output::{
    open_preferred_sink, AudioSink, CloseMode, NullSink, PcmPacket, SinkKind, StreamDescription,
};
pub use types::{AudioStreamInfo, DecodedFrame, FrameSequence, PcmBuffer, SampleFormat};
