//! Audio output capture for integration tests
//!
//! Sinks that stand in for a device: one records everything it is sent,
//! one fails after a fixed number of packets.

use oasis_ap::audio::{AudioSink, CloseMode, PcmPacket, StreamDescription};
use oasis_ap::{Error, Result};

/// One packet as seen by a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketRecord {
    pub pts: u64,
    pub dts: u64,
    pub duration: u64,
    pub len: usize,
}

/// Records every stream and packet it receives
#[derive(Default)]
pub struct RecordingSink {
    pub frame_size: Option<usize>,
    pub descriptions: Vec<StreamDescription>,
    /// Packets per opened stream
    pub streams: Vec<Vec<PacketRecord>>,
    /// Every close call, including closes of an already closed stream
    pub closes: Vec<CloseMode>,
    pub bytes: Vec<u8>,
    pub pauses: usize,
    pub open: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn packets(&self) -> impl Iterator<Item = &PacketRecord> {
        self.streams.iter().flatten()
    }

    pub fn packet_count(&self) -> usize {
        self.packets().count()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl AudioSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    fn frame_size(&self) -> Option<usize> {
        self.frame_size
    }

    fn open_stream(&mut self, desc: &StreamDescription) -> Result<()> {
        assert!(!self.open, "stream opened twice without close");
        self.descriptions.push(desc.clone());
        self.streams.push(Vec::new());
        self.open = true;
        Ok(())
    }

    fn write_packet(&mut self, packet: &PcmPacket<'_>) -> Result<()> {
        assert!(self.open, "packet written to a closed stream");
        let stream = self.streams.last_mut().unwrap();
        if let Some(prev) = stream.last() {
            assert_eq!(prev.pts + prev.duration, packet.pts, "timestamp gap within a stream");
        }
        stream.push(PacketRecord {
            pts: packet.pts,
            dts: packet.dts,
            duration: packet.duration,
            len: packet.data.len(),
        });
        self.bytes.extend_from_slice(packet.data);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.pauses += 1;
        Ok(())
    }

    fn close_stream(&mut self, mode: CloseMode) -> Result<()> {
        self.closes.push(mode);
        self.open = false;
        Ok(())
    }
}

/// Accepts `accept` packets, then fails every write
pub struct FailingSink {
    pub accept: usize,
    pub written: usize,
    pub closes: Vec<CloseMode>,
}

impl FailingSink {
    pub fn after(accept: usize) -> Self {
        Self {
            accept,
            written: 0,
            closes: Vec::new(),
        }
    }
}

impl AudioSink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    fn open_stream(&mut self, _desc: &StreamDescription) -> Result<()> {
        Ok(())
    }

    fn write_packet(&mut self, _packet: &PcmPacket<'_>) -> Result<()> {
        if self.written >= self.accept {
            return Err(Error::AudioOutput("device unplugged".into()));
        }
        self.written += 1;
        Ok(())
    }

    fn close_stream(&mut self, mode: CloseMode) -> Result<()> {
        self.closes.push(mode);
        Ok(())
    }
}
