use bytes::{Bytes, BytesMut};
use tracing::{debug, info, trace, warn};

use crate::error::{ConfigurationError, MuxError, Result};
use crate::layout::{encode_cif, FrameLayout, MuxConfig};
use crate::mode::TransmissionMode;
use crate::port::{Port, PortBuffer};

/// One assembled Common Interleaved Frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cif {
    /// Position in the output stream, starting at 0.
    pub sequence: u64,
    /// Transmission frame the CIF belongs to.
    pub frame: u64,
    /// CIF index within its transmission frame.
    pub index: usize,
    /// The CIF bytes, exactly as long as the layout of `index` says.
    pub payload: Bytes,
}

/// Bytes left in a port when the output ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortResidual {
    pub port: Port,
    pub bytes: usize,
    pub slot_len: usize,
    /// Bytes past the last full slot.
    pub partial: usize,
    pub finished: bool,
}

impl PortResidual {
    /// A finished producer whose output did not end on a slot boundary.
    pub fn is_premature(&self) -> bool {
        self.finished && self.partial != 0
    }
}

/// Summary of a finished output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfStream {
    /// The finished port that could not fill another slot, or `None` when
    /// the scheduler closed the output.
    pub ended_by: Option<Port>,
    pub cifs_emitted: u64,
    /// Complete transmission frames emitted.
    pub frames_completed: u64,
    /// Discarded bytes, one entry per port that still held data.
    pub residuals: Vec<PortResidual>,
}

impl EndOfStream {
    /// Residuals that indicate an upstream framing problem.
    pub fn premature(&self) -> impl Iterator<Item = &PortResidual> {
        self.residuals.iter().filter(|r| r.is_premature())
    }
}

/// Outcome of one [`FrameMux::poll_cif`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MuxPoll {
    /// A complete CIF is ready for the output.
    Ready(Cif),
    /// The port needs more bytes before the next CIF can be assembled.
    Starved(Port),
    /// The output has ended. Returned for every call after the end.
    Ended(EndOfStream),
}

/// Assembles FIC and subchannel byte streams into CIFs.
///
/// Pull-based: producers [`push`](FrameMux::push) bytes into their ports,
/// the scheduler calls [`poll_cif`](FrameMux::poll_cif) until it reports a
/// starved port, then feeds that port and polls again.
#[derive(Debug)]
pub struct FrameMux {
    config: MuxConfig,
    layout: FrameLayout,
    fic: PortBuffer,
    subchannels: Vec<PortBuffer>,
    sequence: u64,
    frame: u64,
    index: usize,
    out: BytesMut,
    end: Option<EndOfStream>,
}

impl FrameMux {
    /// Validate the configuration and build the multiplexer.
    pub fn new(
        mode: TransmissionMode,
        subchannel_count: usize,
        sizes: &[u32],
    ) -> std::result::Result<Self, ConfigurationError> {
        Ok(Self::with_config(MuxConfig::new(
            mode,
            subchannel_count,
            sizes,
        )?))
    }

    /// Build the multiplexer from an already validated configuration.
    pub fn with_config(config: MuxConfig) -> Self {
        let layout = config.layout();
        let fic = PortBuffer::new(Port::Fic, layout.fic_block_size());
        let subchannels = layout
            .slot_lens()
            .enumerate()
            .map(|(index, slot_len)| PortBuffer::new(Port::Subchannel(index), slot_len))
            .collect();

        debug!(
            mode = %config.mode(),
            subchannels = layout.subchannel_count(),
            fic_block = layout.fic_block_size(),
            frame_len = layout.frame_len(),
            "frame multiplexer configured"
        );

        Self {
            out: BytesMut::with_capacity(layout.cif(0).cif_len()),
            config,
            layout,
            fic,
            subchannels,
            sequence: 0,
            frame: 0,
            index: 0,
            end: None,
        }
    }

    /// Let every port advertise `wants_more` until `cifs` slots are buffered.
    pub fn with_port_high_watermark(mut self, cifs: usize) -> Self {
        self.fic = rebuild_with_watermark(self.fic, cifs);
        self.subchannels = self
            .subchannels
            .into_iter()
            .map(|port| rebuild_with_watermark(port, cifs))
            .collect();
        self
    }

    pub fn config(&self) -> &MuxConfig {
        &self.config
    }

    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// All ports in slot order: FIC first, then subchannels by index.
    pub fn ports(&self) -> impl Iterator<Item = &PortBuffer> {
        std::iter::once(&self.fic).chain(self.subchannels.iter())
    }

    /// Ports the next CIF takes bytes from. The FIC port only takes part
    /// in CIFs that carry the FIC block.
    fn required_ports(&self) -> impl Iterator<Item = &PortBuffer> {
        let fic = self
            .layout
            .cif(self.index)
            .has_fic()
            .then_some(&self.fic);
        fic.into_iter().chain(self.subchannels.iter())
    }

    /// Look up a port buffer.
    pub fn port(&self, port: Port) -> Option<&PortBuffer> {
        match port {
            Port::Fic => Some(&self.fic),
            Port::Subchannel(index) => self.subchannels.get(index),
        }
    }

    fn port_mut(&mut self, port: Port) -> Result<&mut PortBuffer> {
        match port {
            Port::Fic => Ok(&mut self.fic),
            Port::Subchannel(index) => self
                .subchannels
                .get_mut(index)
                .ok_or(MuxError::UnknownPort(port)),
        }
    }

    /// Append producer bytes to a port.
    pub fn push(&mut self, port: Port, data: &[u8]) -> Result<()> {
        if self.end.is_some() {
            return Err(MuxError::Ended);
        }
        let buffer = self.port_mut(port)?;
        if buffer.is_finished() {
            return Err(MuxError::PortFinished(port));
        }
        buffer.push(data);
        Ok(())
    }

    /// Signal that a producer will not supply more bytes. Idempotent.
    pub fn finish(&mut self, port: Port) -> Result<()> {
        let buffer = self.port_mut(port)?;
        if !buffer.is_finished() {
            debug!(%port, buffered = buffer.available(), "port finished");
            buffer.finish();
        }
        Ok(())
    }

    /// Whether the port is still below its high watermark.
    pub fn wants_more(&self, port: Port) -> bool {
        self.port(port).is_some_and(|p| !p.is_finished() && p.wants_more())
    }

    /// `(frame, cif index within frame)` of the next CIF.
    pub fn position(&self) -> (u64, usize) {
        (self.frame, self.index)
    }

    pub fn cifs_emitted(&self) -> u64 {
        self.sequence
    }

    pub fn is_ended(&self) -> bool {
        self.end.is_some()
    }

    /// The finished port that cannot fill its slot in the next CIF.
    ///
    /// When this is `Some`, the next [`poll_cif`](FrameMux::poll_cif) ends
    /// the output.
    pub fn exhausted_port(&self) -> Option<Port> {
        if self.end.is_some() {
            return None;
        }
        self.required_ports()
            .find(|p| p.is_exhausted())
            .map(|p| p.port())
    }

    /// Try to assemble the next CIF.
    pub fn poll_cif(&mut self) -> Result<MuxPoll> {
        if let Some(end) = &self.end {
            return Ok(MuxPoll::Ended(end.clone()));
        }

        if let Some(port) = self.exhausted_port() {
            return Ok(MuxPoll::Ended(self.end_stream(Some(port))));
        }

        let starved = self.required_ports().find(|p| !p.ready()).map(|p| p.port());
        if let Some(port) = starved {
            trace!(%port, sequence = self.sequence, "waiting for port data");
            return Ok(MuxPoll::Starved(port));
        }

        self.assemble().map(MuxPoll::Ready)
    }

    /// End the output after the last emitted CIF.
    ///
    /// Used by schedulers that stop for reasons of their own (limits,
    /// shutdown). Everything buffered is discarded and reported.
    pub fn close(&mut self) -> EndOfStream {
        self.end_stream(None)
    }

    fn end_stream(&mut self, ended_by: Option<Port>) -> EndOfStream {
        if let Some(end) = &self.end {
            return end.clone();
        }

        let mut residuals = Vec::new();
        for port in std::iter::once(&mut self.fic).chain(self.subchannels.iter_mut()) {
            let finished = port.is_finished();
            let partial = port.residual();
            let bytes = port.discard();
            if bytes == 0 {
                continue;
            }
            let residual = PortResidual {
                port: port.port(),
                bytes,
                slot_len: port.slot_len(),
                partial,
                finished,
            };
            if residual.is_premature() {
                warn!(
                    port = %residual.port,
                    residual = residual.bytes,
                    slot_len = residual.slot_len,
                    "producer ended off a slot boundary; residual discarded"
                );
            } else {
                debug!(
                    port = %residual.port,
                    residual = residual.bytes,
                    "discarding buffered bytes"
                );
            }
            residuals.push(residual);
        }

        let end = EndOfStream {
            ended_by,
            cifs_emitted: self.sequence,
            frames_completed: self.frame,
            residuals,
        };
        info!(
            ended_by = ?end.ended_by,
            cifs = end.cifs_emitted,
            frames = end.frames_completed,
            "multiplexer output ended"
        );
        self.end = Some(end.clone());
        end
    }

    fn assemble(&mut self) -> Result<Cif> {
        // Readiness was checked by the caller; a missing slot surfaces as a
        // length error from `encode_cif`.
        let layout = self.layout.cif(self.index);
        let fic = if layout.has_fic() {
            self.fic.take_slot().unwrap_or_default()
        } else {
            Bytes::new()
        };
        let slots: Vec<Bytes> = self
            .subchannels
            .iter_mut()
            .filter_map(PortBuffer::take_slot)
            .collect();

        self.out.clear();
        encode_cif(layout, &fic, &slots, &mut self.out)?;

        let cif = Cif {
            sequence: self.sequence,
            frame: self.frame,
            index: self.index,
            payload: self.out.split().freeze(),
        };
        trace!(
            sequence = cif.sequence,
            frame = cif.frame,
            index = cif.index,
            "cif assembled"
        );

        self.sequence += 1;
        self.index += 1;
        if self.index == self.config.mode().cifs_per_frame() {
            self.index = 0;
            self.frame += 1;
            debug!(frame = self.frame, "transmission frame complete");
        }
        Ok(cif)
    }
}

fn rebuild_with_watermark(port: PortBuffer, cifs: usize) -> PortBuffer {
    let limit = port.slot_len() * cifs;
    port.with_high_watermark(limit)
}
