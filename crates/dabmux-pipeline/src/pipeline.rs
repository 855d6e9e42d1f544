use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::sync::mpsc::{RecvTimeoutError, TryRecvError};
use std::time::{Duration, Instant};

use dabmux_frame::{CifWriter, FrameMux, MuxConfig, MuxPoll, Port};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::control::{PortEvent, ShutdownHandle};
use crate::error::{PipelineError, Result};
use crate::producer::{self, BoxedSource, Producer};
use crate::report::{ProducerFailure, RunReport, StopReason};

/// Upper bound on how long the loop waits before rechecking shutdown.
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Drives a [`FrameMux`] from one producer thread per port.
pub struct Pipeline {
    mux_config: MuxConfig,
    config: PipelineConfig,
    shutdown: ShutdownHandle,
    fic: Option<BoxedSource>,
    subchannels: BTreeMap<usize, BoxedSource>,
}

enum Wait {
    Event(PortEvent),
    Shutdown,
}

impl Pipeline {
    pub fn new(mux_config: MuxConfig) -> Self {
        Self {
            mux_config,
            config: PipelineConfig::default(),
            shutdown: ShutdownHandle::new(),
            fic: None,
            subchannels: BTreeMap::new(),
        }
    }

    /// Override scheduling parameters.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing shutdown handle.
    pub fn with_shutdown(mut self, shutdown: ShutdownHandle) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Handle that stops this pipeline when requested.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Attach the FIC source.
    pub fn fic(mut self, source: impl Read + Send + 'static) -> Self {
        self.fic = Some(Box::new(source));
        self
    }

    /// Attach the source for subchannel `index`.
    pub fn subchannel(mut self, index: usize, source: impl Read + Send + 'static) -> Self {
        self.subchannels.insert(index, Box::new(source));
        self
    }

    /// Run until a source ends, the CIF limit is reached or shutdown is
    /// requested, writing every CIF to `sink`.
    pub fn run<W: Write>(self, sink: W) -> Result<RunReport> {
        let Pipeline {
            mux_config,
            config,
            shutdown,
            fic,
            mut subchannels,
        } = self;

        let count = mux_config.subchannel_count();
        if let Some(&index) = subchannels.keys().find(|&&index| index >= count) {
            return Err(PipelineError::UnknownSubchannel { index, count });
        }

        let mut sources = vec![(Port::Fic, fic.ok_or(PipelineError::MissingSource(Port::Fic))?)];
        for index in 0..count {
            let port = Port::Subchannel(index);
            let source = subchannels
                .remove(&index)
                .ok_or(PipelineError::MissingSource(port))?;
            sources.push((port, source));
        }

        let mut mux = FrameMux::with_config(mux_config);
        let mut writer = CifWriter::new(sink, mux.layout());

        let mut producers = Vec::with_capacity(sources.len());
        for (port, source) in sources {
            producers.push(producer::spawn(
                port,
                source,
                config.read_chunk_size,
                config.queue_depth,
            )?);
        }

        info!(
            mode = %mux.config().mode(),
            subchannels = count,
            frame_len = mux.layout().frame_len(),
            "pipeline started"
        );

        let mut failures = Vec::new();
        let result = drive(
            &mut mux,
            &mut writer,
            &producers,
            &config,
            &shutdown,
            &mut failures,
        );
        let bytes_written = writer.bytes_written();
        stop_producers(producers);

        let (stop, end) = result?;

        let report = RunReport::new(&mux, &end, stop, bytes_written, failures);
        info!(
            cifs = report.cifs,
            frames = report.frames,
            bytes = report.bytes_written,
            stop = ?report.stop,
            "pipeline stopped"
        );
        Ok(report)
    }
}

fn drive<W: Write>(
    mux: &mut FrameMux,
    writer: &mut CifWriter<W>,
    producers: &[Producer],
    config: &PipelineConfig,
    shutdown: &ShutdownHandle,
    failures: &mut Vec<ProducerFailure>,
) -> Result<(StopReason, dabmux_frame::EndOfStream)> {
    let depth = config.queue_depth;
    loop {
        if shutdown.is_requested() {
            drain_queued(mux, producers, depth, failures)?;
            return Ok((StopReason::Shutdown, mux.close()));
        }
        if let Some(max_cifs) = config.max_cifs {
            if mux.cifs_emitted() >= max_cifs {
                drain_queued(mux, producers, depth, failures)?;
                return Ok((StopReason::Limit { max_cifs }, mux.close()));
            }
        }
        if mux.exhausted_port().is_some() {
            drain_queued(mux, producers, depth, failures)?;
        }

        match mux.poll_cif()? {
            MuxPoll::Ready(cif) => writer.write_cif(&cif)?,
            MuxPoll::Starved(port) => {
                let Some(producer) = producers.iter().find(|p| p.port == port) else {
                    return Err(PipelineError::MissingSource(port));
                };
                match wait_for(producer, config.stall_warn_after, shutdown) {
                    Wait::Event(event) => apply(mux, port, event, failures)?,
                    Wait::Shutdown => {
                        drain_queued(mux, producers, depth, failures)?;
                        return Ok((StopReason::Shutdown, mux.close()));
                    }
                }
            }
            MuxPoll::Ended(end) => {
                let port = end
                    .ended_by
                    .map(|port| port.to_string())
                    .unwrap_or_default();
                return Ok((StopReason::SourceEnded { port }, end));
            }
        }
    }
}

/// Hand every event already waiting in the producer queues to the mux so
/// the end-of-stream residuals account for them.
///
/// Each queue is read at most `queue_depth + 1` times; an endless source
/// keeps refilling its queue as it drains.
fn drain_queued(
    mux: &mut FrameMux,
    producers: &[Producer],
    queue_depth: usize,
    failures: &mut Vec<ProducerFailure>,
) -> Result<()> {
    for producer in producers {
        for _ in 0..=queue_depth {
            match producer.events.try_recv() {
                Ok(event) => apply(mux, producer.port, event, failures)?,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    mux.finish(producer.port)?;
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Block on one producer's queue until it delivers an event.
fn wait_for(producer: &Producer, stall_warn_after: Duration, shutdown: &ShutdownHandle) -> Wait {
    let stall_warn_after = stall_warn_after.max(Duration::from_millis(1));
    let slice = SHUTDOWN_POLL.min(stall_warn_after);
    let started = Instant::now();
    let mut next_warn = stall_warn_after;

    loop {
        match producer.events.recv_timeout(slice) {
            Ok(event) => return Wait::Event(event),
            Err(RecvTimeoutError::Disconnected) => return Wait::Event(PortEvent::End),
            Err(RecvTimeoutError::Timeout) => {
                if shutdown.is_requested() {
                    return Wait::Shutdown;
                }
                let waited = started.elapsed();
                if waited >= next_warn {
                    warn!(
                        port = %producer.port,
                        waited_ms = waited.as_millis() as u64,
                        "port starved; waiting for producer"
                    );
                    next_warn += stall_warn_after;
                }
            }
        }
    }
}

fn apply(
    mux: &mut FrameMux,
    port: Port,
    event: PortEvent,
    failures: &mut Vec<ProducerFailure>,
) -> Result<()> {
    match event {
        PortEvent::Data(bytes) => mux.push(port, &bytes)?,
        PortEvent::End => mux.finish(port)?,
        PortEvent::Failed(error) => {
            warn!(%port, %error, "producer failed; treating as end of stream");
            failures.push(ProducerFailure {
                port: port.to_string(),
                error,
            });
            mux.finish(port)?;
        }
    }
    Ok(())
}

/// Disconnect every producer and join those that have already exited.
///
/// A producer blocked in a read (stdin, a quiet FIFO) is left detached.
fn stop_producers(producers: Vec<Producer>) {
    for Producer {
        port,
        events,
        handle,
    } in producers
    {
        drop(events);
        if handle.is_finished() {
            match handle.join() {
                Ok(bytes) => debug!(%port, bytes, "producer joined"),
                Err(_) => warn!(%port, "producer thread panicked"),
            }
        } else {
            debug!(%port, "producer still blocked; detaching");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::thread;

    use dabmux_frame::{CifReader, TransmissionMode};
    use dabmux_source::SourceStream;

    use super::*;

    fn mode_one(sizes: &[u32]) -> MuxConfig {
        MuxConfig::new(TransmissionMode::I, sizes.len(), sizes).unwrap()
    }

    #[test]
    fn multiplexes_patterns_until_limit() {
        let report = Pipeline::new(mode_one(&[15, 15]))
            .with_config(PipelineConfig {
                max_cifs: Some(8),
                ..PipelineConfig::default()
            })
            .fic(SourceStream::zeros(None))
            .subchannel(0, SourceStream::pattern(vec![1u8, 1], None).unwrap())
            .subchannel(1, SourceStream::pattern(vec![2u8, 2], None).unwrap())
            .run(Vec::new())
            .unwrap();

        assert_eq!(report.cifs, 8);
        assert_eq!(report.frames, 2);
        assert_eq!(report.frame_len, 384 + 4 * 240);
        assert_eq!(report.bytes_written, 8 * 336);
        assert_eq!(report.stop, StopReason::Limit { max_cifs: 8 });
        assert_eq!(report.consumed(Port::Subchannel(0)), Some(8 * 120));
    }

    #[test]
    fn output_layout_is_byte_exact() {
        let config = mode_one(&[15, 15]);
        let layout = config.layout();
        let mut out = Vec::new();
        Pipeline::new(config)
            .with_config(PipelineConfig {
                read_chunk_size: 7,
                queue_depth: 1,
                ..PipelineConfig::default()
            })
            .fic(SourceStream::zeros(Some(384)))
            .subchannel(0, SourceStream::pattern(vec![1u8, 1], None).unwrap())
            .subchannel(1, SourceStream::pattern(vec![2u8, 2], None).unwrap())
            .run(&mut out)
            .unwrap();

        assert_eq!(out.len(), layout.frame_len());
        let mut reader = CifReader::new(Cursor::new(out), &layout);
        let mut with_fic = 0;
        let mut cifs = 0;
        while let Some(cif) = reader.read_cif().unwrap() {
            let cif_layout = layout.cif(cif.index);
            let slices = cif_layout.split(&cif.payload).unwrap();
            if cif_layout.has_fic() {
                assert_eq!(slices.fic.len(), 384);
                assert!(slices.fic.iter().all(|&b| b == 0));
                with_fic += 1;
            }
            assert!(slices.subchannels[0].iter().all(|&b| b == 1));
            assert!(slices.subchannels[1].iter().all(|&b| b == 2));
            cifs += 1;
        }
        assert_eq!((cifs, with_fic), (4, 1));
    }

    #[test]
    fn finite_source_ends_stream_and_reports_residual() {
        let report = Pipeline::new(mode_one(&[1]))
            .fic(SourceStream::zeros(None))
            .subchannel(0, Cursor::new(vec![9u8; 8 * 5 + 3]))
            .run(std::io::sink())
            .unwrap();

        assert_eq!(report.cifs, 5);
        assert_eq!(
            report.stop,
            StopReason::SourceEnded {
                port: "subch-0".to_string()
            }
        );
        assert!(report.has_premature_end());
        let residual = report
            .residuals
            .iter()
            .find(|r| r.port == "subch-0")
            .unwrap();
        assert_eq!(residual.bytes, 3);
    }

    /// Serves `len` bytes, then reports end of stream after `delay`.
    struct LateEnd {
        remaining: usize,
        delay: Duration,
    }

    impl Read for LateEnd {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.remaining == 0 {
                thread::sleep(self.delay);
                return Ok(0);
            }
            let n = buf.len().min(self.remaining);
            buf[..n].fill(4);
            self.remaining -= n;
            Ok(n)
        }
    }

    #[test]
    fn queued_end_of_other_ports_is_reported() {
        let report = Pipeline::new(mode_one(&[1, 1]))
            .fic(SourceStream::zeros(None))
            .subchannel(
                0,
                LateEnd {
                    remaining: 19,
                    delay: Duration::from_millis(200),
                },
            )
            .subchannel(1, Cursor::new(vec![6u8; 21]))
            .run(std::io::sink())
            .unwrap();

        assert_eq!(report.cifs, 2);
        assert_eq!(
            report.stop,
            StopReason::SourceEnded {
                port: "subch-0".to_string()
            }
        );
        let residual = |port: &str| {
            report
                .residuals
                .iter()
                .find(|r| r.port == port)
                .cloned()
                .unwrap()
        };
        let first = residual("subch-0");
        let second = residual("subch-1");
        assert_eq!((first.bytes, first.premature), (3, true));
        assert_eq!((second.bytes, second.premature), (5, true));
    }

    struct Failing {
        served: bool,
    }

    impl Read for Failing {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.served {
                return Err(std::io::Error::other("read error"));
            }
            self.served = true;
            let n = buf.len().min(16);
            buf[..n].fill(5);
            Ok(n)
        }
    }

    #[test]
    fn producer_failure_ends_its_port() {
        let report = Pipeline::new(mode_one(&[1]))
            .with_config(PipelineConfig {
                read_chunk_size: 64,
                ..PipelineConfig::default()
            })
            .fic(SourceStream::zeros(None))
            .subchannel(0, Failing { served: false })
            .run(std::io::sink())
            .unwrap();

        assert_eq!(report.cifs, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].port, "subch-0");
        assert!(!report.has_premature_end());
    }

    struct Silent;

    impl Read for Silent {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            thread::sleep(Duration::from_secs(60));
            Ok(0)
        }
    }

    #[test]
    fn shutdown_stops_a_stalled_pipeline() {
        let pipeline = Pipeline::new(mode_one(&[1]))
            .with_config(PipelineConfig {
                stall_warn_after: Duration::from_millis(10),
                ..PipelineConfig::default()
            })
            .fic(SourceStream::zeros(None))
            .subchannel(0, Silent);
        let shutdown = pipeline.shutdown_handle();

        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            shutdown.request();
        });
        let report = pipeline.run(std::io::sink()).unwrap();
        stopper.join().unwrap();

        assert_eq!(report.stop, StopReason::Shutdown);
        assert_eq!(report.cifs, 0);
    }

    #[test]
    fn missing_source_is_rejected() {
        let result = Pipeline::new(mode_one(&[1, 1]))
            .fic(SourceStream::zeros(None))
            .subchannel(0, SourceStream::zeros(None))
            .run(std::io::sink());
        assert!(matches!(
            result,
            Err(PipelineError::MissingSource(Port::Subchannel(1)))
        ));
    }

    #[test]
    fn out_of_range_subchannel_is_rejected() {
        let result = Pipeline::new(mode_one(&[1]))
            .fic(SourceStream::zeros(None))
            .subchannel(0, SourceStream::zeros(None))
            .subchannel(3, SourceStream::zeros(None))
            .run(std::io::sink());
        assert!(matches!(
            result,
            Err(PipelineError::UnknownSubchannel { index: 3, count: 1 })
        ));
    }

    #[test]
    fn report_serializes_stop_reason() {
        let report = Pipeline::new(mode_one(&[1]))
            .with_config(PipelineConfig {
                max_cifs: Some(0),
                ..PipelineConfig::default()
            })
            .fic(SourceStream::zeros(None))
            .subchannel(0, SourceStream::zeros(None))
            .run(std::io::sink())
            .unwrap();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stop"]["reason"], "limit");
        assert_eq!(json["stop"]["max_cifs"], 0);
        assert_eq!(json["cifs"], 0);
    }
}
