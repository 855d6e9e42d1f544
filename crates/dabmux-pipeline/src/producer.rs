use std::io::{ErrorKind, Read};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::thread::JoinHandle;

use bytes::Bytes;
use dabmux_frame::Port;
use tracing::{debug, trace};

use crate::control::PortEvent;
use crate::error::{PipelineError, Result};

/// A source the pipeline can move onto a producer thread.
pub type BoxedSource = Box<dyn Read + Send + 'static>;

/// Receiving half of a running producer.
pub(crate) struct Producer {
    pub(crate) port: Port,
    pub(crate) events: Receiver<PortEvent>,
    pub(crate) handle: JoinHandle<u64>,
}

/// Start a thread reading `source` in `chunk_size` pieces.
///
/// At most `queue_depth` chunks wait in the channel; the thread blocks
/// when the multiplexer falls behind.
pub(crate) fn spawn(
    port: Port,
    mut source: BoxedSource,
    chunk_size: usize,
    queue_depth: usize,
) -> Result<Producer> {
    let (sender, events) = sync_channel(queue_depth);
    let chunk_size = chunk_size.max(1);
    let handle = std::thread::Builder::new()
        .name(format!("dabmux-{port}"))
        .spawn(move || read_loop(port, &mut source, chunk_size, &sender))
        .map_err(|source| PipelineError::Spawn { port, source })?;

    Ok(Producer {
        port,
        events,
        handle,
    })
}

fn read_loop(
    port: Port,
    source: &mut BoxedSource,
    chunk_size: usize,
    sender: &SyncSender<PortEvent>,
) -> u64 {
    let mut total = 0u64;
    let mut buf = vec![0u8; chunk_size];
    loop {
        let event = match source.read(&mut buf) {
            Ok(0) => PortEvent::End,
            Ok(n) => {
                total += n as u64;
                trace!(%port, bytes = n, "producer read");
                PortEvent::Data(Bytes::copy_from_slice(&buf[..n]))
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => PortEvent::Failed(err.to_string()),
        };

        let last = !matches!(event, PortEvent::Data(_));
        if sender.send(event).is_err() {
            debug!(%port, "multiplexer gone; producer stopping");
            break;
        }
        if last {
            debug!(%port, bytes = total, "producer finished");
            break;
        }
    }
    total
}
