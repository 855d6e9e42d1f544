//! Pattern mux example: two synthetic subchannels multiplexed into mode I CIFs.
//!
//! Run with:
//!   cargo run --example pattern-mux --features pipeline

use dabmux::frame::{CifReader, MuxConfig, TransmissionMode};
use dabmux::pipeline::{Pipeline, PipelineConfig};
use dabmux::source::SourceStream;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = MuxConfig::new(TransmissionMode::I, 2, &[15, 15])?;
    let layout = config.layout();

    let mut output = Vec::new();
    let report = Pipeline::new(config)
        .with_config(PipelineConfig {
            max_cifs: Some(4),
            ..PipelineConfig::default()
        })
        .fic(SourceStream::zeros(None))
        .subchannel(0, SourceStream::pattern(vec![1u8, 1], None)?)
        .subchannel(1, SourceStream::pattern(vec![2u8, 2], None)?)
        .run(&mut output)?;

    eprintln!(
        "[mux] {} CIF(s) in {} frame(s), {} bytes",
        report.cifs, report.frames, report.bytes_written
    );

    // The first CIF of a frame leads with the FIC block; every CIF then
    // holds each subchannel slot in index order
    let mut reader = CifReader::new(output.as_slice(), &layout);
    while let Some(cif) = reader.read_cif()? {
        let slices = layout.cif(cif.index).split(&cif.payload)?;
        eprintln!(
            "[cif {}.{}] fic={}B subch-0={:?}.. subch-1={:?}..",
            cif.frame,
            cif.index,
            slices.fic.len(),
            &slices.subchannels[0][..4],
            &slices.subchannels[1][..4]
        );
    }

    Ok(())
}
