//! Async CIF reader: splits a CIF stream file into CIFs with `CifCodec`.
//!
//! Run with:
//!   cargo run --example async-cif-reader --features async -- frames.bin 1 15,15

use dabmux::frame::{CifCodec, MuxConfig, TransmissionMode};
use futures_util::StreamExt;
use tokio_util::codec::FramedRead;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let path = args.next().ok_or("usage: async-cif-reader <FILE> <MODE> <SIZES>")?;
    let mode: TransmissionMode = args.next().as_deref().unwrap_or("1").parse()?;
    let sizes = args
        .next()
        .unwrap_or_else(|| "15,15".to_string())
        .split(',')
        .map(str::parse::<u32>)
        .collect::<Result<Vec<_>, _>>()?;

    let config = MuxConfig::new(mode, sizes.len(), &sizes)?;
    let file = tokio::fs::File::open(&path).await?;
    let mut cifs = FramedRead::new(file, CifCodec::new(&config.layout()));

    let mut count = 0u64;
    while let Some(cif) = cifs.next().await {
        let cif = cif?;
        if count < 4 {
            eprintln!(
                "[cif {}.{}] {} bytes, first={:02x?}",
                cif.frame,
                cif.index,
                cif.payload.len(),
                &cif.payload[..4]
            );
        }
        count += 1;
    }
    eprintln!("[done] {count} CIF(s) of mode {mode}");

    Ok(())
}
