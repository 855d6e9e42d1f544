use std::io::BufReader;

use dabmux_frame::{CifReader, MuxConfig};
use dabmux_source::{open_file, SourceStream};
use serde::Serialize;

use crate::cmd::{resolve_layout, InspectArgs};
use crate::exit::{mux_error, source_error, CliResult, SUCCESS};
use crate::output::{hex_preview, json_line, table, OutputFormat};

const PREVIEW_BYTES: usize = 8;

#[derive(Serialize, Debug, PartialEq, Eq)]
struct SlotStats {
    name: String,
    bytes: usize,
    /// CIFs that carry the slot.
    cifs: u64,
    /// CIFs in which the slot held only zero bytes.
    silent_cifs: u64,
}

#[derive(Serialize, Debug)]
struct CifListing {
    sequence: u64,
    frame: u64,
    index: usize,
    slots: Vec<String>,
}

#[derive(Serialize, Debug)]
struct InspectOutput {
    input: String,
    mode: String,
    frame_len: usize,
    cifs: u64,
    frames: u64,
    /// CIFs after the last complete transmission frame.
    trailing_cifs: u64,
    slots: Vec<SlotStats>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    listing: Vec<CifListing>,
}

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let (config, _) = resolve_layout(&args.spec)?;

    let source = if args.input.as_os_str() == "-" {
        SourceStream::stdin()
    } else {
        open_file(&args.input).map_err(|err| source_error("failed opening input", err))?
    };

    let mut output = summarize(BufReader::new(source), &config, args.list)?;
    output.input = args.input.display().to_string();
    print_inspect(&output, format);
    Ok(SUCCESS)
}

fn summarize<R: std::io::Read>(input: R, config: &MuxConfig, list: usize) -> CliResult<InspectOutput> {
    let layout = config.layout();
    let cifs_per_frame = layout.cifs_per_frame() as u64;

    let mut slots: Vec<SlotStats> = std::iter::once(("fic".to_string(), layout.fic_block_size()))
        .chain(
            layout
                .slot_lens()
                .enumerate()
                .map(|(index, len)| (format!("subch-{index}"), len)),
        )
        .map(|(name, bytes)| SlotStats {
            name,
            bytes,
            cifs: 0,
            silent_cifs: 0,
        })
        .collect();
    let mut listing = Vec::new();

    let mut reader = CifReader::new(input, &layout);
    while let Some(cif) = reader
        .read_cif()
        .map_err(|err| mux_error("failed reading CIF stream", err))?
    {
        let cif_layout = layout.cif(cif.index);
        let split = cif_layout
            .split(&cif.payload)
            .map_err(|err| mux_error("failed splitting CIF", err))?;
        let fic = cif_layout.has_fic().then_some(split.fic);
        let parts: Vec<Option<&[u8]>> = std::iter::once(fic)
            .chain(split.subchannels.iter().copied().map(Some))
            .collect();

        for (stats, part) in slots.iter_mut().zip(&parts) {
            let Some(part) = part else { continue };
            stats.cifs += 1;
            if part.iter().all(|&b| b == 0) {
                stats.silent_cifs += 1;
            }
        }
        if listing.len() < list {
            listing.push(CifListing {
                sequence: cif.sequence,
                frame: cif.frame,
                index: cif.index,
                slots: parts
                    .iter()
                    .map(|part| match part {
                        Some(part) => hex_preview(part, PREVIEW_BYTES),
                        None => "-".to_string(),
                    })
                    .collect(),
            });
        }
    }

    let cifs = reader.cifs_read();
    Ok(InspectOutput {
        input: String::new(),
        mode: config.mode().to_string(),
        frame_len: layout.frame_len(),
        cifs,
        frames: cifs / cifs_per_frame,
        trailing_cifs: cifs % cifs_per_frame,
        slots,
        listing,
    })
}

fn print_inspect(output: &InspectOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", json_line(output)),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!(
                "{}: mode {}, {} CIF(s), {} complete frame(s) of {} bytes, {} trailing CIF(s)",
                output.input,
                output.mode,
                output.cifs,
                output.frames,
                output.frame_len,
                output.trailing_cifs
            );
            let mut slots = table(&["SLOT", "BYTES", "CIFS", "SILENT CIFS"]);
            for slot in &output.slots {
                slots.add_row(vec![
                    slot.name.clone(),
                    slot.bytes.to_string(),
                    slot.cifs.to_string(),
                    slot.silent_cifs.to_string(),
                ]);
            }
            println!("{slots}");

            if !output.listing.is_empty() {
                let mut header = vec!["CIF", "FRAME", "INDEX"];
                header.extend(output.slots.iter().map(|s| s.name.as_str()));
                let mut cifs = table(&header);
                for cif in &output.listing {
                    let mut row = vec![
                        cif.sequence.to_string(),
                        cif.frame.to_string(),
                        cif.index.to_string(),
                    ];
                    row.extend(cif.slots.iter().cloned());
                    cifs.add_row(row);
                }
                println!("{cifs}");
            }
        }
        OutputFormat::Raw => println!("{}", output.cifs),
    }
}
