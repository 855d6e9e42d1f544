use std::ops::Range;

use dabmux_config::EnsembleConfig;
use dabmux_frame::{MuxConfig, CU_BYTES};
use serde::Serialize;

use crate::cmd::{resolve_layout, LayoutArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{json_line, table, OutputFormat};

#[derive(Serialize, Debug)]
pub(crate) struct SlotView {
    pub name: String,
    pub offset: usize,
    pub bytes: usize,
    pub cus: usize,
}

#[derive(Serialize, Debug)]
pub(crate) struct CifView {
    pub index: usize,
    pub cif_len: usize,
    pub slots: Vec<SlotView>,
}

#[derive(Serialize, Debug)]
pub(crate) struct LayoutView {
    pub mode: String,
    pub cifs_per_frame: usize,
    pub frame_len: usize,
    pub fic_block: usize,
    pub frame_duration_ms: u128,
    pub capacity_cus: usize,
    pub used_cus: usize,
    pub free_cus: usize,
    pub cifs: Vec<CifView>,
}

impl LayoutView {
    pub(crate) fn new(config: &MuxConfig, ensemble: Option<&EnsembleConfig>) -> Self {
        let layout = config.layout();
        let mode = layout.mode();
        let slot = |name: String, range: Range<usize>| SlotView {
            name,
            offset: range.start,
            bytes: range.len(),
            cus: range.len() / CU_BYTES,
        };

        let cifs = layout
            .cifs()
            .iter()
            .map(|cif| {
                let mut slots = Vec::new();
                if cif.has_fic() {
                    slots.push(slot("fic".to_string(), cif.fic()));
                }
                for (index, range) in cif.subchannels().iter().enumerate() {
                    let name = match ensemble {
                        Some(ensemble) => ensemble.label(index),
                        None => format!("subch-{index}"),
                    };
                    slots.push(slot(name, range.clone()));
                }
                if !cif.padding().is_empty() {
                    slots.push(slot("padding".to_string(), cif.padding()));
                }
                CifView {
                    index: cif.index(),
                    cif_len: cif.cif_len(),
                    slots,
                }
            })
            .collect();

        Self {
            mode: mode.to_string(),
            cifs_per_frame: layout.cifs_per_frame(),
            frame_len: layout.frame_len(),
            fic_block: layout.fic_block_size(),
            frame_duration_ms: mode.frame_duration().as_millis(),
            capacity_cus: mode.cif_capacity_cus(),
            used_cus: mode.fic_cu_equivalent() + layout.used_cus(),
            free_cus: layout.free_cus(),
            cifs,
        }
    }
}

pub fn run(args: LayoutArgs, format: OutputFormat) -> CliResult<i32> {
    let (config, ensemble) = resolve_layout(&args.spec)?;
    let view = LayoutView::new(&config, ensemble.as_ref());
    print_layout(&view, format);
    Ok(SUCCESS)
}

fn print_layout(view: &LayoutView, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", json_line(view)),
        OutputFormat::Table => {
            println!(
                "mode {}: {} bytes per frame of {} CIF(s), {} ms, FIC block {} bytes",
                view.mode, view.frame_len, view.cifs_per_frame, view.frame_duration_ms, view.fic_block
            );
            let mut slots = table(&["CIF", "SLOT", "OFFSET", "BYTES", "CU"]);
            for cif in &view.cifs {
                for slot in &cif.slots {
                    slots.add_row(vec![
                        cif.index.to_string(),
                        slot.name.clone(),
                        slot.offset.to_string(),
                        slot.bytes.to_string(),
                        slot.cus.to_string(),
                    ]);
                }
            }
            println!("{slots}");
            println!(
                "capacity: {} of {} CU used, {} MSC CU free",
                view.used_cus, view.capacity_cus, view.free_cus
            );
        }
        OutputFormat::Pretty => {
            println!("Layout:");
            println!("  Mode:             {}", view.mode);
            println!(
                "  Frame:            {} CIF(s), {} bytes, {} ms",
                view.cifs_per_frame, view.frame_len, view.frame_duration_ms
            );
            println!("  FIC block:        {} bytes", view.fic_block);
            println!(
                "  Capacity:         {}/{} CU ({} free)",
                view.used_cus, view.capacity_cus, view.free_cus
            );
            for cif in &view.cifs {
                println!("  CIF {} ({} bytes):", cif.index, cif.cif_len);
                for slot in &cif.slots {
                    println!(
                        "    {:<15} @{:<6} {} bytes ({} CU)",
                        format!("{}:", slot.name),
                        slot.offset,
                        slot.bytes,
                        slot.cus
                    );
                }
            }
        }
        OutputFormat::Raw => println!("{}", view.frame_len),
    }
}

#[cfg(test)]
mod tests {
    use dabmux_frame::{MscPadding, TransmissionMode};

    use super::*;

    fn names(cif: &CifView) -> Vec<&str> {
        cif.slots.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn fic_block_only_in_the_first_cif() {
        let config = MuxConfig::new(TransmissionMode::I, 2, &[15, 15]).unwrap();
        let view = LayoutView::new(&config, None);

        assert_eq!(view.cifs.len(), 4);
        assert_eq!(names(&view.cifs[0]), ["fic", "subch-0", "subch-1"]);
        assert_eq!(names(&view.cifs[1]), ["subch-0", "subch-1"]);
        assert_eq!(view.cifs[0].slots[0].bytes, 384);
        assert_eq!(view.cifs[0].slots[1].offset, 384);
        assert_eq!(view.cifs[0].slots[2].offset, 504);
        assert_eq!(view.cifs[0].cif_len, 624);
        assert_eq!(view.cifs[3].slots[0].offset, 0);
        assert_eq!(view.cifs[3].cif_len, 240);
        assert_eq!(view.frame_len, 624 + 3 * 240);
        assert_eq!(view.fic_block, 384);
        assert_eq!(view.frame_duration_ms, 96);
        assert_eq!(view.used_cus, 12 + 30);
        assert_eq!(view.free_cus, 864 - 30);
    }

    #[test]
    fn view_includes_padding_slot() {
        let config = MuxConfig::new(TransmissionMode::III, 1, &[64])
            .unwrap()
            .with_padding(MscPadding::Zero);
        let view = LayoutView::new(&config, None);

        let cif = &view.cifs[0];
        let padding = cif.slots.last().unwrap();
        assert_eq!(padding.name, "padding");
        assert_eq!(padding.offset, 128 + 64 * 8);
        assert_eq!(padding.cus, 864 - 64);
        assert_eq!(cif.cif_len, 128 + 864 * 8);
        assert_eq!(view.frame_len, cif.cif_len);
    }
}
