//! This is the main entry point for the FAT32 recovery tool.
//!
//! The program provides an interactive command-line interface for recovering data from
//! FAT32 disk images. Users can open disk images, pick a partition, inspect the volume
//! metadata, reconstruct the cluster chains and export their content.

use fat_recovery::commands::Command;
use fat_recovery::filesystem::chain::ChainSummary;
use fat_recovery::recovery::export_chains;
use fat_recovery::{Disk, FATVol, traits::LayoutDisplay};
use log::{error, info, warn};
use std::{
    fs::File,
    io::{self, Write},
    path::Path,
};

/// Represents the runtime state of the program.
///
/// This struct keeps track of the currently opened disk image and the mounted volume.
struct RunState {
    /// The currently opened disk image.
    disk: Option<Disk<File>>,
    /// Volume in inspection mode, with its partition number
    volume: Option<(u8, FATVol<File>)>,
    /// Enable the validation of the bpb
    bpb_validation: bool,
}

fn main() {
    stderrlog::new()
        .module(module_path!())
        .module("fat_recovery")
        .verbosity(2)
        .init()
        .unwrap();

    let mut run_state = RunState {
        disk: None,
        volume: None,
        bpb_validation: true,
    };

    loop {
        print!("> ");
        io::stdout().flush().unwrap();

        let mut s = String::new();
        let read = io::stdin()
            .read_line(&mut s)
            .expect("Failed to read command");
        if read == 0 {
            break;
        }

        match Command::from_string(&s) {
            Command::Open(path) => match Disk::from_file(Path::new(&path)) {
                Ok(disk) => {
                    if let Some(mbr) = disk.part_table() {
                        for (i, entry) in mbr.pt_entries().iter().enumerate() {
                            println!("  Partition {}: {}", i + 1, entry);
                        }
                    }
                    run_state.disk = Some(disk);
                    run_state.volume = None;
                }
                Err(err) => error!("{err}"),
            },
            Command::Quit => break,
            Command::Print => print_layout(&run_state),
            Command::Partition(vol_nb) => select_partition(&mut run_state, vol_nb),
            Command::Info => match &run_state.volume {
                Some((_, vol)) => match vol.format_human_readable() {
                    Ok(summary) => print!("{summary}"),
                    Err(err) => error!("Info formatting error: {err}"),
                },
                None => warn!("Select a partition first"),
            },
            Command::Chains => match &run_state.volume {
                Some((_, vol)) => match vol.reconstruct_chains() {
                    Ok(chains) => {
                        for (i, chain) in chains.iter().enumerate() {
                            println!("  #{i:04} {chain}");
                        }
                        println!("{}", ChainSummary::from(&chains[..]));
                    }
                    Err(err) => error!("Chain reconstruction failed: {err}"),
                },
                None => warn!("Select a partition first"),
            },
            Command::Dump(dir) => dump(&run_state, Path::new(&dir)),
            Command::Skip => run_state.bpb_validation = false,
            Command::Unknown(s) => error!("Unknown command: {s:?}"),
            Command::Invalid(s) => error!("{s}"),
            Command::Empty => {}
        }
    }
}

fn print_layout(run_state: &RunState) {
    let Some(disk) = &run_state.disk else {
        error!("Open disk image first");
        return;
    };

    if let Err(e) = disk.print_layout(3) {
        error!("Print layout error: {e}");
    }
    if let Some((_, vol)) = &run_state.volume {
        match vol.display_layout(6) {
            Ok(layout) => print!("\n{layout}"),
            Err(e) => error!("Print layout error: {e}"),
        }
    }
}

fn select_partition(run_state: &mut RunState, vol_nb: u8) {
    let Some(disk) = &run_state.disk else {
        warn!("Open disk image first");
        return;
    };

    let mounted = match vol_nb {
        0 => disk.mount_raw(run_state.bpb_validation),
        nb => disk.mount(nb as usize - 1, run_state.bpb_validation),
    };

    match mounted {
        Ok(vol) => {
            info!("Volume #{vol_nb} mounted");
            run_state.volume = Some((vol_nb, vol));
        }
        Err(err) => error!("Cannot mount volume #{vol_nb}: {err}"),
    }
}

fn dump(run_state: &RunState, dir: &Path) {
    let Some((vol_nb, vol)) = &run_state.volume else {
        warn!("Select a partition first");
        return;
    };

    let chains = match vol.reconstruct_chains() {
        Ok(chains) => chains,
        Err(err) => {
            error!("Chain reconstruction failed: {err}");
            return;
        }
    };

    match export_chains(vol, &chains, dir) {
        Ok(report) => println!(
            "Exported {} chains of volume #{vol_nb} to {} ({} failed).",
            report.written().len(),
            dir.display(),
            report.failed()
        ),
        Err(err) => error!("Export failed: {err}"),
    }
}
