mod common;

use common::{EOC, SECTOR, VolumeBuilder, partitioned_disk};
use fat_recovery::Disk;
use fat_recovery::filesystem::chain_reader::ChainReader;
use fat_recovery::filesystem::fat_error::FATError;
use fat_recovery::partition::disk_error::DiskError;
use fat_recovery::recovery::export_chains;
use fat_recovery::traits::BoundedRead;
use std::io::{Cursor, Read, Write};

fn raw_disk(volume: Vec<u8>) -> Disk<Cursor<Vec<u8>>> {
    Disk::new(Cursor::new(volume)).unwrap()
}

fn read_all<R: Read>(mut reader: R, chunk: usize) -> Vec<u8> {
    let mut content = vec![];
    let mut buf = vec![0u8; chunk];
    loop {
        let n = reader.read(&mut buf).unwrap();
        if n == 0 {
            return content;
        }
        content.extend_from_slice(&buf[..n]);
    }
}

#[test]
fn recovers_three_cluster_chain() {
    let builder = VolumeBuilder::new(1)
        .chain(&[5, 6, 7])
        .marker(5, b'A')
        .marker(6, b'B')
        .marker(7, b'C');
    let disk = raw_disk(builder.build());
    let vol = disk.mount_raw(true).unwrap();

    let chains = vol.reconstruct_chains().unwrap();

    assert_eq!(chains.len(), 1);
    assert_eq!(*chains[0].start_cluster(), 5);
    assert!(*chains[0].contiguous());
    assert_eq!(*chains[0].size_bytes(), 3 * 512);

    let content = read_all(vol.open_chain_reader(&chains[0]).unwrap(), 4096);
    let mut expected = vec![b'A'; 512];
    expected.extend(vec![b'B'; 512]);
    expected.extend(vec![b'C'; 512]);
    assert_eq!(content, expected);
}

#[test]
fn end_of_stream_comes_with_last_bytes() {
    let builder = VolumeBuilder::new(2).chain(&[3, 4]).marker(3, 1).marker(4, 2);
    let disk = raw_disk(builder.build());
    let vol = disk.mount_raw(false).unwrap();
    let chain = vol.reconstruct_chains().unwrap()[0];

    for mut reader in [
        vol.open_chain_reader(&chain).unwrap(),
        vol.open_cluster_walker(&chain).unwrap(),
    ] {
        let mut buf = vec![0u8; 1500];
        let first = reader.read_bounded(&mut buf).unwrap();
        assert_eq!(first.count, 1500);
        assert!(!first.end_of_stream);

        let second = reader.read_bounded(&mut buf).unwrap();
        assert_eq!(second.count, 2048 - 1500);
        assert!(second.end_of_stream);
        assert!(buf[..548].iter().all(|b| *b == 2));
    }
}

#[test]
fn fast_path_matches_cluster_walk() {
    let mut builder = VolumeBuilder::new(2)
        .chain(&[2, 3, 4, 5])
        .chain(&[10, 11])
        .chain(&[20, 40, 21, 22, 7])
        .chain(&[60]);
    for cluster in 2..128u32 {
        let data: Vec<u8> = (0..builder.cluster_size())
            .map(|i| (cluster as usize * 7 + i) as u8)
            .collect();
        builder = builder.data(cluster, data);
    }
    let disk = raw_disk(builder.build());
    let vol = disk.mount_raw(true).unwrap();

    let chains = vol.reconstruct_chains().unwrap();
    assert_eq!(chains.len(), 4);

    for chain in &chains {
        let walked = read_all(vol.open_cluster_walker(chain).unwrap(), 4096);
        assert_eq!(walked.len() as u64, *chain.size_bytes());

        for chunk in [1, 100, 1024, 5000] {
            let fast = read_all(vol.open_chain_reader(chain).unwrap(), chunk);
            assert_eq!(fast, walked, "chain at cluster {}", chain.start_cluster());
        }
    }
}

#[test]
fn zeroed_entry_splits_chain_in_two() {
    let builder = VolumeBuilder::new(1)
        .chain(&[5, 6, 7])
        .link(6, 0)
        .marker(5, b'A')
        .marker(6, b'B')
        .marker(7, b'C')
        .chain(&[20, 21]);
    let disk = raw_disk(builder.build());
    let vol = disk.mount_raw(true).unwrap();

    let chains = vol.reconstruct_chains().unwrap();
    let found: Vec<(u32, u64)> = chains
        .iter()
        .map(|c| (*c.start_cluster(), *c.size_bytes()))
        .collect();

    assert_eq!(found, vec![(5, 2 * 512), (7, 512), (20, 2 * 512)]);

    let head = read_all(vol.open_cluster_walker(&chains[0]).unwrap(), 4096);
    assert!(head[..512].iter().all(|b| *b == b'A'));
    assert!(head[512..].iter().all(|b| *b == b'B'));
    assert_eq!(head, read_all(vol.open_chain_reader(&chains[0]).unwrap(), 4096));

    let rest = read_all(vol.open_chain_reader(&chains[1]).unwrap(), 4096);
    assert_eq!(rest, vec![b'C'; 512]);
}

#[test]
fn partition_windows_flatten_into_chain_windows() {
    let first = VolumeBuilder::new(1).chain(&[9, 10]).marker(9, b'x').build();
    let second = VolumeBuilder::new(1)
        .chain(&[3, 4])
        .marker(3, b'p')
        .marker(4, b'q')
        .build();
    let second_lba = 8 + (first.len() / SECTOR) as u32;
    let disk = Disk::new(Cursor::new(partitioned_disk(
        &[(8, first), (second_lba, second)],
        300,
    )))
    .unwrap();

    assert_eq!(disk.fat32_partitions(), vec![0, 1]);
    let vol = disk.mount(1, true).unwrap();
    let chain = vol.reconstruct_chains().unwrap()[0];

    let reader = vol.open_chain_reader(&chain).unwrap();
    match &reader {
        ChainReader::Contiguous(window) => {
            let expected = (second_lba as u64 + 6) * 512 + 512;
            assert_eq!(*window.base_offset(), expected);
        }
        ChainReader::Fragmented(_) => panic!("chain should be contiguous"),
    }

    let content = read_all(reader, 300);
    assert!(content[..512].iter().all(|b| *b == b'p'));
    assert!(content[512..].iter().all(|b| *b == b'q'));
}

#[test]
fn invalid_partition_selection() {
    let volume = VolumeBuilder::new(1).build();
    let disk = Disk::new(Cursor::new(partitioned_disk(&[(8, volume)], 200))).unwrap();

    assert!(matches!(
        disk.mount(1, true),
        Err(DiskError::InvalidPartitionIndex(1))
    ));
    assert!(matches!(
        disk.mount(7, true),
        Err(DiskError::InvalidPartitionIndex(7))
    ));
}

#[test]
fn image_without_signature_has_no_partition_table() {
    let mut image = VolumeBuilder::new(1).chain(&[2]).build();
    image[510] = 0;
    let disk = raw_disk(image);

    assert!(disk.part_table().is_none());
    assert!(matches!(disk.mount(0, false), Err(DiskError::NoPartitionTable)));
    assert_eq!(disk.mount_raw(false).unwrap().reconstruct_chains().unwrap().len(), 1);
}

#[test]
fn unsupported_sector_size_is_fatal() {
    let mut image = VolumeBuilder::new(1).build();
    image[11..13].copy_from_slice(&1024u16.to_le_bytes());
    let disk = raw_disk(image);

    assert!(matches!(
        disk.mount_raw(false),
        Err(DiskError::Volume(FATError::UnsupportedSectorSize {
            expected: 512,
            actual: 1024
        }))
    ));
}

#[test]
fn zero_sectors_per_cluster_is_fatal() {
    let mut image = VolumeBuilder::new(1).chain(&[5, 6]).build();
    image[13] = 0;
    let disk = raw_disk(image);

    assert!(matches!(
        disk.mount_raw(false),
        Err(DiskError::Volume(FATError::InvalidSecPerClus(0)))
    ));
}

#[test]
fn oversized_fat_still_mounts() {
    let mut image = VolumeBuilder::new(1).chain(&[2, 3]).build();
    image[36..40].copy_from_slice(&u32::MAX.to_le_bytes());
    let disk = raw_disk(image);

    let vol = disk.mount_raw(false).unwrap();

    assert_eq!(vol.allocation_table().cluster_count(), (132 - 4) * 512 / 4);
    assert!(vol.reconstruct_chains().is_ok());
}

#[test]
fn damaged_fs_info_still_mounts() {
    let mut image = VolumeBuilder::new(1).chain(&[2, 3]).build();
    image[SECTOR + 510] = 0;
    let disk = raw_disk(image);

    let vol = disk.mount_raw(true).unwrap();

    assert!(vol.fs_info().is_none());
    assert_eq!(vol.reconstruct_chains().unwrap().len(), 1);
}

#[test]
fn opens_disk_image_file() {
    let volume = VolumeBuilder::new(1)
        .chain(&[2, 5, 3])
        .marker(2, b'1')
        .marker(5, b'2')
        .marker(3, b'3')
        .build();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&partitioned_disk(&[(4, volume)], 160)).unwrap();
    file.flush().unwrap();

    let disk = Disk::from_file(file.path()).unwrap();
    assert_eq!(disk.file_path().as_deref(), Some(file.path()));
    let vol = disk.mount(0, true).unwrap();
    let chains = vol.reconstruct_chains().unwrap();

    assert_eq!(chains.len(), 1);
    assert!(!*chains[0].contiguous());
    let content = read_all(vol.open_chain_reader(&chains[0]).unwrap(), 1000);
    assert_eq!(content.len(), 3 * 512);
    assert_eq!((content[0], content[512], content[1024]), (b'1', b'2', b'3'));
}

#[test]
fn exports_every_chain() {
    let mut avi = b"RIFF".to_vec();
    avi.extend_from_slice(&600u32.to_le_bytes());
    avi.extend_from_slice(b"AVI LIST");
    avi.resize(512, 0xAB);
    let builder = VolumeBuilder::new(1)
        .chain(&[2, 3])
        .data(2, avi)
        .chain(&[10])
        .marker(10, 0x42)
        .link(11, EOC)
        .data(11, vec![0xFF, 0xD8, 0xFF, 0xE0]);
    let disk = raw_disk(builder.build());
    let vol = disk.mount_raw(true).unwrap();
    let chains = vol.reconstruct_chains().unwrap();
    let out = tempfile::tempdir().unwrap();

    let report = export_chains(&vol, &chains, out.path()).unwrap();

    assert_eq!(*report.failed(), 0);
    let names: Vec<String> = report
        .written()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["data_0000.avi", "data_0001.bin", "data_0002.jpg"]);
    assert_eq!(std::fs::read(&report.written()[0]).unwrap().len(), 608);
    assert_eq!(std::fs::read(&report.written()[1]).unwrap(), vec![0x42; 512]);
    assert_eq!(std::fs::read(&report.written()[2]).unwrap().len(), 512);
}
