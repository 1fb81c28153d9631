//! Builders for synthetic disk images.

#![allow(dead_code)]

pub const SECTOR: usize = 512;
pub const EOC: u32 = 0x0FFFFFFF;

/// A FAT32 volume with 4 reserved sectors, two 1-sector FATs and 126 data clusters.
pub struct VolumeBuilder {
    pub sec_per_clus: u8,
    fat: Vec<u32>,
    clusters: Vec<(u32, Vec<u8>)>,
}

impl VolumeBuilder {
    pub const RSVD: usize = 4;
    pub const NUM_FAT: usize = 2;
    pub const DATA_CLUSTERS: usize = 126;

    pub fn new(sec_per_clus: u8) -> Self {
        let mut fat = vec![0u32; 128];
        fat[0] = 0x0FFFFFF8;
        fat[1] = EOC;
        Self {
            sec_per_clus,
            fat,
            clusters: vec![],
        }
    }

    pub fn cluster_size(&self) -> usize {
        self.sec_per_clus as usize * SECTOR
    }

    pub fn link(mut self, cluster: u32, value: u32) -> Self {
        self.fat[cluster as usize] = value;
        self
    }

    /// Links `clusters` in order and ends the chain on the last one.
    pub fn chain(mut self, clusters: &[u32]) -> Self {
        for pair in clusters.windows(2) {
            self.fat[pair[0] as usize] = pair[1];
        }
        if let Some(last) = clusters.last() {
            self.fat[*last as usize] = EOC;
        }
        self
    }

    pub fn data(mut self, cluster: u32, data: Vec<u8>) -> Self {
        self.clusters.push((cluster, data));
        self
    }

    /// Fills the cluster with a single byte.
    pub fn marker(self, cluster: u32, byte: u8) -> Self {
        let size = self.cluster_size();
        self.data(cluster, vec![byte; size])
    }

    pub fn first_data_sector(&self) -> usize {
        Self::RSVD + Self::NUM_FAT
    }

    pub fn tot_sec(&self) -> usize {
        self.first_data_sector() + Self::DATA_CLUSTERS * self.sec_per_clus as usize
    }

    pub fn build(&self) -> Vec<u8> {
        let mut image = vec![0u8; self.tot_sec() * SECTOR];

        let s = &mut image[..SECTOR];
        s[0..3].copy_from_slice(&[0xEB, 0x58, 0x90]);
        s[3..11].copy_from_slice(b"MSWIN4.1");
        s[11..13].copy_from_slice(&512u16.to_le_bytes());
        s[13] = self.sec_per_clus;
        s[14..16].copy_from_slice(&(Self::RSVD as u16).to_le_bytes());
        s[16] = Self::NUM_FAT as u8;
        s[21] = 0xF8;
        s[32..36].copy_from_slice(&(self.tot_sec() as u32).to_le_bytes());
        s[36..40].copy_from_slice(&1u32.to_le_bytes());
        s[44..48].copy_from_slice(&2u32.to_le_bytes());
        s[48..50].copy_from_slice(&1u16.to_le_bytes());
        s[66] = 0x29;
        s[71..82].copy_from_slice(b"TESTVOLUME ");
        s[82..90].copy_from_slice(b"FAT32   ");
        s[510] = 0x55;
        s[511] = 0xAA;

        let s = &mut image[SECTOR..2 * SECTOR];
        s[0..4].copy_from_slice(&0x41615252u32.to_le_bytes());
        s[484..488].copy_from_slice(&0x61417272u32.to_le_bytes());
        s[488..492].copy_from_slice(&0xFFFFFFFFu32.to_le_bytes());
        s[492..496].copy_from_slice(&0xFFFFFFFFu32.to_le_bytes());
        s[508..512].copy_from_slice(&0xAA550000u32.to_le_bytes());

        for copy in 0..Self::NUM_FAT {
            let start = (Self::RSVD + copy) * SECTOR;
            for (i, entry) in self.fat.iter().enumerate() {
                image[start + i * 4..start + i * 4 + 4].copy_from_slice(&entry.to_le_bytes());
            }
        }

        for (cluster, data) in &self.clusters {
            let start = (self.first_data_sector() + (*cluster as usize - 2) * self.sec_per_clus as usize)
                * SECTOR;
            image[start..start + data.len()].copy_from_slice(data);
        }

        image
    }
}

/// Places volumes behind an MBR, each at the given starting sector.
pub fn partitioned_disk(volumes: &[(u32, Vec<u8>)], total_sectors: usize) -> Vec<u8> {
    let mut disk = vec![0u8; total_sectors * SECTOR];

    for (i, (lba_start, volume)) in volumes.iter().enumerate() {
        let entry = 446 + i * 16;
        disk[entry] = if i == 0 { 0x80 } else { 0 };
        disk[entry + 4] = 0x0C;
        disk[entry + 8..entry + 12].copy_from_slice(&lba_start.to_le_bytes());
        disk[entry + 12..entry + 16]
            .copy_from_slice(&((volume.len() / SECTOR) as u32).to_le_bytes());

        let start = *lba_start as usize * SECTOR;
        disk[start..start + volume.len()].copy_from_slice(volume);
    }
    disk[510] = 0x55;
    disk[511] = 0xAA;

    disk
}
