//! Synthetic FAT32 images for unit tests.

use crate::SECTOR_SIZE;

/// Layout parameters of a synthetic volume.
pub struct Geometry {
    pub sec_per_clus: u8,
    pub rsvd_sec_cnt: u16,
    pub num_fat: u8,
    pub fat_sz: u32,
    pub data_clusters: u32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            sec_per_clus: 1,
            rsvd_sec_cnt: 4,
            num_fat: 2,
            fat_sz: 1,
            data_clusters: 126,
        }
    }
}

impl Geometry {
    pub fn cluster_size(&self) -> usize {
        self.sec_per_clus as usize * SECTOR_SIZE
    }

    pub fn first_data_sector(&self) -> usize {
        self.rsvd_sec_cnt as usize + self.num_fat as usize * self.fat_sz as usize
    }

    pub fn tot_sec(&self) -> u32 {
        self.first_data_sector() as u32 + self.data_clusters * self.sec_per_clus as u32
    }

    pub fn cluster_offset(&self, cluster: u32) -> usize {
        self.first_data_sector() * SECTOR_SIZE + (cluster as usize - 2) * self.cluster_size()
    }
}

pub fn boot_sector(geometry: &Geometry) -> [u8; 512] {
    let mut s = [0u8; 512];
    s[0..3].copy_from_slice(&[0xEB, 0x58, 0x90]);
    s[3..11].copy_from_slice(b"MSWIN4.1");
    s[11..13].copy_from_slice(&512u16.to_le_bytes());
    s[13] = geometry.sec_per_clus;
    s[14..16].copy_from_slice(&geometry.rsvd_sec_cnt.to_le_bytes());
    s[16] = geometry.num_fat;
    s[21] = 0xF8;
    s[32..36].copy_from_slice(&geometry.tot_sec().to_le_bytes());
    s[36..40].copy_from_slice(&geometry.fat_sz.to_le_bytes());
    s[44..48].copy_from_slice(&2u32.to_le_bytes());
    s[48..50].copy_from_slice(&1u16.to_le_bytes());
    s[50..52].copy_from_slice(&6u16.to_le_bytes());
    s[64] = 0x80;
    s[66] = 0x29;
    s[67..71].copy_from_slice(&0x1234ABCDu32.to_le_bytes());
    s[71..82].copy_from_slice(b"RECOVERY   ");
    s[82..90].copy_from_slice(b"FAT32   ");
    s[510] = 0x55;
    s[511] = 0xAA;
    s
}

pub fn fs_info_sector() -> [u8; 512] {
    let mut s = [0u8; 512];
    s[0..4].copy_from_slice(&0x41615252u32.to_le_bytes());
    s[484..488].copy_from_slice(&0x61417272u32.to_le_bytes());
    s[488..492].copy_from_slice(&100u32.to_le_bytes());
    s[492..496].copy_from_slice(&3u32.to_le_bytes());
    s[508..512].copy_from_slice(&0xAA550000u32.to_le_bytes());
    s
}

/// Builds a whole volume: boot sector, FSInfo, every FAT copy, then cluster data.
///
/// `fat` holds the entries from index 0; the remaining entries are free.
pub fn volume_image(geometry: &Geometry, fat: &[u32], clusters: &[(u32, Vec<u8>)]) -> Vec<u8> {
    let mut image = vec![0u8; geometry.tot_sec() as usize * SECTOR_SIZE];
    image[..SECTOR_SIZE].copy_from_slice(&boot_sector(geometry));
    image[SECTOR_SIZE..2 * SECTOR_SIZE].copy_from_slice(&fs_info_sector());

    for copy in 0..geometry.num_fat as usize {
        let start =
            (geometry.rsvd_sec_cnt as usize + copy * geometry.fat_sz as usize) * SECTOR_SIZE;
        for (i, entry) in fat.iter().enumerate() {
            image[start + i * 4..start + i * 4 + 4].copy_from_slice(&entry.to_le_bytes());
        }
    }

    for (cluster, data) in clusters {
        let start = geometry.cluster_offset(*cluster);
        image[start..start + data.len()].copy_from_slice(data);
    }

    image
}

/// Cluster content filled with a single marker byte.
pub fn marker(byte: u8, geometry: &Geometry) -> Vec<u8> {
    vec![byte; geometry.cluster_size()]
}
