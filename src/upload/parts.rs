use crate::{FiledockError, Result};

/// Bookkeeping for one in-flight upload part.
#[derive(Debug, Clone)]
pub struct PartObj {
    /// 1-based part number.
    pub number: u32,
    /// Byte offset of the part within the source.
    pub offset: u64,
    pub size: u64,
    pub loaded: u64,
    pub etag: Option<String>,
}

/// The full part layout of an upload. Parts cover the source exactly; only
/// the last part may be short.
#[derive(Debug, Clone)]
pub struct PartsMap {
    pub parts: Vec<PartObj>,
    pub part_size: u64,
    pub total_size: u64,
}

impl PartsMap {
    /// Split `total_size` bytes into parts of at most `part_size`.
    ///
    /// An empty source still yields a single zero-length part so the wire
    /// flow stays uniform.
    pub fn split(total_size: u64, part_size: u64) -> Result<Self> {
        if part_size == 0 {
            return Err(FiledockError::InvalidOption(
                "part_size must be positive".to_owned(),
            ));
        }

        let mut parts = Vec::new();
        if total_size == 0 {
            parts.push(PartObj {
                number: 1,
                offset: 0,
                size: 0,
                loaded: 0,
                etag: None,
            });
        } else {
            let mut offset = 0;
            let mut number = 1;
            while offset < total_size {
                let size = part_size.min(total_size - offset);
                parts.push(PartObj {
                    number,
                    offset,
                    size,
                    loaded: 0,
                    etag: None,
                });
                offset += size;
                number += 1;
            }
        }

        Ok(Self {
            parts,
            part_size,
            total_size,
        })
    }

    pub fn loaded(&self) -> u64 {
        self.parts.iter().map(|p| p.loaded).sum()
    }
}

pub(crate) fn checksum(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_cover_source_exactly() {
        let map = PartsMap::split(10, 3).unwrap();
        assert_eq!(map.parts.len(), 4);
        assert_eq!(
            map.parts.iter().map(|p| p.size).collect::<Vec<_>>(),
            vec![3, 3, 3, 1]
        );
        assert_eq!(map.parts.iter().map(|p| p.size).sum::<u64>(), 10);
        assert_eq!(map.parts.last().unwrap().offset, 9);
    }

    #[test]
    fn exact_multiple_has_no_short_part() {
        let map = PartsMap::split(12, 4).unwrap();
        assert_eq!(map.parts.len(), 3);
        assert!(map.parts.iter().all(|p| p.size == 4));
    }

    #[test]
    fn part_numbers_start_at_one() {
        let map = PartsMap::split(5, 2).unwrap();
        assert_eq!(
            map.parts.iter().map(|p| p.number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn empty_source_yields_single_empty_part() {
        let map = PartsMap::split(0, 1024).unwrap();
        assert_eq!(map.parts.len(), 1);
        assert_eq!(map.parts[0].size, 0);
        assert_eq!(map.loaded(), 0);
    }

    #[test]
    fn zero_part_size_is_rejected() {
        assert!(PartsMap::split(10, 0).is_err());
    }

    #[test]
    fn loaded_never_exceeds_size() {
        let map = PartsMap::split(100, 7).unwrap();
        assert!(map.parts.iter().all(|p| p.loaded <= p.size));
        assert_eq!(map.loaded(), 0);
    }

    #[test]
    fn checksum_matches_crc32_check_value() {
        assert_eq!(checksum(b"123456789"), 0xCBF43926);
    }
}
