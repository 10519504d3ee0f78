//! .gbc catalog file reader/writer.

use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::{Catalog, GobbleError, GobbleResult};

/// Magic bytes: "GBCT"
const GBC_MAGIC: u32 = 0x47424354;

/// Current format version.
const FORMAT_VERSION: u16 = 1;

/// Header size in bytes.
const HEADER_SIZE: usize = 32;

/// Writer for .gbc files.
pub struct CatalogWriter;

/// Reader for .gbc files.
pub struct CatalogReader;

/// One persisted row. Row order is the entry index.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CatalogRow {
    company: String,
    name: String,
    address: String,
}

impl CatalogWriter {
    /// Write a catalog to a file, replacing it only once the full payload is on disk.
    pub fn write_to_file(catalog: &Catalog, path: &Path) -> GobbleResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = path.with_extension("gbc.tmp");
        {
            let mut file = std::fs::File::create(&tmp_path)?;
            Self::write_to(catalog, &mut file)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Write a catalog to any writer.
    pub fn write_to<W: Write>(catalog: &Catalog, writer: &mut W) -> GobbleResult<()> {
        let rows: Vec<CatalogRow> = catalog
            .entries()
            .iter()
            .map(|e| CatalogRow {
                company: e.company.clone(),
                name: e.name.clone(),
                address: e.address.clone(),
            })
            .collect();

        let payload = serde_json::to_vec(&rows)
            .map_err(|e| GobbleError::Storage(format!("Serialization failed: {e}")))?;

        let mut header = [0u8; HEADER_SIZE];
        write_u32(&mut header[0..4], GBC_MAGIC);
        write_u16(&mut header[4..6], FORMAT_VERSION);
        write_u16(&mut header[6..8], 0); // flags
        write_u64(&mut header[8..16], rows.len() as u64);
        write_u64(&mut header[16..24], catalog.created_at);
        write_u64(&mut header[24..32], payload.len() as u64);

        writer.write_all(&header)?;
        writer.write_all(&payload)?;

        Ok(())
    }
}

impl CatalogReader {
    /// Read a catalog from a file.
    pub fn read_from_file(path: &Path) -> GobbleResult<Catalog> {
        let mut file = std::fs::File::open(path)?;
        Self::read_from(&mut file)
    }

    /// Read a catalog from any reader.
    pub fn read_from<R: Read>(reader: &mut R) -> GobbleResult<Catalog> {
        let mut header = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header)?;

        let magic = read_u32(&header[0..4]);
        if magic != GBC_MAGIC {
            return Err(GobbleError::Storage(format!(
                "Invalid magic: expected 0x{GBC_MAGIC:08X}, got 0x{magic:08X}"
            )));
        }

        let version = read_u16(&header[4..6]);
        if version != FORMAT_VERSION {
            return Err(GobbleError::Storage(format!(
                "Unsupported version: {version}"
            )));
        }

        let entry_count = read_u64(&header[8..16]) as usize;
        let created_at = read_u64(&header[16..24]);
        let payload_len = read_u64(&header[24..32]);

        // Sized by what actually arrives, not by the header.
        let mut payload = Vec::new();
        reader.take(payload_len).read_to_end(&mut payload)?;
        if (payload.len() as u64) < payload_len {
            return Err(GobbleError::Storage(format!(
                "Truncated payload: header declares {payload_len} bytes, found {}",
                payload.len()
            )));
        }

        let rows: Vec<CatalogRow> = serde_json::from_slice(&payload)
            .map_err(|e| GobbleError::Storage(format!("Deserialization failed: {e}")))?;

        if rows.len() != entry_count {
            return Err(GobbleError::Storage(format!(
                "Header declares {entry_count} entries, payload has {}",
                rows.len()
            )));
        }

        let mut catalog =
            Catalog::from_rows(rows.into_iter().map(|r| (r.company, r.name, r.address)));
        catalog.created_at = created_at;
        Ok(catalog)
    }
}

// Little-endian byte helpers
fn write_u16(buf: &mut [u8], val: u16) {
    buf[..2].copy_from_slice(&val.to_le_bytes());
}
fn write_u32(buf: &mut [u8], val: u32) {
    buf[..4].copy_from_slice(&val.to_le_bytes());
}
fn write_u64(buf: &mut [u8], val: u64) {
    buf[..8].copy_from_slice(&val.to_le_bytes());
}
fn read_u16(buf: &[u8]) -> u16 {
    u16::from_le_bytes([buf[0], buf[1]])
}
fn read_u32(buf: &[u8]) -> u32 {
    u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
}
fn read_u64(buf: &[u8]) -> u64 {
    u64::from_le_bytes([buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> Catalog {
        Catalog::from_rows(vec![
            (
                "KOPI CO PTE LTD".to_string(),
                "KOPI CORNER".to_string(),
                "1 MAIN ST, SINGAPORE 123456".to_string(),
            ),
            (
                "NOODLE HOUSE".to_string(),
                "NOODLE HOUSE".to_string(),
                "22 SIDE RD #01-05, SINGAPORE 012345".to_string(),
            ),
        ])
    }

    #[test]
    fn test_roundtrip_preserves_row_order() {
        let catalog = sample_catalog();
        let mut buf = Vec::new();
        CatalogWriter::write_to(&catalog, &mut buf).unwrap();

        let loaded = CatalogReader::read_from(&mut &buf[..]).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get(1).unwrap().index, 1);
        assert_eq!(loaded.get(1).unwrap().name, "NOODLE HOUSE");
        assert_eq!(loaded.created_at, catalog.created_at);
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = Catalog::from_rows(Vec::new());
        let mut buf = Vec::new();
        CatalogWriter::write_to(&catalog, &mut buf).unwrap();
        let loaded = CatalogReader::read_from(&mut &buf[..]).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_invalid_magic() {
        let buf = [0u8; HEADER_SIZE + 4];
        let result = CatalogReader::read_from(&mut &buf[..]);
        assert!(matches!(result, Err(GobbleError::Storage(_))));
    }

    #[test]
    fn test_truncated_payload() {
        let mut buf = Vec::new();
        CatalogWriter::write_to(&sample_catalog(), &mut buf).unwrap();
        buf.truncate(buf.len() - 3);
        assert!(CatalogReader::read_from(&mut &buf[..]).is_err());
    }

    #[test]
    fn test_oversized_payload_len_is_storage_error() {
        let mut buf = Vec::new();
        CatalogWriter::write_to(&Catalog::from_rows(Vec::new()), &mut buf).unwrap();
        buf[24..32].copy_from_slice(&(u64::MAX / 2).to_le_bytes());

        let result = CatalogReader::read_from(&mut &buf[..]);
        assert!(matches!(result, Err(GobbleError::Storage(_))));
    }

    #[test]
    fn test_file_roundtrip_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("catalog.gbc");

        CatalogWriter::write_to_file(&sample_catalog(), &path).unwrap();
        let loaded = CatalogReader::read_from_file(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(!path.with_extension("gbc.tmp").exists());
    }
}
