//! Binary persistence for the vector index.
//!
//! File format: vectors.bin
//!
//! Header (47 bytes):
//! - version: u8 (1)
//! - model_id: [u8; 32] (SHA-256 hash of the model name)
//! - dimensions: u16 (little-endian)
//! - row_count: u64 (little-endian)
//! - checksum: u32 (CRC32 of the header fields before checksum)
//!
//! Body:
//! - model name: u16 length (little-endian) + UTF-8 bytes
//! - records: u64 length (little-endian) + JSON array of embedding records
//! - embeddings: row_count * dimensions f32 (little-endian)
//!
//! The artifact is self-describing: it reloads without the embedding
//! model present, and every mismatch (version, model, arrays) fails fast
//! instead of silently misaligning rows.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::semantic::embeddings::model_id_hash;
use crate::semantic::index::{EmbeddingRecord, VectorIndex};

/// Current file format version
const FORMAT_VERSION: u8 = 1;

/// Header size in bytes: version(1) + model_id(32) + dimensions(2) + row_count(8) + checksum(4)
const HEADER_SIZE: usize = 47;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Version mismatch: file version {0}, supported version {1}")]
    VersionMismatch(u8, u8),

    #[error("Model mismatch: index was built with '{built_with}', expected '{expected}'")]
    ModelMismatch { built_with: String, expected: String },

    #[error("Checksum mismatch: file may be corrupted")]
    ChecksumMismatch,

    #[error("Invalid records section: {0}")]
    InvalidRecords(#[from] serde_json::Error),
}

/// Storage manager for the vector index artifact.
pub struct IndexStorage {
    path: PathBuf,
}

impl IndexStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the index from storage.
    ///
    /// When `expected_model` is given, loading fails with
    /// [`StorageError::ModelMismatch`] if the artifact was built with a
    /// different model. Loading never touches the embedding backend:
    /// vectors are precomputed numbers.
    pub fn load(&self, expected_model: Option<&str>) -> Result<VectorIndex, StorageError> {
        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);

        let header = read_header(&mut reader)?;
        let model_name = read_model_name(&mut reader)?;

        if model_id_hash(&model_name) != header.model_id {
            return Err(StorageError::InvalidFormat(
                "model name does not match header hash".to_string(),
            ));
        }
        if let Some(expected) = expected_model {
            if model_name != expected {
                return Err(StorageError::ModelMismatch {
                    built_with: model_name,
                    expected: expected.to_string(),
                });
            }
        }

        let records = read_records(&mut reader)?;
        if records.len() as u64 != header.row_count {
            return Err(StorageError::InvalidFormat(format!(
                "header claims {} rows but records section has {}",
                header.row_count,
                records.len()
            )));
        }

        let embeddings = read_embeddings(
            &mut reader,
            header.row_count as usize,
            header.dimensions as usize,
        )?;

        VectorIndex::from_parts(
            model_name,
            header.dimensions as usize,
            embeddings,
            records,
        )
        .map_err(|e| StorageError::InvalidFormat(e.to_string()))
    }

    /// Save the index to storage.
    ///
    /// Uses atomic write: temp file -> fsync -> rename.
    pub fn save(&self, index: &VectorIndex) -> Result<(), StorageError> {
        let temp_path = self.path.with_extension("tmp");

        let result = self.write_to_file(&temp_path, index);
        if result.is_err() {
            let _ = std::fs::remove_file(&temp_path);
            return result;
        }

        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    fn write_to_file(&self, path: &Path, index: &VectorIndex) -> Result<(), StorageError> {
        let dimensions = u16::try_from(index.dimensions()).map_err(|_| {
            StorageError::InvalidFormat(format!(
                "dimensions {} exceed the format limit",
                index.dimensions()
            ))
        })?;
        let name_len = u16::try_from(index.model_name().len()).map_err(|_| {
            StorageError::InvalidFormat("model name too long for format".to_string())
        })?;

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write_header(
            &mut writer,
            &Header {
                version: FORMAT_VERSION,
                model_id: model_id_hash(index.model_name()),
                dimensions,
                row_count: index.len() as u64,
            },
        )?;

        writer.write_all(&name_len.to_le_bytes())?;
        writer.write_all(index.model_name().as_bytes())?;

        let records_json = serde_json::to_vec(index.records())?;
        writer.write_all(&(records_json.len() as u64).to_le_bytes())?;
        writer.write_all(&records_json)?;

        for &value in index.embeddings() {
            writer.write_all(&value.to_le_bytes())?;
        }

        writer.flush()?;
        let file = writer
            .into_inner()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        file.sync_all()?;

        Ok(())
    }
}

/// File header structure.
#[derive(Debug)]
struct Header {
    version: u8,
    model_id: [u8; 32],
    dimensions: u16,
    row_count: u64,
}

fn read_header(reader: &mut impl Read) -> Result<Header, StorageError> {
    let mut header_bytes = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header_bytes)?;

    let version = header_bytes[0];
    if version > FORMAT_VERSION {
        return Err(StorageError::VersionMismatch(version, FORMAT_VERSION));
    }

    let mut model_id = [0u8; 32];
    model_id.copy_from_slice(&header_bytes[1..33]);

    let dimensions = u16::from_le_bytes([header_bytes[33], header_bytes[34]]);
    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&header_bytes[35..43]);
    let row_count = u64::from_le_bytes(count_bytes);

    let mut checksum_bytes = [0u8; 4];
    checksum_bytes.copy_from_slice(&header_bytes[43..47]);
    let stored_checksum = u32::from_le_bytes(checksum_bytes);

    if stored_checksum != crc32fast::hash(&header_bytes[0..43]) {
        return Err(StorageError::ChecksumMismatch);
    }

    Ok(Header {
        version,
        model_id,
        dimensions,
        row_count,
    })
}

fn write_header(writer: &mut impl Write, header: &Header) -> Result<(), StorageError> {
    let mut header_bytes = [0u8; HEADER_SIZE];

    header_bytes[0] = header.version;
    header_bytes[1..33].copy_from_slice(&header.model_id);
    header_bytes[33..35].copy_from_slice(&header.dimensions.to_le_bytes());
    header_bytes[35..43].copy_from_slice(&header.row_count.to_le_bytes());

    let checksum = crc32fast::hash(&header_bytes[0..43]);
    header_bytes[43..47].copy_from_slice(&checksum.to_le_bytes());

    writer.write_all(&header_bytes)?;
    Ok(())
}

fn read_model_name(reader: &mut impl Read) -> Result<String, StorageError> {
    let mut len_bytes = [0u8; 2];
    reader.read_exact(&mut len_bytes)?;
    let len = u16::from_le_bytes(len_bytes) as usize;

    let mut name_bytes = vec![0u8; len];
    reader.read_exact(&mut name_bytes)?;

    String::from_utf8(name_bytes)
        .map_err(|_| StorageError::InvalidFormat("model name is not valid UTF-8".to_string()))
}

fn read_records(reader: &mut impl Read) -> Result<Vec<EmbeddingRecord>, StorageError> {
    let mut len_bytes = [0u8; 8];
    reader.read_exact(&mut len_bytes)?;
    let len = u64::from_le_bytes(len_bytes) as usize;

    let mut json_bytes = vec![0u8; len];
    reader.read_exact(&mut json_bytes)?;

    Ok(serde_json::from_slice(&json_bytes)?)
}

fn read_embeddings(
    reader: &mut impl Read,
    rows: usize,
    dimensions: usize,
) -> Result<Vec<f32>, StorageError> {
    let mut raw = vec![0u8; rows * dimensions * 4];
    reader.read_exact(&mut raw)?;

    Ok(raw
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
