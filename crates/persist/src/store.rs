//! File-backed recording store.
//!
//! Layout inside the store directory:
//! ```text
//! store.meta.json            - schema versions and recording count
//! recordings/
//!   000001.rec.zst           - zstd compressed wire bytes
//!   000001.meta.cbor         - CBOR session metadata
//! integrity/
//!   chain.json               - sha256 hash chain over every recording file
//! ```
//!
//! Every read is checked against the chain; a digest or schema mismatch is an
//! error, never a best-effort load.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use saberline_kernel::{Recording, SessionConfig};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::wire::{self, WireError};

const STORE_SCHEMA_VERSION: u32 = 1;
const WIRE_FORMAT_VERSION: u32 = 1;
const ZSTD_LEVEL: i32 = 3;

const META_FILE: &str = "store.meta.json";
const RECORDINGS_DIR: &str = "recordings";
const INTEGRITY_DIR: &str = "integrity";
const CHAIN_FILE: &str = "chain.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CBOR error: {0}")]
    Cbor(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("wire format error: {0}")]
    Wire(#[from] WireError),
    #[error("{file} was modified: chain has {expected}, file hashes to {actual}")]
    Tampered {
        file: String,
        expected: String,
        actual: String,
    },
    #[error("hash chain broken at {file}")]
    BrokenChain { file: String },
    #[error("{0} is not covered by the hash chain")]
    Unchained(String),
    #[error("{what} version mismatch: store has v{found}, expected v{expected}")]
    SchemaMismatch {
        what: &'static str,
        found: u32,
        expected: u32,
    },
    #[error("recording {0} not found")]
    NotFound(u32),
    #[error("no recordings stored")]
    NoRecordings,
}

/// Contents of store.meta.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMeta {
    pub store_schema_version: u32,
    pub wire_format_version: u32,
    pub recording_count: u32,
}

impl StoreMeta {
    fn current() -> Self {
        Self {
            store_schema_version: STORE_SCHEMA_VERSION,
            wire_format_version: WIRE_FORMAT_VERSION,
            recording_count: 0,
        }
    }

    fn check_versions(&self) -> Result<(), StoreError> {
        let checks = [
            ("store schema", self.store_schema_version, STORE_SCHEMA_VERSION),
            ("wire format", self.wire_format_version, WIRE_FORMAT_VERSION),
        ];
        for (what, found, expected) in checks {
            if found != expected {
                return Err(StoreError::SchemaMismatch { what, found, expected });
            }
        }
        Ok(())
    }
}

/// Everything needed to replay a recording against the right level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMeta {
    pub level: String,
    /// Play type the difficulty was taken from.
    pub play_type: String,
    pub difficulty: Option<String>,
    /// Settings the live session ran with. Replay must reuse them.
    pub config: SessionConfig,
    /// Fixed tick length the session was driven with, if any.
    pub tick_seconds: Option<f64>,
    pub frame_count: u64,
    pub cut_count: u32,
}

/// One file's digest, linked to the digest written before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainLink {
    pub file: String,
    pub sha256: String,
    pub prev: Option<String>,
}

/// Append-only sha256 chain over recording files, in write order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HashChain {
    pub links: Vec<ChainLink>,
}

impl HashChain {
    fn append(&mut self, file: String, data: &[u8]) {
        let prev = self.links.last().map(|l| l.sha256.clone());
        self.links.push(ChainLink {
            file,
            sha256: sha256_hex(data),
            prev,
        });
    }

    fn link(&self, file: &str) -> Option<&ChainLink> {
        self.links.iter().find(|l| l.file == file)
    }

    /// Check `data` against the digest recorded for `file`.
    fn check(&self, file: &str, data: &[u8]) -> Result<(), StoreError> {
        let link = self
            .link(file)
            .ok_or_else(|| StoreError::Unchained(file.to_string()))?;
        let actual = sha256_hex(data);
        if actual != link.sha256 {
            return Err(StoreError::Tampered {
                file: file.to_string(),
                expected: link.sha256.clone(),
                actual,
            });
        }
        Ok(())
    }

    /// Check each link points at its predecessor and each file still hashes
    /// to its recorded digest.
    fn verify(&self, dir: &Path) -> Result<(), StoreError> {
        let mut prev: Option<&str> = None;
        for link in &self.links {
            if link.prev.as_deref() != prev {
                return Err(StoreError::BrokenChain {
                    file: link.file.clone(),
                });
            }
            self.check(&link.file, &std::fs::read(dir.join(&link.file))?)?;
            prev = Some(link.sha256.as_str());
        }
        Ok(())
    }
}

/// Directory of compressed recordings guarded by a hash chain.
pub struct RecordingStore {
    root: PathBuf,
    meta: StoreMeta,
    chain: HashChain,
}

fn recording_file(id: u32) -> String {
    format!("{id:06}.rec.zst")
}

fn sidecar_file(id: u32) -> String {
    format!("{id:06}.meta.cbor")
}

impl RecordingStore {
    /// Open the store at `path`, creating it if absent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join(RECORDINGS_DIR))?;
        std::fs::create_dir_all(root.join(INTEGRITY_DIR))?;

        let meta_path = root.join(META_FILE);
        let chain_path = root.join(INTEGRITY_DIR).join(CHAIN_FILE);
        let store = if meta_path.exists() {
            let meta: StoreMeta = read_json(&meta_path)?;
            meta.check_versions()?;
            let chain = if chain_path.exists() {
                read_json(&chain_path)?
            } else {
                HashChain::default()
            };
            Self { root, meta, chain }
        } else {
            let store = Self {
                root,
                meta: StoreMeta::current(),
                chain: HashChain::default(),
            };
            store.flush()?;
            store
        };
        debug!(root = %store.root.display(), recordings = store.meta.recording_count, "recording store opened");
        Ok(store)
    }

    /// Persist a recording with its metadata. Returns the new recording id,
    /// counting from 1.
    pub fn save(&mut self, recording: &Recording, meta: &RecordingMeta) -> Result<u32, StoreError> {
        let id = self.meta.recording_count + 1;
        self.write_file(recording_file(id), &compress(&wire::encode(recording))?)?;
        self.write_file(sidecar_file(id), &encode_sidecar(meta)?)?;
        self.meta.recording_count = id;
        self.flush()?;
        info!(id, frames = recording.frame_count(), level = %meta.level, "recording saved");
        Ok(id)
    }

    pub fn load(&self, id: u32) -> Result<(Recording, RecordingMeta), StoreError> {
        self.check_id(id)?;
        let bytes = decompress(&self.read_file(&recording_file(id))?)?;
        let recording = wire::decode(&bytes)?;
        Ok((recording, self.load_meta(id)?))
    }

    pub fn load_latest(&self) -> Result<(Recording, RecordingMeta), StoreError> {
        match self.meta.recording_count {
            0 => Err(StoreError::NoRecordings),
            latest => self.load(latest),
        }
    }

    /// Metadata only, without decompressing the frames.
    pub fn load_meta(&self, id: u32) -> Result<RecordingMeta, StoreError> {
        self.check_id(id)?;
        decode_sidecar(&self.read_file(&sidecar_file(id))?)
    }

    /// Walk the whole chain, re-hashing every file.
    pub fn verify_integrity(&self) -> Result<(), StoreError> {
        self.chain.verify(&self.root.join(RECORDINGS_DIR))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn meta(&self) -> &StoreMeta {
        &self.meta
    }

    pub fn chain(&self) -> &HashChain {
        &self.chain
    }

    pub fn recording_count(&self) -> u32 {
        self.meta.recording_count
    }

    fn check_id(&self, id: u32) -> Result<(), StoreError> {
        if (1..=self.meta.recording_count).contains(&id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(id))
        }
    }

    fn write_file(&mut self, file: String, data: &[u8]) -> Result<(), StoreError> {
        std::fs::write(self.root.join(RECORDINGS_DIR).join(&file), data)?;
        self.chain.append(file, data);
        Ok(())
    }

    fn read_file(&self, file: &str) -> Result<Vec<u8>, StoreError> {
        let data = std::fs::read(self.root.join(RECORDINGS_DIR).join(file))?;
        self.chain.check(file, &data)?;
        Ok(data)
    }

    /// Write the store metadata and the chain.
    fn flush(&self) -> Result<(), StoreError> {
        write_json(&self.root.join(META_FILE), &self.meta)?;
        write_json(&self.root.join(INTEGRITY_DIR).join(CHAIN_FILE), &self.chain)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    Ok(serde_json::from_reader(File::open(path)?)?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    serde_json::to_writer_pretty(File::create(path)?, value)?;
    Ok(())
}

fn encode_sidecar(meta: &RecordingMeta) -> Result<Vec<u8>, StoreError> {
    let mut out = Vec::new();
    ciborium::into_writer(meta, &mut out).map_err(|e| StoreError::Cbor(e.to_string()))?;
    Ok(out)
}

fn decode_sidecar(data: &[u8]) -> Result<RecordingMeta, StoreError> {
    ciborium::from_reader(data).map_err(|e| StoreError::Cbor(e.to_string()))
}

fn compress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut encoder = zstd::Encoder::new(Vec::new(), ZSTD_LEVEL)?;
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn decompress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut out = Vec::new();
    zstd::Decoder::new(data)?.read_to_end(&mut out)?;
    Ok(out)
}

fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use saberline_kernel::{RecordingFrame, RecordingWriter};

    fn recording(frames: usize) -> Recording {
        let mut writer = RecordingWriter::new();
        for i in 0..frames {
            let mut frame = RecordingFrame {
                time: i as f64 / 72.0,
                ..Default::default()
            };
            frame.player.controllers[0].position.x = (i as f64).sin();
            writer.push(&frame);
        }
        writer.finish()
    }

    fn meta(frames: u64) -> RecordingMeta {
        RecordingMeta {
            level: "demo:8".into(),
            play_type: "standard".into(),
            difficulty: Some("Expert".into()),
            config: SessionConfig::default(),
            tick_seconds: Some(1.0 / 72.0),
            frame_count: frames,
            cut_count: 3,
        }
    }

    #[test]
    fn open_lays_out_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordingStore::open(tmp.path().join("recs")).unwrap();
        assert_eq!(store.recording_count(), 0);
        assert!(store.root().join(RECORDINGS_DIR).is_dir());
        assert!(store.root().join(INTEGRITY_DIR).join(CHAIN_FILE).is_file());
        assert_eq!(store.meta().store_schema_version, STORE_SCHEMA_VERSION);
    }

    #[test]
    fn reopened_store_returns_bit_exact_samples() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("recs");
        let rec = recording(1500);
        {
            let mut store = RecordingStore::open(&path).unwrap();
            assert_eq!(store.save(&rec, &meta(1500)).unwrap(), 1);
        }

        let store = RecordingStore::open(&path).unwrap();
        let (loaded, loaded_meta) = store.load_latest().unwrap();
        assert_eq!(loaded.frame_count(), 1500);
        assert!(
            loaded
                .samples()
                .iter()
                .zip(rec.samples())
                .all(|(a, b)| a.to_bits() == b.to_bits())
        );
        assert_eq!(loaded_meta, meta(1500));
        store.verify_integrity().unwrap();
    }

    #[test]
    fn ids_count_from_one() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = RecordingStore::open(tmp.path().join("recs")).unwrap();
        assert_eq!(store.save(&recording(2), &meta(2)).unwrap(), 1);
        assert_eq!(store.save(&recording(3), &meta(3)).unwrap(), 2);
        assert_eq!(store.load(1).unwrap().0.frame_count(), 2);
        assert_eq!(store.load_meta(2).unwrap().frame_count, 3);
        assert!(matches!(store.load(3), Err(StoreError::NotFound(3))));
        assert!(matches!(store.load(0), Err(StoreError::NotFound(0))));
        // Two files per recording, each linked to the one before.
        assert_eq!(store.chain().links.len(), 4);
        assert_eq!(store.chain().links[0].prev, None);
        assert_eq!(
            store.chain().links[3].prev.as_deref(),
            Some(store.chain().links[2].sha256.as_str())
        );
    }

    #[test]
    fn empty_store_has_no_latest() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RecordingStore::open(tmp.path().join("recs")).unwrap();
        assert!(matches!(store.load_latest(), Err(StoreError::NoRecordings)));
    }

    #[test]
    fn modified_recording_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("recs");
        let mut store = RecordingStore::open(&path).unwrap();
        store.save(&recording(10), &meta(10)).unwrap();

        let file = path.join(RECORDINGS_DIR).join(recording_file(1));
        let mut data = std::fs::read(&file).unwrap();
        if let Some(byte) = data.last_mut() {
            *byte ^= 0xff;
        }
        std::fs::write(&file, &data).unwrap();

        let store = RecordingStore::open(&path).unwrap();
        assert!(matches!(store.verify_integrity(), Err(StoreError::Tampered { .. })));
        assert!(matches!(store.load(1), Err(StoreError::Tampered { .. })));
        // The sidecar is untouched and still loads.
        assert_eq!(store.load_meta(1).unwrap().frame_count, 10);
    }

    #[test]
    fn relinked_chain_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("recs");
        let mut store = RecordingStore::open(&path).unwrap();
        store.save(&recording(4), &meta(4)).unwrap();

        let chain_path = path.join(INTEGRITY_DIR).join(CHAIN_FILE);
        let mut chain: HashChain = read_json(&chain_path).unwrap();
        chain.links[1].prev = None;
        write_json(&chain_path, &chain).unwrap();

        let store = RecordingStore::open(&path).unwrap();
        assert!(matches!(store.verify_integrity(), Err(StoreError::BrokenChain { .. })));
    }

    #[test]
    fn wire_version_mismatch_fails_open() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("recs");
        RecordingStore::open(&path).unwrap();

        let meta_path = path.join(META_FILE);
        let mut meta: StoreMeta = read_json(&meta_path).unwrap();
        meta.wire_format_version = 7;
        write_json(&meta_path, &meta).unwrap();

        match RecordingStore::open(&path) {
            Err(StoreError::SchemaMismatch { what, found, expected }) => {
                assert_eq!(what, "wire format");
                assert_eq!(found, 7);
                assert_eq!(expected, WIRE_FORMAT_VERSION);
            }
            Err(e) => panic!("expected SchemaMismatch, got: {e}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }
}
