//! Persistent cache tier.
//!
//! Records are content-addressed: the file name is the hex SHA-256 of the
//! logical cache key. Each file holds a serialized envelope
//! `{ data, created_at, expires_at }`, optionally gzip-compressed as a whole.
//! Writes go to a temp file which is renamed into place, so a reader never
//! observes a partially written record.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

const CACHE_EXTENSION: &str = "cache";
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Persisted record envelope. Timestamps are epoch seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub data: Value,
    pub created_at: u64,
    pub expires_at: u64,
}

pub(crate) fn epoch_secs(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// File-backed cache tier under a single directory.
#[derive(Debug)]
pub struct DiskTier {
    dir: PathBuf,
    compression: bool,
}

impl DiskTier {
    /// Open (creating if needed) a disk tier rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>, compression: bool) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, compression })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn compression_enabled(&self) -> bool {
        self.compression
    }

    fn record_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{digest:x}.{CACHE_EXTENSION}"))
    }

    /// Read a record, enforcing TTL lazily.
    ///
    /// Expired or unreadable records are removed and reported as a miss;
    /// per-record I/O failures never abort the caller.
    pub fn read(&self, key: &str) -> Option<Envelope> {
        let path = self.record_path(key);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read cache record, treating as miss");
                return None;
            }
        };

        let bytes = if raw.starts_with(&GZIP_MAGIC) {
            let mut decoder = GzDecoder::new(raw.as_slice());
            let mut out = Vec::new();
            if let Err(e) = decoder.read_to_end(&mut out) {
                warn!(key = %key, error = %e, "Corrupt compressed cache record, removing");
                let _ = fs::remove_file(&path);
                return None;
            }
            out
        } else {
            raw
        };

        let envelope: Envelope = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(key = %key, error = %e, "Corrupt cache record, removing");
                let _ = fs::remove_file(&path);
                return None;
            }
        };

        if epoch_secs(SystemTime::now()) > envelope.expires_at {
            debug!(key = %key, "Cache record expired, removing");
            let _ = fs::remove_file(&path);
            return None;
        }

        Some(envelope)
    }

    /// Atomically write a record: serialize to a temp file in the cache
    /// directory, then rename over the final path.
    pub fn write(&self, key: &str, envelope: &Envelope) -> io::Result<()> {
        let bytes = serde_json::to_vec(envelope)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let bytes = if self.compression {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&bytes)?;
            encoder.finish()?
        } else {
            bytes
        };

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&bytes)?;
        tmp.flush()?;
        tmp.persist(self.record_path(key)).map_err(|e| e.error)?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.record_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Remove every record in the tier.
    pub fn clear(&self) -> io::Result<()> {
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == CACHE_EXTENSION) {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Sweep the whole tier, removing expired records.
    ///
    /// Returns the number of records removed. Intended for periodic
    /// invocation, not per-request.
    pub fn cleanup(&self) -> io::Result<usize> {
        let now = epoch_secs(SystemTime::now());
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.extension().is_some_and(|e| e == CACHE_EXTENSION) {
                continue;
            }
            let Ok(raw) = fs::read(&path) else { continue };
            let bytes = if raw.starts_with(&GZIP_MAGIC) {
                let mut decoder = GzDecoder::new(raw.as_slice());
                let mut out = Vec::new();
                if decoder.read_to_end(&mut out).is_err() {
                    continue;
                }
                out
            } else {
                raw
            };
            let Ok(envelope) = serde_json::from_slice::<Envelope>(&bytes) else {
                continue;
            };
            if now > envelope.expires_at && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(data: Value, ttl_secs: u64) -> Envelope {
        let now = epoch_secs(SystemTime::now());
        Envelope {
            data,
            created_at: now,
            expires_at: now + ttl_secs,
        }
    }

    #[test]
    fn test_write_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let tier = DiskTier::open(dir.path(), false).unwrap();
        tier.write("k", &envelope(json!({"a": 1}), 60)).unwrap();
        let back = tier.read("k").unwrap();
        assert_eq!(back.data, json!({"a": 1}));
    }

    #[test]
    fn test_compressed_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let tier = DiskTier::open(dir.path(), true).unwrap();
        tier.write("k", &envelope(json!("v".repeat(512)), 60)).unwrap();
        assert_eq!(tier.read("k").unwrap().data, json!("v".repeat(512)));
    }

    #[test]
    fn test_expired_record_is_miss_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let tier = DiskTier::open(dir.path(), false).unwrap();
        let now = epoch_secs(SystemTime::now());
        tier.write(
            "k",
            &Envelope {
                data: json!(1),
                created_at: now.saturating_sub(120),
                expires_at: now.saturating_sub(60),
            },
        )
        .unwrap();
        assert!(tier.read("k").is_none());
        // second read hits the removed file path
        assert!(tier.read("k").is_none());
    }

    #[test]
    fn test_corrupt_record_is_miss() {
        let dir = tempfile::tempdir().unwrap();
        let tier = DiskTier::open(dir.path(), false).unwrap();
        tier.write("k", &envelope(json!(1), 60)).unwrap();
        // overwrite the record file with garbage
        let digest = Sha256::digest("k".as_bytes());
        let path = dir.path().join(format!("{digest:x}.cache"));
        fs::write(&path, b"not json").unwrap();
        assert!(tier.read("k").is_none());
    }

    #[test]
    fn test_cleanup_counts_only_expired() {
        let dir = tempfile::tempdir().unwrap();
        let tier = DiskTier::open(dir.path(), false).unwrap();
        let now = epoch_secs(SystemTime::now());
        tier.write("live", &envelope(json!(1), 60)).unwrap();
        tier.write(
            "dead",
            &Envelope {
                data: json!(2),
                created_at: now.saturating_sub(120),
                expires_at: now.saturating_sub(60),
            },
        )
        .unwrap();

        assert_eq!(tier.cleanup().unwrap(), 1);
        assert!(tier.read("live").is_some());
    }

    #[test]
    fn test_clear_removes_all_records() {
        let dir = tempfile::tempdir().unwrap();
        let tier = DiskTier::open(dir.path(), false).unwrap();
        tier.write("a", &envelope(json!(1), 60)).unwrap();
        tier.write("b", &envelope(json!(2), 60)).unwrap();
        tier.clear().unwrap();
        assert!(tier.read("a").is_none());
        assert!(tier.read("b").is_none());
    }
}
