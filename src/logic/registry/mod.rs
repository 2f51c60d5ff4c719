//! Registry Module - Persisted Model Artifacts
//!
//! Maps (family, crop type) to one artifact file inside an explicit storage
//! directory.
//!
//! # Write discipline
//! - One writer per key at a time (per-key lock); different keys write concurrently
//! - Writes go to a temp file in the same directory, then rename over the target,
//!   so readers see the old file, no file, or the new file, never a partial one
//! - Reads take no lock

pub mod artifact;


use std::collections::HashMap;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

pub use artifact::{ArtifactFile, ArtifactHeader, ArtifactInfo, ArtifactKey, ArtifactName};
use crate::logic::error::{CoreError, CoreResult};
use crate::logic::model::{ModelFamily, TrainedModel};

pub struct ModelRegistry {
    root: PathBuf,
    write_locks: Mutex<HashMap<ArtifactKey, Arc<Mutex<()>>>>,
}

impl ModelRegistry {
    /// Registry over `root`. The directory is created lazily on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact_path(&self, family: ModelFamily, crop_type: &str) -> PathBuf {
        self.root.join(ArtifactKey::new(family, crop_type).file_name())
    }

    /// True iff an artifact file for the key is present
    pub fn exists(&self, family: ModelFamily, crop_type: &str) -> bool {
        self.artifact_path(family, crop_type).is_file()
    }

    /// Load and verify an artifact. `ArtifactNotFound` if absent.
    pub fn load(&self, family: ModelFamily, crop_type: &str) -> CoreResult<TrainedModel> {
        let key = ArtifactKey::new(family, crop_type);
        let path = self.root.join(key.file_name());

        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CoreError::ArtifactNotFound {
                    family: family.to_string(),
                    crop_type: crop_type.to_string(),
                });
            }
            Err(e) => {
                return Err(CoreError::Storage(format!("{}: {}", path.display(), e)));
            }
        };

        let file: ArtifactFile = serde_json::from_slice(&data)
            .map_err(|e| CoreError::Storage(format!("{}: corrupt artifact: {}", path.display(), e)))?;
        file.verify(&key)?;

        log::debug!("Loaded artifact {} ({} samples)", key.file_name(), file.n_samples);
        Ok(file.model)
    }

    /// Persist (overwrite) the artifact for a key
    pub fn save(
        &self,
        family: ModelFamily,
        crop_type: &str,
        model: &TrainedModel,
        n_samples: usize,
    ) -> CoreResult<()> {
        let key = ArtifactKey::new(family, crop_type);
        let lock = self.key_lock(&key);
        let _guard = lock.lock();

        fs::create_dir_all(&self.root)
            .map_err(|e| CoreError::Storage(format!("{}: {}", self.root.display(), e)))?;

        let file = ArtifactFile::new(&key, model.clone(), n_samples)?;
        let target = self.root.join(key.file_name());

        let mut temp = tempfile::NamedTempFile::new_in(&self.root)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer(&mut writer, &file)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&target)
            .map_err(|e| CoreError::Storage(format!("{}: {}", target.display(), e.error)))?;

        log::debug!("Saved artifact {}", key.file_name());
        Ok(())
    }

    /// Delete one artifact. Ok(false) if it was not there.
    pub fn remove(&self, family: ModelFamily, crop_type: &str) -> CoreResult<bool> {
        let key = ArtifactKey::new(family, crop_type);
        let lock = self.key_lock(&key);
        let _guard = lock.lock();

        match fs::remove_file(self.root.join(key.file_name())) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// All artifacts in the storage directory, sorted by file name
    pub fn list(&self) -> CoreResult<Vec<ArtifactInfo>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut infos = Vec::new();
        for entry in entries.filter_map(|e| e.ok()) {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let key = match ArtifactName::parse(name) {
                Some(ArtifactName::Exact(key)) => key,
                Some(ArtifactName::Hashed { family }) => match read_header(&entry.path()) {
                    Some(header) if header.family == family => ArtifactKey::new(family, &header.crop_type),
                    _ => {
                        log::warn!("Skipping unreadable artifact {}", name);
                        continue;
                    }
                },
                None => continue,
            };

            infos.push(ArtifactInfo {
                family: key.family,
                crop_type: key.crop_type,
                file_name: name.to_string(),
                size_bytes: entry.metadata().map(|m| m.len()).unwrap_or(0),
            });
        }

        infos.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(infos)
    }

    /// Delete every artifact. Returns the number removed.
    pub fn clear(&self) -> CoreResult<usize> {
        let mut removed = 0;
        for info in self.list()? {
            if self.remove(info.family, &info.crop_type)? {
                removed += 1;
            }
        }
        log::info!("Cleared {} model artifacts from {}", removed, self.root.display());
        Ok(removed)
    }

    fn key_lock(&self, key: &ArtifactKey) -> Arc<Mutex<()>> {
        self.write_locks
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

fn read_header(path: &Path) -> Option<ArtifactHeader> {
    let data = fs::read(path).ok()?;
    serde_json::from_slice(&data).ok()
}
