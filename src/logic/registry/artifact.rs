use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::logic::error::{CoreError, CoreResult};
use crate::logic::model::{ModelFamily, TrainedModel};

/// Bump when the envelope or model encoding changes incompatibly
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

pub const ARTIFACT_EXTENSION: &str = "json";

const NAME_SEPARATOR: &str = "_model_crop_";

/// Longest escaped crop kept verbatim in a file name. Longer names are cut
/// and suffixed with `~` + a hash, keeping file names under the usual
/// 255-byte limit.
pub const MAX_ESCAPED_CROP_LEN: usize = 160;

const HASHED_PREFIX_LEN: usize = 96;
const HASH_MARKER: char = '~';

// ============================================================================
// KEY
// ============================================================================

/// (family, crop type) identity of one artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ArtifactKey {
    pub family: ModelFamily,
    pub crop_type: String,
}

impl ArtifactKey {
    pub fn new(family: ModelFamily, crop_type: &str) -> Self {
        Self {
            family,
            crop_type: crop_type.to_string(),
        }
    }

    /// `{Family}_model_crop_{escaped crop}.json`, or
    /// `{Family}_model_crop_{prefix}~{hash}.json` for very long crop names
    pub fn file_name(&self) -> String {
        let mut escaped = escape_crop(&self.crop_type);
        if escaped.len() > MAX_ESCAPED_CROP_LEN {
            let digest = hex::encode(Sha256::digest(self.crop_type.as_bytes()));
            // Escaped text is ASCII, any byte index is a char boundary
            escaped.truncate(HASHED_PREFIX_LEN);
            escaped.push(HASH_MARKER);
            escaped.push_str(&digest[..32]);
        }
        format!(
            "{}{}{}.{}",
            self.family.as_str(),
            NAME_SEPARATOR,
            escaped,
            ARTIFACT_EXTENSION
        )
    }

    /// Inverse of `file_name`. None for foreign files and for hashed names,
    /// whose crop type lives only inside the file.
    pub fn from_file_name(name: &str) -> Option<Self> {
        match ArtifactName::parse(name)? {
            ArtifactName::Exact(key) => Some(key),
            ArtifactName::Hashed { .. } => None,
        }
    }
}

/// What a file name in the storage directory says about its artifact
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactName {
    Exact(ArtifactKey),
    /// Long crop name; read the envelope for the crop type
    Hashed { family: ModelFamily },
}

impl ArtifactName {
    pub fn parse(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(&format!(".{}", ARTIFACT_EXTENSION))?;
        let (family, crop) = stem.split_once(NAME_SEPARATOR)?;
        let family: ModelFamily = family.parse().ok()?;

        if let Some((prefix, digest)) = crop.split_once(HASH_MARKER) {
            let well_formed = prefix.len() == HASHED_PREFIX_LEN
                && digest.len() == 32
                && digest.bytes().all(|b| b.is_ascii_hexdigit());
            return well_formed.then_some(ArtifactName::Hashed { family });
        }

        Some(ArtifactName::Exact(ArtifactKey {
            family,
            crop_type: unescape_crop(crop)?,
        }))
    }
}

/// Keep ASCII alphanumerics and '-', hex-escape every other byte as `_XX`.
/// Injective, and the result never contains path separators.
pub fn escape_crop(crop: &str) -> String {
    let mut out = String::with_capacity(crop.len());
    for byte in crop.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push('_');
            out.push_str(&hex::encode([byte]));
        }
    }
    out
}

pub fn unescape_crop(escaped: &str) -> Option<String> {
    let bytes = escaped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'_' {
            let pair = escaped.get(i + 1..i + 3)?;
            let decoded = hex::decode(pair).ok()?;
            out.extend_from_slice(&decoded);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

// ============================================================================
// FILE ENVELOPE
// ============================================================================

/// On-disk artifact: metadata + checksum + model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactFile {
    pub format_version: u32,
    pub family: ModelFamily,
    pub crop_type: String,
    pub trained_at: DateTime<Utc>,
    pub n_samples: usize,
    /// SHA-256 (hex) of the serialized model
    pub checksum: String,
    pub model: TrainedModel,
}

impl ArtifactFile {
    pub fn new(key: &ArtifactKey, model: TrainedModel, n_samples: usize) -> CoreResult<Self> {
        let checksum = model_checksum(&model)?;
        Ok(Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            family: key.family,
            crop_type: key.crop_type.clone(),
            trained_at: Utc::now(),
            n_samples,
            checksum,
            model,
        })
    }

    /// Reject foreign-version, mismatched-key or tampered artifacts
    pub fn verify(&self, key: &ArtifactKey) -> CoreResult<()> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(CoreError::Storage(format!(
                "Artifact format v{} not supported (expected v{})",
                self.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        if self.family != key.family || self.crop_type != key.crop_type {
            return Err(CoreError::Storage(format!(
                "Artifact key mismatch: file holds {} / '{}', expected {} / '{}'",
                self.family, self.crop_type, key.family, key.crop_type
            )));
        }
        let actual = model_checksum(&self.model)?;
        if actual != self.checksum {
            return Err(CoreError::Storage(format!(
                "Artifact checksum mismatch for {} / '{}'",
                key.family, key.crop_type
            )));
        }
        Ok(())
    }
}

/// Key fields of an envelope, read without verifying the model
#[derive(Debug, Deserialize)]
pub struct ArtifactHeader {
    pub family: ModelFamily,
    pub crop_type: String,
}

/// Listing entry
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactInfo {
    pub family: ModelFamily,
    pub crop_type: String,
    pub file_name: String,
    pub size_bytes: u64,
}

fn model_checksum(model: &TrainedModel) -> CoreResult<String> {
    let bytes = serde_json::to_vec(model)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}
