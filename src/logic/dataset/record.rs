use serde::{Deserialize, Serialize};

/// Number of input features fed to every model
pub const FEATURE_COUNT: usize = 3;

/// Canonical feature names, in model column order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = ["rainfall", "temperature", "ph"];

/// Column headers expected in the source file
pub const SOURCE_COLUMNS: [&str; 5] = ["Rainfall", "Temperature", "Ph", "Crop", "Production"];

/// One cleaned dataset row, canonical names
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CropRecord {
    pub rainfall: f64,
    pub temperature: f64,
    pub ph: f64,
    pub crop_type: String,
    #[serde(rename = "yield")]
    pub yield_value: f64,
}

impl CropRecord {
    pub fn new(crop_type: &str, rainfall: f64, temperature: f64, ph: f64, yield_value: f64) -> Self {
        Self {
            rainfall,
            temperature,
            ph,
            crop_type: crop_type.to_string(),
            yield_value,
        }
    }

    /// Feature vector in `FEATURE_NAMES` order
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [self.rainfall, self.temperature, self.ph]
    }

    /// Numeric columns checked by the outlier filter (features + target)
    pub(crate) fn numeric_columns(&self) -> [f64; FEATURE_COUNT + 1] {
        [self.rainfall, self.temperature, self.ph, self.yield_value]
    }

    /// Exact-equality key used for duplicate removal
    pub(crate) fn dedup_key(&self) -> (u64, u64, u64, u64, &str) {
        (
            normalize_bits(self.rainfall),
            normalize_bits(self.temperature),
            normalize_bits(self.ph),
            normalize_bits(self.yield_value),
            self.crop_type.as_str(),
        )
    }
}

/// Row as it appears in the source CSV
#[derive(Deserialize, Debug, Clone)]
pub(crate) struct SourceRow {
    #[serde(rename = "Rainfall")]
    pub rainfall: f64,
    #[serde(rename = "Temperature")]
    pub temperature: f64,
    #[serde(rename = "Ph")]
    pub ph: f64,
    #[serde(rename = "Crop")]
    pub crop: String,
    #[serde(rename = "Production")]
    pub production: f64,
}

impl From<SourceRow> for CropRecord {
    fn from(row: SourceRow) -> Self {
        Self {
            rainfall: row.rainfall,
            temperature: row.temperature,
            ph: row.ph,
            crop_type: row.crop.trim().to_string(),
            yield_value: row.production,
        }
    }
}

// -0.0 and 0.0 compare equal, so they must dedup together
fn normalize_bits(v: f64) -> u64 {
    if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() }
}
