use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::logic::error::{CoreError, CoreResult};
use super::record::{CropRecord, SourceRow, SOURCE_COLUMNS};

/// Source headers in `CropRecord::numeric_columns` order
const NUMERIC_SOURCE_COLUMNS: [&str; 4] = ["Rainfall", "Temperature", "Ph", "Production"];

/// Read raw rows from a CSV file. No cleaning happens here.
pub fn read_csv(path: &Path) -> CoreResult<Vec<CropRecord>> {
    if !path.exists() {
        return Err(CoreError::DataLoad(format!(
            "Dataset file not found: {}",
            path.display()
        )));
    }

    let file = File::open(path)
        .map_err(|e| CoreError::DataLoad(format!("{}: {}", path.display(), e)))?;

    read_from(file).map_err(|e| match e {
        CoreError::DataLoad(msg) => CoreError::DataLoad(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

/// Read raw rows from any CSV source
pub fn read_from<R: Read>(source: R) -> CoreResult<Vec<CropRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| CoreError::DataLoad(format!("Cannot read header: {}", e)))?
        .clone();

    let missing: Vec<&str> = SOURCE_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(CoreError::DataLoad(format!(
            "Missing required columns: {}",
            missing.join(", ")
        )));
    }

    let mut records = Vec::new();
    for (idx, row) in reader.deserialize::<SourceRow>().enumerate() {
        // +2: header line, 1-based
        let row = row.map_err(|e| CoreError::DataLoad(format!("Malformed row {}: {}", idx + 2, e)))?;
        let record = CropRecord::from(row);

        // csv parses "NaN" / "inf" as floats
        let numeric = record.numeric_columns();
        if let Some(col) = (0..numeric.len()).find(|&i| !numeric[i].is_finite()) {
            return Err(CoreError::DataLoad(format!(
                "Malformed row {}: non-finite value in column {}",
                idx + 2,
                NUMERIC_SOURCE_COLUMNS[col]
            )));
        }
        records.push(record);
    }

    Ok(records)
}
