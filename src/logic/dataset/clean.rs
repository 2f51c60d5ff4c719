use std::collections::{HashMap, HashSet};

use super::record::{CropRecord, FEATURE_COUNT};

/// Rows with any |z| above this are dropped
pub const OUTLIER_Z_LIMIT: f64 = 3.0;

const COLUMN_COUNT: usize = FEATURE_COUNT + 1;

/// Drop exact duplicate rows, keeping the first occurrence
pub fn dedup(records: Vec<CropRecord>) -> Vec<CropRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    let mut keep = Vec::with_capacity(records.len());

    for (idx, record) in records.iter().enumerate() {
        if seen.insert(record.dedup_key()) {
            keep.push(idx);
        }
    }

    select(records, &keep)
}

/// Per crop-type z-score filter over features and target.
///
/// Partitions with fewer than 2 rows pass through unchanged, and a column
/// with zero deviation never marks a row as an outlier. Output keeps input order.
pub fn remove_outliers(records: Vec<CropRecord>) -> Vec<CropRecord> {
    let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, record) in records.iter().enumerate() {
        groups.entry(record.crop_type.as_str()).or_default().push(idx);
    }

    let mut drop = vec![false; records.len()];
    for (crop, indices) in &groups {
        if indices.len() < 2 {
            continue;
        }

        let stats = column_stats(&records, indices);
        let mut dropped = 0usize;
        for &idx in indices {
            let values = records[idx].numeric_columns();
            let is_outlier = values.iter().zip(stats.iter()).any(|(&v, &(mean, std))| {
                std > 0.0 && ((v - mean) / std).abs() > OUTLIER_Z_LIMIT
            });
            if is_outlier {
                drop[idx] = true;
                dropped += 1;
            }
        }

        if dropped > 0 {
            log::debug!("Crop '{}': removed {} outlier rows of {}", crop, dropped, indices.len());
        }
    }

    let keep: Vec<usize> = (0..records.len()).filter(|&i| !drop[i]).collect();
    select(records, &keep)
}

/// (mean, population std) for each numeric column of the given rows
fn column_stats(records: &[CropRecord], indices: &[usize]) -> [(f64, f64); COLUMN_COUNT] {
    let n = indices.len() as f64;
    let mut stats = [(0.0f64, 0.0f64); COLUMN_COUNT];

    for col in 0..COLUMN_COUNT {
        let mean = indices
            .iter()
            .map(|&i| records[i].numeric_columns()[col])
            .sum::<f64>()
            / n;
        let variance = indices
            .iter()
            .map(|&i| (records[i].numeric_columns()[col] - mean).powi(2))
            .sum::<f64>()
            / n;
        stats[col] = (mean, variance.sqrt());
    }

    stats
}

fn select(records: Vec<CropRecord>, keep: &[usize]) -> Vec<CropRecord> {
    if keep.len() == records.len() {
        return records;
    }
    let mut wanted = keep.iter().copied().peekable();
    records
        .into_iter()
        .enumerate()
        .filter_map(|(idx, record)| {
            if wanted.peek() == Some(&idx) {
                wanted.next();
                Some(record)
            } else {
                None
            }
        })
        .collect()
}
