use std::path::Path;

use crate::audio::features::FeatureRecord;
use crate::error::ReportError;

/// Column order of the CSV report
pub const HEADER: [&str; 7] = [
    "Song",
    "Key",
    "RMSE",
    "Dynamic Range",
    "Spectral Centroid",
    "Spectral Bandwidth",
    "Tempo",
];

/// Rows in file-processing order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReportTable {
    records: Vec<FeatureRecord>,
}

impl ReportTable {
    pub fn push(&mut self, record: FeatureRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[FeatureRecord] {
        &self.records
    }
}

/// Create or truncate `path` and write the header plus one row per record.
///
/// The header is written even when the table is empty.
pub fn write_report(table: &ReportTable, path: &Path) -> Result<(), ReportError> {
    let write_err = |source: csv::Error| ReportError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(write_err)?;

    writer.write_record(HEADER).map_err(write_err)?;
    for record in table.records() {
        writer.serialize(record).map_err(write_err)?;
    }
    writer.flush().map_err(|e| write_err(e.into()))?;

    log::debug!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

/// Parse a report written by `write_report` back into a table.
#[cfg(test)]
pub fn read_report(path: &Path) -> Result<ReportTable, ReportError> {
    let read_err = |source: csv::Error| ReportError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(read_err)?;
    let mut table = ReportTable::default();
    for row in reader.deserialize::<FeatureRecord>() {
        table.push(row.map_err(read_err)?);
    }
    Ok(table)
}
