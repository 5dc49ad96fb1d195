use std::io::Write;

use anyhow::{bail, Result};
use serde::Serialize;

use crate::application::PointService;
use crate::domain::{AccountId, PointHistory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => bail!("Unknown export format: {}. Use csv or json", other),
        }
    }
}

/// One exported page of an account's history.
#[derive(Debug, Serialize)]
struct HistoryPage<'a> {
    account_id: AccountId,
    offset: usize,
    records: &'a [PointHistory],
}

/// Writes an account's history to CSV or JSON.
pub struct HistoryExporter<'a> {
    service: &'a PointService,
}

impl<'a> HistoryExporter<'a> {
    pub fn new(service: &'a PointService) -> Self {
        Self { service }
    }

    /// Export one page of history, most recent first. Returns the number of
    /// records written.
    pub fn export<W: Write>(
        &self,
        account_id: AccountId,
        offset: usize,
        limit: usize,
        format: ExportFormat,
        writer: W,
    ) -> Result<usize> {
        let records = self.service.history(account_id, offset, limit)?;
        match format {
            ExportFormat::Csv => write_csv(&records, writer)?,
            ExportFormat::Json => {
                let page = HistoryPage {
                    account_id,
                    offset,
                    records: &records,
                };
                write_json(&page, writer)?
            }
        }
        Ok(records.len())
    }
}

fn write_csv<W: Write>(records: &[PointHistory], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record(["id", "user_id", "amount", "kind", "timestamp_millis"])?;
    for record in records {
        csv_writer.write_record(&[
            record.id.to_string(),
            record.account_id.to_string(),
            record.amount.to_string(),
            record.kind.as_str().to_string(),
            record.timestamp_millis.to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

fn write_json<W: Write, T: Serialize>(value: &T, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    Ok(())
}
