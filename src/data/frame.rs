use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::debug;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{Error, Result};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parse a date cell, accepting plain dates, naive timestamps and RFC 3339.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_utc())
}

/// Dated numeric columns loaded from a CSV file.
///
/// Rows keep file order; empty cells are stored as `NaN`. The frame is never
/// mutated after loading: every transformation returns a new frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesFrame {
    date_column: String,
    dates: Vec<NaiveDateTime>,
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl TimeSeriesFrame {
    /// Build a frame from already parsed parts
    pub fn new(date_column: impl Into<String>, dates: Vec<NaiveDateTime>, names: Vec<String>, columns: Vec<Vec<f64>>) -> Result<Self> {
        if names.len() != columns.len() {
            return Err(Error::shape("frame columns", format!("{} columns", names.len()), format!("{} columns", columns.len())));
        }
        if let Some(bad) = columns.iter().find(|c| c.len() != dates.len()) {
            return Err(Error::shape("frame rows", format!("{} rows", dates.len()), format!("{} rows", bad.len())));
        }
        Ok(TimeSeriesFrame {
            date_column: date_column.into(),
            dates,
            names,
            columns,
        })
    }

    /// Load `value_columns` (or every non-date column when empty) from a CSV file
    pub fn read_csv<P: AsRef<Path>>(path: P, date_column: &str, value_columns: &[&str]) -> Result<Self> {
        let path = path.as_ref();
        debug!("loading {}", path.display());
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), date_column, value_columns)
    }

    pub fn from_reader<R: Read>(reader: R, date_column: &str, value_columns: &[&str]) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader.headers()?.clone();
        let header_names: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();

        let position = |name: &str| -> Result<usize> {
            header_names.iter().position(|h| h == name).ok_or_else(|| Error::UnknownSeriesName {
                name: name.to_string(),
                available: header_names.clone(),
            })
        };

        let date_idx = position(date_column)?;
        let selected: Vec<(String, usize)> = if value_columns.is_empty() {
            header_names
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != date_idx)
                .map(|(i, name)| (name.clone(), i))
                .collect()
        } else {
            value_columns
                .iter()
                .map(|name| position(name).map(|i| (name.to_string(), i)))
                .collect::<Result<_>>()?
        };

        let mut dates = Vec::new();
        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); selected.len()];

        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let row = row + 1;

            let raw_date = record.get(date_idx).unwrap_or("");
            let date = parse_date(raw_date).ok_or_else(|| Error::InvalidDate {
                row,
                value: raw_date.to_string(),
            })?;
            dates.push(date);

            for ((name, idx), column) in selected.iter().zip(columns.iter_mut()) {
                let raw = record.get(*idx).unwrap_or("").trim();
                let value = if raw.is_empty() {
                    f64::NAN
                } else {
                    raw.parse::<f64>().map_err(|_| Error::InvalidValue {
                        row,
                        column: name.clone(),
                        value: raw.to_string(),
                    })?
                };
                column.push(value);
            }
        }

        debug!("loaded {} rows, {} value columns", dates.len(), selected.len());
        let names = selected.into_iter().map(|(name, _)| name).collect();
        Self::new(date_column, dates, names, columns)
    }

    pub fn date_column(&self) -> &str {
        &self.date_column
    }

    pub fn dates(&self) -> &[NaiveDateTime] {
        &self.dates
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Values of a named column, `UnknownSeriesName` when absent
    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
            .ok_or_else(|| Error::UnknownSeriesName {
                name: name.to_string(),
                available: self.names.clone(),
            })
    }

    /// New frame with rows ordered by ascending date (stable for equal dates)
    pub fn sorted_by_date(&self) -> Self {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by_key(|&i| self.dates[i]);
        self.select_rows(&order)
    }

    /// New frame with the last `n` rows (all rows when `n >= len`)
    pub fn tail(&self, n: usize) -> Self {
        let start = self.len().saturating_sub(n);
        let rows: Vec<usize> = (start..self.len()).collect();
        self.select_rows(&rows)
    }

    fn select_rows(&self, rows: &[usize]) -> Self {
        TimeSeriesFrame {
            date_column: self.date_column.clone(),
            dates: rows.iter().map(|&i| self.dates[i]).collect(),
            names: self.names.clone(),
            columns: self
                .columns
                .iter()
                .map(|column| rows.iter().map(|&i| column[i]).collect())
                .collect(),
        }
    }
}
