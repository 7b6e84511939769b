use crate::data::frame::TimeSeriesFrame;
use crate::error::{Error, Result};

/// Number of windows a series of `series_len` points yields: `max(0, L - s - p + 1)`
pub fn window_count(series_len: usize, sequence_length: usize, pred_length: usize) -> usize {
    (series_len + 1).saturating_sub(sequence_length + pred_length)
}

/// One training example: `sequence_length` consecutive observations and the
/// observation right after them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window<'a> {
    pub input: &'a [f64],
    pub target: f64,
}

/// Turns one numeric column into fixed-length input/target windows.
///
/// Window `i` covers `[i, i + sequence_length)` and targets element
/// `i + sequence_length`. `pred_length` only reduces the number of windows so
/// that the last `pred_length` points are never used as a window start.
#[derive(Debug, Clone)]
pub struct SequenceDataset {
    series: Vec<f64>,
    sequence_length: usize,
    pred_length: usize,
}

impl SequenceDataset {
    pub fn new(series: Vec<f64>, sequence_length: usize, pred_length: usize) -> Result<Self> {
        if sequence_length == 0 || pred_length == 0 {
            return Err(Error::InvalidConfiguration(format!(
                "sequence_length ({}) and pred_length ({}) must be at least 1",
                sequence_length, pred_length
            )));
        }
        if window_count(series.len(), sequence_length, pred_length) == 0 {
            return Err(Error::InvalidConfiguration(format!(
                "series of length {} is too short for sequence_length {} + pred_length {}",
                series.len(),
                sequence_length,
                pred_length
            )));
        }

        Ok(SequenceDataset {
            series,
            sequence_length,
            pred_length,
        })
    }

    /// Windows over the `column` of a loaded frame
    pub fn from_frame(frame: &TimeSeriesFrame, column: &str, sequence_length: usize, pred_length: usize) -> Result<Self> {
        let series = frame.column(column)?.to_vec();
        Self::new(series, sequence_length, pred_length)
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    pub fn pred_length(&self) -> usize {
        self.pred_length
    }

    pub fn series(&self) -> &[f64] {
        &self.series
    }

    pub fn len(&self) -> usize {
        window_count(self.series.len(), self.sequence_length, self.pred_length)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Random access to window `index`, `None` past the end
    pub fn get(&self, index: usize) -> Option<Window<'_>> {
        if index >= self.len() {
            return None;
        }
        let end = index + self.sequence_length;
        Some(Window {
            input: &self.series[index..end],
            target: self.series[end],
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Window<'_>> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn test_window_count_formula() {
        assert_eq!(window_count(10, 4, 1), 6);
        assert_eq!(window_count(10, 4, 3), 4);
        assert_eq!(window_count(5, 4, 1), 1);
        assert_eq!(window_count(4, 4, 1), 0);
        assert_eq!(window_count(2, 4, 1), 0);
    }

    #[test]
    fn test_windows_and_targets() {
        let dataset = SequenceDataset::new(series(10), 4, 1).unwrap();
        assert_eq!(dataset.len(), 6);

        for i in 0..dataset.len() {
            let window = dataset.get(i).unwrap();
            let expected: Vec<f64> = (i..i + 4).map(|v| v as f64).collect();
            assert_eq!(window.input, expected.as_slice());
            assert_eq!(window.target, (i + 4) as f64);
        }
        assert!(dataset.get(6).is_none());
    }

    #[test]
    fn test_pred_length_only_shrinks_count() {
        let dataset = SequenceDataset::new(series(10), 3, 2).unwrap();
        assert_eq!(dataset.len(), 6);
        let last = dataset.get(5).unwrap();
        assert_eq!(last.input, &[5.0, 6.0, 7.0]);
        assert_eq!(last.target, 8.0);
        assert_eq!(dataset.iter().count(), 6);
    }

    #[test]
    fn test_too_short_series_is_invalid() {
        assert!(matches!(SequenceDataset::new(series(4), 4, 1), Err(Error::InvalidConfiguration(_))));
        assert!(matches!(SequenceDataset::new(series(10), 0, 1), Err(Error::InvalidConfiguration(_))));
        assert!(matches!(SequenceDataset::new(series(10), 2, 0), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_from_frame_unknown_column() {
        let frame = TimeSeriesFrame::from_reader("date,top 1\n2021-01-01,1\n".as_bytes(), "date", &[]).unwrap();
        assert!(matches!(
            SequenceDataset::from_frame(&frame, "top 2", 1, 1),
            Err(Error::UnknownSeriesName { .. })
        ));
    }
}
