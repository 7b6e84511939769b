/// CSV loading into dated numeric columns.
pub mod frame;

/// Sliding input/target windows over one column.
pub mod dataset;

/// Batching of windows for training.
pub mod loader;

pub use dataset::{window_count, SequenceDataset, Window};
pub use frame::TimeSeriesFrame;
pub use loader::{DataLoader, WindowBatch};
