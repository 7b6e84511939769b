/// Batched LSTM cell.
pub mod lstm_cell;

/// Fully connected projection.
pub mod linear;
