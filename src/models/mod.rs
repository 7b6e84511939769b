/// Stacked LSTM layers with backpropagation through time.
pub mod lstm_network;

/// LSTM stack plus linear head: window batch in, scalar predictions out.
pub mod predictor;
