pub mod classifier;
pub mod commands;
pub mod handlers;
pub mod reconciler;
pub mod refund_aggregator;
pub mod signature;
