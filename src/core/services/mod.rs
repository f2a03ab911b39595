pub mod classifier;
pub mod incoming;
pub mod outgoing;
