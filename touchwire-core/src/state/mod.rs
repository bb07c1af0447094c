pub mod connection;
mod pending;

pub use connection::{ConnectStage, ConnectionState};
pub use pending::{PendingRequest, PendingSlot, Reply, ReplySender, classify_reply};
