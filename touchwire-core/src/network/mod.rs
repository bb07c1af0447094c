pub mod connection;

pub use connection::{ConnectionEvent, DaemonConnection};
