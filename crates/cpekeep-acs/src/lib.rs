// cpekeep-acs: Async client for the northbound interface of a TR-069 ACS

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::{BasicAuth, NbiClient};
pub use error::Error;
pub use models::{ParameterValue, Task, TaskAck, WireType};
pub use transport::{TlsMode, TransportConfig};
