#![deny(unsafe_code)]

//! Destination side of a conversion: a JSON-lines registry of Gen3 datasets
//! plus optional placement of payload files under the destination root.

pub mod error;
pub mod id;
pub mod registry;
pub mod transfer;

pub use error::WriteError;
pub use id::DatasetId;
pub use registry::{REGISTRY_FILE, RegistryEntry, RegistryWriter, read_entries};
pub use transfer::TransferMode;
