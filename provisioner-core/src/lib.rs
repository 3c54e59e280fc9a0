pub mod admin;
pub mod config;
pub mod errors;
pub mod memory;
pub mod provisioner;
pub mod topic;

pub use admin::*;
pub use config::*;
pub use errors::*;
pub use provisioner::*;
pub use topic::*;
