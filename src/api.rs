//! Public data model shared by the endpoint, the client and the transports.
//!
//! This module groups the value model, addressing, the wire codec and error
//! definitions so downstream crates can speak the protocol without pulling in
//! the endpoint or network implementation.

pub mod address;
pub mod codec;
pub mod error;
pub mod types;

pub mod prelude {
    pub use super::address::Address;
    pub use super::error::{ErrorCode, StoreError, StoreResult};
    pub use super::types::*;
}
