//! Primitive types shared across the zkpay coordinator.
//!
//! Everything in here is plain data: fixed-size buffers, chain-tagged
//! addresses, canonical token amounts, and the boot-time token-key registry.
//! No I/O, no async.

pub mod address;
pub mod amount;
pub mod buf;
pub mod errors;
pub mod slip44;
pub mod token;

pub mod prelude {
    pub use crate::{
        address::UniversalAddress,
        amount::Amount,
        buf::Buf32,
        errors::PrimitivesError,
    };
}
