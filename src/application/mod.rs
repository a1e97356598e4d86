//! Export pipeline and the ports it is driven through.

pub mod cancel;
pub mod error;
pub mod export;
pub mod fetch;
pub mod ports;
pub mod rendering;
