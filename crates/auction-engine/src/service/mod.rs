//! Service layer: orchestration of the domain against the driven ports.

pub mod engine;

pub use engine::AuctionEngine;
