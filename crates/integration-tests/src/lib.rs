//! # Integration Tests Crate
//!
//! End-to-end scenarios that drive the auction engine through its public
//! API with all in-memory collaborators wired together.
//!
//! ## Structure
//!
//! ```text
//! integration-tests/
//! ├── src/
//! │   ├── lib.rs        # This file
//! │   ├── harness.rs    # Wired engine + deterministic clock
//! │   └── scenarios.rs  # Bidding, settlement, and concurrency scenarios
//! ```
//!
//! ## Scenario Categories
//!
//! 1. **Full lifecycle**: scheduled → active → ending soon → ended →
//!    settled → delivered
//! 2. **Concurrent bidding**: racing bids on one auction resolve to a
//!    single winner; losers are rejected against the committed price
//! 3. **Escrow conservation**: every besito held is eventually released
//!    or captured, never both, never neither
//! 4. **Idempotency**: repeated ending sweeps and replayed bid
//!    submissions cause no duplicate side effects
//! 5. **Failure recovery**: delivery outages are retried by later sweeps
//!    without touching payment finality

pub mod harness;

#[cfg(test)]
mod scenarios;
