//! Integration tests for the relay listener.
//!
//! - `harness.rs`    - Mock relay server and mock collaborators
//! - `forwarding.rs` - Filter dispatch and forward/cursor effects
//! - `failures.rs`   - Per-frame failure policy (filter, forward, storage)
//! - `ordering.rs`   - Serialized critical-section and delivery order
//! - `transport.rs`  - Connection lifecycle, ping, reconnect, resume cursor

mod forwarding;
