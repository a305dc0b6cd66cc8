//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `HopState`: Tracks one page visit (fetching, parsed, skipped, persisted, etc.)

mod hop_state;

// Re-export main types
pub use hop_state::HopState;
