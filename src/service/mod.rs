//! Key/Value Facade
//!
//! Application-facing wrapper around a `ChordNode`. Keys are hashed into the
//! ring's identifier space; values are opaque bytes.
//!
//! ## Core Concepts
//! - **Awaitable calls**: `insert`, `remove` and `retrieve` resolve the responsible node and
//!   return its answer.
//! - **Completions**: The `*_async` variants run in the background and deliver exactly one
//!   `Completion` per call over a channel, carrying either the result or the error.
//!
//! ## Submodules
//! - **`facade`**: `ChordService`.
//! - **`types`**: `Completion`.

pub mod facade;
pub mod types;

pub use facade::ChordService;
pub use types::Completion;

#[cfg(test)]
mod tests;
