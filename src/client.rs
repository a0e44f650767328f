//! Session handle for the caching query layer.
//!
//! Implementation details are split into submodules under `src/client/`.

pub mod builder;
pub mod core;

pub use self::builder::FlashClientBuilder;
pub use self::core::{CacheState, FlashClient};
