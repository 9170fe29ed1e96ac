//! Core library components.
//!
//! Storage, identity and sync logic. Nothing in here performs platform HTTP
//! calls itself; those go through the traits in [`sync`].

pub mod cipher;
pub mod clock;
pub mod codec;
pub mod config;
pub mod constants;
pub mod context;
pub mod handoff;
pub mod session;
pub mod store;
pub mod sync;
pub mod types;
pub mod validation;
pub mod vault;
