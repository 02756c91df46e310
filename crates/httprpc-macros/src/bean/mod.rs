//! Implementation of the `#[derive(Bean)]` macro.

mod attrs;
mod derive;

pub use derive::bean_derive_impl;
