//! Synthetic record generation
//!
//! Pure functions of a logical id (or sequence number) plus randomness.

pub mod merchant;
pub mod session;

pub use merchant::{merchant, probe_document};
pub use session::{session, Session};

use rand::Rng;

/// Uniform pick from a non-empty constant list
fn pick<'a, R: Rng>(rng: &mut R, items: &[&'a str]) -> &'a str {
    items[rng.gen_range(0..items.len())]
}
