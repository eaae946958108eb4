//! Binary-side application plumbing.

pub(crate) mod progress;
