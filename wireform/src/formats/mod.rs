//! The three wire formats sharing the codec core.

pub mod bin;
pub mod json;
pub mod xml;
