//! Source composition.

pub(crate) mod merge_policy;
pub mod service;
