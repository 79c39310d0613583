//! Command handlers.

pub(crate) mod diagnostic;
