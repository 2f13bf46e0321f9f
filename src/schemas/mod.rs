// Data types shared across the crate: configuration, targets, outcomes and errors.

pub(crate) mod config;
pub(crate) mod errors;
pub(crate) mod outcome;
pub(crate) mod targets;
