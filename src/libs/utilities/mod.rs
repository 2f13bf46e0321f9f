// Small helpers used across the crate.

pub mod checksum;
pub mod path_helpers;
pub mod timestamps;
pub mod versions;
