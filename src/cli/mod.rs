// Command-line surface: argument definitions parsed by `clap`.

pub(crate) mod cmd_enums;
