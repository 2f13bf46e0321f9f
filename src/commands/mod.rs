// Register application subcommands.
// Each module corresponds to a specific `hamshack` command-line action.

// Writes a sample configuration file.
pub mod generate;
// Lists the known applications.
pub mod list;
// Resolves, downloads and installs the selected applications.
pub mod run;
