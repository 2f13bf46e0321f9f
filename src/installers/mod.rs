// This module is the hub for the pieces that fetch and execute installers.
//
// It serves as an organizational unit: the orchestrator in `libs` depends on these
// modules, while they depend on nothing but the schemas and the run context.

/// Declares the `http` module: the `HttpClient` seam used for listing pages,
/// release documents and artifact downloads, plus its `ureq`-backed implementation.
pub(crate) mod http;

/// Declares the `resolver` module, which scrapes a listing page (or a GitHub
/// release) for installer links and picks the newest one.
pub(crate) mod resolver;

/// Declares the `runner` module, which launches an installer with its silent
/// switches, waits for it and classifies the exit code.
pub(crate) mod runner;
