// Library root
// -----------
// The binary (`main.rs`) only parses arguments and reports errors; all the
// work happens in these modules.
//
// Module responsibilities:
// - `config`: config file location, parsing and writing.
// - `api`: authenticated HTTP calls to Habitica, behind the `Api` trait.
// - `cache`: on-disk ETag cache for GET responses.
// - `cron`: makes sure Habitica's day has rolled over before scoring.
// - `commands`: one function per subcommand, rendering responses as text.
// - `cli`: clap definitions and dispatch.
// - `ui`: colors, spinner and interactive prompts.
pub mod api;
pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod cron;
pub mod error;
pub mod logging;
pub mod models;
pub mod ui;

#[cfg(test)]
mod testing;
