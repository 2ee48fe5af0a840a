// UI module - command-line presentation layer
//
// This module contains:
// - Cli: clap command surface
// - CliController: routes commands to the ThemeService
// - StatusRefresher: periodic console view while monitoring

pub mod cli;
pub mod controller;
pub mod status;

pub use cli::{Cli, Command, StartupAction};
pub use controller::CliController;
pub use status::{StatusRefresher, StatusView};
