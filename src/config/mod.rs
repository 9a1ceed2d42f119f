/// Main configuration module.
///
/// Re-exports submodules for game constants and server (environment) configuration.
pub mod game;
pub mod server;
