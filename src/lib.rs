// For integration tests only, the proctor binary is the shipped artifact
pub mod capture;
pub mod cli;
pub mod config;
pub mod logging;
pub mod proxy;
pub mod server;
pub mod transport;
