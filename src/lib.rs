pub mod config;
pub mod error;
pub mod gateway;
pub mod gateway_state;
pub mod io_struct;
pub mod logging;
pub mod providers;
pub mod relay;
pub mod server;
pub mod validation;
