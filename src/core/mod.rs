pub mod config;
pub mod config_loader;
pub mod error;
pub mod http;
pub mod release;
pub mod retry;
pub mod state_machine;

pub use config::*;
pub use config_loader::*;
pub use error::*;
pub use http::{ACCEPT_JSON, RestClient};
pub use release::*;
pub use retry::*;
pub use state_machine::*;
