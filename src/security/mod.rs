pub mod credentials;

pub use credentials::{Credentials, mask_secret};
