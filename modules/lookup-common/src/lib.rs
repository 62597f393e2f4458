pub mod config;
pub mod error;
pub mod normalize;

pub use config::{Config, SignalScope};
pub use error::LookupError;
pub use normalize::clean_user;
