pub mod level;
pub mod value;
pub mod record;
pub mod error;
pub mod handler;
pub mod json;
pub mod cloud;
pub mod layer;

pub mod env;
pub mod init;

#[cfg(test)]
mod test_support;

pub use cloud::{rewrite_attr, CloudLoggingHandler, LEVEL_CRITICAL};
pub use handler::Handler;
pub use init::{try_init, try_init_from_env, CloudLoggingConfig};
pub use layer::CloudLoggingLayer;
