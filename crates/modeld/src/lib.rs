//! # modeld
//!
//! Serves lazily loaded models over RESP, so any Redis client can ask for a
//! model by `(namespace, variant)`.

#![warn(missing_docs)]

pub mod handler;
pub mod logging;
pub mod resp;
pub mod server;
pub mod service;

pub use handler::CommandHandler;
pub use logging::env_filter;
pub use resp::{Frame, FrameError};
pub use server::serve;
pub use service::{build_registries, parse_model_ref, ModelRegistries};
