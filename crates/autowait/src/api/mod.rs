pub mod connect_options;
pub mod engine_options;

pub use connect_options::ConnectOptions;
pub(crate) use engine_options::deadline_after;
pub use engine_options::{
    DEFAULT_ASSERTION_TIMEOUT, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT, EngineOptions,
};
