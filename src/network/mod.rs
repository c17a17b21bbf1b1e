// Network client module
// Author: kelexine (https://github.com/kelexine)

mod client;
pub mod endpoint;
pub mod streaming;

pub use client::{classify_error, ClientState, NetworkClient};
pub use endpoint::{Endpoint, ProxyRoute, DEFAULT_COMPLETIONS_PATH};
pub use streaming::{StreamEvent, StreamEvents, StreamingResponse};
