//! threatcl HTTP Server
//!
//! Serves the read-only GraphQL query engine over HTTP.

mod protocol;
mod server;

pub use protocol::{decode_body, GetParams};
pub use server::{router, Server};
