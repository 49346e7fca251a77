// SPDX-License-Identifier: Apache-2.0
mod protocol;
mod server;

pub use protocol::{McpError, McpRequest, McpResponse, INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND};
pub use server::McpServer;
