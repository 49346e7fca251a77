// SPDX-License-Identifier: Apache-2.0
pub mod builtin;
mod registry;
mod state;
mod tool;

pub use registry::{ToolDescriptor, ToolRegistry};
pub use state::VehicleState;
pub use tool::{validate_args, ParamSpec, ParamType, Tool, ToolError, ToolOutput};
