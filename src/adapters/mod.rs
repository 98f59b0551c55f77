//! Adapters plugging concrete collaborators into the domain ports.

pub mod handlers;
pub mod probes;
pub mod recovery;
pub mod tool_gateway;

pub use handlers::SimulatedHandler;
pub use probes::{CommandProbe, StaticProbe};
pub use recovery::{
    HeuristicAnalyzer, ScriptedSolver, SimulatedImplementer, SimulatedValidator, TemplateSolver,
};
pub use tool_gateway::{CallerContext, ToolError, ToolGateway, ToolRequest, ToolResponse, ToolSpec};
