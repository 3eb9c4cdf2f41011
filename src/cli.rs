//! CLI domain: parse, route and output only.
//! No domain orchestration; the route table dispatches to library services.

mod output;
mod parse;
mod route;

pub use output::{exit_code, map_error};
pub use parse::{Cli, Commands};
pub use route::RunContext;
