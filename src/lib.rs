//! fsmscan extracts statecharts from TypeScript state definitions
//! annotated with `target`, `describe`, `guard`, `invoke` and `action`.
//!
//! Charts follow the JSON schema of statechart visualizers:
//! flat, with one level of nested states, or made of parallel regions.

mod cli;

pub use cli::Cli;
pub use fsmscan_ts;
