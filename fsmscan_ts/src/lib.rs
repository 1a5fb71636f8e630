//! Static extraction of statecharts from TypeScript sources.
//!
//! State definitions are classes whose members are initialized with annotation chains
//! built from five primitives: `target`, `describe`, `guard`, `invoke` and `action`.
//! The chains are read from the syntax tree, never executed.
//!
//! ```text
//! class Red {
//!     next = describe("go green", action({ name: "log" }, target(Green, (ctx) => ctx)));
//! }
//! ```
//!
//! Sources are parsed once into a [`SourceContext`],
//! then [`extract_one`] or [`extract_many`] assemble a [`ChartDocument`] per machine.

#![forbid(unsafe_code)]

mod annotation;
mod assembler;
mod literal;
mod orchestrator;
mod resolver;
mod source;
mod syntax;

pub use annotation::{Primitive, is_annotation, parse_chain};
pub use assembler::assemble_state;
pub use fsmscan_core;
pub use fsmscan_core::{ChartDocument, MachineConfig};
pub use literal::{parse_descriptor, parse_literal};
pub use orchestrator::{Batch, ExtractError, extract_many, extract_one};
pub use resolver::{UNKNOWN, resolve_name};
pub use source::{Declaration, Lookup, Member, SourceContext, SourceError, SourceFile};
pub use syntax::Syntax;
