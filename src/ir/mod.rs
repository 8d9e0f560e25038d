//! Lowered intermediate representation: immutable node shapes plus the
//! two-phase generator that produces them from a type-checked AST.

pub mod generator;
pub mod nodes;

pub use generator::generate;
pub use nodes::{
    AnchorId, ContextId, FlowId, IRProgram, IRRun, IRStep, MemoryId, PersonaId, ToolId, TypeId,
};
