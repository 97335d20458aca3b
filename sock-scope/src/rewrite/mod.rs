//! Module rewriting
//!
//! The structural module representation and the engine that splices probe
//! code into it at load time.

pub mod engine;
pub mod module;

pub use engine::Instrumenter;
pub use module::{FieldDef, MethodDef, ModuleDef, ModuleKind};
