//! Structural module representation
//!
//! A loaded module travels through the host as raw bytes; this is the
//! in-memory form the engine edits. Method bodies are source-form text so
//! probe snippets can be spliced at entry and exit without understanding the
//! body itself. Serialization is plain JSON so a failed parse of foreign
//! bytes degrades cleanly instead of corrupting the module.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Class,
    /// Interfaces declare no executable bodies and are never rewritten.
    Interface,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub type_name: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDef {
    /// Fully qualified method name, e.g. `net.Socket.read(byte[])`.
    pub long_name: String,
    /// `None` for abstract/native methods, which have nothing to wrap.
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDef {
    pub name: String,
    pub kind: ModuleKind,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub methods: Vec<MethodDef>,
}

impl ModuleDef {
    pub fn from_bytes(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn is_interface(&self) -> bool {
        self.kind == ModuleKind::Interface
    }
}
