//! Instrumentation engine
//!
//! One `Instrumenter` per probe source, registered with the module host. For
//! every loaded module it either returns rewritten bytes or, on any failure,
//! the original bytes unchanged — a broken rewrite must cost one module its
//! probes, never the host its correctness. Runs synchronously on whichever
//! host thread is loading the module.

use std::sync::Arc;

use log::{debug, error};

use crate::domain::RewriteError;
use crate::host::ModuleRewriter;
use crate::probe::ProbeSource;
use crate::rewrite::module::{FieldDef, ModuleDef};

pub struct Instrumenter {
    source: Arc<dyn ProbeSource>,
}

impl Instrumenter {
    pub fn new(source: Arc<dyn ProbeSource>) -> Self {
        Instrumenter { source }
    }

    /// Rewrite a freshly loaded module, or hand it back untouched.
    ///
    /// Ineligible modules take the fast path and return the input
    /// byte-for-byte. Eligible ones get the probe source's declared fields
    /// added and every non-empty method body wrapped with its pre/post
    /// snippets. Any failure is logged with the module identity and the
    /// original bytes are returned so the host keeps running with that one
    /// module un-instrumented.
    pub fn rewrite(&self, identity: &str, raw: &[u8]) -> Vec<u8> {
        if !self.source.needs_instrument(identity) {
            return raw.to_vec();
        }
        match self.apply(identity, raw) {
            Ok(rewritten) => rewritten,
            Err(e) => {
                error!("could not instrument {identity}: {e}");
                raw.to_vec()
            }
        }
    }

    fn apply(&self, identity: &str, raw: &[u8]) -> Result<Vec<u8>, RewriteError> {
        let mut module = ModuleDef::from_bytes(raw)?;

        if module.is_interface() {
            return Ok(raw.to_vec());
        }

        for declaration in self.source.class_new_fields(identity) {
            let tokens: Vec<&str> = declaration.split_whitespace().collect();
            if tokens.len() != 2 {
                let count = tokens.len();
                return Err(RewriteError::BadFieldDeclaration { declaration, tokens: count });
            }
            module.fields.push(FieldDef {
                type_name: tokens[0].to_string(),
                name: tokens[1].to_string(),
            });
        }

        for method in &mut module.methods {
            // No body: abstract or native, nothing to wrap.
            let Some(body) = method.body.as_mut() else { continue };
            if body.is_empty() {
                continue;
            }
            let pre = self.source.pre_code(&method.long_name);
            let post = self.source.post_code(&method.long_name);
            if !pre.is_empty() {
                debug!("trace: {pre}");
                body.insert_str(0, &pre);
            }
            if !post.is_empty() {
                // Normal-return path only; the exceptional exit path is left
                // to the probe source's own snippets if it needs one.
                body.push_str(&post);
            }
        }

        Ok(module.to_bytes()?)
    }
}

impl ModuleRewriter for Instrumenter {
    fn rewrite(&self, identity: &str, raw: &[u8]) -> Vec<u8> {
        Instrumenter::rewrite(self, identity, raw)
    }

    fn wants(&self, identity: &str) -> bool {
        self.source.needs_instrument(identity)
    }
}
