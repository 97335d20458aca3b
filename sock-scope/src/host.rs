//! Module host
//!
//! The load-hook surface an embedding runtime exposes to the agent. The host
//! offers every freshly loaded module's bytes to the registered rewriters,
//! keeps the pristine originals, and can re-apply the rewriter chain later
//! for the attach-to-running-process case. Retransformation always starts
//! from the pristine bytes, so applying it twice never duplicates probes.

use std::sync::{Arc, RwLock};

use dashmap::DashMap;

use crate::domain::HostError;

/// A registered module rewriter (in practice, an [`crate::rewrite::Instrumenter`]).
pub trait ModuleRewriter: Send + Sync {
    /// Rewritten bytes, or the input unchanged. Must not fail loudly.
    fn rewrite(&self, identity: &str, raw: &[u8]) -> Vec<u8>;

    /// Whether this rewriter would touch the module at all. Used to filter
    /// the already-loaded set before retransformation.
    fn wants(&self, identity: &str) -> bool;
}

struct ModuleRecord {
    original: Vec<u8>,
    current: Vec<u8>,
    /// Sealed modules were loaded outside the host's control and refuse
    /// retransformation, like a runtime's unmodifiable core classes.
    sealed: bool,
}

#[derive(Default)]
pub struct ModuleHost {
    rewriters: RwLock<Vec<Arc<dyn ModuleRewriter>>>,
    modules: DashMap<String, ModuleRecord>,
}

impl ModuleHost {
    pub fn new() -> Self {
        ModuleHost::default()
    }

    /// Rewriters run in registration order on every later load.
    pub fn add_rewriter(&self, rewriter: Arc<dyn ModuleRewriter>) {
        self.rewriters.write().unwrap().push(rewriter);
    }

    /// Offer a freshly loaded module to the rewriter chain. Returns the bytes
    /// the runtime should actually install. Runs on the loading thread.
    pub fn load_module(&self, identity: &str, raw: &[u8]) -> Vec<u8> {
        let current = self.run_rewriters(identity, raw);
        self.modules.insert(
            identity.to_string(),
            ModuleRecord { original: raw.to_vec(), current: current.clone(), sealed: false },
        );
        current
    }

    /// Record a module the host refuses to modify; it bypasses the rewriter
    /// chain entirely.
    pub fn load_sealed_module(&self, identity: &str, raw: &[u8]) -> Vec<u8> {
        self.modules.insert(
            identity.to_string(),
            ModuleRecord { original: raw.to_vec(), current: raw.to_vec(), sealed: true },
        );
        raw.to_vec()
    }

    pub fn loaded_modules(&self) -> Vec<String> {
        self.modules.iter().map(|entry| entry.key().clone()).collect()
    }

    /// The bytes currently installed for a module.
    pub fn module_bytes(&self, identity: &str) -> Option<Vec<u8>> {
        self.modules.get(identity).map(|entry| entry.current.clone())
    }

    /// Re-run the rewriter chain over the module's pristine bytes.
    ///
    /// # Errors
    /// `ModuleNotFound` if the identity was never loaded, `Unmodifiable` if
    /// the module is sealed.
    pub fn retransform(&self, identity: &str) -> Result<(), HostError> {
        // Clone out of the map before rewriting so a rewriter can never
        // re-enter the entry it is being run for.
        let original = {
            let record = self
                .modules
                .get(identity)
                .ok_or_else(|| HostError::ModuleNotFound(identity.to_string()))?;
            if record.sealed {
                return Err(HostError::Unmodifiable(identity.to_string()));
            }
            record.original.clone()
        };

        let current = self.run_rewriters(identity, &original);
        if let Some(mut record) = self.modules.get_mut(identity) {
            record.current = current;
        }
        Ok(())
    }

    fn run_rewriters(&self, identity: &str, raw: &[u8]) -> Vec<u8> {
        let mut current = raw.to_vec();
        for rewriter in self.rewriters.read().unwrap().iter() {
            current = rewriter.rewrite(identity, &current);
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Appends a marker byte so repeated application is detectable.
    struct Tagger;

    impl ModuleRewriter for Tagger {
        fn rewrite(&self, identity: &str, raw: &[u8]) -> Vec<u8> {
            if !self.wants(identity) {
                return raw.to_vec();
            }
            let mut out = raw.to_vec();
            out.push(b'!');
            out
        }
        fn wants(&self, identity: &str) -> bool {
            identity.starts_with("net/")
        }
    }

    #[test]
    fn test_load_runs_rewriters_in_order() {
        let host = ModuleHost::new();
        host.add_rewriter(Arc::new(Tagger));
        host.add_rewriter(Arc::new(Tagger));
        assert_eq!(host.load_module("net/Socket", b"abc"), b"abc!!");
        assert_eq!(host.module_bytes("net/Socket").unwrap(), b"abc!!");
        assert_eq!(host.load_module("util/List", b"abc"), b"abc");
    }

    #[test]
    fn test_retransform_starts_from_pristine_bytes() {
        let host = ModuleHost::new();
        host.load_module("net/Socket", b"abc");
        host.add_rewriter(Arc::new(Tagger));

        host.retransform("net/Socket").unwrap();
        assert_eq!(host.module_bytes("net/Socket").unwrap(), b"abc!");

        // A second pass must not stack probes.
        host.retransform("net/Socket").unwrap();
        assert_eq!(host.module_bytes("net/Socket").unwrap(), b"abc!");
    }

    #[test]
    fn test_retransform_errors() {
        let host = ModuleHost::new();
        assert_eq!(
            host.retransform("net/Missing"),
            Err(HostError::ModuleNotFound("net/Missing".to_string()))
        );

        host.load_sealed_module("net/Core", b"xyz");
        assert_eq!(
            host.retransform("net/Core"),
            Err(HostError::Unmodifiable("net/Core".to_string()))
        );
        assert_eq!(host.module_bytes("net/Core").unwrap(), b"xyz");
    }
}
