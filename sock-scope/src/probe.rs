//! Probe-source collaborator contract
//!
//! A probe source is the pluggable policy that decides which modules and
//! methods receive probes and supplies the probe code text. One concrete
//! implementation exists per socket-implementation family (blocking,
//! non-blocking), selected when the orchestrator is wired; this crate only
//! defines the seam.

use std::sync::Arc;

use crate::session::Session;

pub trait ProbeSource: Send + Sync {
    /// Called once when the owning session is bootstrapped, before any module
    /// is offered for rewriting.
    fn init(&self, _session: &Arc<Session>) {}

    /// Whether a module with this identity should be rewritten at all.
    fn needs_instrument(&self, identity: &str) -> bool;

    /// Extra state fields to add to the rewritten module, each declaration as
    /// `"<type name> <field name>"`. A declaration with a different token
    /// count fails the rewrite of that one module.
    fn class_new_fields(&self, _identity: &str) -> Vec<String> {
        Vec::new()
    }

    /// Source-form code to run on method entry, or empty for none.
    fn pre_code(&self, method_long_name: &str) -> String;

    /// Source-form code to run after normal method completion, or empty for
    /// none.
    fn post_code(&self, method_long_name: &str) -> String;
}
