//! Name constants and resource-name derivation
//!
//! Droplets and volumes for a target share one derived name. That name is the
//! only key used to find them again: there is no local mapping table, the
//! provider's listing API is the source of truth.

/// Lifecycle operation names, used in error context and tracing spans
pub mod operations {
    /// Create droplet + volume and wait until the agent is reachable
    ///
    /// **Idempotent:** Yes (reuses same-named resources)
    /// **Duration:** ~1-5 minutes
    pub const CREATE: &str = "create";

    /// Power on an existing droplet, or create it when absent
    pub const START: &str = "start";

    /// Power off the droplet and wait for the `off` status
    pub const STOP: &str = "stop";

    /// Delete the droplet, then detach and delete the volume
    ///
    /// **Idempotent:** Yes (re-running finishes a partial teardown)
    pub const DESTROY: &str = "destroy";

    /// Read-only status snapshot
    pub const INFO: &str = "info";
}

/// Derive the shared droplet/volume name for a child of an owner.
///
/// The result is `{child_id}-{owner_id}`. Callers must pass a hyphen-free
/// `owner_id`: only then does the last `-` separate the two components, and
/// only then do distinct pairs yield distinct names. Owner ids issued by the
/// orchestrator satisfy this.
pub fn resource_name(owner_id: &str, child_id: &str) -> String {
    format!("{}-{}", child_id, owner_id)
}
