//! Lifecycle flows, one module per public operation
//!
//! ```text
//! create:  render user-data -> ensure volume -> ensure droplet (active) -> reachable
//! start:   absent? create : power on if needed -> reachable
//! stop:    power off (poll off)
//! destroy: delete droplet (poll 404) -> detach volume (poll) -> delete volume
//! ```

mod create_target;
mod destroy_target;
mod stop_target;
