//! Marquee Security Crate
//!
//! Security levels and the static policy tables (allowlists per level plus the
//! level-independent blocklist) consulted by the sanitization engine.

pub mod error;
pub mod level;
pub mod policy;

pub use error::{PolicyError, PolicyResult};
pub use level::SecurityLevel;
pub use policy::{Allowlist, Blocklist, PolicyStore};
