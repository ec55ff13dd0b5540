// ABOUTME: Type-safe identifiers shared across the orchestration engine.
// ABOUTME: Uses phantom types to prevent ID confusion at compile time.

mod id;

pub use id::{Id, ResourceId, RunId, SessionId};
