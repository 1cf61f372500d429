//! The result reporter port.
//!
//! The engine never talks to the hosting platform directly; whoever embeds
//! it supplies a reporter and formats outcomes for chat, logs, or tests.

use async_trait::async_trait;

use crate::outcome::IngestionOutcome;

/// Consumer of ingestion outcomes.
///
/// Invoked exactly once per completed or failed ingestion. Implementations
/// must not assume they are called on any particular task: dependency
/// timeouts deliver outcomes from a background timer task.
#[async_trait]
pub trait ResultReporter: Send + Sync {
    async fn report(&self, outcome: IngestionOutcome);
}
