// Analysis record integrity: schema, validation, normalization, migration, scoring.
// Handlers and history plumbing sit on top; the core modules are pure.

pub mod builder;
pub mod content;
pub mod handlers;
pub mod history;
pub mod migrate;
pub mod normalize;
pub mod schema;
pub mod scoring;
pub mod validation;

use chrono::Utc;

/// Current time in epoch milliseconds, the unit of `createdAt` / `updatedAt`.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
