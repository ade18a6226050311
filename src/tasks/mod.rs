pub mod manager;
pub mod producers;
pub mod progress;
pub mod sweeper;
pub mod types;

pub use manager::TaskManager;
pub use producers::{ExportProducer, ImportProducer};
pub use types::{Task, TaskFormat, TaskKind, TaskPatch, TaskStatus};

#[cfg(test)]
mod tests;
