pub mod export;
pub mod import;

pub use export::ExportProducer;
pub use import::ImportProducer;
