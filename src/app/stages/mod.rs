pub mod clean;
pub mod ingest;
pub mod load;

#[cfg(test)]
mod test_support;

pub use clean::CleanStage;
pub use ingest::IngestStage;
pub use load::LoadStage;
