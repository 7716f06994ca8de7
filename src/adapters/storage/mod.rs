pub mod local;
pub mod s3;

pub use local::LocalStorage;
pub use s3::S3Storage;
