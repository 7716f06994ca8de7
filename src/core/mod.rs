pub mod cleaning;
pub mod etl;

pub use crate::domain::keys::RunTimestamp;
pub use crate::domain::model::{Dataset, StageReport, TableReport, Value};
pub use crate::domain::ports::{ObjectMeta, Stage, Storage, Warehouse};
pub use crate::utils::error::Result;
