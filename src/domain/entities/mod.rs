pub mod child_record;

pub use child_record::{Bucket, ChildRecord};
