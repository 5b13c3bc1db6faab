pub mod env_record;
pub mod error;
pub mod heap;
pub mod operations;
pub mod value;
