pub mod cancellation;
pub mod driver;
