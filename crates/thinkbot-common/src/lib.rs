pub mod error;
pub mod gateway;
pub mod json_extract;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
