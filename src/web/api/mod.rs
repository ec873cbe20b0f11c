pub mod channels;
pub mod error;
