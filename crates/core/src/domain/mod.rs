pub mod asset;
pub mod justification;
pub mod payload;
pub mod request;
