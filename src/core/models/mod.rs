pub mod entity;
pub mod message;
pub mod status;
