pub mod directory;
pub mod render;
