pub mod directory;
pub mod discharge;
