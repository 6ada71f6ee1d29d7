pub mod content;
pub mod envelope;
pub mod generator;
pub mod image;
