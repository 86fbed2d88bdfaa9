pub mod archive;
pub mod cleanup;
pub mod layout;

pub use layout::{OutputLayout, OutputType};
