pub mod collab;
pub mod types;
