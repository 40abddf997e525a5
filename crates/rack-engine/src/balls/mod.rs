pub mod factory;
pub mod layout;
