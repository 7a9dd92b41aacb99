//! Client storage: layout and settings

pub mod layout;
pub mod settings;
