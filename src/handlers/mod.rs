pub mod bootstrap;
pub mod commands;
pub mod documents;
pub mod system;
