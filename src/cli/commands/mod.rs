pub mod data;
pub mod documents;
pub mod report;
pub mod server;
