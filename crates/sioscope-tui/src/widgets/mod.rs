pub mod footer;
pub mod header;
pub mod help;
pub mod messages;
