pub mod catalog;
pub mod client;
pub mod quote;
pub mod settings;
pub mod user;
