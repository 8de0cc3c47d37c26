pub mod catalog;
pub mod error;
pub mod handlers;
pub mod models;
pub mod notify;
pub mod packing;
pub mod reminder;
pub mod store;
