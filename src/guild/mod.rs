pub mod gateway;

pub use gateway::{SerenityGateway, SharedGuildGateway};
