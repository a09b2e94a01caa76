pub mod chat_stream;
pub mod config;
pub mod gateway;
pub mod message;
pub mod persona;
pub mod session;
pub mod transcript;
