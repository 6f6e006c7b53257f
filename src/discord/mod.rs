pub mod payload;
pub mod webhook;
