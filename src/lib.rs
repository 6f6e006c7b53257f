//! Forwards newly arrived unread Gmail messages to a Discord webhook,
//! once per message, surviving restarts.

pub mod auth;
pub mod config;
pub mod daemon;
pub mod discord;
pub mod domain;
pub mod gmail;
pub mod mail;
pub mod store;
