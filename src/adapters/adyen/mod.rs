//! Adyen wire formats: inbound standard notifications and the outbound
//! modification API.

pub mod client;
pub mod webhook;

pub use {client::AdyenClient, webhook::notify_handler};
