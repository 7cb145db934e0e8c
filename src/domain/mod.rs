pub mod error;
pub mod id;
pub mod method;
pub mod money;
pub mod notification;
pub mod order;
pub mod payment;
pub mod provider;
pub mod reference;
pub mod refund;
pub mod store;
