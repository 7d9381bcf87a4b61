pub mod api_client;
pub mod backend;
pub mod catalog;
pub mod checkout;
pub mod circuit_breaker;
pub mod hold_timer;
pub mod order;
pub mod payment;
pub mod selection;
