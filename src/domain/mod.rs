pub mod address;
pub mod booking;
pub mod entity;
pub mod errors;
pub mod export;
pub mod lifecycle;
pub mod notification;
pub mod order;
pub mod outbox;
pub mod payment;
pub mod ports;
pub mod pricing;
pub mod validation;
