#![allow(dead_code)]

pub mod dns_messages;

pub use dns_messages::*;
pub use mock_ports::*;
