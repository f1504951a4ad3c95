mod config;
mod service;
mod transport;

pub use self::{
    config::{Config, Transports},
    service::Mailer,
    transport::{Message, Transport},
};

pub use lettre_email::Mailbox;
