use failure::Error;
use lettre::{SendmailTransport, Transport as _};
use lettre_email::{EmailBuilder, Mailbox};
use log::debug;

use super::config::{Config, Transports};

/// A message ready to be sent.
#[derive(Clone, Debug)]
pub struct Message {
    pub to: Mailbox,
    pub reply_to: Option<Mailbox>,
    pub subject: String,
    pub text: String,
}

/// A method of delivering messages.
pub trait Transport {
    fn send(&mut self, message: Message) -> Result<(), Error>;
}

/// Construct transport described by configuration.
pub fn from_config(config: &Config) -> Result<Box<dyn Transport + Send>, Error> {
    Ok(match config.transport {
        Transports::Log => Box::new(Logger),
        Transports::Sendmail => Box::new(Sendmail {
            sender: config.sender.clone(),
            transport: SendmailTransport::new(),
        }),
    })
}

/// Transport which only logs messages.
struct Logger;

impl Transport for Logger {
    fn send(&mut self, message: Message) -> Result<(), Error> {
        debug!("Sending mail to {}", message.to);
        if let Some(ref reply_to) = message.reply_to {
            debug!("Reply-To: {}", reply_to);
        }
        debug!("Subject: {}", message.subject);
        debug!("{}", message.text);
        Ok(())
    }
}

/// Transport using the `sendmail(1)` command.
struct Sendmail {
    sender: Mailbox,
    transport: SendmailTransport,
}

impl Transport for Sendmail {
    fn send(&mut self, message: Message) -> Result<(), Error> {
        let Message { to, reply_to, subject, text } = message;

        let mut builder = EmailBuilder::new()
            .from(self.sender.clone())
            .to(to)
            .subject(subject)
            .text(text);

        if let Some(reply_to) = reply_to {
            builder = builder.reply_to(reply_to);
        }

        self.transport.send(builder.build()?.into())?;
        Ok(())
    }
}
