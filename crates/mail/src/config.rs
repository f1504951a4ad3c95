use lettre_email::Mailbox;
use serde::{Deserialize, Deserializer, de};

/// Mail system configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Email address to send messages as.
    #[serde(deserialize_with = "de_mailbox")]
    pub sender: Mailbox,
    /// Transport method to use.
    #[serde(flatten)]
    pub transport: Transports,
}

impl Config {
    /// Validate configuration correctness.
    pub fn validate(&self) -> Result<(), failure::Error> {
        super::transport::from_config(self)?;
        Ok(())
    }
}

/// Mail transport configuration.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(tag = "transport", rename_all = "lowercase")]
pub enum Transports {
    /// Log messages instead of sending them.
    Log,
    /// Use the `sendmail(1)` command.
    Sendmail,
}

fn de_mailbox<'de, D>(d: D) -> std::result::Result<Mailbox, D::Error>
where
    D: Deserializer<'de>,
{
    d.deserialize_str(MailboxVisitor)
}

struct MailboxVisitor;

impl<'de> de::Visitor<'de> for MailboxVisitor {
    type Value = Mailbox;

    fn expecting(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "an email address")
    }

    fn visit_str<E>(self, v: &str) -> std::result::Result<Mailbox, E>
    where
        E: de::Error,
    {
        v.parse()
            .map_err(|_| E::invalid_value(
                de::Unexpected::Str(v), &"an email address"))
    }
}
