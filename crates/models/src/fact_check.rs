//! Routing of fact-check replies.
//!
//! When an edition is sent for a fact check, external reviewers are asked to
//! reply to an address of the form
//!
//! ```text
//! factcheck+<environment>-<edition ID>@<domain>
//! ```
//!
//! Replies arriving at the shared mailbox are matched back to editions by
//! decoding this address. The environment tag ensures that a deployment only
//! ever accepts replies to requests it sent itself.

use failure::Fail;

use crate::{models::{Edition, EditionId}, workflow::TransitionError};

const PREFIX: &str = "factcheck+";

/// Identity of the running deployment.
pub trait DeploymentIdentity {
    /// Tag distinguishing this deployment from others sharing a mailbox.
    fn current_environment_tag(&self) -> &str;

    /// Domain at which fact-check replies for an environment are received.
    fn host_for(&self, environment: &str) -> String;
}

/// Deployment identity taken from configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Deployment {
    environment: String,
    domain: String,
}

impl Deployment {
    pub fn new<E, D>(environment: E, domain: D) -> Result<Deployment, DeploymentError>
    where
        E: Into<String>,
        D: Into<String>,
    {
        let environment = environment.into();
        let domain = domain.into();

        if environment.is_empty() || environment.chars().any(|c| {
            c == '@' || c == '+' || c == '-' || c.is_whitespace()
        }) {
            return Err(DeploymentError::InvalidEnvironment(environment));
        }

        if domain.is_empty() || domain.contains('@') {
            return Err(DeploymentError::InvalidDomain(domain));
        }

        Ok(Deployment { environment, domain })
    }

    /// Derive identity from a host name of the form
    /// `publisher.<environment>.<domain>`.
    pub fn from_publisher_host(host: &str) -> Result<Deployment, DeploymentError> {
        let invalid = || DeploymentError::InvalidHost(host.to_string());

        let mut parts = host.splitn(3, '.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("publisher"), Some(environment), Some(domain))
            if !domain.is_empty() =>
                Deployment::new(environment, domain).map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl DeploymentIdentity for Deployment {
    fn current_environment_tag(&self) -> &str {
        &self.environment
    }

    fn host_for(&self, _: &str) -> String {
        self.domain.clone()
    }
}

#[derive(Debug, Eq, Fail, PartialEq)]
pub enum DeploymentError {
    #[fail(display = "Invalid environment tag: {:?}", _0)]
    InvalidEnvironment(String),
    #[fail(display = "Invalid mail domain: {:?}", _0)]
    InvalidDomain(String),
    #[fail(display = "Expected a host name like publisher.<environment>.<domain>, \
        got {:?}", _0)]
    InvalidHost(String),
}

/// Encoder and decoder of fact-check reply addresses.
#[derive(Clone, Debug)]
pub struct FactCheckAddress {
    environment: String,
    domain: String,
}

impl FactCheckAddress {
    pub fn new<D>(identity: &D) -> FactCheckAddress
    where
        D: DeploymentIdentity + ?Sized,
    {
        let environment = identity.current_environment_tag().to_string();
        let domain = identity.host_for(&environment);
        FactCheckAddress { environment, domain }
    }

    /// Construct reply address for an edition.
    pub fn encode(&self, id: EditionId) -> String {
        format!("{}{}-{}@{}", PREFIX, self.environment, id, self.domain)
    }

    /// Construct reply address for an edition.
    ///
    /// Fails with [`TransitionError::Unsaved`] if the edition has no ID yet.
    pub fn for_edition(&self, edition: &Edition)
    -> Result<String, TransitionError> {
        edition.id()
            .map(|id| self.encode(id))
            .ok_or(TransitionError::Unsaved)
    }

    /// Extract edition ID fragment from an address.
    ///
    /// Address may be given bare (`local@domain`) or with a display name
    /// (`Name <local@domain>`).
    pub fn decode<'a>(&self, address: &'a str)
    -> Result<&'a str, MalformedFactCheckAddress> {
        let address = address.trim();
        let address = match (address.rfind('<'), address.rfind('>')) {
            (Some(start), Some(end)) if start < end => &address[start + 1..end],
            _ => address,
        };

        let local = match address.rfind('@') {
            Some(at) => &address[..at],
            None => return Err(MalformedFactCheckAddress::NotFactCheck(
                address.to_string())),
        };

        if !local.starts_with(PREFIX) {
            return Err(MalformedFactCheckAddress::NotFactCheck(
                address.to_string()));
        }

        let tagged = &local[PREFIX.len()..];

        // Edition IDs never contain a dash, so the tag ends at the last one.
        let (tag, fragment) = match tagged.rfind('-') {
            Some(dash) => (&tagged[..dash], &tagged[dash + 1..]),
            None => (tagged, ""),
        };

        if tag != self.environment {
            return Err(MalformedFactCheckAddress::WrongEnvironment(
                address.to_string()));
        }

        if fragment.is_empty() {
            return Err(MalformedFactCheckAddress::MissingEditionId);
        }

        Ok(fragment)
    }

    /// Extract edition ID from an address.
    pub fn edition_id(&self, address: &str)
    -> Result<EditionId, MalformedFactCheckAddress> {
        let fragment = self.decode(address)?;
        fragment.parse()
            .map_err(|_| MalformedFactCheckAddress::InvalidEditionId(
                fragment.to_string()))
    }

    /// Is this a fact-check address for the current environment?
    pub fn is_valid(&self, address: &str) -> bool {
        self.decode(address).is_ok()
    }
}

#[derive(Debug, Eq, Fail, PartialEq)]
pub enum MalformedFactCheckAddress {
    #[fail(display = "{} is not a fact-check address", _0)]
    NotFactCheck(String),
    #[fail(display = "{} belongs to another environment", _0)]
    WrongEnvironment(String),
    #[fail(display = "Fact-check address contains no edition ID")]
    MissingEditionId,
    #[fail(display = "Invalid edition ID in fact-check address: {}", _0)]
    InvalidEditionId(String),
}

/// A request for fact check, as handed over to the mailer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FactCheckMail {
    pub edition: EditionId,
    pub title: String,
    pub slug: String,
    /// Text to be checked.
    pub body: String,
    pub email_addresses: Vec<String>,
    pub customised_message: Option<String>,
    /// Address to which replies should be sent.
    pub reply_to: String,
}

/// Delivery of fact-check requests.
///
/// Delivery happens after the request has been recorded, and its outcome
/// doesn't affect the edition. Implementations should report failures
/// through logs.
pub trait FactCheckMailer: Send + Sync {
    fn send_fact_check_request(&self, mail: &FactCheckMail);
}
