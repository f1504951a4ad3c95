use imprimatur_models::{FactCheckMail, FactCheckMailer};
use lettre_email::Mailbox;
use log::{debug, error, info};
use std::{
    io,
    sync::{Mutex, mpsc::{self, Receiver, Sender}},
    thread::{self, JoinHandle},
};

use super::{config::Config, transport::{self, Message, Transport}};

/// Fire-and-forget mail service.
///
/// Messages are queued and delivered in order on a background thread, so
/// that callers never wait for a transport. Dropping the mailer waits for
/// the queue to drain.
pub struct Mailer {
    queue: Mutex<Option<Sender<Message>>>,
    worker: Option<JoinHandle<()>>,
}

impl Mailer {
    pub fn new(transport: Box<dyn Transport + Send>) -> io::Result<Mailer> {
        let (queue, messages) = mpsc::channel();

        let worker = thread::Builder::new()
            .name("mailer".into())
            .spawn(move || deliver(transport, messages))?;

        Ok(Mailer {
            queue: Mutex::new(Some(queue)),
            worker: Some(worker),
        })
    }

    pub fn from_config(config: &Config) -> Result<Mailer, failure::Error> {
        Ok(Mailer::new(transport::from_config(config)?)?)
    }

    /// Try to send an email message.
    ///
    /// Errors will be logged, but otherwise ignored.
    pub fn do_send(&self, message: Message) {
        let queue = match self.queue.lock() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        };

        let to = message.to.clone();

        match *queue {
            Some(ref queue) => if queue.send(message).is_err() {
                error!("Mail worker is gone, dropping mail to {}", to);
            },
            None => error!("Mailer is shutting down, dropping mail to {}", to),
        }
    }
}

impl Drop for Mailer {
    fn drop(&mut self) {
        match self.queue.get_mut() {
            Ok(queue) => drop(queue.take()),
            Err(poison) => drop(poison.into_inner().take()),
        }

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Mail worker panicked");
            }
        }
    }
}

fn deliver(mut transport: Box<dyn Transport + Send>, messages: Receiver<Message>) {
    for message in messages {
        let to = message.to.clone();

        match transport.send(message) {
            Ok(()) => info!("Sent mail to {}", to),
            Err(err) => error!("Could not send email to {}: {}", to, err),
        }
    }

    debug!("Mail queue closed");
}

impl FactCheckMailer for Mailer {
    fn send_fact_check_request(&self, mail: &FactCheckMail) {
        let reply_to = match mail.reply_to.parse::<Mailbox>() {
            Ok(reply_to) => reply_to,
            Err(_) => {
                error!("Invalid fact-check reply address {}", mail.reply_to);
                return;
            }
        };

        let subject = format!("\u{2018}{}\u{2019} fact check request", mail.title);
        let text = format_fact_check(mail);

        for address in &mail.email_addresses {
            let to = match address.parse::<Mailbox>() {
                Ok(to) => to,
                Err(_) => {
                    error!("Invalid fact-check recipient {}", address);
                    continue;
                }
            };

            self.do_send(Message {
                to,
                reply_to: Some(reply_to.clone()),
                subject: subject.clone(),
                text: text.clone(),
            });
        }
    }
}

fn format_fact_check(mail: &FactCheckMail) -> String {
    let intro = match mail.customised_message {
        Some(ref message) if !message.trim().is_empty() => message.clone(),
        _ => format!(
            "Please check the facts in \u{2018}{}\u{2019} ({}) below, and reply \
            to this message with any corrections.",
            mail.title, mail.slug),
    };

    format!("{}\n\n---\n\n{}\n", intro, mail.body)
}

#[cfg(test)]
mod tests {
    use imprimatur_models::EditionId;
    use std::{sync::{Arc, Mutex}, time::{Duration, Instant}};

    use super::*;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<Message>>>);

    impl Transport for Recorder {
        fn send(&mut self, message: Message) -> Result<(), failure::Error> {
            self.0.lock().unwrap().push(message);
            Ok(())
        }
    }

    struct Slow(Recorder);

    impl Transport for Slow {
        fn send(&mut self, message: Message) -> Result<(), failure::Error> {
            thread::sleep(Duration::from_millis(500));
            self.0.send(message)
        }
    }

    struct Broken;

    impl Transport for Broken {
        fn send(&mut self, _: Message) -> Result<(), failure::Error> {
            Err(failure::err_msg("connection refused"))
        }
    }

    fn mail() -> FactCheckMail {
        FactCheckMail {
            edition: "0123456789abcdef0123456789abcdef".parse::<EditionId>().unwrap(),
            title: "Childcare".into(),
            slug: "childcare".into(),
            body: "Body to check".into(),
            email_addresses: vec!["a@example.com".into(), "b@example.com".into()],
            customised_message: None,
            reply_to: "factcheck+wibble-0123456789abcdef0123456789abcdef@alphagov.co.uk"
                .into(),
        }
    }

    #[test]
    fn one_message_per_recipient() {
        let recorder = Recorder::default();
        let mailer = Mailer::new(Box::new(recorder.clone())).unwrap();

        mailer.send_fact_check_request(&mail());
        drop(mailer);

        let sent = recorder.0.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to.address, "a@example.com");
        assert_eq!(sent[1].to.address, "b@example.com");
        assert_eq!(sent[0].reply_to.as_ref().unwrap().address, mail().reply_to);
        assert!(sent[0].subject.contains("Childcare"));
        assert!(sent[0].text.contains("Please check the facts"));
        assert!(sent[0].text.ends_with("Body to check\n"));
    }

    #[test]
    fn customised_message_replaces_intro() {
        let recorder = Recorder::default();
        let mailer = Mailer::new(Box::new(recorder.clone())).unwrap();

        let mail = FactCheckMail {
            customised_message: Some("Dear expert".into()),
            .. mail()
        };
        mailer.send_fact_check_request(&mail);
        drop(mailer);

        let sent = recorder.0.lock().unwrap();
        assert!(sent[0].text.starts_with("Dear expert\n\n"));
        assert!(!sent[0].text.contains("Please check the facts"));
    }

    #[test]
    fn delivery_errors_are_swallowed() {
        let mailer = Mailer::new(Box::new(Broken)).unwrap();
        mailer.send_fact_check_request(&mail());
    }

    #[test]
    fn sending_does_not_wait_for_delivery() {
        let recorder = Recorder::default();
        let mailer = Mailer::new(Box::new(Slow(recorder.clone()))).unwrap();

        let start = Instant::now();
        mailer.send_fact_check_request(&mail());
        assert!(start.elapsed() < Duration::from_millis(400));

        drop(mailer);
        assert_eq!(recorder.0.lock().unwrap().len(), 2);
    }
}
