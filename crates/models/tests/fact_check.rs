//! Tests for fact checking over persistent storage.

use failure::Fallible;
use imprimatur_models::{
    Deployment,
    FactCheckAddress,
    FileStore,
    MalformedFactCheckAddress,
    Params,
    Store,
    Transition,
    Workflow,
};

mod common;

use self::common::*;

#[test]
fn reply_is_recorded_in_stored_edition() -> Fallible<()> {
    setup();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("editions.json");

    let id = {
        let mailer = RecordingMailer::default();
        let workflow = Workflow::new(FileStore::open(&path), &*DEPLOYMENT)
            .with_mailer(mailer.clone());

        let mut edition = workflow.create_edition(
            &*AUTHOR, answer("Facts"), new_edition("facts"))?;
        make_ready(&workflow, &mut edition);
        workflow.send_fact_check(&*AUTHOR, &mut edition,
            Params::default().email_addresses("expert@example.com"))?;

        assert_eq!(mailer.sent().len(), 1);
        edition.id().unwrap()
    };

    let workflow = Workflow::new(FileStore::open(&path), &*DEPLOYMENT);
    let address = workflow.addresses().encode(id);
    let edition = workflow.receive_fact_check_reply(&address, "Looks right")?;

    assert!(edition.is_fact_check_received());
    assert_eq!(workflow.store().find(id)?, edition);

    let reply = edition.actions().last_of_type(Transition::ReceiveFactCheck).unwrap();
    assert_eq!(reply.comment(), "Looks right");

    Ok(())
}

#[test]
fn environments_do_not_share_replies() -> Fallible<()> {
    let (workflow, _) = workflow();
    let mut edition = workflow.create_edition(
        &*AUTHOR, answer("Facts"), new_edition("facts"))?;
    make_ready(&workflow, &mut edition);
    workflow.send_fact_check(&*AUTHOR, &mut edition,
        Params::default().email_addresses("expert@example.com"))?;

    let id = edition.id().unwrap();
    let address = workflow.addresses().encode(id);

    let preview = FactCheckAddress::new(
        &Deployment::from_publisher_host("publisher.preview.alphagov.co.uk")?);
    assert!(!preview.is_valid(&address));
    assert_eq!(
        preview.edition_id(&address),
        Err(MalformedFactCheckAddress::WrongEnvironment(address.clone())),
    );

    assert!(workflow.addresses().is_valid(&address));
    assert_eq!(workflow.addresses().edition_id(&address), Ok(id));
    assert_eq!(workflow.addresses().decode(&address), Ok(id.to_string().as_str()));

    Ok(())
}

#[test]
fn garbled_edition_id() {
    let (workflow, _) = workflow();

    assert_eq!(
        workflow.addresses().edition_id("factcheck+wibble-abde@alphagov.co.uk"),
        Err(MalformedFactCheckAddress::InvalidEditionId("abde".into())),
    );

    match workflow.receive_fact_check_reply(
        "factcheck+wibble-00000000000000000000000000000000@alphagov.co.uk", "Hi",
    ) {
        Err(imprimatur_models::WorkflowError::Store(
            imprimatur_models::StoreError::NotFound(_))) => (),
        other => panic!("expected NotFound, got {:?}", other),
    }
}
