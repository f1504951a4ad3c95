//! Commands for managing editions.

use failure::format_err;
use imprimatur_models::{
    Actor,
    Content,
    Edition,
    EditionId,
    EditionKind,
    NewEdition,
    Params,
    Part,
    PartUpdate,
    Store,
    Transition,
    Workflow,
};
use structopt::StructOpt;

use crate::Result;
use super::util::{self, print_table};

#[derive(StructOpt)]
pub struct Opts {
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
pub enum Command {
    /// List all editions
    #[structopt(name = "list")]
    List,
    /// Show an edition and its history
    #[structopt(name = "show")]
    Show(EditionOpts),
    /// Create a new edition
    #[structopt(name = "new")]
    New(NewOpts),
    /// Move an edition through the workflow
    #[structopt(name = "transition")]
    Transition(TransitionOpts),
    /// Create a new version of a published edition
    #[structopt(name = "new-version")]
    NewVersion(NewVersionOpts),
    /// Inspect or change parts of an edition
    #[structopt(name = "parts")]
    Parts(PartsOpts),
}

pub fn main<S: Store>(workflow: &Workflow<S>, actor: Actor, opts: Opts)
-> Result<()> {
    match opts.command {
        Command::List => list(workflow),
        Command::Show(opts) => show(workflow, opts),
        Command::New(opts) => new(workflow, actor, opts),
        Command::Transition(opts) => transition(workflow, actor, opts),
        Command::NewVersion(opts) => new_version(workflow, actor, opts),
        Command::Parts(opts) => parts(workflow, opts),
    }
}

/// Find an edition by its ID, or the latest edition with given slug.
pub fn find<S: Store>(store: &S, key: &str) -> Result<Edition> {
    if let Ok(id) = key.parse::<EditionId>() {
        return Ok(store.find(id)?);
    }

    store.find_by_slug(key)?
        .ok_or_else(|| format_err!("No edition with ID or slug {:?}", key))
}

pub fn list<S: Store>(workflow: &Workflow<S>) -> Result<()> {
    let rows = workflow.store().all()?
        .iter()
        .map(|edition| vec![
            util::edition_id(edition),
            edition.slug().to_string(),
            edition.version_number().to_string(),
            edition.kind().to_string(),
            edition.state().to_string(),
            edition.title().to_string(),
        ])
        .collect::<Vec<_>>();

    print_table(&["ID", "Slug", "Ver", "Kind", "State", "Title"], &rows);

    Ok(())
}

#[derive(StructOpt)]
pub struct EditionOpts {
    /// Edition ID or slug
    edition: String,
}

pub fn show<S: Store>(workflow: &Workflow<S>, opts: EditionOpts) -> Result<()> {
    let edition = find(workflow.store(), &opts.edition)?;

    println!("ID:            {}", util::edition_id(&edition));
    println!("Slug:          {}", edition.slug());
    println!("Title:         {}", edition.title());
    println!("Kind:          {}", edition.kind());
    println!("Content item:  {}", edition.panopticon_id());
    println!("Version:       {}", edition.version_number());
    println!("State:         {}", edition.state());
    println!("Rejected:      {}", edition.rejected_count());
    println!("Created:       {}", edition.created_at());

    let rows = edition.actions().iter()
        .map(|action| vec![
            action.created_at().format("%Y-%m-%d %H:%M:%S").to_string(),
            action.request_type().to_string(),
            util::actor(action.requester()),
            action.recipient().map(util::actor).unwrap_or_default(),
            util::first_line(action.comment()),
        ])
        .collect::<Vec<_>>();

    if !rows.is_empty() {
        println!();
        print_table(&["Date", "Action", "By", "For", "Comment"], &rows);
    }

    for action in edition.actions() {
        if let Some(request) = action.fact_check() {
            println!();
            println!("Fact check sent to {}, replies to {}",
                request.email_addresses.join(", "), request.reply_to);
        }

        if let Some(diff) = action.diff() {
            println!();
            println!("Changes published on {}:", action.created_at());
            println!("{}", diff);
        }
    }

    println!();
    println!("{}", edition.whole_body());

    Ok(())
}

#[derive(StructOpt)]
pub struct NewOpts {
    /// Kind of the edition (answer, guide, programme, place, or transaction)
    kind: EditionKind,
    /// URL slug
    slug: String,
    /// Title
    #[structopt(long = "title", short = "t")]
    title: String,
    /// Reference to the content item
    #[structopt(long = "panopticon-id")]
    panopticon_id: String,
    /// Main text: body of an answer, overview of a guide or programme, or
    /// introduction of a place or transaction
    #[structopt(long = "body", short = "b")]
    body: Option<String>,
}

pub fn new<S: Store>(workflow: &Workflow<S>, actor: Actor, opts: NewOpts)
-> Result<()> {
    let NewOpts { kind, slug, title, panopticon_id, body } = opts;

    let mut content = Content::empty(kind);

    if let Some(body) = body {
        match content {
            Content::Answer(ref mut answer) => answer.body = body,
            Content::Guide(ref mut guide) => guide.overview = body,
            Content::Programme(ref mut programme) => programme.overview = body,
            Content::Place(ref mut place) => place.introduction = body,
            Content::Transaction(ref mut transaction) =>
                transaction.introduction = body,
        }
    }

    let edition = workflow.create_edition(
        actor, content, NewEdition { slug, title, panopticon_id })?;

    println!("{}", util::edition_id(&edition));

    Ok(())
}

#[derive(StructOpt)]
pub struct TransitionOpts {
    /// Edition ID or slug
    edition: String,
    /// Transition to apply
    transition: Transition,
    /// Comment to record with the transition
    #[structopt(long = "comment", short = "m", default_value = "")]
    comment: String,
    /// Comma-separated list of fact-check recipients
    #[structopt(long = "emails")]
    emails: Option<String>,
    /// Message to send to fact-check recipients
    #[structopt(long = "message")]
    message: Option<String>,
}

pub fn transition<S: Store>(workflow: &Workflow<S>, actor: Actor, opts: TransitionOpts)
-> Result<()> {
    let mut edition = find(workflow.store(), &opts.edition)?;

    let mut params = Params::comment(opts.comment);
    if let Some(ref emails) = opts.emails {
        params = params.email_addresses(emails);
    }
    if let Some(message) = opts.message {
        params = params.customised_message(message);
    }

    workflow.perform(actor, &mut edition, opts.transition, params)?;

    println!("{} is now {}", util::edition_id(&edition), edition.state());

    Ok(())
}

#[derive(StructOpt)]
pub struct NewVersionOpts {
    /// Edition ID or slug
    edition: String,
    /// Kind of the new edition, if different
    #[structopt(long = "kind", short = "k")]
    kind: Option<EditionKind>,
}

pub fn new_version<S: Store>(workflow: &Workflow<S>, actor: Actor, opts: NewVersionOpts)
-> Result<()> {
    let edition = find(workflow.store(), &opts.edition)?;
    let clone = workflow.new_version(actor, &edition, opts.kind)?;

    println!("{}", util::edition_id(&clone));

    Ok(())
}

#[derive(StructOpt)]
pub struct PartsOpts {
    /// Edition ID or slug
    edition: String,
    #[structopt(subcommand)]
    command: Option<PartsCommand>,
}

#[derive(StructOpt)]
pub enum PartsCommand {
    /// Add a part at the end
    #[structopt(name = "add")]
    Add {
        /// Title of the new part
        title: String,
        /// Body of the new part
        #[structopt(default_value = "")]
        body: String,
    },
    /// Change a part
    #[structopt(name = "edit")]
    Edit {
        /// Index of the part, as listed
        index: usize,
        #[structopt(long = "title", short = "t")]
        title: Option<String>,
        #[structopt(long = "body", short = "b")]
        body: Option<String>,
        /// New position of the part
        #[structopt(long = "order", short = "o")]
        order: Option<u32>,
    },
    /// Remove a part
    #[structopt(name = "remove")]
    Remove {
        /// Index of the part, as listed
        index: usize,
    },
}

pub fn parts<S: Store>(workflow: &Workflow<S>, opts: PartsOpts) -> Result<()> {
    let mut edition = find(workflow.store(), &opts.edition)?;
    let kind = edition.kind();

    if !kind.has_parts() {
        return Err(format_err!("Editions of kind {} have no parts", kind));
    }

    if let Some(command) = opts.command {
        let update = match command {
            PartsCommand::Add { title, body } =>
                PartUpdate::Add(Part::new(title, body)),
            PartsCommand::Edit { index, title, body, order } =>
                PartUpdate::Edit { index, title, body, order },
            PartsCommand::Remove { index } => PartUpdate::Destroy { index },
        };

        if let Some(parts) = edition.content_mut()?.parts_mut() {
            parts.apply_updates(vec![update])?;
        }

        workflow.store().save(&mut edition)?;
    }

    let parts = match edition.parts() {
        Some(parts) => parts,
        None => return Ok(()),
    };

    let rows = parts.iter()
        .enumerate()
        .map(|(inx, part)| vec![
            inx.to_string(),
            part.order.map(|order| order.to_string()).unwrap_or_default(),
            part.title.clone(),
            util::first_line(&part.body),
        ])
        .collect::<Vec<_>>();

    print_table(&["#", "Order", "Title", "Body"], &rows);

    if let Err(errors) = parts.validate() {
        println!();
        println!("{}", errors);
    }

    Ok(())
}
