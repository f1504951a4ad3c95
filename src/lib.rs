use failure::Error;
use imprimatur_mail::Mailer;
use imprimatur_models::{Actor, FileStore, UserId, Workflow};
use std::path::PathBuf;
use structopt::StructOpt;

mod config;
mod edition;
mod fact_check;
mod util;

use self::config::Config;

pub type Result<T, E=Error> = std::result::Result<T, E>;

#[derive(StructOpt)]
#[structopt(name = "imprimatur")]
struct Opts {
    /// Path to the configuration file
    #[structopt(long = "config", short = "c", default_value = "config.toml",
        parse(from_os_str))]
    config: PathBuf,
    /// Act as the user with this ID rather than as the system
    #[structopt(long = "as")]
    user: Option<UserId>,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
enum Command {
    /// Manage editions
    #[structopt(name = "edition")]
    Edition(edition::Opts),
    /// Work with fact-check requests and replies
    #[structopt(name = "fact-check")]
    FactCheck(fact_check::Opts),
}

pub fn main() -> Result<()> {
    let opts = Opts::from_args();
    let config = config::load(&opts.config)?;

    setup_logging(&config.logging)?;

    // Validate after logging setup so that problems are logged.
    config.validate()?;

    let actor = opts.user.map(Actor::User).unwrap_or(Actor::System);
    let workflow = workflow(&config)?;

    match opts.command {
        Command::Edition(opts) => edition::main(&workflow, actor, opts),
        Command::FactCheck(opts) => fact_check::main(&workflow, opts),
    }
}

fn workflow(config: &Config) -> Result<Workflow<FileStore>> {
    let deployment = config.model.deployment.deployment()?;
    let store = FileStore::open(config.model.storage.path.clone());
    let mailer = Mailer::from_config(&config.mail)?;

    Ok(Workflow::new(store, &deployment).with_mailer(mailer))
}

fn setup_logging(config: &config::Logging) -> Result<()> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(config.level);

    for (module, level) in &config.filters {
        builder.filter_module(&module, *level);
    }

    builder.try_init()?;

    Ok(())
}
