//! Commands for fact checking.

use imprimatur_models::{Store, Workflow};
use std::io::{self, Read};
use structopt::StructOpt;

use crate::Result;
use super::{edition, util};

#[derive(StructOpt)]
pub struct Opts {
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
pub enum Command {
    /// Print the address to which fact-check replies for an edition are sent
    #[structopt(name = "address")]
    Address {
        /// Edition ID or slug
        edition: String,
    },
    /// Record a fact-check reply read from standard input
    #[structopt(name = "receive")]
    Receive {
        /// Address at which the reply was received
        address: String,
    },
}

pub fn main<S: Store>(workflow: &Workflow<S>, opts: Opts) -> Result<()> {
    match opts.command {
        Command::Address { edition } => address(workflow, &edition),
        Command::Receive { address } => receive(workflow, &address),
    }
}

fn address<S: Store>(workflow: &Workflow<S>, key: &str) -> Result<()> {
    let edition = edition::find(workflow.store(), key)?;
    println!("{}", workflow.addresses().for_edition(&edition)?);
    Ok(())
}

fn receive<S: Store>(workflow: &Workflow<S>, address: &str) -> Result<()> {
    let mut body = String::new();
    io::stdin().read_to_string(&mut body)?;

    let edition = workflow.receive_fact_check_reply(address, body.trim_end())?;

    println!("{} is now {}", util::edition_id(&edition), edition.state());

    Ok(())
}
