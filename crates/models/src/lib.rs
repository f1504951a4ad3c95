#[macro_use] mod macros;

mod config;

pub mod audit;
pub mod diff;
pub mod fact_check;
pub mod models;
pub mod store;
pub mod workflow;

pub use self::{
    audit::{Action, ActionDetails, ActionLog, Actor, FactCheckRequest},
    config::{Config, DeploymentConfig, DeploymentConfigError, Storage},
    fact_check::{
        Deployment,
        DeploymentError,
        DeploymentIdentity,
        FactCheckAddress,
        FactCheckMail,
        FactCheckMailer,
        MalformedFactCheckAddress,
    },
    models::*,
    store::{FileStore, MemoryStore, Store, StoreError},
    workflow::{
        Params,
        Rule,
        State,
        Transition,
        TransitionError,
        Workflow,
        WorkflowError,
    },
};
