mod content;
mod edition;
mod parts;
mod user;

pub use self::{
    content::{
        Answer,
        Content,
        EditionKind,
        Guide,
        ParseKindError,
        Place,
        Programme,
        Transaction,
    },
    edition::{
        EditError,
        Edition,
        EditionId,
        NewEdition,
        NotPublished,
        ParseEditionIdError,
    },
    parts::{Part, PartUpdate, Parts, PartsErrors, UpdatePartsError, UNORDERED},
    user::{User, UserId},
};
