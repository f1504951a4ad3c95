use serde::{Deserialize, Serialize};

pub type UserId = i32;

/// A member of editorial staff.
///
/// Users only take part in the workflow as actors; the only thing which
/// matters about them is their identity.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct User {
    id: UserId,
}

impl User {
    pub fn new(id: UserId) -> User {
        User { id }
    }

    pub fn id(&self) -> UserId {
        self.id
    }
}
