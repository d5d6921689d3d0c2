use uuid::Uuid;

use crate::models::user::Role;

/// The actor behind one request. Built once by the authentication
/// extractor and immutable for the duration of a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Anonymous,
    Authenticated { id: Uuid, role: Role },
}

impl Subject {
    pub fn authenticated(id: Uuid, role: Role) -> Self {
        Subject::Authenticated { id, role }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Subject::Authenticated { .. })
    }

    pub fn id(&self) -> Option<Uuid> {
        match self {
            Subject::Anonymous => None,
            Subject::Authenticated { id, .. } => Some(*id),
        }
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            Subject::Anonymous => None,
            Subject::Authenticated { role, .. } => Some(*role),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }
}
