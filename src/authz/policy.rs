use uuid::Uuid;

use super::subject::Subject;
use crate::models::user::Role;

/// Semantic operation requested against a resource. The router performs
/// the HTTP-verb derivation: GET/HEAD handlers decide with `Read`, POST
/// with `Create`, PATCH with `Update`, DELETE with `Delete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Category,
    Genre,
    Title,
    Review,
    Comment,
}

impl ResourceKind {
    /// Catalog resources are curated by administrators; content resources
    /// (reviews, comments) are written by any authenticated user.
    fn is_catalog(self) -> bool {
        matches!(self, ResourceKind::Category | ResourceKind::Genre | ResourceKind::Title)
    }
}

/// Collection-level decision: list and create, plus slug-keyed deletes on
/// the catalog collections.
pub fn can_access_collection(subject: &Subject, action: Action, kind: ResourceKind) -> bool {
    match action {
        Action::Read => true,
        Action::Create | Action::Delete if kind.is_catalog() => subject.is_admin(),
        Action::Create => subject.is_authenticated(),
        Action::Update | Action::Delete => false,
    }
}

/// Object-level decision for a specific instance. `author` is the owning
/// identity for resources that carry one (reviews, comments) and `None`
/// for catalog resources. The role grant is checked before ownership;
/// either alone suffices.
pub fn can_access_object(subject: &Subject, action: Action, author: Option<Uuid>) -> bool {
    match action {
        Action::Read => true,
        Action::Update | Action::Delete => match author {
            Some(author_id) => match subject.role() {
                Some(Role::Moderator) | Some(Role::Admin) => true,
                _ => subject.id() == Some(author_id),
            },
            None => subject.is_admin(),
        },
        // Creation is a collection-level decision.
        Action::Create => false,
    }
}

/// Sole gate on the `/users` administration collection. Self-profile
/// access goes through the `/users/me` path instead and is open to any
/// authenticated subject.
pub fn can_manage_users(subject: &Subject) -> bool {
    subject.is_admin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user() -> Subject {
        Subject::authenticated(Uuid::new_v4(), Role::User)
    }

    fn moderator() -> Subject {
        Subject::authenticated(Uuid::new_v4(), Role::Moderator)
    }

    fn admin() -> Subject {
        Subject::authenticated(Uuid::new_v4(), Role::Admin)
    }

    #[test]
    fn read_is_public_everywhere() {
        for kind in [
            ResourceKind::Category,
            ResourceKind::Genre,
            ResourceKind::Title,
            ResourceKind::Review,
            ResourceKind::Comment,
        ] {
            assert!(can_access_collection(&Subject::Anonymous, Action::Read, kind));
            assert!(can_access_collection(&user(), Action::Read, kind));
        }
        assert!(can_access_object(&Subject::Anonymous, Action::Read, None));
        assert!(can_access_object(&Subject::Anonymous, Action::Read, Some(Uuid::new_v4())));
    }

    #[test]
    fn catalog_writes_require_admin() {
        for kind in [ResourceKind::Category, ResourceKind::Genre, ResourceKind::Title] {
            assert!(!can_access_collection(&Subject::Anonymous, Action::Create, kind));
            assert!(!can_access_collection(&user(), Action::Create, kind));
            assert!(!can_access_collection(&moderator(), Action::Create, kind));
            assert!(can_access_collection(&admin(), Action::Create, kind));
            assert!(!can_access_collection(&moderator(), Action::Delete, kind));
            assert!(can_access_collection(&admin(), Action::Delete, kind));
        }
    }

    #[test]
    fn content_create_requires_authentication_only() {
        for kind in [ResourceKind::Review, ResourceKind::Comment] {
            assert!(!can_access_collection(&Subject::Anonymous, Action::Create, kind));
            assert!(can_access_collection(&user(), Action::Create, kind));
            assert!(can_access_collection(&moderator(), Action::Create, kind));
            assert!(can_access_collection(&admin(), Action::Create, kind));
        }
    }

    #[test]
    fn owned_object_write_is_owner_or_role_grant() {
        let owner_id = Uuid::new_v4();
        let owner = Subject::authenticated(owner_id, Role::User);
        let stranger = user();

        for action in [Action::Update, Action::Delete] {
            assert!(can_access_object(&owner, action, Some(owner_id)));
            assert!(!can_access_object(&stranger, action, Some(owner_id)));
            assert!(can_access_object(&moderator(), action, Some(owner_id)));
            assert!(can_access_object(&admin(), action, Some(owner_id)));
            assert!(!can_access_object(&Subject::Anonymous, action, Some(owner_id)));
        }
    }

    #[test]
    fn authorless_object_write_is_admin_only() {
        for action in [Action::Update, Action::Delete] {
            assert!(!can_access_object(&Subject::Anonymous, action, None));
            assert!(!can_access_object(&user(), action, None));
            assert!(!can_access_object(&moderator(), action, None));
            assert!(can_access_object(&admin(), action, None));
        }
    }

    #[test]
    fn user_administration_is_admin_only() {
        assert!(!can_manage_users(&Subject::Anonymous));
        assert!(!can_manage_users(&user()));
        assert!(!can_manage_users(&moderator()));
        assert!(can_manage_users(&admin()));
    }
}
