/// Row-level access policy
///
/// Decides whether a principal may perform an operation on a row. The
/// decision is a pure function of the principal, the operation and the
/// ownership facts of the row, so it can be tested without a database.
/// Callers resolve ownership first (for notes and checklist items that means
/// looking up the parent task) and describe the row as a [`Resource`].
///
/// # Rules
///
/// | Resource | SELECT | INSERT | UPDATE | DELETE |
/// |---|---|---|---|---|
/// | User | own row | never | own row | never |
/// | SubscriptionPlan | anyone | never | never | never |
/// | Task | owner | owner | owner | owner |
/// | TaskNote / TaskChecklistItem | task owner | task owner | task owner | task owner |
/// | EmailConnection | owner | owner | owner | owner |
/// | EmailActionToken | never | never | never | never |
///
/// A missing principal is denied everything except reading plans. Denial is
/// a decision, not an error; [`require`] turns it into
/// [`Error::Unauthorized`] for callers that want `?`.
///
/// # Example
///
/// ```
/// use jottask_shared::auth::policy::{authorize, Decision, Operation, Resource};
/// use jottask_shared::auth::principal::Principal;
/// use uuid::Uuid;
///
/// let me = Principal::new(Uuid::new_v4());
/// let mine = Resource::Task { user_id: me.user_id };
/// let theirs = Resource::Task { user_id: Uuid::new_v4() };
///
/// assert_eq!(authorize(Some(&me), Operation::Update, &mine), Decision::Allow);
/// assert_eq!(authorize(Some(&me), Operation::Select, &theirs), Decision::Deny);
/// ```

use uuid::Uuid;

use super::principal::Principal;
use crate::error::{Error, Result};

/// Row operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Select,
        Operation::Insert,
        Operation::Update,
        Operation::Delete,
    ];
}

/// A row, reduced to the facts the policy needs
///
/// For INSERT the ownership fields carry the value being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// A profile row
    User { id: Uuid },

    /// Plan catalog row
    SubscriptionPlan,

    /// A task
    Task { user_id: Uuid },

    /// A note, owned through its task
    TaskNote { task_user_id: Uuid },

    /// A checklist item, owned through its task
    TaskChecklistItem { task_user_id: Uuid },

    /// A connected mailbox
    EmailConnection { user_id: Uuid },

    /// An action token; only the service path touches these
    EmailActionToken { user_id: Uuid },
}

/// Policy outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    fn when(allowed: bool) -> Self {
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}

/// Evaluates the policy for one row
pub fn authorize(principal: Option<&Principal>, operation: Operation, resource: &Resource) -> Decision {
    if let Resource::SubscriptionPlan = resource {
        return Decision::when(operation == Operation::Select);
    }

    let Some(principal) = principal else {
        return Decision::Deny;
    };

    match *resource {
        Resource::User { id } => Decision::when(
            matches!(operation, Operation::Select | Operation::Update) && principal.is(id),
        ),
        Resource::Task { user_id } | Resource::EmailConnection { user_id } => {
            Decision::when(principal.is(user_id))
        }
        Resource::TaskNote { task_user_id } | Resource::TaskChecklistItem { task_user_id } => {
            Decision::when(principal.is(task_user_id))
        }
        Resource::EmailActionToken { .. } | Resource::SubscriptionPlan => Decision::Deny,
    }
}

/// Like [`authorize`], but a denial is an [`Error::Unauthorized`]
pub fn require(principal: &Principal, operation: Operation, resource: &Resource) -> Result<()> {
    match authorize(Some(principal), operation, resource) {
        Decision::Allow => Ok(()),
        Decision::Deny => {
            tracing::debug!(
                user_id = %principal.user_id,
                ?operation,
                ?resource,
                "Access denied by policy"
            );
            Err(Error::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned_resources(owner: Uuid) -> Vec<Resource> {
        vec![
            Resource::Task { user_id: owner },
            Resource::TaskNote { task_user_id: owner },
            Resource::TaskChecklistItem { task_user_id: owner },
            Resource::EmailConnection { user_id: owner },
        ]
    }

    #[test]
    fn test_owner_allowed_everything_on_owned_rows() {
        let me = Principal::new(Uuid::new_v4());
        for resource in owned_resources(me.user_id) {
            for op in Operation::ALL {
                assert_eq!(authorize(Some(&me), op, &resource), Decision::Allow, "{op:?} {resource:?}");
            }
        }
    }

    #[test]
    fn test_cross_tenant_denied_everything() {
        let me = Principal::new(Uuid::new_v4());
        let other = Uuid::new_v4();

        let mut resources = owned_resources(other);
        resources.push(Resource::User { id: other });
        resources.push(Resource::EmailActionToken { user_id: other });

        for resource in resources {
            for op in Operation::ALL {
                assert_eq!(authorize(Some(&me), op, &resource), Decision::Deny, "{op:?} {resource:?}");
            }
        }
    }

    #[test]
    fn test_own_profile_select_update_only() {
        let me = Principal::new(Uuid::new_v4());
        let profile = Resource::User { id: me.user_id };

        assert!(authorize(Some(&me), Operation::Select, &profile).is_allowed());
        assert!(authorize(Some(&me), Operation::Update, &profile).is_allowed());
        assert!(!authorize(Some(&me), Operation::Insert, &profile).is_allowed());
        assert!(!authorize(Some(&me), Operation::Delete, &profile).is_allowed());
    }

    #[test]
    fn test_action_tokens_never_granted() {
        let me = Principal::new(Uuid::new_v4());
        let token = Resource::EmailActionToken { user_id: me.user_id };
        for op in Operation::ALL {
            assert_eq!(authorize(Some(&me), op, &token), Decision::Deny);
        }
    }

    #[test]
    fn test_anonymous_denied() {
        let owner = Uuid::new_v4();
        for resource in owned_resources(owner) {
            for op in Operation::ALL {
                assert_eq!(authorize(None, op, &resource), Decision::Deny);
            }
        }
        assert_eq!(authorize(None, Operation::Select, &Resource::User { id: owner }), Decision::Deny);
    }

    #[test]
    fn test_plans_readable_by_anyone() {
        assert!(authorize(None, Operation::Select, &Resource::SubscriptionPlan).is_allowed());
        let me = Principal::new(Uuid::new_v4());
        assert!(!authorize(Some(&me), Operation::Update, &Resource::SubscriptionPlan).is_allowed());
    }

    #[test]
    fn test_insert_checked_against_written_owner() {
        let me = Principal::new(Uuid::new_v4());
        let forged = Resource::Task { user_id: Uuid::new_v4() };
        assert!(matches!(
            require(&me, Operation::Insert, &forged),
            Err(Error::Unauthorized)
        ));
    }
}
