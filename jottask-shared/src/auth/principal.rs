/// The authenticated caller of an operation
///
/// Every store and service operation takes the principal as an explicit
/// argument; there is no ambient "current user".

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity established by a validated access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Subject of the token, equal to `users.id`
    pub user_id: Uuid,

    /// Email claim, when present
    pub email: Option<String>,
}

impl Principal {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            email: None,
        }
    }

    /// True when this principal is the given user
    pub fn is(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}
