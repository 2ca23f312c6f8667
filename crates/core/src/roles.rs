//! Well-known role names, capabilities, and the authorization seam.
//!
//! Role names must match the seed data in `0001_create_core_tables.sql`.

use crate::error::CoreError;
use crate::types::DbId;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_SUPERVISOR: &str = "supervisor";
pub const ROLE_SITE_ENGINEER: &str = "site_engineer";
pub const ROLE_OPERATOR: &str = "operator";

/// Roles that receive site-level alerts such as low stock.
pub const ALERT_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_SUPERVISOR];

/// An action class an actor may or may not be allowed to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Push and pull through the sync protocol.
    SyncData,
    /// Create, edit, submit and delete own activities.
    EditActivity,
    /// Approve or reject submitted activities.
    ApproveActivity,
    /// Sign or reject hold points.
    SignHoldPoint,
    /// Act on other users' records (e.g. submit on their behalf).
    Admin,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::SyncData => "sync_data",
            Capability::EditActivity => "edit_activity",
            Capability::ApproveActivity => "approve_activity",
            Capability::SignHoldPoint => "sign_hold_point",
            Capability::Admin => "admin",
        }
    }
}

/// The authenticated caller of an engine operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: DbId,
    pub role: String,
}

impl Actor {
    pub fn new(user_id: DbId, role: impl Into<String>) -> Self {
        Self {
            user_id,
            role: role.into(),
        }
    }
}

/// Capability check collaborator: `actor, capability -> allow | deny`.
pub trait Authorizer: Send + Sync {
    fn allows(&self, actor: &Actor, capability: Capability) -> bool;

    /// Fail with [`CoreError::Forbidden`] unless `actor` holds `capability`.
    fn require(&self, actor: &Actor, capability: Capability) -> Result<(), CoreError> {
        if self.allows(actor, capability) {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "Role '{}' lacks the {} capability",
                actor.role,
                capability.as_str()
            )))
        }
    }
}

/// Static role → capability table.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoleAuthorizer;

impl Authorizer for RoleAuthorizer {
    fn allows(&self, actor: &Actor, capability: Capability) -> bool {
        use Capability::*;
        match actor.role.as_str() {
            ROLE_ADMIN => true,
            ROLE_SUPERVISOR => capability != Admin,
            ROLE_SITE_ENGINEER => matches!(capability, SyncData | EditActivity | SignHoldPoint),
            ROLE_OPERATOR => matches!(capability, SyncData | EditActivity),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn admin_holds_every_capability() {
        let admin = Actor::new(1, ROLE_ADMIN);
        for cap in [
            Capability::SyncData,
            Capability::EditActivity,
            Capability::ApproveActivity,
            Capability::SignHoldPoint,
            Capability::Admin,
        ] {
            assert!(RoleAuthorizer.allows(&admin, cap));
        }
    }

    #[test]
    fn operator_cannot_approve() {
        let op = Actor::new(2, ROLE_OPERATOR);
        assert!(RoleAuthorizer.allows(&op, Capability::EditActivity));
        assert!(!RoleAuthorizer.allows(&op, Capability::ApproveActivity));
        assert!(!RoleAuthorizer.allows(&op, Capability::SignHoldPoint));
    }

    #[test]
    fn supervisor_is_not_admin() {
        let sup = Actor::new(3, ROLE_SUPERVISOR);
        assert!(RoleAuthorizer.allows(&sup, Capability::ApproveActivity));
        assert!(!RoleAuthorizer.allows(&sup, Capability::Admin));
    }

    #[test]
    fn unknown_role_is_denied() {
        let who = Actor::new(4, "visitor");
        let err = RoleAuthorizer.require(&who, Capability::SyncData).unwrap_err();
        assert_matches!(err, CoreError::Forbidden(msg) if msg.contains("sync_data"));
    }
}
