use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role claim carried by the authenticated principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Guide,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Guide => "guide",
            Role::User => "user",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "guide" => Ok(Role::Guide),
            "user" => Ok(Role::User),
            _ => Err(()),
        }
    }
}

/// Request-scoped identity passed explicitly into every lifecycle operation.
///
/// There is no ambient "current user": handlers build one of these from the
/// bearer claims and thread it through.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user_id: Uuid,
    pub role: Role,
}

impl RequestContext {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins may act on anyone's resources; everyone else only on their own.
    pub fn owns_or_admin(&self, owner_id: Uuid) -> bool {
        self.is_admin() || self.user_id == owner_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_passes_ownership_check_for_any_owner() {
        let ctx = RequestContext::new(Uuid::new_v4(), Role::Admin);
        assert!(ctx.owns_or_admin(Uuid::new_v4()));
    }

    #[test]
    fn user_only_owns_own_resources() {
        let id = Uuid::new_v4();
        let ctx = RequestContext::new(id, Role::User);
        assert!(ctx.owns_or_admin(id));
        assert!(!ctx.owns_or_admin(Uuid::new_v4()));
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Admin, Role::Guide, Role::User] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("root".parse::<Role>().is_err());
    }
}
