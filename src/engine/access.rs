//! Access Scope Resolver
//!
//! Super admins see everything; team members see the clients they created;
//! portal users see the one client they are linked to. SUPER_ADMIN accounts
//! are protected from deactivation and deletion by every path.

use crate::error::{CrmError, Result};
use crate::model::{Client, User, UserRole};

/// Whether `user` may read or mutate `client`
pub fn can_access_client(user: &User, client: &Client) -> bool {
    user.role == UserRole::SuperAdmin
        || client.created_by == user.id
        || user.client_id == Some(client.id)
}

pub fn require_client_access(user: &User, client: &Client) -> Result<()> {
    if can_access_client(user, client) {
        Ok(())
    } else {
        Err(CrmError::Forbidden)
    }
}

pub fn require_super_admin(user: &User) -> Result<()> {
    if user.role == UserRole::SuperAdmin {
        Ok(())
    } else {
        Err(CrmError::Forbidden)
    }
}

/// Gate for deactivating or deleting a team account. No caller, super admin
/// or otherwise, may remove a SUPER_ADMIN or act on their own account.
pub fn require_removable(actor: &User, target: &User) -> Result<()> {
    if target.role == UserRole::SuperAdmin || actor.id == target.id {
        return Err(CrmError::Forbidden);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CompanyType;
    use uuid::Uuid;

    fn user(role: UserRole) -> User {
        User::new("Test", "t@example.com", "hash".to_string(), role)
    }

    fn client_owned_by(owner: Uuid) -> Client {
        Client::new(
            "Acme".to_string(),
            "ABCDE1234F".to_string(),
            CompanyType::Firm,
            "a@b.example".to_string(),
            None,
            owner,
        )
    }

    #[test]
    fn test_super_admin_sees_everything() {
        let admin = user(UserRole::SuperAdmin);
        let client = client_owned_by(Uuid::new_v4());
        assert!(can_access_client(&admin, &client));
    }

    #[test]
    fn test_owner_sees_own_client_only() {
        let owner = user(UserRole::TeamMember);
        let stranger = user(UserRole::TeamMember);
        let client = client_owned_by(owner.id);
        assert!(can_access_client(&owner, &client));
        assert!(!can_access_client(&stranger, &client));
        assert!(matches!(
            require_client_access(&stranger, &client),
            Err(CrmError::Forbidden)
        ));
    }

    #[test]
    fn test_portal_user_sees_linked_client() {
        let client = client_owned_by(Uuid::new_v4());
        let mut portal = user(UserRole::Client);
        assert!(!can_access_client(&portal, &client));
        portal.client_id = Some(client.id);
        assert!(can_access_client(&portal, &client));
    }

    #[test]
    fn test_super_admin_cannot_be_removed_even_by_super_admin() {
        let actor = user(UserRole::SuperAdmin);
        let target = user(UserRole::SuperAdmin);
        assert!(matches!(
            require_removable(&actor, &target),
            Err(CrmError::Forbidden)
        ));
    }

    #[test]
    fn test_no_self_removal() {
        let actor = user(UserRole::SuperAdmin);
        assert!(matches!(
            require_removable(&actor, &actor),
            Err(CrmError::Forbidden)
        ));
    }

    #[test]
    fn test_team_member_is_removable_by_admin() {
        let actor = user(UserRole::SuperAdmin);
        let target = user(UserRole::TeamMember);
        assert!(require_removable(&actor, &target).is_ok());
    }

    #[test]
    fn test_require_super_admin() {
        assert!(require_super_admin(&user(UserRole::SuperAdmin)).is_ok());
        assert!(require_super_admin(&user(UserRole::TeamMember)).is_err());
        assert!(require_super_admin(&user(UserRole::Member)).is_err());
    }
}
