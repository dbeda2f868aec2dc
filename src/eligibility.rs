//! Pure assignment-matching predicates. Group membership is the only channel
//! that needs a secondary store query, so the service resolves groups and
//! feeds them in; everything here is a plain function over values and is
//! exercised directly by unit tests.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::assignment::Assignment;
use crate::models::group::EligibilityGroup;

/// Whether the assignment is currently usable, independent of membership:
/// deactivated assignments and assignments outside their window never grant
/// access.
pub fn assignment_is_active(assignment: &Assignment, now: DateTime<Utc>) -> bool {
    if !assignment.is_active {
        return false;
    }
    if let Some(start) = assignment.start_at {
        if now < start {
            return false;
        }
    }
    if let Some(end) = assignment.end_at {
        if now > end {
            return false;
        }
    }
    true
}

/// Channels one and two of the disjunction: explicit principal id, then role
/// names. Cheap, in-memory, checked before any group lookup.
pub fn matches_users_or_roles(assignment: &Assignment, user_id: Uuid, roles: &[String]) -> bool {
    if assignment.assigned_to_users.contains(&user_id) {
        return true;
    }
    roles
        .iter()
        .any(|role| assignment.assigned_to_roles.iter().any(|r| r == role))
}

/// Channel three: membership in any *active* group the assignment targets.
/// Membership is evaluated against the group's current roster, never cached.
pub fn matches_groups(
    assignment: &Assignment,
    user_id: Uuid,
    groups: &[EligibilityGroup],
) -> bool {
    groups.iter().any(|group| {
        group.is_active
            && assignment.assigned_to_groups.contains(&group.id)
            && group.members.contains(&user_id)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn assignment() -> Assignment {
        Assignment {
            id: Uuid::new_v4(),
            test_id: Uuid::new_v4(),
            assigned_by: Uuid::new_v4(),
            assigned_to_users: vec![],
            assigned_to_roles: vec![],
            assigned_to_groups: vec![],
            start_at: None,
            end_at: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn group(id: Uuid, members: Vec<Uuid>, is_active: bool) -> EligibilityGroup {
        EligibilityGroup {
            id,
            name: format!("group-{}", id),
            description: None,
            members,
            is_active,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn deactivated_assignment_is_never_active() {
        let mut a = assignment();
        a.is_active = false;
        assert!(!assignment_is_active(&a, Utc::now()));
    }

    #[test]
    fn window_bounds_gate_activity() {
        let now = Utc::now();
        let mut a = assignment();
        a.start_at = Some(now + Duration::hours(1));
        assert!(!assignment_is_active(&a, now));

        a.start_at = Some(now - Duration::hours(2));
        a.end_at = Some(now - Duration::hours(1));
        assert!(!assignment_is_active(&a, now));

        a.end_at = Some(now + Duration::hours(1));
        assert!(assignment_is_active(&a, now));
    }

    #[test]
    fn open_ended_window_is_active() {
        assert!(assignment_is_active(&assignment(), Utc::now()));
    }

    #[test]
    fn direct_user_channel_matches_without_roles() {
        let user = Uuid::new_v4();
        let mut a = assignment();
        a.assigned_to_users = vec![Uuid::new_v4(), user];
        assert!(matches_users_or_roles(&a, user, &[]));
    }

    #[test]
    fn role_channel_matches_when_user_not_listed() {
        let mut a = assignment();
        a.assigned_to_roles = vec!["sales".into(), "hr".into()];
        let roles = vec!["engineering".into(), "hr".into()];
        assert!(matches_users_or_roles(&a, Uuid::new_v4(), &roles));
        assert!(!matches_users_or_roles(&a, Uuid::new_v4(), &["ops".into()]));
    }

    #[test]
    fn group_channel_requires_active_targeted_group() {
        let user = Uuid::new_v4();
        let targeted = Uuid::new_v4();
        let mut a = assignment();
        a.assigned_to_groups = vec![targeted];

        let active = group(targeted, vec![user], true);
        assert!(matches_groups(&a, user, &[active.clone()]));

        let inactive = group(targeted, vec![user], false);
        assert!(!matches_groups(&a, user, &[inactive]));

        let untargeted = group(Uuid::new_v4(), vec![user], true);
        assert!(!matches_groups(&a, user, &[untargeted]));

        assert!(!matches_groups(&a, Uuid::new_v4(), &[active]));
    }
}
