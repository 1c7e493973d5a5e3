//! Principal: the authenticated actor an operation runs on behalf of.
//!
//! The core never authenticates; a principal arrives already validated from
//! the transport layer's auth middleware.

use std::collections::HashSet;

use uuid::Uuid;

/// The acting user: identity, team memberships, and the admin flag.
/// Administrators bypass visibility filtering entirely.
#[derive(Debug, Clone)]
pub struct Principal {
  pub id:       Uuid,
  pub teams:    HashSet<Uuid>,
  pub is_admin: bool,
}

impl Principal {
  /// A regular user with the given team memberships.
  pub fn user(id: Uuid, teams: impl IntoIterator<Item = Uuid>) -> Self {
    Self { id, teams: teams.into_iter().collect(), is_admin: false }
  }

  /// An administrator. Team memberships are irrelevant for admins.
  pub fn admin(id: Uuid) -> Self {
    Self { id, teams: HashSet::new(), is_admin: true }
  }
}
