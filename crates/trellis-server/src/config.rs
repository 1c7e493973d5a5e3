//! Runtime server configuration, deserialised from `trellis.toml` (or the
//! `TRELLIS_*` environment).
//!
//! Besides transport settings, the configuration carries the local user
//! accounts and any deployment-specific entity types registered on top of
//! the built-in catalog.

use std::path::PathBuf;

use serde::Deserialize;
use trellis_core::{
  plan::PlanLimits,
  schema::{EntitySchema, FieldDef},
};
use uuid::Uuid;

#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  pub store_path: PathBuf,

  /// Page size applied when a list request names none.
  #[serde(default)]
  pub default_page_size: Option<u64>,
  /// Hard ceiling on the page size a client may request.
  #[serde(default)]
  pub max_page_size: Option<u64>,

  /// Extra entity types registered alongside the built-in catalog.
  #[serde(default)]
  pub entities: Vec<EntityConfig>,

  /// Accounts accepted by HTTP Basic authentication.
  #[serde(default)]
  pub users: Vec<UserConfig>,
}

impl ServerConfig {
  pub fn plan_limits(&self) -> PlanLimits {
    let defaults = PlanLimits::default();
    PlanLimits {
      default_page_size: self
        .default_page_size
        .unwrap_or(defaults.default_page_size),
      max_page_size: self.max_page_size.unwrap_or(defaults.max_page_size),
    }
  }
}

fn default_host() -> String {
  "127.0.0.1".to_string()
}

fn default_port() -> u16 {
  8080
}

// ─── Entities ────────────────────────────────────────────────────────────────

/// A configured entity type; validated into an
/// [`EntitySchema`] at startup.
#[derive(Deserialize, Clone)]
pub struct EntityConfig {
  pub name:   String,
  pub fields: Vec<FieldDef>,
  #[serde(default = "default_true")]
  pub soft_delete: bool,
  #[serde(default = "default_true")]
  pub team_visibility: bool,
  #[serde(default = "default_primary_key")]
  pub primary_key: String,
}

impl EntityConfig {
  pub fn to_schema(&self) -> trellis_core::Result<EntitySchema> {
    EntitySchema::new(
      self.name.clone(),
      self.fields.clone(),
      self.primary_key.clone(),
      self.soft_delete,
      self.team_visibility,
    )
  }
}

fn default_true() -> bool {
  true
}

fn default_primary_key() -> String {
  "id".to_string()
}

// ─── Users ───────────────────────────────────────────────────────────────────

/// One local account.
#[derive(Deserialize, Clone)]
pub struct UserConfig {
  pub id:       Uuid,
  pub username: String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  #[serde(default)]
  pub is_admin: bool,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn entity_config_builds_a_schema() {
    let config: EntityConfig = serde_json::from_value(serde_json::json!({
      "name": "Project",
      "fields": [
        { "name": "id",           "type": "reference" },
        { "name": "name",         "type": "string", "required": true },
        { "name": "assignedUser", "type": "reference" },
        { "name": "deleted",      "type": "boolean" },
      ],
    }))
    .unwrap();
    let schema = config.to_schema().unwrap();
    assert_eq!(schema.name(), "Project");
    assert!(schema.soft_delete());
    assert!(schema.team_visibility());
    assert_eq!(schema.primary_key(), "id");
  }

  #[test]
  fn capability_flags_without_their_fields_fail_validation() {
    let config: EntityConfig = serde_json::from_value(serde_json::json!({
      "name": "Project",
      "fields": [{ "name": "id", "type": "reference" }],
    }))
    .unwrap();
    assert!(config.to_schema().is_err());
  }
}
