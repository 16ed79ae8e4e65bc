// permx/src/utils/structs.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// `resource -> action -> flag` as delivered by the backend. Only the integer `1` grants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionGrants(BTreeMap<String, BTreeMap<String, Value>>);

impl PermissionGrants {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no resource keys are present at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_granted(&self, resource: &str, action: &str) -> bool {
        self.0
            .get(resource)
            .and_then(|actions| actions.get(action))
            .map_or(false, |flag| flag.as_u64() == Some(1))
    }

    pub fn set(&mut self, resource: &str, action: &str, flag: Value) {
        self.0
            .entry(resource.to_string())
            .or_default()
            .insert(action.to_string(), flag);
    }

    /// Builder used mostly in tests and fixtures.
    pub fn grant(mut self, resource: &str, action: &str) -> Self {
        self.set(resource, action, Value::from(1));
        self
    }

    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `resource.action` pairs that are actually granted.
    pub fn granted_pairs(&self) -> Vec<String> {
        self.0
            .iter()
            .flat_map(|(resource, actions)| {
                actions
                    .iter()
                    .filter(|(_, flag)| flag.as_u64() == Some(1))
                    .map(move |(action, _)| format!("{}.{}", resource, action))
            })
            .collect()
    }
}

/// The authenticated user as handed over by the session provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrentUser(pub Value);

impl CurrentUser {
    pub fn new(payload: Value) -> Self {
        Self(payload)
    }

    /// Best-effort identifier for log lines.
    pub fn label(&self) -> String {
        ["email", "id", "_id", "username"]
            .iter()
            .find_map(|field| match self.0.get(*field) {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| "<anonymous>".to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreState {
    pub grants: PermissionGrants,
    pub is_loading: bool,
    pub error: Option<String>,
    pub loaded_at: Option<DateTime<Utc>>,
}

// User-facing notification emitted on denial
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

impl Notice {
    pub fn access_denied(permission_key: &str) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: format!(
                "Access denied: you don't have permission to access this page ({})",
                permission_key
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_only_integer_one_grants() {
        let grants: PermissionGrants = serde_json::from_value(json!({
            "providers": { "add": "1", "edit": true, "view": 1.0, "list": 0, "menu": 1, "delete": 2 }
        }))
        .unwrap();

        assert!(grants.is_granted("providers", "menu"));
        assert!(!grants.is_granted("providers", "add"));
        assert!(!grants.is_granted("providers", "edit"));
        assert!(!grants.is_granted("providers", "view"));
        assert!(!grants.is_granted("providers", "list"));
        assert!(!grants.is_granted("providers", "delete"));
        assert!(!grants.is_granted("providers", "missing"));
        assert!(!grants.is_granted("users", "menu"));
    }

    #[test]
    fn test_granted_pairs() {
        let grants = PermissionGrants::new()
            .grant("providers", "menu")
            .grant("offers", "add");
        assert_eq!(grants.granted_pairs(), vec!["offers.add", "providers.menu"]);
        assert_eq!(grants.resources().count(), 2);
    }

    #[test]
    fn test_resource_with_no_actions_is_not_empty() {
        let grants: PermissionGrants = serde_json::from_value(json!({ "providers": {} })).unwrap();
        assert!(!grants.is_empty());
        assert!(!grants.is_granted("providers", "menu"));
    }

    #[test]
    fn test_user_label() {
        assert_eq!(CurrentUser::new(json!({"email": "a@b.c"})).label(), "a@b.c");
        assert_eq!(CurrentUser::new(json!({"id": 42})).label(), "42");
        assert_eq!(CurrentUser::new(json!({})).label(), "<anonymous>");
    }

    #[test]
    fn test_access_denied_notice() {
        let notice = Notice::access_denied("all-Business");
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(
            notice.message,
            "Access denied: you don't have permission to access this page (all-Business)"
        );
    }
}
