// permx/src/utils/auth.rs
use crate::error::PermxError;
use crate::utils::structs::{CurrentUser, PermissionGrants};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("{strategy}: permissions must be an object of resources")]
    NotAnObject { strategy: ExtractionStrategy },
    #[error("{strategy}: {source}")]
    Malformed {
        strategy: ExtractionStrategy,
        #[source]
        source: serde_json::Error,
    },
}

impl From<ExtractionError> for PermxError {
    fn from(err: ExtractionError) -> Self {
        PermxError::MalformedPayload(err.to_string())
    }
}

/// Places a user payload may carry its permissions, tried in `ORDER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// `user.data.permissions`
    DataPermissions,
    /// `user.permissions`
    UserPermissions,
    /// `user.<any>.permissions`, scanning the user's object-valued properties in key order.
    NestedPermissions,
}

impl std::fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = match self {
            ExtractionStrategy::DataPermissions => "user.data.permissions",
            ExtractionStrategy::UserPermissions => "user.permissions",
            ExtractionStrategy::NestedPermissions => "user.*.permissions",
        };
        f.write_str(path)
    }
}

impl ExtractionStrategy {
    pub const ORDER: [ExtractionStrategy; 3] = [
        ExtractionStrategy::DataPermissions,
        ExtractionStrategy::UserPermissions,
        ExtractionStrategy::NestedPermissions,
    ];

    /// The raw permissions value this strategy finds, if present and not null.
    pub fn locate<'a>(&self, user: &'a Value) -> Option<&'a Value> {
        let found = match self {
            ExtractionStrategy::DataPermissions => {
                user.get("data").and_then(|data| data.get("permissions"))
            }
            ExtractionStrategy::UserPermissions => user.get("permissions"),
            ExtractionStrategy::NestedPermissions => user
                .as_object()?
                .values()
                .filter(|value| value.is_object())
                .find_map(|value| value.get("permissions").filter(|p| !p.is_null())),
        };
        found.filter(|value| !value.is_null())
    }

    fn decode(&self, raw: &Value) -> Result<PermissionGrants, ExtractionError> {
        if !raw.is_object() {
            return Err(ExtractionError::NotAnObject { strategy: *self });
        }
        serde_json::from_value(raw.clone())
            .map_err(|source| ExtractionError::Malformed {
                strategy: *self,
                source,
            })
    }
}

/// Derive grants from a user payload.
///
/// The first strategy that finds a value decides: a malformed value there is an error
/// even if a later strategy would have matched. No value anywhere yields empty grants.
pub fn extract_grants(user: &CurrentUser) -> Result<PermissionGrants, ExtractionError> {
    for strategy in ExtractionStrategy::ORDER {
        if let Some(raw) = strategy.locate(&user.0) {
            log::debug!("permissions for {} found at {}", user.label(), strategy);
            return strategy.decode(raw);
        }
    }
    log::debug!("no permissions payload for {}", user.label());
    Ok(PermissionGrants::new())
}
