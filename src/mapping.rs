// permx/src/mapping.rs
//! Translation from menu-item keys to backend `resource.action` pairs.

use crate::error::PermxError;
use lazy_static::lazy_static;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Built-in entries for the marketplace dashboard. The spelling of keys such as
/// `Bussiness` matches the identifiers used by the menu and must not be corrected.
const BUILTIN_ENTRIES: &[(&str, &str)] = &[
    // Business providers
    ("Bussiness", "providers"),
    ("add-Bussiness", "providers.add"),
    ("all-Business", "providers.list"),
    ("edit-Bussiness", "providers.edit"),
    ("view-Bussiness", "providers.view"),
    ("delete-Bussiness", "providers.delete"),
    // Staff
    ("Stuff", "stuff"),
    ("add-Stuff", "stuff.add"),
    ("all-Stuff", "stuff.list"),
    ("edit-Stuff", "stuff.edit"),
    // Customers
    ("Users", "users"),
    ("add-User", "users.add"),
    ("all-Users", "users.list"),
    ("UserProfile", "users"),
    // Offers
    ("Offers", "offers"),
    ("add-Offer", "offers.add"),
    ("all-Offers", "offers.list"),
    ("delete-Offer", "offers"),
    // Bookings
    ("Bookings", "bookings"),
    ("all-Bookings", "bookings.list"),
    ("view-Booking", "bookings.view"),
    // Locations
    ("locations", "cities"),
    ("all-Cities", "cities.list"),
    ("all-Zones", "zones.list"),
    ("all-Countries", "countries.list"),
    ("add-City", "cities.add"),
    // Team
    ("Teams", "admins"),
    ("all-Admins", "admins.list"),
    ("add-Admin", "admins.add"),
    ("all-Roles", "roles.list"),
    ("add-Role", "roles.add"),
    // Settings
    ("Settings", "settings"),
    ("edit-Settings", "settings.edit"),
    ("all-SpTypes", "sp_types.list"),
    ("all-SpCategories", "sp_categories.list"),
    ("all-Promocodes", "promocodes.list"),
    ("add-Promocode", "promocodes.add"),
    ("all-Branches", "branches.list"),
    ("add-Branch", "branches.add"),
];

lazy_static! {
    static ref BUILTIN_TABLE: MappingTable = MappingTable::from_static(BUILTIN_ENTRIES);
}

/// The backend permission a menu key resolves to. `action` is `None` when the
/// mapping only names the resource and the caller supplies the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionRef<'a> {
    pub resource: &'a str,
    pub action: Option<&'a str>,
}

impl<'a> PermissionRef<'a> {
    /// At most one dot; both sides non-empty when present.
    fn parse(value: &'a str) -> Option<Self> {
        match value.split_once('.') {
            Some((resource, action))
                if !resource.is_empty() && !action.is_empty() && !action.contains('.') =>
            {
                Some(Self {
                    resource,
                    action: Some(action),
                })
            }
            Some(_) => None,
            None if value.is_empty() => None,
            None => Some(Self {
                resource: value,
                action: None,
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    entries: BTreeMap<String, String>,
}

impl MappingTable {
    /// The process-wide marketplace table.
    pub fn builtin() -> &'static MappingTable {
        &BUILTIN_TABLE
    }

    fn from_static(entries: &[(&str, &str)]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        }
    }

    /// Build a table from arbitrary entries, rejecting values that cannot resolve.
    pub fn from_entries<I, K, V>(entries: I) -> Result<Self, PermxError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut table = BTreeMap::new();
        for (key, value) in entries {
            let key = key.into();
            let value = value.into();
            if PermissionRef::parse(&value).is_none() {
                return Err(PermxError::InvalidMapping(format!(
                    "'{}' maps to unusable value '{}'",
                    key, value
                )));
            }
            if table.insert(key.clone(), value).is_some() {
                return Err(PermxError::InvalidMapping(format!(
                    "duplicate entry for '{}'",
                    key
                )));
            }
        }
        Ok(Self { entries: table })
    }

    /// Parse a flat JSON object of `menuKey -> "resource[.action]"`.
    pub fn from_json_str(json: &str) -> Result<Self, PermxError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| PermxError::InvalidMapping(e.to_string()))?;
        let object = value.as_object().ok_or_else(|| {
            PermxError::InvalidMapping("mapping must be a JSON object".to_string())
        })?;

        let mut entries = Vec::with_capacity(object.len());
        for (key, value) in object {
            let target = value.as_str().ok_or_else(|| {
                PermxError::InvalidMapping(format!("value for '{}' must be a string", key))
            })?;
            entries.push((key.clone(), target.to_string()));
        }
        Self::from_entries(entries)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PermxError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    /// Look up a menu key. Unknown and empty keys yield `None`, which callers treat as deny.
    pub fn resolve(&self, menu_key: &str) -> Option<PermissionRef<'_>> {
        self.entries
            .get(menu_key)
            .and_then(|value| PermissionRef::parse(value))
    }

    pub fn contains(&self, menu_key: &str) -> bool {
        self.entries.contains_key(menu_key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
