// permx/src/menu.rs

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuAction {
    Menu,
    List,
    Add,
    Edit,
    Delete,
    View,
}

impl MenuAction {
    pub const ALL: [MenuAction; 6] = [
        MenuAction::Menu,
        MenuAction::List,
        MenuAction::Add,
        MenuAction::Edit,
        MenuAction::Delete,
        MenuAction::View,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MenuAction::Menu => "menu",
            MenuAction::List => "list",
            MenuAction::Add => "add",
            MenuAction::Edit => "edit",
            MenuAction::Delete => "delete",
            MenuAction::View => "view",
        }
    }

    /// Dashboard route for this action under a resource's base path.
    pub fn to_path(&self, base_path: &str) -> String {
        match self {
            MenuAction::Menu | MenuAction::List => base_path.to_string(),
            MenuAction::Add => format!("{}/create", base_path),
            MenuAction::View => format!("{}/{{id}}", base_path),
            MenuAction::Edit => format!("{}/{{id}}/edit", base_path),
            MenuAction::Delete => format!("{}/{{id}}/delete", base_path),
        }
    }
}

impl fmt::Display for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MenuAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MenuAction::ALL
            .iter()
            .copied()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| format!("unknown action '{}'", s))
    }
}

/// A node of the navigation tree.
///
/// Nodes without a `key` are always visible. `heading` nodes are section labels and are
/// never gated. `disabled` nodes stay in the tree but are not navigable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MenuNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Action checked when this node is evaluated as a child. Falls back to
    /// inference from the key when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_action: Option<MenuAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<MenuNode>>,
}

impl MenuNode {
    pub fn heading(label: &str) -> Self {
        Self {
            heading: Some(label.to_string()),
            ..Self::default()
        }
    }

    pub fn item(title: &str, key: &str, path: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            key: Some(key.to_string()),
            path: Some(path.to_string()),
            ..Self::default()
        }
    }

    /// A node with no key, visible to everyone.
    pub fn open(title: &str, path: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            path: Some(path.to_string()),
            ..Self::default()
        }
    }

    pub fn group(title: &str, key: Option<&str>, children: Vec<MenuNode>) -> Self {
        Self {
            title: Some(title.to_string()),
            key: key.map(str::to_string),
            children: Some(children),
            ..Self::default()
        }
    }

    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_string());
        self
    }

    pub fn requires(mut self, action: MenuAction) -> Self {
        self.required_action = Some(action);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn is_heading(&self) -> bool {
        self.heading.is_some()
    }

    /// Where the node navigates to, if anywhere.
    pub fn nav_target(&self) -> Option<&str> {
        if self.disabled || self.is_heading() {
            return None;
        }
        self.path.as_deref()
    }

    /// Depth-first search by key.
    pub fn find_by_key<'a>(nodes: &'a [MenuNode], key: &str) -> Option<&'a MenuNode> {
        for node in nodes {
            if node.key.as_deref() == Some(key) {
                return Some(node);
            }
            if let Some(found) = node
                .children
                .as_deref()
                .and_then(|children| Self::find_by_key(children, key))
            {
                return Some(found);
            }
        }
        None
    }

    /// Every key in the tree, in depth-first order.
    pub fn flatten_keys(nodes: &[MenuNode]) -> Vec<&str> {
        let mut keys = Vec::new();
        for node in nodes {
            if let Some(key) = node.key.as_deref() {
                keys.push(key);
            }
            if let Some(children) = node.children.as_deref() {
                keys.extend(Self::flatten_keys(children));
            }
        }
        keys
    }
}

static CANONICAL_MENU: Lazy<Vec<MenuNode>> = Lazy::new(build_canonical_menu);

fn build_canonical_menu() -> Vec<MenuNode> {
    use MenuAction::*;

    vec![
        MenuNode::open("Dashboard", "/dashboard").with_icon("home"),
        MenuNode::heading("Marketplace"),
        MenuNode::group(
            "Business",
            Some("Bussiness"),
            vec![
                MenuNode::item("Add Business", "add-Bussiness", "/providers/create").requires(Add),
                MenuNode::item("All Business", "all-Business", "/providers").requires(List),
            ],
        )
        .with_icon("briefcase"),
        MenuNode::group(
            "Staff",
            Some("Stuff"),
            vec![
                MenuNode::item("Add Staff", "add-Stuff", "/stuff/create").requires(Add),
                MenuNode::item("All Staff", "all-Stuff", "/stuff").requires(List),
            ],
        )
        .with_icon("id-badge"),
        MenuNode::group(
            "Offers",
            Some("Offers"),
            vec![
                MenuNode::item("Add Offer", "add-Offer", "/offers/create").requires(Add),
                MenuNode::item("All Offers", "all-Offers", "/offers").requires(List),
            ],
        )
        .with_icon("tag"),
        MenuNode::group(
            "Bookings",
            Some("Bookings"),
            vec![MenuNode::item("All Bookings", "all-Bookings", "/bookings").requires(List)],
        )
        .with_icon("calendar"),
        MenuNode::group(
            "Users",
            Some("Users"),
            vec![
                MenuNode::item("Add User", "add-User", "/users/create").requires(Add),
                MenuNode::item("All Users", "all-Users", "/users").requires(List),
            ],
        )
        .with_icon("users"),
        MenuNode::heading("Administration"),
        MenuNode::group(
            "Locations",
            Some("locations"),
            vec![
                MenuNode::item("Countries", "all-Countries", "/countries").requires(List),
                MenuNode::item("Cities", "all-Cities", "/cities").requires(List),
                MenuNode::item("Zones", "all-Zones", "/zones").requires(List),
            ],
        )
        .with_icon("map"),
        MenuNode::group(
            "Team",
            Some("Teams"),
            vec![
                MenuNode::item("Add Admin", "add-Admin", "/admins/create").requires(Add),
                MenuNode::item("All Admins", "all-Admins", "/admins").requires(List),
                MenuNode::item("Roles", "all-Roles", "/roles").requires(List),
            ],
        )
        .with_icon("shield"),
        MenuNode::heading("Settings"),
        MenuNode::group(
            "Settings",
            Some("Settings"),
            vec![
                MenuNode::item("General", "edit-Settings", "/settings").requires(Edit),
                MenuNode::item("Provider Types", "all-SpTypes", "/sp-types").requires(List),
                MenuNode::item("Provider Categories", "all-SpCategories", "/sp-categories")
                    .requires(List),
                MenuNode::item("Promo Codes", "all-Promocodes", "/promocodes").requires(List),
                MenuNode::item("Branches", "all-Branches", "/branches").requires(List),
            ],
        )
        .with_icon("cog"),
        MenuNode::open("Reports", "/reports").with_icon("chart").disabled(),
    ]
}

/// The canonical menu, optionally passed through `filter`.
///
/// Without a filter the shared canonical tree is borrowed; callers must treat it as read-only.
pub fn get_menu<F>(filter: Option<F>) -> Cow<'static, [MenuNode]>
where
    F: FnOnce(&[MenuNode]) -> Vec<MenuNode>,
{
    match filter {
        Some(filter) => Cow::Owned(filter(&CANONICAL_MENU)),
        None => Cow::Borrowed(CANONICAL_MENU.as_slice()),
    }
}

/// Convenience for the unfiltered tree.
pub fn canonical_menu() -> &'static [MenuNode] {
    &CANONICAL_MENU
}
