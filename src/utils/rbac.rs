// permx/src/utils/rbac.rs
use crate::filters::filter_menu;
use crate::mapping::MappingTable;
use crate::menu::{get_menu, MenuAction, MenuNode};
use crate::store::{PermissionSource, PermissionStore};
use crate::utils::structs::{CurrentUser, PermissionGrants, StoreState};
use std::sync::Arc;

/// The decision procedure. An empty grants map, an unknown key or any flag other
/// than the integer `1` all deny. An action embedded in the mapping wins over `action`.
pub fn has_permission(
    grants: &PermissionGrants,
    mapping: &MappingTable,
    menu_key: &str,
    action: MenuAction,
) -> bool {
    if grants.is_empty() {
        return false;
    }

    match mapping.resolve(menu_key) {
        Some(permission) => {
            let effective_action = permission.action.unwrap_or(action.as_str());
            grants.is_granted(permission.resource, effective_action)
        }
        None => false,
    }
}

/// Outcome of a page-level check taken from one consistent view of the grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Loading,
    Granted,
    Denied,
}

pub trait PermissionCheck {
    fn has_permission(&self, menu_key: &str, action: MenuAction) -> bool;

    fn is_loading(&self) -> bool {
        false
    }

    /// Loading wins over any verdict. Implementors backed by shared state should
    /// override this to read both from the same snapshot.
    fn decide(&self, menu_key: &str, action: MenuAction) -> AccessDecision {
        if self.is_loading() {
            AccessDecision::Loading
        } else if self.has_permission(menu_key, action) {
            AccessDecision::Granted
        } else {
            AccessDecision::Denied
        }
    }

    fn can_access(&self, menu_key: &str) -> bool {
        self.has_permission(menu_key, MenuAction::Menu)
    }

    fn can_list(&self, menu_key: &str) -> bool {
        self.has_permission(menu_key, MenuAction::List)
    }

    fn can_add(&self, menu_key: &str) -> bool {
        self.has_permission(menu_key, MenuAction::Add)
    }

    fn can_edit(&self, menu_key: &str) -> bool {
        self.has_permission(menu_key, MenuAction::Edit)
    }

    fn can_delete(&self, menu_key: &str) -> bool {
        self.has_permission(menu_key, MenuAction::Delete)
    }

    fn can_view(&self, menu_key: &str) -> bool {
        self.has_permission(menu_key, MenuAction::View)
    }
}

/// Evaluates against a fixed grants snapshot.
#[derive(Debug, Clone, Copy)]
pub struct GrantsEvaluator<'a> {
    pub grants: &'a PermissionGrants,
    pub mapping: &'a MappingTable,
}

impl<'a> GrantsEvaluator<'a> {
    pub fn new(grants: &'a PermissionGrants, mapping: &'a MappingTable) -> Self {
        Self { grants, mapping }
    }
}

impl PermissionCheck for GrantsEvaluator<'_> {
    fn has_permission(&self, menu_key: &str, action: MenuAction) -> bool {
        has_permission(self.grants, self.mapping, menu_key, action)
    }
}

/// Per-session permission service: a store plus the mapping it resolves keys through.
/// Cloning shares the same store.
#[derive(Debug, Clone)]
pub struct PermissionService {
    store: Arc<PermissionStore>,
    mapping: Arc<MappingTable>,
}

impl Default for PermissionService {
    fn default() -> Self {
        Self::new(MappingTable::builtin().clone())
    }
}

impl PermissionService {
    pub fn new(mapping: MappingTable) -> Self {
        Self {
            store: Arc::new(PermissionStore::new()),
            mapping: Arc::new(mapping),
        }
    }

    pub fn store(&self) -> &PermissionStore {
        &self.store
    }

    pub fn mapping(&self) -> &MappingTable {
        &self.mapping
    }

    pub fn state(&self) -> StoreState {
        self.store.snapshot()
    }

    pub async fn refresh<S>(&self, user: Option<CurrentUser>, source: &S)
    where
        S: PermissionSource + ?Sized,
    {
        self.store.refresh(user, source).await
    }

    /// Prune `tree` for the current user. The whole pass sees one grants snapshot.
    pub fn filter_menu(&self, tree: &[MenuNode]) -> Vec<MenuNode> {
        self.store.with_state(|state| {
            filter_menu(tree, &GrantsEvaluator::new(&state.grants, &self.mapping))
        })
    }

    /// The canonical menu pruned for the current user.
    pub fn menu(&self) -> Vec<MenuNode> {
        get_menu(Some(|tree: &[MenuNode]| self.filter_menu(tree))).into_owned()
    }
}

impl PermissionCheck for PermissionService {
    fn has_permission(&self, menu_key: &str, action: MenuAction) -> bool {
        self.store
            .with_state(|state| has_permission(&state.grants, &self.mapping, menu_key, action))
    }

    fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    fn decide(&self, menu_key: &str, action: MenuAction) -> AccessDecision {
        self.store.with_state(|state| {
            if state.is_loading {
                AccessDecision::Loading
            } else if has_permission(&state.grants, &self.mapping, menu_key, action) {
                AccessDecision::Granted
            } else {
                AccessDecision::Denied
            }
        })
    }
}
