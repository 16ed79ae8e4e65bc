// permx/src/router.rs
use actix_web::{
    body::{BoxBody, EitherBody},
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    web, Error, Scope,
};
use tracing::info;
use once_cell::sync::Lazy;
use serde::Serialize;
use crate::menu::MenuAction;
use crate::middleware::permission_guard::PermissionGuard;

/// A dashboard route and the permission that gates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtectedRoute {
    pub path: String,
    pub permission_key: String,
    pub action: MenuAction,
}

impl ProtectedRoute {
    pub fn new(path: &str, permission_key: &str, action: MenuAction) -> Self {
        Self {
            path: path.to_string(),
            permission_key: permission_key.to_string(),
            action,
        }
    }

    pub fn guard(&self) -> PermissionGuard {
        PermissionGuard::new(&self.permission_key, self.action)
    }
}

// (base path, menu key used for every page of that resource)
const RESOURCE_PAGES: &[(&str, &str, &[MenuAction])] = &[
    ("/providers", "Bussiness", &[MenuAction::List, MenuAction::Add, MenuAction::Edit, MenuAction::View]),
    ("/stuff", "Stuff", &[MenuAction::List, MenuAction::Add, MenuAction::Edit]),
    ("/users", "Users", &[MenuAction::List, MenuAction::Add, MenuAction::View]),
    ("/offers", "Offers", &[MenuAction::List, MenuAction::Add, MenuAction::Edit]),
    ("/bookings", "Bookings", &[MenuAction::List, MenuAction::View]),
    ("/admins", "Teams", &[MenuAction::List, MenuAction::Add]),
    ("/settings", "Settings", &[MenuAction::Edit]),
];

static PROTECTED_ROUTES: Lazy<Vec<ProtectedRoute>> = Lazy::new(|| {
    RESOURCE_PAGES
        .iter()
        .flat_map(|(base, key, actions)| {
            actions
                .iter()
                .map(move |action| ProtectedRoute::new(&action.to_path(base), key, *action))
        })
        .collect()
});

pub fn protected_routes() -> &'static [ProtectedRoute] {
    &PROTECTED_ROUTES
}

/// Exact path lookup, e.g. `/offers/{id}/edit`.
pub fn route_for(path: &str) -> Option<&'static ProtectedRoute> {
    PROTECTED_ROUTES.iter().find(|route| route.path == path)
}

/// Scope at `route.path` wrapped in the route's permission guard.
pub fn guarded_scope(
    route: &ProtectedRoute,
) -> Scope<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<EitherBody<BoxBody>>,
        Error = Error,
        InitError = (),
    >,
> {
    info!(
        "guarding {} with '{}' ({})",
        route.path, route.permission_key, route.action
    );
    web::scope(&route.path).wrap(route.guard())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingTable;

    #[test]
    fn test_routes_derive_from_resource_pages() {
        let route = route_for("/offers/{id}/edit").unwrap();
        assert_eq!(route.permission_key, "Offers");
        assert_eq!(route.action, MenuAction::Edit);

        let route = route_for("/providers/create").unwrap();
        assert_eq!(route.action, MenuAction::Add);

        assert!(route_for("/reports").is_none());
    }

    #[test]
    fn test_every_route_key_is_mapped() {
        let table = MappingTable::builtin();
        for route in protected_routes() {
            assert!(
                table.resolve(&route.permission_key).is_some(),
                "unmapped route key {}",
                route.permission_key
            );
        }
    }

    #[test]
    fn test_route_paths_are_unique() {
        let mut paths: Vec<_> = protected_routes().iter().map(|r| r.path.as_str()).collect();
        let total = paths.len();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), total);
    }
}
