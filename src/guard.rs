// permx/src/guard.rs
//! Page-level guard for a single mounted route.

use crate::menu::MenuAction;
use crate::utils::rbac::{AccessDecision, PermissionCheck};
use crate::utils::structs::Notice;
use log::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Unchecked,
    Checking,
    Granted,
    Denied,
}

/// What the caller should render for this pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardView {
    /// Permissions are still loading: render nothing, no denial.
    Loading,
    Content,
    /// Render nothing; the denial side effect has already been triggered.
    Denied,
}

/// Receives the visible side effects of a denial.
pub trait DenialHandler {
    fn notify(&self, notice: &Notice);
    fn redirect(&self, to: &str);
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    permission_key: String,
    action: MenuAction,
    safe_route: String,
    state: GuardState,
    denial_fired: bool,
}

impl RouteGuard {
    pub fn new(permission_key: &str, action: MenuAction) -> Self {
        Self {
            permission_key: permission_key.to_string(),
            action,
            safe_route: "/".to_string(),
            state: GuardState::Unchecked,
            denial_fired: false,
        }
    }

    pub fn with_safe_route(mut self, safe_route: &str) -> Self {
        self.safe_route = safe_route.to_string();
        self
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn permission_key(&self) -> &str {
        &self.permission_key
    }

    pub fn action(&self) -> MenuAction {
        self.action
    }

    /// Evaluate for one render pass. The denial notice and redirect fire at most
    /// once for the lifetime of this guard.
    pub fn render<P, H>(&mut self, checker: &P, handler: &H) -> GuardView
    where
        P: PermissionCheck + ?Sized,
        H: DenialHandler + ?Sized,
    {
        match checker.decide(&self.permission_key, self.action) {
            AccessDecision::Loading => {
                self.state = GuardState::Checking;
                return GuardView::Loading;
            }
            AccessDecision::Granted => {
                self.state = GuardState::Granted;
                return GuardView::Content;
            }
            AccessDecision::Denied => {}
        }

        self.state = GuardState::Denied;
        if !self.denial_fired {
            self.denial_fired = true;
            warn!(
                "route denied for '{}' ({}), redirecting to {}",
                self.permission_key, self.action, self.safe_route
            );
            handler.notify(&Notice::access_denied(&self.permission_key));
            handler.redirect(&self.safe_route);
        }
        GuardView::Denied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingTable;
    use crate::store::SessionSource;
    use crate::utils::rbac::{GrantsEvaluator, PermissionService};
    use crate::utils::structs::{CurrentUser, PermissionGrants};
    use serde_json::json;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        notices: RefCell<Vec<Notice>>,
        redirects: RefCell<Vec<String>>,
    }

    impl DenialHandler for Recorder {
        fn notify(&self, notice: &Notice) {
            self.notices.borrow_mut().push(notice.clone());
        }

        fn redirect(&self, to: &str) {
            self.redirects.borrow_mut().push(to.to_string());
        }
    }

    #[test]
    fn test_starts_unchecked() {
        let guard = RouteGuard::new("all-Business", MenuAction::List);
        assert_eq!(guard.state(), GuardState::Unchecked);
    }

    #[test]
    fn test_loading_renders_neutral_state() {
        let service = PermissionService::default();
        service.store().begin();
        let recorder = Recorder::default();
        let mut guard = RouteGuard::new("all-Business", MenuAction::List);

        assert_eq!(guard.render(&service, &recorder), GuardView::Loading);
        assert_eq!(guard.state(), GuardState::Checking);
        assert!(recorder.notices.borrow().is_empty());
        assert!(recorder.redirects.borrow().is_empty());
    }

    #[test]
    fn test_denial_fires_once_per_mount() {
        let service = PermissionService::default();
        let recorder = Recorder::default();
        let mut guard =
            RouteGuard::new("all-Business", MenuAction::List).with_safe_route("/dashboard");

        for _ in 0..3 {
            assert_eq!(guard.render(&service, &recorder), GuardView::Denied);
        }
        assert_eq!(guard.state(), GuardState::Denied);
        assert_eq!(
            *recorder.notices.borrow(),
            vec![Notice::access_denied("all-Business")]
        );
        assert_eq!(*recorder.redirects.borrow(), vec!["/dashboard".to_string()]);
    }

    #[tokio::test]
    async fn test_granted_after_permissions_load() {
        let service = PermissionService::default();
        let recorder = Recorder::default();
        let mut guard = RouteGuard::new("all-Business", MenuAction::List);

        service.store().begin();
        assert_eq!(guard.render(&service, &recorder), GuardView::Loading);

        let user = CurrentUser::new(json!({
            "permissions": { "providers": { "list": 1 } }
        }));
        service.refresh(Some(user), &SessionSource).await;

        assert_eq!(guard.render(&service, &recorder), GuardView::Content);
        assert_eq!(guard.state(), GuardState::Granted);
        assert!(recorder.redirects.borrow().is_empty());
    }

    #[test]
    fn test_embedded_action_decides_route() {
        let service = PermissionService::default();
        let ticket = service.store().begin();
        service
            .store()
            .complete(ticket, Ok(PermissionGrants::new().grant("providers", "add")));

        let recorder = Recorder::default();
        let mut guard = RouteGuard::new("add-Bussiness", MenuAction::Menu);
        assert_eq!(guard.render(&service, &recorder), GuardView::Content);
    }

    /// Grants already cleared by a reload that has not finished yet.
    struct Reloading;

    impl PermissionCheck for Reloading {
        fn has_permission(&self, _menu_key: &str, _action: MenuAction) -> bool {
            false
        }

        fn decide(&self, _menu_key: &str, _action: MenuAction) -> AccessDecision {
            AccessDecision::Loading
        }
    }

    #[test]
    fn test_reload_in_flight_never_denies() {
        let recorder = Recorder::default();
        let mut guard = RouteGuard::new("all-Business", MenuAction::List);

        assert_eq!(guard.render(&Reloading, &recorder), GuardView::Loading);
        assert_eq!(guard.state(), GuardState::Checking);
        assert!(recorder.notices.borrow().is_empty());
        assert!(recorder.redirects.borrow().is_empty());
    }

    #[test]
    fn test_identity_change_between_renders_shows_loading() {
        let service = PermissionService::default();
        let ticket = service.store().begin();
        service
            .store()
            .complete(ticket, Ok(PermissionGrants::new().grant("providers", "list")));

        let recorder = Recorder::default();
        let mut guard = RouteGuard::new("all-Business", MenuAction::List);
        assert_eq!(guard.render(&service, &recorder), GuardView::Content);

        service.store().begin();
        assert_eq!(guard.render(&service, &recorder), GuardView::Loading);
        assert!(recorder.redirects.borrow().is_empty());
    }

    #[test]
    fn test_renders_against_grants_snapshot() {
        let grants = PermissionGrants::new().grant("offers", "add");
        let evaluator = GrantsEvaluator::new(&grants, MappingTable::builtin());
        let recorder = Recorder::default();

        let mut allowed = RouteGuard::new("add-Offer", MenuAction::Add);
        assert_eq!(allowed.render(&evaluator, &recorder), GuardView::Content);

        let mut refused = RouteGuard::new("all-Offers", MenuAction::List);
        assert_eq!(refused.render(&evaluator, &recorder), GuardView::Denied);
        assert_eq!(recorder.redirects.borrow().len(), 1);
    }
}
