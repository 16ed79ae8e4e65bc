// permx/src/lib.rs

pub mod configs;
pub mod error;
pub mod filters;
pub mod guard;
pub mod mapping;
pub mod menu;
pub mod middleware;
pub mod router;
pub mod store;
pub mod utils;

// Re-export main types for easier importing
pub use error::PermxError;
pub use mapping::{MappingTable, PermissionRef};
pub use menu::{canonical_menu, get_menu, MenuAction, MenuNode};
pub use filters::{filter_menu, infer_action};
pub use store::{PermissionSource, PermissionStore, SessionSource, Ticket};
pub use guard::{DenialHandler, GuardState, GuardView, RouteGuard};

pub use configs::initializer::{setup_permx_logging, PermxConfig};

pub use utils::{
    auth::{extract_grants, ExtractionError, ExtractionStrategy},
    rbac::{has_permission, AccessDecision, GrantsEvaluator, PermissionCheck, PermissionService},
    structs::{CurrentUser, Notice, NoticeLevel, PermissionGrants, StoreState},
};

pub use middleware::permission_guard::{PermissionGuard, PermissionGuardMiddleware};
pub use router::{guarded_scope, protected_routes, route_for, ProtectedRoute};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

pub mod prelude {
    pub use crate::{
        CurrentUser,
        MenuAction,
        MenuNode,
        PermissionCheck,
        PermissionGuard,
        PermissionService,
        PermxConfig,
        RouteGuard,
        SessionSource,
    };
}
