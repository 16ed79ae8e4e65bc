// permx/src/middleware/permission_guard.rs
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage, HttpResponse,
};
use futures_util::future::LocalBoxFuture;
use std::rc::Rc;
use tracing::{debug, info, warn};
use crate::configs::initializer::PermxConfig;
use crate::menu::MenuAction;
use crate::utils::{
    rbac::{AccessDecision, PermissionCheck, PermissionService},
    structs::Notice,
};

pub const NOTICE_HEADER: &str = "x-permx-notice";

/// Guards an actix scope or resource with one `(permission_key, action)` pair.
#[derive(Debug, Clone)]
pub struct PermissionGuard {
    pub permission_key: String,
    pub action: MenuAction,
}

impl PermissionGuard {
    pub fn new(permission_key: &str, action: MenuAction) -> Self {
        Self {
            permission_key: permission_key.to_string(),
            action,
        }
    }

    /// Shorthand for menu-level access.
    pub fn access(permission_key: &str) -> Self {
        Self::new(permission_key, MenuAction::Menu)
    }
}

impl<S, B> Transform<S, ServiceRequest> for PermissionGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = PermissionGuardMiddleware<S>;
    type InitError = ();
    type Future = LocalBoxFuture<'static, Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        let guard = self.clone();
        Box::pin(async move {
            Ok(PermissionGuardMiddleware {
                service: Rc::new(service),
                guard,
            })
        })
    }
}

pub struct PermissionGuardMiddleware<S> {
    service: Rc<S>,
    guard: PermissionGuard,
}

fn find_service(req: &ServiceRequest) -> Option<PermissionService> {
    if let Some(service) = req.extensions().get::<PermissionService>() {
        return Some(service.clone());
    }
    req.app_data::<web::Data<PermissionService>>()
        .map(|data| data.get_ref().clone())
}

/// Header values must be visible ASCII.
fn header_safe(message: &str) -> String {
    message
        .chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control())
        .collect()
}

impl<S, B> Service<ServiceRequest> for PermissionGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = Rc::clone(&self.service);
        let guard = self.guard.clone();

        Box::pin(async move {
            let uri = req.uri().to_string();

            let permissions = match find_service(&req) {
                Some(permissions) => permissions,
                None => {
                    warn!("permission service not found for request: {}", uri);
                    return Err(actix_web::error::ErrorInternalServerError(
                        "permission service not configured",
                    ));
                }
            };

            match permissions.decide(&guard.permission_key, guard.action) {
                AccessDecision::Loading => {
                    debug!("permissions still loading for {}", uri);
                    let response = HttpResponse::ServiceUnavailable()
                        .insert_header((header::RETRY_AFTER, "1"))
                        .finish();
                    return Ok(req.into_response(response).map_into_right_body());
                }
                AccessDecision::Granted => {
                    info!(
                        "access granted to {} for '{}' ({})",
                        uri, guard.permission_key, guard.action
                    );
                    let res = svc.call(req).await?;
                    return Ok(res.map_into_left_body());
                }
                AccessDecision::Denied => {}
            }

            let safe_route = req
                .app_data::<web::Data<PermxConfig>>()
                .map(|config| config.safe_route.clone())
                .unwrap_or_else(|| "/".to_string());
            let notice = Notice::access_denied(&guard.permission_key);

            warn!(
                "access denied to {} for '{}' ({}), redirecting to {}",
                uri, guard.permission_key, guard.action, safe_route
            );

            let response = HttpResponse::Found()
                .insert_header((header::LOCATION, safe_route))
                .insert_header((NOTICE_HEADER, header_safe(&notice.message)))
                .finish();
            Ok(req.into_response(response).map_into_right_body())
        })
    }
}
