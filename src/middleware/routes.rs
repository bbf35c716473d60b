use axum::Router;
use axum::extract::{OriginalUri, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum_extra::extract::PrivateCookieJar;

use super::cookies;
use super::error::AuthError;
use super::extractor::CasUser;
use super::state::CasAuth;
use super::traits::SessionStore;
use crate::auth::{Action, AuthType, CasRequest};
use crate::ids;
use crate::session::MemorySession;

/// Create a router serving the CAS logout endpoint at `path`
/// (`GET` and `POST`).
pub fn logout_routes<S: SessionStore>(auth: CasAuth<S>, path: &str) -> Router {
    Router::new()
        .route(path, get(logout::<S>).post(logout::<S>))
        .with_state(auth)
}

// ── Guards ─────────────────────────────────────────────────────────

/// Middleware: unauthenticated requests are sent to CAS login and come back
/// to the page they asked for.
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/private", get(private))
///     .route_layer(axum::middleware::from_fn_with_state(auth.clone(), bounce::<MemoryStore>));
/// ```
pub async fn bounce<S: SessionStore>(
    State(auth): State<CasAuth<S>>,
    jar: PrivateCookieJar,
    request: Request,
    next: Next,
) -> Response {
    guard(auth, jar, request, next, AuthType::Bounce).await
}

/// Middleware: like [`bounce`], but authenticated users are redirected to
/// the stored return target. Mount it on a dedicated login route.
pub async fn bounce_redirect<S: SessionStore>(
    State(auth): State<CasAuth<S>>,
    jar: PrivateCookieJar,
    request: Request,
    next: Next,
) -> Response {
    guard(auth, jar, request, next, AuthType::BounceRedirect).await
}

/// Middleware: unauthenticated requests get `401 Unauthorized`.
pub async fn block<S: SessionStore>(
    State(auth): State<CasAuth<S>>,
    jar: PrivateCookieJar,
    request: Request,
    next: Next,
) -> Response {
    guard(auth, jar, request, next, AuthType::Block).await
}

async fn guard<S: SessionStore>(
    auth: CasAuth<S>,
    jar: PrivateCookieJar,
    mut request: Request,
    next: Next,
    auth_type: AuthType,
) -> Response {
    let (session_id, loaded) = match load_session(&auth, &jar).await {
        Ok(found) => found,
        Err(e) => return e.into_response(),
    };
    let existed = loaded.is_some();
    let mut session = loaded.unwrap_or_default();
    let before = session.clone();

    let uri = request
        .extensions()
        .get::<OriginalUri>()
        .map(|original| original.0.clone())
        .unwrap_or_else(|| request.uri().clone());
    let cas_request =
        CasRequest::from_path_and_query(uri.path_and_query().map_or("/", |pq| pq.as_str()));

    let action = auth.client.handle(&mut session, &cas_request, auth_type).await;

    let changed = session != before;
    if changed {
        if let Err(e) = auth.store.save(&session_id, session.clone()).await {
            return AuthError::Store(e.to_string()).into_response();
        }
    }

    let jar = if existed || changed {
        jar.add(cookies::session_cookie(
            &auth.settings.session_cookie_name,
            &session_id,
            auth.settings.session_ttl_days,
            auth.settings.secure_cookies,
        ))
    } else {
        jar
    };

    match action {
        Action::Allow => {
            if let Some(principal) = auth.client.principal(&session) {
                let attributes = auth.client.attributes(&session);
                request.extensions_mut().insert(CasUser {
                    principal,
                    attributes,
                });
            }
            (jar, next.run(request).await).into_response()
        }
        Action::Redirect(location) => (jar, Redirect::to(&location)).into_response(),
        Action::Reject => (jar, StatusCode::UNAUTHORIZED).into_response(),
    }
}

// ── Logout ─────────────────────────────────────────────────────────

/// Handler: clear the CAS identity (or the whole session) and redirect to
/// CAS logout.
pub async fn logout<S: SessionStore>(
    State(auth): State<CasAuth<S>>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Response) {
    let (session_id, loaded) = match load_session(&auth, &jar).await {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(error = %e, "Session lookup failed during logout");
            (String::new(), None)
        }
    };

    let Some(mut session) = loaded else {
        let action = auth.client.logout(&mut MemorySession::new());
        return (jar, reply(action));
    };

    let action = auth.client.logout(&mut session);

    let jar = if session.is_destroyed() {
        if let Err(e) = auth.store.delete(&session_id).await {
            tracing::warn!(error = %e, "Session deletion failed during logout");
        }
        jar.remove(cookies::clear_session_cookie(
            &auth.settings.session_cookie_name,
        ))
    } else {
        if let Err(e) = auth.store.save(&session_id, session).await {
            tracing::warn!(error = %e, "Session update failed during logout");
        }
        jar
    };

    (jar, reply(action))
}

// ── Helpers ────────────────────────────────────────────────────────

/// Existing session for the cookie's ID, or a fresh ID with no session.
///
/// A cookie pointing at an unknown session gets a new ID rather than being
/// reused.
async fn load_session<S: SessionStore>(
    auth: &CasAuth<S>,
    jar: &PrivateCookieJar,
) -> Result<(String, Option<MemorySession>), AuthError> {
    if let Some(id) = cookies::get_session_id(jar, &auth.settings.session_cookie_name) {
        let found = auth
            .store
            .load(&id)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        if found.is_some() {
            return Ok((id, found));
        }
    }
    Ok((ids::generate_session_id(), None))
}

fn reply(action: Action) -> Response {
    match action {
        Action::Redirect(location) => Redirect::to(&location).into_response(),
        Action::Reject => StatusCode::UNAUTHORIZED.into_response(),
        Action::Allow => StatusCode::NO_CONTENT.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
    use axum::http::Request as HttpRequest;
    use axum::middleware::from_fn_with_state;
    use axum_extra::extract::cookie::{Cookie, Key};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::client::CasClient;
    use crate::config::CasConfig;
    use crate::middleware::config::CasAuthConfig;
    use crate::middleware::traits::MemoryStore;
    use crate::session::{RETURN_TO_SLOT, SessionSlots};
    use crate::types::AttributeValue;

    const COOKIE_NAME: &str = "__cas_session";

    fn cas_config() -> CasConfig {
        // Port 1 is closed: ticket validation fails at the transport.
        CasConfig::new(
            "http://127.0.0.1:1/cas".parse().unwrap(),
            "https://app.example.com".parse().unwrap(),
        )
        .with_session_info("cas_info")
    }

    fn auth_with(config: CasConfig, key: &Key) -> CasAuth<MemoryStore> {
        let config = CasAuthConfig::new(CasClient::new(config).unwrap())
            .with_cookie_key(key.clone())
            .with_secure_cookies(false);
        CasAuth::new(config, MemoryStore::new())
    }

    fn app(auth: &CasAuth<MemoryStore>) -> Router {
        let private = Router::new()
            .route(
                "/private",
                get(|user: CasUser| async move { user.principal.to_string() }),
            )
            .route_layer(from_fn_with_state(auth.clone(), bounce::<MemoryStore>));

        let api = Router::new()
            .route(
                "/api/me",
                get(|user: CasUser| async move {
                    user.attributes
                        .get("email")
                        .map(|v| v.values().join(","))
                        .unwrap_or_default()
                }),
            )
            .route_layer(from_fn_with_state(auth.clone(), block::<MemoryStore>));

        let login = Router::new()
            .route("/login", get(|| async { "unreachable when authenticated" }))
            .route_layer(from_fn_with_state(
                auth.clone(),
                bounce_redirect::<MemoryStore>,
            ));

        let public = Router::new().route(
            "/public",
            get(|user: Option<CasUser>| async move {
                user.map_or_else(|| "guest".to_string(), |u| u.principal.to_string())
            }),
        );

        private
            .merge(api)
            .merge(login)
            .merge(public)
            .merge(logout_routes(auth.clone(), "/logout"))
    }

    /// Encrypted cookie header value for `session_id`.
    fn cookie_header(key: &Key, session_id: &str) -> String {
        let jar = PrivateCookieJar::new(key.clone())
            .add(Cookie::new(COOKIE_NAME, session_id.to_string()));
        let response = jar.into_response();
        let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    async fn seed(auth: &CasAuth<MemoryStore>, session_id: &str, user: &str) {
        let mut session = MemorySession::new();
        session.insert("cas_user", Value::from(user));
        session.insert("cas_info", serde_json::json!({"email": ["a@x.org", "b@x.org"]}));
        session.insert(RETURN_TO_SLOT, Value::from("/private"));
        auth.store().save(session_id, session).await.unwrap();
    }

    fn get_request(uri: &str, cookie: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_bounce_redirects_to_cas_login() {
        let key = Key::generate();
        let auth = auth_with(cas_config(), &key);

        let response = app(&auth)
            .oneshot(get_request("/private", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[LOCATION].to_str().unwrap();
        assert_eq!(
            location,
            "http://127.0.0.1:1/cas/login?service=https%3A%2F%2Fapp.example.com%2Fprivate&renew=false"
        );
        assert!(response.headers().contains_key(SET_COOKIE));
        assert_eq!(auth.store().len().await, 1);
    }

    #[tokio::test]
    async fn test_block_rejects_without_creating_session() {
        let key = Key::generate();
        let auth = auth_with(cas_config(), &key);

        let response = app(&auth)
            .oneshot(get_request("/api/me", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!response.headers().contains_key(SET_COOKIE));
        assert!(auth.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_authenticated_session_passes_through() {
        let key = Key::generate();
        let auth = auth_with(cas_config(), &key);
        seed(&auth, "sid-1", "alice").await;
        let cookie = cookie_header(&key, "sid-1");

        let response = app(&auth)
            .oneshot(get_request("/private", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "alice");

        let response = app(&auth)
            .oneshot(get_request("/api/me", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "a@x.org,b@x.org");
    }

    #[tokio::test]
    async fn test_bounce_redirect_sends_authenticated_user_back() {
        let key = Key::generate();
        let auth = auth_with(cas_config(), &key);
        seed(&auth, "sid-1", "alice").await;
        let cookie = cookie_header(&key, "sid-1");

        let response = app(&auth)
            .oneshot(get_request("/login", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/private");
    }

    #[tokio::test]
    async fn test_unknown_session_cookie_is_treated_as_anonymous() {
        let key = Key::generate();
        let auth = auth_with(cas_config(), &key);
        let cookie = cookie_header(&key, "forged");

        let response = app(&auth)
            .oneshot(get_request("/api/me", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unreachable_cas_server_rejects_ticket() {
        let key = Key::generate();
        let auth = auth_with(cas_config(), &key);

        let response = app(&auth)
            .oneshot(get_request("/private?ticket=ST-1", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_dev_mode_logs_in_without_cas() {
        let key = Key::generate();
        let mut info = crate::types::Attributes::new();
        info.insert("email".into(), AttributeValue::from("dev@example.com"));
        let config = cas_config()
            .with_dev_mode_active(true)
            .with_dev_mode_user("developer")
            .with_dev_mode_info(info);
        let auth = auth_with(config, &key);

        let response = app(&auth)
            .oneshot(get_request("/api/me", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(SET_COOKIE));
        assert_eq!(body_text(response).await, "dev@example.com");
    }

    #[tokio::test]
    async fn test_optional_user_extractor() {
        let key = Key::generate();
        let auth = auth_with(cas_config(), &key);

        let response = app(&auth)
            .oneshot(get_request("/public", None))
            .await
            .unwrap();
        assert_eq!(body_text(response).await, "guest");
    }

    #[tokio::test]
    async fn test_logout_clears_identity_and_redirects() {
        let key = Key::generate();
        let auth = auth_with(cas_config(), &key);
        seed(&auth, "sid-1", "alice").await;
        let cookie = cookie_header(&key, "sid-1");

        let response = app(&auth)
            .oneshot(get_request("/logout", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[LOCATION],
            "http://127.0.0.1:1/cas/logout"
        );

        let session = auth.store().load("sid-1").await.unwrap().unwrap();
        assert_eq!(session.get("cas_user"), None);
        assert_eq!(session.get("cas_info"), None);
    }

    #[tokio::test]
    async fn test_logout_destroys_session() {
        let key = Key::generate();
        let auth = auth_with(cas_config().with_destroy_session(true), &key);
        seed(&auth, "sid-1", "alice").await;
        let cookie = cookie_header(&key, "sid-1");

        let response = app(&auth)
            .oneshot(get_request("/logout", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(auth.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_logout_without_session_still_redirects() {
        let key = Key::generate();
        let auth = auth_with(cas_config(), &key);

        let response = app(&auth)
            .oneshot(get_request("/logout", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[LOCATION],
            "http://127.0.0.1:1/cas/logout"
        );
    }
}
