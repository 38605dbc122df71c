// Request authorization gate
//
// Every request on the gated routes passes through `AuthGate::evaluate`, which
// runs an ordered list of checks. Each check either hands over to the next one
// or produces the final decision.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::auth::{
    error::AuthError,
    middleware::{AuthenticatedUser, Identity},
    token::{SessionClaims, TokenService},
};

/// Why a request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    MissingAuthHeader,
    InvalidOrExpiredToken,
}

impl From<DenyReason> for AuthError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::MissingAuthHeader => AuthError::MissingToken,
            DenyReason::InvalidOrExpiredToken => AuthError::InvalidToken,
        }
    }
}

/// Final outcome for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allowed(Identity),
    Denied(DenyReason),
}

enum Flow {
    Next,
    Decide(GateDecision),
}

/// What the checks have learned about the request so far
struct Inspection<'a> {
    method: &'a Method,
    path: &'a str,
    header: Option<&'a HeaderValue>,
    token: Option<&'a str>,
    claims: Option<SessionClaims>,
}

type Check = fn(&TokenService, &mut Inspection<'_>) -> Flow;

const CHECKS: [(&str, Check); 5] = [
    ("public_read", public_read),
    ("header_present", header_present),
    ("bearer_token", bearer_token),
    ("verify_token", verify_token),
    ("bind_identity", bind_identity),
];

fn deny_invalid() -> Flow {
    Flow::Decide(GateDecision::Denied(DenyReason::InvalidOrExpiredToken))
}

/// Book reads are open to anonymous callers
fn public_read(_: &TokenService, inspection: &mut Inspection<'_>) -> Flow {
    let read_only = *inspection.method == Method::GET || *inspection.method == Method::HEAD;
    if read_only && inspection.path.split('/').any(|segment| segment == "books") {
        return Flow::Decide(GateDecision::Allowed(Identity::Anonymous));
    }
    Flow::Next
}

/// An absent or blank Authorization header counts as missing
fn header_present(_: &TokenService, inspection: &mut Inspection<'_>) -> Flow {
    match inspection.header {
        Some(value) if !value.as_bytes().iter().all(u8::is_ascii_whitespace) => Flow::Next,
        _ => Flow::Decide(GateDecision::Denied(DenyReason::MissingAuthHeader)),
    }
}

/// Expects exactly `Bearer <token>`; anything else is an invalid token
fn bearer_token(_: &TokenService, inspection: &mut Inspection<'_>) -> Flow {
    let Some(raw) = inspection.header.and_then(|value| value.to_str().ok()) else {
        return deny_invalid();
    };

    let mut parts = raw.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => {
            inspection.token = Some(token);
            Flow::Next
        }
        _ => deny_invalid(),
    }
}

fn verify_token(tokens: &TokenService, inspection: &mut Inspection<'_>) -> Flow {
    match inspection.token.and_then(|token| tokens.verify(token)) {
        Some(claims) => {
            inspection.claims = Some(claims);
            Flow::Next
        }
        None => deny_invalid(),
    }
}

/// A verified token without a subject is still unusable
fn bind_identity(_: &TokenService, inspection: &mut Inspection<'_>) -> Flow {
    match inspection.claims.as_ref().and_then(SessionClaims::identity) {
        Some(identity) => Flow::Decide(GateDecision::Allowed(Identity::User(AuthenticatedUser {
            user_id: identity.user_id,
            email: identity.email,
        }))),
        None => deny_invalid(),
    }
}

/// Decides, once per request, whether it may reach a handler
pub struct AuthGate {
    tokens: Arc<TokenService>,
}

impl AuthGate {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }

    pub fn evaluate(&self, method: &Method, path: &str, headers: &HeaderMap) -> GateDecision {
        let mut inspection = Inspection {
            method,
            path,
            header: headers.get(header::AUTHORIZATION),
            token: None,
            claims: None,
        };

        for (name, check) in CHECKS {
            if let Flow::Decide(decision) = check(&self.tokens, &mut inspection) {
                debug!(check = name, ?decision, "gate decided");
                return decision;
            }
        }

        // The last check always decides; refuse if that ever changes
        GateDecision::Denied(DenyReason::InvalidOrExpiredToken)
    }
}

/// axum middleware running the gate in front of the protected routes
///
/// On success the resolved `Identity` is stored in the request extensions,
/// where the `AuthenticatedUser` extractor picks it up.
pub async fn authorize(
    State(gate): State<Arc<AuthGate>>,
    mut request: Request,
    next: Next,
) -> Response {
    let decision = gate.evaluate(request.method(), request.uri().path(), request.headers());

    match decision {
        GateDecision::Allowed(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        GateDecision::Denied(reason) => {
            warn!(
                method = %request.method(),
                path = %request.uri().path(),
                ?reason,
                "request denied by authorization gate"
            );
            AuthError::from(reason).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::{IdentityClaims, CLAIMS_VERSION, SESSION_TTL_SECONDS};
    use axum::{
        body::{to_bytes, Body},
        http::{self, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use proptest::prelude::*;
    use tower::ServiceExt;
    use uuid::Uuid;

    const TEST_SECRET: &[u8] = b"test_secret_key_for_testing_purposes";

    fn test_tokens() -> Arc<TokenService> {
        Arc::new(TokenService::new(TEST_SECRET))
    }

    fn test_gate() -> AuthGate {
        AuthGate::new(test_tokens())
    }

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn issue_for(user_id: Uuid) -> String {
        test_tokens()
            .issue(&IdentityClaims {
                user_id,
                email: "a@x.com".to_string(),
            })
            .unwrap()
    }

    #[test]
    fn test_public_listing_without_header_is_anonymous() {
        let decision = test_gate().evaluate(&Method::GET, "/api/books", &HeaderMap::new());
        assert_eq!(decision, GateDecision::Allowed(Identity::Anonymous));

        let decision = test_gate().evaluate(&Method::GET, "/api/books/123", &HeaderMap::new());
        assert_eq!(decision, GateDecision::Allowed(Identity::Anonymous));
    }

    #[test]
    fn test_public_read_ignores_bad_header() {
        let decision =
            test_gate().evaluate(&Method::GET, "/api/books", &headers_with_auth("Bearer garbage"));
        assert_eq!(decision, GateDecision::Allowed(Identity::Anonymous));
    }

    #[test]
    fn test_only_books_segment_is_public() {
        let decision = test_gate().evaluate(&Method::GET, "/api/user/me", &HeaderMap::new());
        assert_eq!(decision, GateDecision::Denied(DenyReason::MissingAuthHeader));

        let decision = test_gate().evaluate(&Method::GET, "/api/bookshelf", &HeaderMap::new());
        assert_eq!(decision, GateDecision::Denied(DenyReason::MissingAuthHeader));
    }

    #[test]
    fn test_mutation_without_header_is_denied() {
        for method in [Method::POST, Method::PUT, Method::DELETE] {
            let decision = test_gate().evaluate(&method, "/api/books", &HeaderMap::new());
            assert_eq!(decision, GateDecision::Denied(DenyReason::MissingAuthHeader));
        }
    }

    #[test]
    fn test_blank_header_counts_as_missing() {
        let decision = test_gate().evaluate(&Method::POST, "/api/books", &headers_with_auth("   "));
        assert_eq!(decision, GateDecision::Denied(DenyReason::MissingAuthHeader));
    }

    #[test]
    fn test_garbage_bearer_is_denied() {
        let decision =
            test_gate().evaluate(&Method::POST, "/api/books", &headers_with_auth("Bearer garbage"));
        assert_eq!(decision, GateDecision::Denied(DenyReason::InvalidOrExpiredToken));
    }

    #[test]
    fn test_malformed_header_structure_is_invalid_token() {
        let token = issue_for(Uuid::new_v4());
        let malformed = [
            token.clone(),
            format!("Basic {}", token),
            format!("Bearer {} extra", token),
            "Bearer".to_string(),
        ];

        for value in malformed {
            let decision =
                test_gate().evaluate(&Method::DELETE, "/api/books/1", &headers_with_auth(&value));
            assert_eq!(decision, GateDecision::Denied(DenyReason::InvalidOrExpiredToken));
        }
    }

    #[test]
    fn test_non_utf8_header_is_invalid_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_bytes(b"Bearer \xff\xfe").unwrap());

        let decision = test_gate().evaluate(&Method::POST, "/api/books", &headers);
        assert_eq!(decision, GateDecision::Denied(DenyReason::InvalidOrExpiredToken));
    }

    #[test]
    fn test_valid_token_binds_subject() {
        let user_id = Uuid::new_v4();
        let header = format!("Bearer {}", issue_for(user_id));

        let decision = test_gate().evaluate(&Method::POST, "/api/books", &headers_with_auth(&header));

        match decision {
            GateDecision::Allowed(Identity::User(user)) => {
                assert_eq!(user.user_id, user_id);
                assert_eq!(user.email, "a@x.com");
            }
            other => panic!("expected an authenticated identity, got {:?}", other),
        }
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        let header = format!("bearer {}", issue_for(Uuid::new_v4()));
        let decision = test_gate().evaluate(&Method::PUT, "/api/books/1", &headers_with_auth(&header));
        assert!(matches!(decision, GateDecision::Allowed(Identity::User(_))));
    }

    #[test]
    fn test_expired_token_is_denied() {
        let issued_at = Utc::now().timestamp() - SESSION_TTL_SECONDS - 5;
        let token = test_tokens()
            .issue_at(
                &IdentityClaims {
                    user_id: Uuid::new_v4(),
                    email: "a@x.com".to_string(),
                },
                issued_at,
            )
            .unwrap();

        let decision = test_gate().evaluate(
            &Method::POST,
            "/api/books",
            &headers_with_auth(&format!("Bearer {}", token)),
        );
        assert_eq!(decision, GateDecision::Denied(DenyReason::InvalidOrExpiredToken));
    }

    #[test]
    fn test_token_without_subject_is_denied() {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            user_id: None,
            email: "a@x.com".to_string(),
            iat: now,
            exp: now + 600,
            jti: Uuid::new_v4(),
            ver: CLAIMS_VERSION,
        };
        let token =
            encode(&Header::default(), &claims, &EncodingKey::from_secret(TEST_SECRET)).unwrap();

        let decision = test_gate().evaluate(
            &Method::POST,
            "/api/books",
            &headers_with_auth(&format!("Bearer {}", token)),
        );
        assert_eq!(decision, GateDecision::Denied(DenyReason::InvalidOrExpiredToken));
    }

    // Middleware behaviour through a real router

    async fn whoami(user: AuthenticatedUser) -> String {
        user.user_id.to_string()
    }

    fn test_router() -> Router {
        Router::new()
            .route("/api/user/me", get(whoami))
            .route("/api/books", get(|| async { "public" }))
            .route_layer(middleware::from_fn_with_state(Arc::new(test_gate()), authorize))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_middleware_missing_header_returns_401_json() {
        let response = test_router()
            .oneshot(http::Request::builder().uri("/api/user/me").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Unauthorized or missing Authorization header");
    }

    #[tokio::test]
    async fn test_middleware_invalid_token_returns_401_json() {
        let response = test_router()
            .oneshot(
                http::Request::builder()
                    .uri("/api/user/me")
                    .header(header::AUTHORIZATION, "Bearer garbage")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Unauthorized or invalid token");
    }

    #[tokio::test]
    async fn test_middleware_passes_identity_downstream() {
        let user_id = Uuid::new_v4();
        let response = test_router()
            .oneshot(
                http::Request::builder()
                    .uri("/api/user/me")
                    .header(header::AUTHORIZATION, format!("Bearer {}", issue_for(user_id)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes, user_id.to_string().as_bytes());
    }

    #[tokio::test]
    async fn test_middleware_public_listing_needs_no_header() {
        let response = test_router()
            .oneshot(http::Request::builder().uri("/api/books").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    proptest! {
        #[test]
        fn prop_garbage_tokens_never_allowed(garbage in "[a-zA-Z0-9._-]{1,60}") {
            let header = format!("Bearer {}", garbage);
            let decision =
                test_gate().evaluate(&Method::POST, "/api/books", &headers_with_auth(&header));
            prop_assert_eq!(decision, GateDecision::Denied(DenyReason::InvalidOrExpiredToken));
        }
    }
}
