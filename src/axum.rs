//! Axum integration utilities.
//!
//! Routes register a [`RoutePolicy`] through [`AuthorizeLayer`]; an earlier
//! layer (for example the `jwt` module) is expected to attach an
//! [`AuthContext`] to request extensions. A request with no context is
//! rejected outright, and a role failing the policy gets a 403.

use std::future::poll_fn;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::policy::RoutePolicy;
use crate::role::Role;
use crate::types::{PrincipalId, TenantId};

use ::axum::body::Body;
use ::axum::response::{IntoResponse, Response};
use ::http::{Request, StatusCode};
use ::tower::{Layer, Service};

/// Authentication context extracted from a request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Tenant identifier.
    pub tenant: TenantId,
    /// Principal identifier.
    pub principal: PrincipalId,
    /// Role assigned to the principal by the identity system.
    pub role: Role,
}

impl AuthContext {
    pub(crate) fn new(tenant: TenantId, principal: PrincipalId, role: Role) -> Self {
        Self {
            tenant,
            principal,
            role,
        }
    }
}

/// Middleware layer that enforces a [`RoutePolicy`].
#[derive(Debug, Clone)]
pub struct AuthorizeLayer {
    policy: Arc<RoutePolicy>,
}

impl AuthorizeLayer {
    /// Creates an authorization layer for one route's policy.
    pub fn new(policy: RoutePolicy) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }
}

impl<Inner> Layer<Inner> for AuthorizeLayer {
    type Service = AuthorizeService<Inner>;

    fn layer(&self, inner: Inner) -> Self::Service {
        AuthorizeService {
            inner,
            policy: self.policy.clone(),
        }
    }
}

/// Middleware service that enforces permission checks.
#[derive(Debug, Clone)]
pub struct AuthorizeService<Inner> {
    inner: Inner,
    policy: Arc<RoutePolicy>,
}

impl<Inner> Service<Request<Body>> for AuthorizeService<Inner>
where
    Inner: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    Inner::Future: Send + 'static,
{
    type Response = Response;
    type Error = Inner::Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();
        let policy = self.policy.clone();

        Box::pin(async move {
            let context = req.extensions().get::<AuthContext>().cloned();
            let Some(context) = context else {
                return Ok((StatusCode::UNAUTHORIZED, "missing auth context").into_response());
            };

            if policy.allows(context.role) {
                poll_fn(|cx| inner.poll_ready(cx)).await?;
                inner.call(req).await
            } else {
                Ok((StatusCode::FORBIDDEN, "forbidden").into_response())
            }
        })
    }
}

#[cfg(feature = "axum-jwt")]
pub mod jwt {
    use std::fmt;
    use std::marker::PhantomData;
    use std::pin::Pin;
    use std::str::FromStr;
    use std::sync::Arc;
    use std::task::{Context, Poll};

    use jsonwebtoken::{DecodingKey, Validation, decode};
    use serde::de::DeserializeOwned;
    use thiserror::Error;

    use crate::axum::AuthContext;
    use crate::role::Role;
    use crate::types::{PrincipalId, TenantId};

    use ::axum::body::Body;
    use ::axum::extract::FromRequestParts;
    use ::axum::response::{IntoResponse, Response};
    use ::http::header::AUTHORIZATION;
    use ::http::request::Parts;
    use ::http::{HeaderMap, Request, StatusCode};
    use ::tower::{Layer, Service};

    /// Errors returned by JWT auth helpers.
    #[derive(Debug, Error)]
    pub enum AuthError {
        /// Authorization header is missing.
        #[error("missing authorization header")]
        MissingAuthorization,
        /// Authorization header format is invalid.
        #[error("invalid authorization header")]
        InvalidAuthorization,
        /// JWT validation error.
        #[error("invalid token")]
        InvalidToken,
        /// Required claims are missing or invalid.
        ///
        /// This includes an unrecognized role string: the request is
        /// rejected rather than mapped to any default role.
        #[error("invalid claims: {0}")]
        InvalidClaims(String),
    }

    /// Rejection type for axum extractors.
    #[derive(Debug)]
    pub struct AuthRejection {
        status: StatusCode,
        message: String,
    }

    impl From<AuthError> for AuthRejection {
        fn from(err: AuthError) -> Self {
            Self {
                status: StatusCode::UNAUTHORIZED,
                message: err.to_string(),
            }
        }
    }

    impl IntoResponse for AuthRejection {
        fn into_response(self) -> Response {
            (self.status, self.message).into_response()
        }
    }

    /// Claims type used to extract tenant, principal, and role from JWTs.
    pub trait JwtClaims: DeserializeOwned + Send + Sync + Clone + 'static {
        /// Returns the tenant identifier string.
        fn tenant_id(&self) -> &str;
        /// Returns the principal identifier string.
        fn principal_id(&self) -> &str;
        /// Returns the role string.
        fn role(&self) -> &str;
    }

    /// Default JWT claims shape: `{ tenant_id, principal_id, role }`.
    #[derive(Debug, Clone, serde::Deserialize)]
    pub struct DefaultClaims {
        /// Tenant identifier.
        pub tenant_id: String,
        /// Principal identifier.
        pub principal_id: String,
        /// Role string, e.g. `council_member`.
        pub role: String,
        /// Standard JWT subject.
        pub sub: Option<String>,
        /// Standard JWT expiration.
        pub exp: Option<usize>,
    }

    impl JwtClaims for DefaultClaims {
        fn tenant_id(&self) -> &str {
            &self.tenant_id
        }

        fn principal_id(&self) -> &str {
            &self.principal_id
        }

        fn role(&self) -> &str {
            &self.role
        }
    }

    /// JWT auth state holding decoding settings.
    #[derive(Clone)]
    pub struct JwtAuthState<C: JwtClaims> {
        decoding_key: Arc<DecodingKey>,
        validation: Validation,
        _marker: PhantomData<fn() -> C>,
    }

    impl<C: JwtClaims> fmt::Debug for JwtAuthState<C> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("JwtAuthState")
                .field("decoding_key", &"<redacted>")
                .field("validation", &self.validation)
                .finish()
        }
    }

    impl<C: JwtClaims> JwtAuthState<C> {
        /// Creates a new JWT auth state.
        pub fn new(decoding_key: DecodingKey, validation: Validation) -> Self {
            Self {
                decoding_key: Arc::new(decoding_key),
                validation,
                _marker: PhantomData,
            }
        }

        fn decode_from_headers(&self, headers: &HeaderMap) -> Result<JwtAuth<C>, AuthError> {
            let token = bearer_token(headers)?;
            let data = decode::<C>(&token, &self.decoding_key, &self.validation)
                .map_err(|_| AuthError::InvalidToken)?;
            JwtAuth::from_claims(data.claims)
        }
    }

    /// Provides access to [`JwtAuthState`] for extractors.
    pub trait JwtAuthProvider<C: JwtClaims> {
        /// Returns the JWT auth state for decoding.
        fn jwt_auth(&self) -> &JwtAuthState<C>;
    }

    /// Extracted JWT auth context plus claims.
    #[derive(Debug, Clone)]
    pub struct JwtAuth<C: JwtClaims> {
        /// Parsed auth context.
        pub context: AuthContext,
        /// Full claims.
        pub claims: C,
    }

    impl<C: JwtClaims> JwtAuth<C> {
        fn from_claims(claims: C) -> Result<Self, AuthError> {
            let tenant = TenantId::try_from(claims.tenant_id())
                .map_err(|err| AuthError::InvalidClaims(err.to_string()))?;
            let principal = PrincipalId::try_from(claims.principal_id())
                .map_err(|err| AuthError::InvalidClaims(err.to_string()))?;
            let role = Role::from_str(claims.role())
                .map_err(|err| AuthError::InvalidClaims(err.to_string()))?;
            Ok(Self {
                context: AuthContext::new(tenant, principal, role),
                claims,
            })
        }
    }

    impl<S, C> FromRequestParts<S> for JwtAuth<C>
    where
        S: Send + Sync + JwtAuthProvider<C>,
        C: JwtClaims,
    {
        type Rejection = AuthRejection;

        async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
            if let Some(existing) = parts.extensions.get::<JwtAuth<C>>() {
                return Ok(existing.clone());
            }
            let auth = state.jwt_auth().decode_from_headers(&parts.headers)?;
            parts.extensions.insert(auth.clone());
            parts.extensions.insert(auth.context.clone());
            Ok(auth)
        }
    }

    impl<S> FromRequestParts<S> for AuthContext
    where
        S: Send + Sync + JwtAuthProvider<DefaultClaims>,
    {
        type Rejection = AuthRejection;

        async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
            let auth = JwtAuth::<DefaultClaims>::from_request_parts(parts, state).await?;
            Ok(auth.context)
        }
    }

    /// Middleware layer that decodes JWT and inserts auth context into
    /// request extensions.
    #[derive(Debug, Clone)]
    pub struct JwtAuthLayer<C: JwtClaims> {
        state: Arc<JwtAuthState<C>>,
    }

    impl<C: JwtClaims> JwtAuthLayer<C> {
        /// Creates a new JWT auth layer.
        pub fn new(state: JwtAuthState<C>) -> Self {
            Self {
                state: Arc::new(state),
            }
        }
    }

    impl<S, C> Layer<S> for JwtAuthLayer<C>
    where
        C: JwtClaims,
    {
        type Service = JwtAuthService<S, C>;

        fn layer(&self, inner: S) -> Self::Service {
            JwtAuthService {
                inner,
                state: self.state.clone(),
            }
        }
    }

    /// Middleware service that decodes JWT and attaches [`AuthContext`].
    #[derive(Debug, Clone)]
    pub struct JwtAuthService<S, C: JwtClaims> {
        inner: S,
        state: Arc<JwtAuthState<C>>,
    }

    impl<S, C> Service<Request<Body>> for JwtAuthService<S, C>
    where
        S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
        S::Future: Send + 'static,
        C: JwtClaims,
    {
        type Response = Response;
        type Error = S::Error;
        type Future =
            Pin<Box<dyn std::future::Future<Output = Result<Response, Self::Error>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, mut req: Request<Body>) -> Self::Future {
            let state = self.state.clone();
            let mut inner = self.inner.clone();

            Box::pin(async move {
                match state.decode_from_headers(req.headers()) {
                    Ok(auth) => {
                        req.extensions_mut().insert(auth.context.clone());
                        req.extensions_mut().insert(auth);
                        std::future::poll_fn(|cx| inner.poll_ready(cx)).await?;
                        inner.call(req).await
                    }
                    Err(err) => Ok(AuthRejection::from(err).into_response()),
                }
            })
        }
    }

    fn bearer_token(headers: &HeaderMap) -> Result<String, AuthError> {
        let value = headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthorization)?;
        let value = value
            .to_str()
            .map_err(|_| AuthError::InvalidAuthorization)?;
        let token = value
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthorization)?;
        if token.is_empty() {
            return Err(AuthError::InvalidAuthorization);
        }
        Ok(token.to_string())
    }
}
