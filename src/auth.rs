use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, TokenData, Validation};
use secrecy::{ExposeSecret as _, SecretString};

use crate::api::App;
use crate::model::{Role, User};
use crate::prelude::*;

/// The bearer claims minted by the identity provider. This service shares
/// the signing secret and consumes the claims as-is; identity lifecycle
/// (sign-up, passwords, invitations, role changes) never touches it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, new)]
pub struct Claims {
    #[new(value = "(chrono::Utc::now() + Duration::days(7)).timestamp()")]
    pub exp: i64,

    pub sub: Record<User>,
    pub role: Role,
}

#[derive(Debug, Snafu, Serialize)]
#[snafu(visibility(pub(crate)))]
#[serde(tag = "error", content = "data")]
pub enum AuthError {
    #[snafu(display("failed to decode JWT token"))]
    Decode {
        #[serde(skip)]
        source: jsonwebtoken::errors::Error,
        #[serde(skip)]
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("failed to encode JWT token"))]
    Encode {
        #[serde(skip)]
        source: jsonwebtoken::errors::Error,
        #[serde(skip)]
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("request is not authenticated"))]
    ExtractToken {
        #[serde(skip)]
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("this action requires the admin role"))]
    RequireAdmin { role: Role },
}

impl AuthError {
    fn status(&self) -> StatusCode {
        match self {
            AuthError::RequireAdmin { .. } => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    message: String,
    #[serde(flatten)]
    data: AuthError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let content = AuthResponse {
            message: self.to_string(),
            data: self,
        };

        (status, Json(content)).into_response()
    }
}

/// Decodes and verifies bearer tokens against the shared signing secret.
#[derive(Debug, Clone)]
pub struct Authenticator {
    secret: SecretString,
    algorithm: Algorithm,
    validation: Validation,
}

impl Authenticator {
    pub fn new(secret: SecretString) -> Self {
        let algorithm = Algorithm::HS256;

        Self {
            secret,
            algorithm,
            validation: Validation::new(algorithm),
        }
    }

    fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.secret.expose_secret().as_ref())
    }

    fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.secret.expose_secret().as_ref())
    }

    fn header(&self) -> jsonwebtoken::Header {
        jsonwebtoken::Header::new(self.algorithm)
    }

    pub fn decode(&self, token: &str) -> Result<TokenData<Claims>, AuthError> {
        jsonwebtoken::decode(token, &self.decoding_key(), &self.validation).context(DecodeSnafu)
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, AuthError> {
        jsonwebtoken::encode(&self.header(), claims, &self.encoding_key()).context(EncodeSnafu)
    }

    pub fn extract(&self, parts: &Parts) -> Result<Claims, AuthError> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .context(ExtractTokenSnafu)?;

        let token = header.to_str().ok().context(ExtractTokenSnafu)?;
        let token = token.strip_prefix("Bearer ").context(ExtractTokenSnafu)?;

        Ok(self.decode(token)?.claims)
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Claims
where
    App: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = App::from_ref(state);
        app.authenticator.extract(parts)
    }
}

/// Proof that the caller holds the admin role. The capability check lives
/// here at the boundary; the services behind it assume it already passed.
#[derive(Debug, Clone)]
pub struct Admin(pub Claims);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Admin
where
    App: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let claims = Claims::from_request_parts(parts, state).await?;

        snafu::ensure!(
            claims.role.is_admin(),
            RequireAdminSnafu { role: claims.role }
        );

        Ok(Admin(claims))
    }
}
