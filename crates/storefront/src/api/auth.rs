//! Authentication endpoints.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::types::User;
use super::{ApiError, ApiSession, CanteenClient, decode};

/// Sign-up form as sent to `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration<'a> {
    pub full_name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub password: &'a str,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
pub(super) struct UserEnvelope {
    pub user: User,
}

impl CanteenClient {
    /// Sign in and capture the upstream session.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] with the API's message for bad
    /// credentials, or any transport error.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, ApiSession), ApiError> {
        let request = self
            .request(Method::POST, "auth/login", None)?
            .json(&Credentials { email, password });
        self.authenticate(request).await
    }

    /// Create a customer account and sign in.
    ///
    /// # Errors
    ///
    /// Returns an error carrying the API's message when registration is
    /// refused (e.g. the email is taken).
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(
        &self,
        registration: &Registration<'_>,
    ) -> Result<(User, ApiSession), ApiError> {
        let request = self
            .request(Method::POST, "auth/register", None)?
            .json(registration);
        self.authenticate(request).await
    }

    async fn authenticate(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<(User, ApiSession), ApiError> {
        let (headers, body) = self.execute_raw(request).await?;
        let session = ApiSession::from_headers(&headers).ok_or(ApiError::MissingSession)?;
        let envelope: UserEnvelope = decode(&body)?;
        Ok((envelope.user, session))
    }

    /// End the upstream session.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, session))]
    pub async fn logout(&self, session: &ApiSession) -> Result<(), ApiError> {
        let request = self.request(Method::POST, "auth/logout", Some(session))?;
        self.execute_unit(request).await
    }

    /// Fetch the user behind a session.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] once the session has expired.
    #[instrument(skip(self, session))]
    pub async fn me(&self, session: &ApiSession) -> Result<User, ApiError> {
        let request = self.request(Method::GET, "auth/me", Some(session))?;
        let envelope: UserEnvelope = self.execute(request).await?;
        Ok(envelope.user)
    }
}
