//! Auth API endpoints

use super::{
    error::ClientError,
    typed::{AuthenticatedApiClient, PublicApiClient},
};
use crate::types::{
    ForgotPasswordRequest, LoginRequest, RefreshTokenRequest, RegisterData,
    ResetPasswordRequest, TokenPair, User,
};
use reqwest::Method;

/// Endpoints that work without a session
impl PublicApiClient {
    /// Exchange credentials for a token pair
    #[tracing::instrument(name = "api.login", skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, ClientError> {
        let req = self.request(Method::POST, "/auth/login").json(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        });
        self.execute(req).await
    }

    /// Create an account; the API returns the new user without issuing tokens
    #[tracing::instrument(name = "api.register", skip_all)]
    pub async fn register(&self, data: &RegisterData) -> Result<User, ClientError> {
        let req = self.request(Method::POST, "/auth/register").json(data);
        self.execute(req).await
    }

    /// Invalidate a refresh token server-side
    #[tracing::instrument(name = "api.logout", skip_all)]
    pub async fn logout(&self, refresh_token: &str) -> Result<(), ClientError> {
        let req = self
            .request(Method::POST, "/auth/logout")
            .json(&RefreshTokenRequest {
                refresh_token: refresh_token.to_string(),
            });
        self.execute_unit(req).await
    }

    /// Trade a refresh token for a new token pair
    #[tracing::instrument(name = "api.refresh", skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ClientError> {
        let req = self
            .request(Method::POST, "/auth/refresh")
            .json(&RefreshTokenRequest {
                refresh_token: refresh_token.to_string(),
            });
        self.execute(req).await
    }

    /// Ask for a password reset email
    #[tracing::instrument(name = "api.forgot_password", skip_all)]
    pub async fn forgot_password(&self, email: &str) -> Result<(), ClientError> {
        let req = self
            .request(Method::POST, "/auth/forgot-password")
            .json(&ForgotPasswordRequest {
                email: email.to_string(),
            });
        self.execute_unit(req).await
    }

    /// Set a new password using the token from the reset email
    #[tracing::instrument(name = "api.reset_password", skip_all)]
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), ClientError> {
        let req = self
            .request(Method::POST, "/auth/reset-password")
            .json(&ResetPasswordRequest {
                token: token.to_string(),
                new_password: new_password.to_string(),
            });
        self.execute_unit(req).await
    }
}

/// Endpoints that require a bearer token
impl AuthenticatedApiClient {
    /// Get the current user's profile
    #[tracing::instrument(name = "api.me", skip_all)]
    pub async fn get_me(&self) -> Result<User, ClientError> {
        let request = self.request(Method::GET, "/users/me");
        self.execute(request).await
    }

    /// Revoke every token issued to the current user
    #[tracing::instrument(name = "api.revoke_all_tokens", skip_all)]
    pub async fn revoke_all_tokens(&self) -> Result<(), ClientError> {
        let request = self.request(Method::POST, "/auth/revoke-all-tokens");
        self.execute_unit(request).await
    }
}
