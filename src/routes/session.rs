use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::state::SessionToken;

/// Request header carrying the caller's session token.
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

/// Session token presented by the caller, if any.
///
/// Never rejects: an absent or unreadable header yields `None`, which every gated operation
/// treats as an anonymous caller.
pub struct SessionHeader(pub Option<SessionToken>);

impl SessionHeader {
    pub fn token(&self) -> Option<&SessionToken> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for SessionHeader
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(SESSION_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(SessionToken::from);
        Ok(Self(token))
    }
}
