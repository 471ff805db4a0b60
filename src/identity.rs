// SPDX-FileCopyrightText: 2025 Scrawl Authors
//
// SPDX-License-Identifier: Apache-2.0

pub(crate) mod http;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// An authenticated identity as reported by the identity service. Either the
/// whole value exists or none of it does; there is no partially-populated
/// form.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub(crate) struct Identity {
    id: String,
    display_name: Option<String>,
    email: Option<String>,
}

impl Identity {
    pub(crate) fn new(
        id: impl Into<String>,
        display_name: Option<String>,
        email: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name,
            email,
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub(crate) fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// The name to show for this identity, falling back through the fields
    /// the identity service may have omitted.
    pub(crate) fn label(&self) -> &str {
        self.display_name()
            .or_else(|| self.email())
            .unwrap_or(&self.id)
    }
}

/// The identity-service boundary. The one production implementation talks
/// REST ([`http::Provider`]); tests substitute fakes.
#[async_trait]
pub(crate) trait Provider: Send + Sync {
    /// Exchange credentials for an identity. Implementations retain whatever
    /// refresh material they need so that [`Provider::mint_token`] works
    /// afterwards; they must not leave any half-established state behind on
    /// failure.
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Identity>;

    /// Create a new account and sign it in. Same retention contract as
    /// [`Provider::sign_in`].
    async fn sign_up(
        &self,
        email: &str,
        display_name: &str,
        password: &SecretString,
    ) -> Result<Identity>;

    /// Mint a short-lived access token for one outbound request. Always a
    /// fresh exchange against the identity service; token lifetimes are too
    /// short for caching to be worth the staleness risk, and the service's
    /// own refresh handling is authoritative.
    async fn mint_token(&self, identity: &Identity) -> Result<SecretString>;

    /// The ambient identity restored from a previous sign-in, if any.
    /// Synchronous and local; never performs a network call.
    fn current(&self) -> Option<Identity>;

    /// Discard the stored credential. Idempotent.
    async fn sign_out(&self) -> Result<()>;
}

#[async_trait]
impl<T: Provider + ?Sized> Provider for Box<T> {
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Identity> {
        (**self).sign_in(email, password).await
    }

    async fn sign_up(
        &self,
        email: &str,
        display_name: &str,
        password: &SecretString,
    ) -> Result<Identity> {
        (**self).sign_up(email, display_name, password).await
    }

    async fn mint_token(&self, identity: &Identity) -> Result<SecretString> {
        (**self).mint_token(identity).await
    }

    fn current(&self) -> Option<Identity> {
        (**self).current()
    }

    async fn sign_out(&self) -> Result<()> {
        (**self).sign_out().await
    }
}
