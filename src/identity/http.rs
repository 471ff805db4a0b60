// SPDX-FileCopyrightText: 2025 Scrawl Authors
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    io,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use log::warn;
use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use url::Url;

use crate::{
    error::{self, Error, Result},
    storage,
};

use super::Identity;

/// The credential retained between invocations: who signed in, and the
/// refresh token the identity service handed us for minting access tokens.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct Credentials {
    identity: Identity,
    refresh_token: String,
}

/// REST identity provider. Sign-in exchanges an email/password for an
/// identity and a refresh token; access tokens are minted per request from
/// the refresh token, never cached.
pub(crate) struct Provider<Storage: storage::Storage<Credentials>> {
    http: reqwest::Client,
    sign_in_url: Url,
    sign_up_url: Url,
    token_url: Url,
    api_key: Option<String>,
    storage: Arc<Mutex<Storage>>,
    current: RwLock<Option<Credentials>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'req> {
    email: &'req str,
    password: &'req str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignUpRequest<'req> {
    email: &'req str,
    password: &'req str,
    display_name: &'req str,
    return_secure_token: bool,
}

// Sign-up answers with the same account payload as sign-in.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    refresh_token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    id_token: String,
    refresh_token: String,
}

fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| Error::Command)?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Pull the human-readable message out of an identity-service error body,
/// falling back to the raw body when it isn't the JSON shape we expect.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .as_ref()
        .and_then(|value| value.pointer("/error/message"))
        .and_then(serde_json::Value::as_str)
        .map_or_else(|| body.to_owned(), str::to_owned)
}

impl<Storage: storage::Storage<Credentials>> Provider<Storage> {
    pub(crate) async fn new(
        storage: Arc<Mutex<Storage>>,
        sign_in_base: &Url,
        token_base: &Url,
        api_key: Option<String>,
    ) -> Result<Self> {
        let stored = storage.lock().await.get().await?;

        Ok(Self {
            http: reqwest::Client::new(),
            sign_in_url: endpoint(sign_in_base, &["v1", "accounts:signInWithPassword"])?,
            sign_up_url: endpoint(sign_in_base, &["v1", "accounts:signUp"])?,
            token_url: endpoint(token_base, &["v1", "token"])?,
            api_key,
            storage,
            current: RwLock::new(stored),
        })
    }

    fn keyed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key.as_ref() {
            Some(key) => req.query(&[("key", key)]),
            None => req,
        }
    }

    async fn store(&self, credentials: Credentials) -> Result<()> {
        self.storage.lock().await.update(&credentials).await?;
        *self
            .current
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(credentials);
        Ok(())
    }

    /// Retain the account payload from a successful sign-in or sign-up
    /// exchange and hand back the identity it describes.
    async fn retain(&self, resp: SignInResponse) -> Result<Identity> {
        let identity = Identity::new(resp.local_id, resp.display_name, resp.email);
        self.store(Credentials {
            identity: identity.clone(),
            refresh_token: resp.refresh_token,
        })
        .await?;
        Ok(identity)
    }
}

#[async_trait]
impl<Storage: storage::Storage<Credentials>> super::Provider for Provider<Storage> {
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Identity> {
        let resp = self
            .keyed(self.http.post(self.sign_in_url.clone()))
            .json(&SignInRequest {
                email,
                password: password.expose_secret(),
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|e| error::Auth::SignIn(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| error::Auth::SignIn(e.to_string()))?;
        if !status.is_success() {
            return Err(error::Auth::SignIn(error_message(&body)).into());
        }

        let resp: SignInResponse = serde_json::from_str(&body)?;
        self.retain(resp).await
    }

    async fn sign_up(
        &self,
        email: &str,
        display_name: &str,
        password: &SecretString,
    ) -> Result<Identity> {
        let resp = self
            .keyed(self.http.post(self.sign_up_url.clone()))
            .json(&SignUpRequest {
                email,
                password: password.expose_secret(),
                display_name,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|e| error::Auth::SignUp(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| error::Auth::SignUp(e.to_string()))?;
        if !status.is_success() {
            return Err(error::Auth::SignUp(error_message(&body)).into());
        }

        let resp: SignInResponse = serde_json::from_str(&body)?;
        self.retain(resp).await
    }

    async fn mint_token(&self, identity: &Identity) -> Result<SecretString> {
        let refresh_token = {
            let guard = self
                .current
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            match guard.as_ref() {
                Some(credentials) if credentials.identity.id() == identity.id() => {
                    credentials.refresh_token.clone()
                }
                Some(_) | None => return Err(error::Auth::NoSession.into()),
            }
        };

        let resp = self
            .keyed(self.http.post(self.token_url.clone()))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", &refresh_token),
            ])
            .send()
            .await
            .map_err(|e| error::Auth::TokenFetch(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| error::Auth::TokenFetch(e.to_string()))?;
        if !status.is_success() {
            return Err(error::Auth::TokenFetch(error_message(&body)).into());
        }

        let resp: TokenResponse =
            serde_json::from_str(&body).map_err(|e| error::Auth::TokenFetch(e.to_string()))?;

        // The service rotates the refresh token on every exchange; losing the
        // rotated value only costs us a future re-login, so a storage failure
        // here doesn't fail the mint.
        if let Err(e) = self
            .store(Credentials {
                identity: identity.clone(),
                refresh_token: resp.refresh_token,
            })
            .await
        {
            warn!("We couldn't persist the rotated refresh token: {}", e);
        }

        Ok(SecretString::new(resp.id_token))
    }

    fn current(&self) -> Option<Identity> {
        self.current
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .as_ref()
            .map(|credentials| credentials.identity.clone())
    }

    async fn sign_out(&self) -> Result<()> {
        match self.storage.lock().await.clear().await {
            Ok(()) => {}
            Err(Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        *self
            .current
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json};

    use crate::identity::Provider as _;

    use super::*;

    #[derive(Default)]
    struct FakeService {
        mints: AtomicU32,
    }

    async fn sign_in_handler(Json(req): Json<serde_json::Value>) -> impl IntoResponse {
        if req["password"] == "hunter2" {
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "localId": "u1",
                    "displayName": "Ada",
                    "email": req["email"],
                    "idToken": "unused-initial-token",
                    "refreshToken": "refresh-0",
                })),
            )
        } else {
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": { "message": "INVALID_PASSWORD" } })),
            )
        }
    }

    async fn sign_up_handler(Json(req): Json<serde_json::Value>) -> impl IntoResponse {
        if req["email"] == "ada@example.com" {
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": { "message": "EMAIL_EXISTS" } })),
            )
        } else {
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "localId": "u2",
                    "displayName": req["displayName"],
                    "email": req["email"],
                    "idToken": "unused-initial-token",
                    "refreshToken": "refresh-0",
                })),
            )
        }
    }

    async fn token_handler(
        State(service): State<Arc<FakeService>>,
        axum::extract::Form(form): axum::extract::Form<std::collections::HashMap<String, String>>,
    ) -> impl IntoResponse {
        assert_eq!(form.get("grant_type").map(String::as_str), Some("refresh_token"));
        let generation = service.mints.fetch_add(1, Ordering::SeqCst) + 1;
        (
            StatusCode::OK,
            Json(serde_json::json!({
                "id_token": format!("access-{generation}"),
                "refresh_token": format!("refresh-{generation}"),
                "user_id": "u1",
            })),
        )
    }

    async fn serve() -> (Url, Arc<FakeService>) {
        let service = Arc::new(FakeService::default());
        let app = axum::Router::new()
            .route("/v1/accounts:signInWithPassword", post(sign_in_handler))
            .route("/v1/accounts:signUp", post(sign_up_handler))
            .route("/v1/token", post(token_handler))
            .with_state(Arc::clone(&service));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        }));

        (Url::parse(&format!("http://{addr}")).unwrap(), service)
    }

    async fn provider(
        base: &Url,
    ) -> Provider<storage::Memory<Credentials>> {
        Provider::new(
            Arc::new(Mutex::new(storage::Memory::new())),
            base,
            base,
            Some("test-key".to_owned()),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn sign_in_establishes_ambient_identity() {
        let (base, _service) = serve().await;
        let provider = provider(&base).await;

        assert!(provider.current().is_none());

        let identity = provider
            .sign_in("ada@example.com", &SecretString::new("hunter2".to_owned()))
            .await
            .unwrap();
        assert_eq!(identity.id(), "u1");
        assert_eq!(identity.display_name(), Some("Ada"));
        assert_eq!(provider.current(), Some(identity));
    }

    #[tokio::test]
    async fn failed_sign_in_leaves_no_identity_behind() {
        let (base, _service) = serve().await;
        let provider = provider(&base).await;

        let err = provider
            .sign_in("ada@example.com", &SecretString::new("wrong".to_owned()))
            .await
            .unwrap_err();
        assert!(
            matches!(&err, Error::Auth(error::Auth::SignIn(message)) if message == "INVALID_PASSWORD"),
            "unexpected error: {err}"
        );
        assert!(provider.current().is_none());
    }

    #[tokio::test]
    async fn sign_up_establishes_ambient_identity() {
        let (base, _service) = serve().await;
        let provider = provider(&base).await;

        let identity = provider
            .sign_up(
                "brin@example.com",
                "Brin",
                &SecretString::new("hunter2".to_owned()),
            )
            .await
            .unwrap();
        assert_eq!(identity.id(), "u2");
        assert_eq!(identity.display_name(), Some("Brin"));
        assert_eq!(identity.email(), Some("brin@example.com"));
        assert_eq!(provider.current(), Some(identity));
    }

    #[tokio::test]
    async fn sign_up_with_a_taken_email_leaves_no_identity_behind() {
        let (base, _service) = serve().await;
        let provider = provider(&base).await;

        let err = provider
            .sign_up(
                "ada@example.com",
                "Ada",
                &SecretString::new("hunter2".to_owned()),
            )
            .await
            .unwrap_err();
        assert!(
            matches!(&err, Error::Auth(error::Auth::SignUp(message)) if message == "EMAIL_EXISTS"),
            "unexpected error: {err}"
        );
        assert!(provider.current().is_none());
    }

    #[tokio::test]
    async fn every_mint_is_a_fresh_exchange() {
        let (base, service) = serve().await;
        let provider = provider(&base).await;

        let identity = provider
            .sign_in("ada@example.com", &SecretString::new("hunter2".to_owned()))
            .await
            .unwrap();

        let first = provider.mint_token(&identity).await.unwrap();
        let second = provider.mint_token(&identity).await.unwrap();
        assert_eq!(first.expose_secret(), "access-1");
        assert_eq!(second.expose_secret(), "access-2");
        assert_eq!(service.mints.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn mint_without_credentials_is_misuse() {
        let (base, _service) = serve().await;
        let provider = provider(&base).await;

        let err = provider
            .mint_token(&Identity::new("u1", None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(error::Auth::NoSession)));
    }

    #[tokio::test]
    async fn sign_out_is_idempotent() {
        let (base, _service) = serve().await;
        let provider = provider(&base).await;

        provider
            .sign_in("ada@example.com", &SecretString::new("hunter2".to_owned()))
            .await
            .unwrap();
        provider.sign_out().await.unwrap();
        assert!(provider.current().is_none());
        provider.sign_out().await.unwrap();
        assert!(provider.current().is_none());
    }
}
