// SPDX-FileCopyrightText: 2025 Scrawl Authors
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::{Arc, PoisonError, RwLock};

use log::debug;
use secrecy::SecretString;
use tokio::sync::broadcast;

use crate::{
    error::{self, Error, Result},
    identity,
};

/// The process-wide session state: exactly one of these holds at any
/// observed instant.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum State {
    Anonymous,
    Authenticated(identity::Identity),
}

impl State {
    pub(crate) fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

struct Inner {
    state: RwLock<State>,
    events: broadcast::Sender<State>,
}

/// Holds the current session for the lifetime of the process and publishes
/// every transition to subscribers. There is no `Authenticated(A)` to
/// `Authenticated(B)` edge: a new sign-in over a live session publishes
/// `Anonymous` first, so nothing observing the session can pair identity A's
/// token with identity B's view of the world.
#[derive(Clone)]
pub(crate) struct Provider {
    inner: Arc<Inner>,
}

impl Provider {
    pub(crate) fn new() -> Self {
        Self::with_current(None)
    }

    /// Start from an identity restored by the identity provider (a previous
    /// invocation's sign-in), or anonymous when there is none.
    pub(crate) fn with_current(identity: Option<identity::Identity>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(identity.map_or(State::Anonymous, State::Authenticated)),
                events,
            }),
        }
    }

    pub(crate) fn current(&self) -> State {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Observe every subsequent transition, in order, as it is published.
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<State> {
        self.inner.events.subscribe()
    }

    fn publish(&self, state: State) {
        let mut guard = self
            .inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        debug!("Session transition: {:?} -> {:?}", *guard, state);
        *guard = state.clone();
        // An event with no subscribers is fine.
        drop(self.inner.events.send(state));
    }

    fn establish(&self, identity: identity::Identity) {
        if self.current().is_authenticated() {
            self.publish(State::Anonymous);
        }
        self.publish(State::Authenticated(identity));
    }

    /// Run the provider's interactive sign-in exchange and, on success, make
    /// the returned identity current. On failure the state is left exactly
    /// as it was.
    pub(crate) async fn sign_in(
        &self,
        provider: &dyn identity::Provider,
        email: &str,
        password: &SecretString,
    ) -> Result<identity::Identity> {
        let identity = provider.sign_in(email, password).await?;
        self.establish(identity.clone());
        Ok(identity)
    }

    /// Create a new account through the provider and make it current, with
    /// the same transition rules as [`Provider::sign_in`].
    pub(crate) async fn sign_up(
        &self,
        provider: &dyn identity::Provider,
        email: &str,
        display_name: &str,
        password: &SecretString,
    ) -> Result<identity::Identity> {
        let identity = provider.sign_up(email, display_name, password).await?;
        self.establish(identity.clone());
        Ok(identity)
    }

    /// Clear the session. Idempotent: signing out while anonymous does
    /// nothing and notifies nobody.
    pub(crate) async fn sign_out(&self, provider: &dyn identity::Provider) -> Result<()> {
        provider.sign_out().await?;
        self.invalidate();
        Ok(())
    }

    /// Drop back to anonymous without touching the identity provider's
    /// stored credential. Used for lazy invalidation when a token mint
    /// reveals the session is no longer good.
    pub(crate) fn invalidate(&self) {
        if self.current().is_authenticated() {
            self.publish(State::Anonymous);
        }
    }
}

/// Produces a proof-of-identity token for one outbound request. Every call
/// is a fresh mint against the identity provider; a mint failure for a live
/// session invalidates that session before the error is surfaced.
#[derive(Clone)]
pub(crate) struct TokenSupplier {
    session: Provider,
    provider: Arc<dyn identity::Provider>,
}

impl TokenSupplier {
    pub(crate) fn new(session: Provider, provider: Arc<dyn identity::Provider>) -> Self {
        Self { session, provider }
    }

    pub(crate) async fn get_token(&self) -> Result<SecretString> {
        let identity = match self.session.current() {
            State::Authenticated(identity) => identity,
            State::Anonymous => return Err(error::Auth::NoSession.into()),
        };

        match self.provider.mint_token(&identity).await {
            Ok(token) => Ok(token),
            Err(e) => {
                if matches!(e, Error::Auth(error::Auth::TokenFetch(_))) {
                    self.session.invalidate();
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Mutex,
    };

    use async_trait::async_trait;
    use secrecy::ExposeSecret as _;
    use tokio::sync::broadcast::error::TryRecvError;

    use crate::identity::Identity;

    use super::*;

    /// Scripted identity provider: hands out queued identities on sign-in
    /// and counts mints so tests can assert on network-free paths.
    pub(crate) struct FakeProvider {
        identities: Mutex<Vec<Identity>>,
        fail_mint: bool,
        pub(crate) mints: AtomicU32,
        pub(crate) sign_outs: AtomicU32,
    }

    impl FakeProvider {
        pub(crate) fn new(identities: Vec<Identity>) -> Self {
            Self {
                identities: Mutex::new(identities),
                fail_mint: false,
                mints: AtomicU32::new(0),
                sign_outs: AtomicU32::new(0),
            }
        }

        pub(crate) fn failing_mint(identities: Vec<Identity>) -> Self {
            Self {
                fail_mint: true,
                ..Self::new(identities)
            }
        }
    }

    #[async_trait]
    impl identity::Provider for FakeProvider {
        async fn sign_in(&self, _email: &str, _password: &SecretString) -> Result<Identity> {
            let mut queue = self.identities.lock().unwrap();
            if queue.is_empty() {
                return Err(error::Auth::SignIn("INVALID_PASSWORD".to_owned()).into());
            }
            Ok(queue.remove(0))
        }

        async fn sign_up(
            &self,
            _email: &str,
            _display_name: &str,
            _password: &SecretString,
        ) -> Result<Identity> {
            let mut queue = self.identities.lock().unwrap();
            if queue.is_empty() {
                return Err(error::Auth::SignUp("EMAIL_EXISTS".to_owned()).into());
            }
            Ok(queue.remove(0))
        }

        async fn mint_token(&self, identity: &Identity) -> Result<SecretString> {
            let n = self.mints.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_mint {
                return Err(error::Auth::TokenFetch("TOKEN_EXPIRED".to_owned()).into());
            }
            Ok(SecretString::new(format!("token:{}:{}", identity.id(), n)))
        }

        fn current(&self) -> Option<Identity> {
            None
        }

        async fn sign_out(&self) -> Result<()> {
            drop(self.sign_outs.fetch_add(1, Ordering::SeqCst));
            Ok(())
        }
    }

    fn ada() -> Identity {
        Identity::new("u1", Some("Ada".to_owned()), None)
    }

    fn brin() -> Identity {
        Identity::new("u2", Some("Brin".to_owned()), None)
    }

    #[tokio::test]
    async fn sign_in_makes_the_identity_current() {
        let session = Provider::new();
        let provider = FakeProvider::new(vec![ada()]);

        let identity = session
            .sign_in(&provider, "ada@example.com", &SecretString::new(String::new()))
            .await
            .unwrap();
        assert_eq!(identity.id(), "u1");
        assert_eq!(session.current(), State::Authenticated(ada()));
    }

    #[tokio::test]
    async fn sign_up_makes_the_new_account_current() {
        let session = Provider::new();
        let provider = FakeProvider::new(vec![brin()]);
        let mut events = session.subscribe();

        let identity = session
            .sign_up(
                &provider,
                "brin@example.com",
                "Brin",
                &SecretString::new(String::new()),
            )
            .await
            .unwrap();
        assert_eq!(identity.id(), "u2");
        assert_eq!(session.current(), State::Authenticated(brin()));
        assert_eq!(events.try_recv().unwrap(), State::Authenticated(brin()));
    }

    #[tokio::test]
    async fn failed_sign_in_leaves_the_state_untouched() {
        let session = Provider::with_current(Some(ada()));
        let provider = FakeProvider::new(vec![]);
        let mut events = session.subscribe();

        let err = session
            .sign_in(&provider, "ada@example.com", &SecretString::new(String::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(error::Auth::SignIn(_))));
        assert_eq!(session.current(), State::Authenticated(ada()));
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn sign_out_is_idempotent_and_silent_when_anonymous() {
        let session = Provider::new();
        let provider = FakeProvider::new(vec![]);
        let mut events = session.subscribe();

        session.sign_out(&provider).await.unwrap();
        session.sign_out(&provider).await.unwrap();

        assert_eq!(session.current(), State::Anonymous);
        assert_eq!(provider.sign_outs.load(Ordering::SeqCst), 2);
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn observers_see_every_transition_in_order() {
        let session = Provider::new();
        let provider = FakeProvider::new(vec![ada(), brin()]);
        let mut events = session.subscribe();
        let password = SecretString::new(String::new());

        session
            .sign_in(&provider, "ada@example.com", &password)
            .await
            .unwrap();
        // A second sign-in over a live session must pass through Anonymous;
        // observers never see one identity replaced by another directly.
        session
            .sign_in(&provider, "brin@example.com", &password)
            .await
            .unwrap();
        session.sign_out(&provider).await.unwrap();

        assert_eq!(events.try_recv().unwrap(), State::Authenticated(ada()));
        assert_eq!(events.try_recv().unwrap(), State::Anonymous);
        assert_eq!(events.try_recv().unwrap(), State::Authenticated(brin()));
        assert_eq!(events.try_recv().unwrap(), State::Anonymous);
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn token_requires_a_session() {
        let session = Provider::new();
        let provider = Arc::new(FakeProvider::new(vec![]));
        let tokens = TokenSupplier::new(session, provider.clone());

        let err = tokens.get_token().await.unwrap_err();
        assert!(matches!(err, Error::Auth(error::Auth::NoSession)));
        assert_eq!(provider.mints.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn every_token_is_minted_fresh() {
        let session = Provider::with_current(Some(ada()));
        let provider = Arc::new(FakeProvider::new(vec![]));
        let tokens = TokenSupplier::new(session.clone(), provider.clone());

        let first = tokens.get_token().await.unwrap();
        let second = tokens.get_token().await.unwrap();
        assert_eq!(first.expose_secret(), "token:u1:1");
        assert_eq!(second.expose_secret(), "token:u1:2");
        assert!(session.current().is_authenticated());
    }

    #[tokio::test]
    async fn mint_failure_invalidates_the_session_lazily() {
        let session = Provider::with_current(Some(ada()));
        let provider = Arc::new(FakeProvider::failing_mint(vec![]));
        let tokens = TokenSupplier::new(session.clone(), provider.clone());
        let mut events = session.subscribe();

        let err = tokens.get_token().await.unwrap_err();
        assert!(matches!(err, Error::Auth(error::Auth::TokenFetch(_))));
        assert_eq!(session.current(), State::Anonymous);
        assert_eq!(events.try_recv().unwrap(), State::Anonymous);
    }
}
