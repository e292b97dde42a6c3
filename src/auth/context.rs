//! Application-wide authentication state
//!
//! `AuthContext` holds the current user and a loading flag, and tells
//! subscribers about sign-in and sign-out. When a user signs in, their id is
//! registered with the balancer; a failed registration is logged and never
//! blocks the sign-in.

use crate::api::classify::ClassifyContext;
use crate::api::client::BalancerClient;
use crate::api::transport::ApiRequest;
use crate::auth::provider::SessionProvider;
use crate::auth::session::User;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{error, info};

const EVENT_CAPACITY: usize = 16;

/// Registers a signed-in user with the backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRegistry: Send + Sync {
    async fn register(&self, user_id: &str) -> Result<()>;
}

#[async_trait]
impl UserRegistry for BalancerClient {
    async fn register(&self, user_id: &str) -> Result<()> {
        let log = self
            .operation("Register User")
            .context_field("user_id", user_id);
        let request = ApiRequest::post_json(
            self.endpoints().user_register_url(),
            json!({ "user_id": user_id }),
        );

        self.execute(&log, request, ClassifyContext::General).await?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// The persisted session was loaded
    InitialSession(Option<User>),
    SignedIn(User),
    SignedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<User>,
    pub loading: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }
}

/// Handle returned by [`AuthContext::subscribe`]
pub struct Subscription {
    receiver: broadcast::Receiver<AuthEvent>,
}

impl Subscription {
    /// Next event, or `None` once the context is gone
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next event if one is already queued
    pub fn try_recv(&mut self) -> Option<AuthEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {}
}

pub struct AuthContext {
    provider: Arc<dyn SessionProvider>,
    registry: Arc<dyn UserRegistry>,
    state: watch::Sender<AuthState>,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthContext {
    pub fn new(provider: Arc<dyn SessionProvider>, registry: Arc<dyn UserRegistry>) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            provider,
            registry,
            state,
            events,
        }
    }

    /// Load the persisted session and clear the loading flag
    pub async fn initialize(&self) -> Result<Option<User>> {
        let session = self.provider.get_session().await;
        let user = session.as_ref().ok().and_then(|s| s.as_ref().map(|s| s.user.clone()));

        self.state.send_replace(AuthState {
            user: user.clone(),
            loading: false,
        });
        self.emit(AuthEvent::InitialSession(user.clone()));

        session.map(|_| user)
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Current user, or [`VaultKrateError::NotSignedIn`](crate::error::VaultKrateError::NotSignedIn)
    pub fn require_user(&self) -> Result<User> {
        self.current_user()
            .ok_or(crate::error::VaultKrateError::NotSignedIn)
    }

    pub fn watch(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.events.subscribe(),
        }
    }

    /// Sign `user` in. A user already signed in is not announced or registered again.
    pub async fn sign_in(&self, user: User) -> Result<User> {
        let session = self.provider.sign_in(user).await?;
        let user = session.user;

        let previous = self.state.send_replace(AuthState {
            user: Some(user.clone()),
            loading: false,
        });

        if previous.user.as_ref().map(|u| &u.id) != Some(&user.id) {
            info!("Signed in as {}", user.display_name());
            self.emit(AuthEvent::SignedIn(user.clone()));
            self.register(&user).await;
        }

        Ok(user)
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.provider.sign_out().await?;

        let previous = self.state.send_replace(AuthState {
            user: None,
            loading: false,
        });

        if previous.user.is_some() {
            info!("Signed out");
            self.emit(AuthEvent::SignedOut);
        }
        Ok(())
    }

    async fn register(&self, user: &User) {
        if let Err(e) = self.registry.register(&user.id).await {
            error!("Error registering user {}: {}", user.id, e);
        }
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
