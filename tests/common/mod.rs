#![allow(dead_code)]

use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, Mutex, RwLock},
    time::Duration,
};

use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    web::Data,
    App,
};
use async_trait::async_trait;
use langchat_auth::{
    auth::{
        self,
        user::{Role, UserDirectory, UserInfo},
        CredentialVerifier, SessionManager, SessionSettings,
    },
    crypto,
    error::HandlerError,
    store::{KeyPage, MemorySessionStore, SessionStore, StoreError, UpdateFn},
};

pub const SECRET_KEY: [u8; 32] = [42; 32];
pub const TIMEOUT: Duration = Duration::from_secs(3600);

/// Users kept in a map instead of Postgres.
#[derive(Default)]
pub struct StaticDirectory {
    users: RwLock<HashMap<String, UserInfo>>,
}

impl StaticDirectory {
    pub fn add(&self, id: &str, username: &str, password: &str, perms: &[&str]) {
        let user = UserInfo {
            id: id.into(),
            username: username.into(),
            password: Some(crypto::encrypt(&SECRET_KEY, password).unwrap()),
            email: Some(format!("{}@example.com", username)),
            real_name: Some(username.to_uppercase()),
            roles: if perms.is_empty() {
                BTreeSet::new()
            } else {
                [Role {
                    id: "administrator".into(),
                    code: "administrator".into(),
                    name: "Administrator".into(),
                }]
                .into()
            },
            perms: perms.iter().map(|p| p.to_string()).collect(),
        };
        self.users.write().unwrap().insert(username.into(), user);
    }

    pub fn remove(&self, username: &str) {
        self.users.write().unwrap().remove(username);
    }
}

#[async_trait]
impl UserDirectory for StaticDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserInfo>, HandlerError> {
        Ok(self.users.read().unwrap().get(username).cloned())
    }
}

/// Records every key written through `set`/`set_if_absent`/`update`. Every call
/// yields to the executor first, so requests driven together interleave
/// between store operations.
#[derive(Default)]
pub struct CountingStore {
    inner: MemorySessionStore,
    writes: Mutex<Vec<String>>,
}

impl CountingStore {
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    pub fn writes_to(&self, key: &str) -> usize {
        self.writes().iter().filter(|k| *k == key).count()
    }
}

#[async_trait]
impl SessionStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        actix_rt::task::yield_now().await;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), StoreError> {
        actix_rt::task::yield_now().await;
        self.writes.lock().unwrap().push(key.to_owned());
        self.inner.set(key, value, ttl).await
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        actix_rt::task::yield_now().await;
        self.writes.lock().unwrap().push(key.to_owned());
        self.inner.set_if_absent(key, value, ttl).await
    }

    async fn update(
        &self,
        key: &str,
        ttl: Option<Duration>,
        f: UpdateFn,
    ) -> Result<Option<String>, StoreError> {
        actix_rt::task::yield_now().await;
        self.writes.lock().unwrap().push(key.to_owned());
        self.inner.update(key, ttl, f).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        actix_rt::task::yield_now().await;
        self.inner.delete(key).await
    }

    async fn ttl(&self, key: &str) -> Result<Option<Option<Duration>>, StoreError> {
        actix_rt::task::yield_now().await;
        self.inner.ttl(key).await
    }

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError> {
        actix_rt::task::yield_now().await;
        self.inner.multi_get(keys).await
    }

    async fn search_keys(
        &self,
        prefix: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        actix_rt::task::yield_now().await;
        self.inner.search_keys(prefix, offset, limit).await
    }

    async fn count_keys(&self, prefix: &str) -> Result<u64, StoreError> {
        actix_rt::task::yield_now().await;
        self.inner.count_keys(prefix).await
    }

    async fn scan(&self, prefix: &str, offset: usize, limit: usize) -> Result<KeyPage, StoreError> {
        actix_rt::task::yield_now().await;
        self.inner.scan(prefix, offset, limit).await
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        actix_rt::task::yield_now().await;
        self.inner.purge_expired().await
    }
}

pub struct TestContext {
    pub directory: Arc<StaticDirectory>,
    pub store: Arc<CountingStore>,
    pub session_manager: Data<SessionManager>,
    pub verifier: Data<CredentialVerifier>,
}

impl TestContext {
    /// `admin` may kick out tokens, `alice` may not. Passwords are `<username>-pw`.
    pub fn new() -> Self {
        Self::with_concurrent_logins(true)
    }

    /// Every login revokes the user's older tokens.
    pub fn exclusive() -> Self {
        Self::with_concurrent_logins(false)
    }

    fn with_concurrent_logins(concurrent: bool) -> Self {
        let directory = Arc::new(StaticDirectory::default());
        directory.add("1", "admin", "admin-pw", &["auth:delete"]);
        directory.add("2", "alice", "alice-pw", &[]);

        let store = Arc::new(CountingStore::default());
        let session_manager = Data::new(SessionManager::new(
            store.clone(),
            SessionSettings {
                timeout: TIMEOUT,
                concurrent,
            },
        ));
        let verifier = Data::new(CredentialVerifier::new(directory.clone(), SECRET_KEY));

        Self {
            directory,
            store,
            session_manager,
            verifier,
        }
    }

    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .app_data(Data::clone(&self.session_manager))
            .app_data(Data::clone(&self.verifier))
            .configure(auth::routes::configure_app)
    }
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}
