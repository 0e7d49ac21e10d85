//! Test harness for isolated pipeline runs.
//!
//! Every harness owns its own `MemoryObjectStore`, in-memory `SqliteCatalog`
//! and `ChannelNotifier`, so tests never share state.

#![allow(dead_code)]

use std::sync::Arc;

use crossbeam_channel::Receiver;

use mailingest::config::{load_settings, Environment};
use mailingest::storage::{MemoryObjectStore, ObjectMetadata, ObjectStore, SettlePolicy};
use mailingest::{
    filter_inbound, BatchReport, ChannelNotifier, FilterResponse, IngestError, Notification,
    NotificationCategory, Pipeline, SqliteCatalog,
};

pub const BUCKET: &str = "mail-intake";

pub struct TestHarness {
    pub env: Environment,
    pub store: Arc<MemoryObjectStore>,
    pub catalog: Arc<SqliteCatalog>,
    notifier: Arc<ChannelNotifier>,
    notifications: Receiver<Notification>,
}

impl TestHarness {
    /// Harness with a configuration object accepting `vendor.com` senders.
    pub fn new() -> Self {
        let harness = Self::without_config();
        harness.write_config(r#"{ "ACCEPTED_SENDERS": "vendor.com, TRUSTED_EMAILS@server.com" }"#);
        harness
    }

    /// Harness with no configuration object stored.
    pub fn without_config() -> Self {
        Self::with_store(MemoryObjectStore::new())
    }

    pub fn with_store(store: MemoryObjectStore) -> Self {
        let mut env = Environment::new(BUCKET);
        env.settle = SettlePolicy::immediate(4);

        let (notifier, notifications) = ChannelNotifier::new();
        Self {
            env,
            store: Arc::new(store),
            catalog: Arc::new(SqliteCatalog::open_in_memory().expect("Failed to open catalog")),
            notifier: Arc::new(notifier),
            notifications,
        }
    }

    pub fn write_config(&self, json: &str) {
        self.store
            .put(BUCKET, &self.env.config_key, json.as_bytes(), &ObjectMetadata::new())
            .expect("Failed to write config");
    }

    pub fn put_email(&self, key: &str, raw: &[u8]) {
        self.store
            .put(BUCKET, key, raw, &ObjectMetadata::new())
            .expect("Failed to write email");
    }

    /// Pipeline built from the stored configuration.
    pub fn pipeline(&self) -> Pipeline {
        let settings = load_settings(self.store.as_ref(), &self.env).expect("Failed to load settings");
        Pipeline::new(
            Arc::new(settings),
            self.store.clone(),
            self.catalog.clone(),
            self.notifier.clone(),
        )
    }

    pub fn process(&self, event_json: &str) -> Result<BatchReport, IngestError> {
        Pipeline::process_event(
            event_json,
            &self.env,
            self.store.clone(),
            self.catalog.clone(),
            self.notifier.clone(),
        )
    }

    pub fn filter(&self, event_json: &str) -> FilterResponse {
        filter_inbound(event_json, &self.env, self.store.as_ref(), self.notifier.as_ref())
    }

    /// Drains notifications published so far.
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.try_iter().collect()
    }

    pub fn categories(&self) -> Vec<NotificationCategory> {
        self.notifications().into_iter().map(|n| n.category).collect()
    }

    pub fn keys_under(&self, prefix: &str) -> Vec<String> {
        self.store.list(BUCKET, prefix).expect("Failed to list objects")
    }
}
