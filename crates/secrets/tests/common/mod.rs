//! In-memory secret store shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use vault_env_core::{Error, Result};
use vault_env_secrets::{LeaseInfo, SecretResponse, SecretStore};

/// One scripted answer for a read
#[derive(Debug, Clone)]
pub enum Reply {
    Data { data: Value, lease_seconds: u64 },
    Fail(String),
}

impl Reply {
    pub fn data(data: Value) -> Self {
        Reply::Data {
            data,
            lease_seconds: 0,
        }
    }

    pub fn leased(data: Value, lease_seconds: u64) -> Self {
        Reply::Data {
            data,
            lease_seconds,
        }
    }
}

/// Answers reads from per-path scripts. The last reply of a script repeats
/// forever.
#[derive(Default)]
pub struct MemoryStore {
    reads: Mutex<HashMap<String, VecDeque<Reply>>>,
    lists: Mutex<HashMap<String, Vec<String>>>,
    read_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(self, path: &str, replies: Vec<Reply>) -> Self {
        self.reads.lock().insert(path.to_string(), replies.into());
        self
    }

    pub fn with_secret(self, path: &str, data: Value) -> Self {
        self.with_script(path, vec![Reply::data(data)])
    }

    pub fn with_folder(self, path: &str, children: &[&str]) -> Self {
        self.lists.lock().insert(
            path.to_string(),
            children.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.read_calls() + self.list_calls()
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn read(&self, path: &str) -> Result<SecretResponse> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);

        let reply = {
            let mut reads = self.reads.lock();
            let script = reads
                .get_mut(path)
                .ok_or_else(|| Error::store("GET", path, "status 404 Not Found"))?;
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            }
        };

        match reply {
            Some(Reply::Data {
                data: Value::Object(data),
                lease_seconds,
            }) => Ok(SecretResponse {
                data,
                lease: LeaseInfo::from_seconds(lease_seconds),
            }),
            Some(Reply::Data { data, .. }) => {
                Err(Error::store("GET", path, format!("not an object: {data}")))
            }
            Some(Reply::Fail(message)) => Err(Error::store("GET", path, message)),
            None => Err(Error::store("GET", path, "empty script")),
        }
    }

    async fn list(&self, path: &str) -> Result<Vec<String>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.lists
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| Error::store("LIST", path, "status 404 Not Found"))
    }
}
