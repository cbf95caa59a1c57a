//! Stand-in upstream context for gateway tests

use async_trait::async_trait;
use legislation_client::{ClientError, Params};
use legislation_context::UpstreamContext;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct StubContext {
    pub label: &'static str,
    /// Answer every call with this status error
    pub fail_status: Option<u16>,
    pub calls: AtomicUsize,
}

impl StubContext {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            fail_status: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(label: &'static str, status: u16) -> Self {
        Self {
            fail_status: Some(status),
            ..Self::new(label)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer(&self, target: &str, params: &Params) -> Result<Value, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.fail_status {
            return Err(ClientError::Status(status));
        }
        Ok(json!({
            "from": self.label,
            "target": target,
            "params": params,
            "법령명": "<strong>개인정보</strong> 보호법",
        }))
    }
}

#[async_trait]
impl UpstreamContext for StubContext {
    fn is_ready(&self) -> bool {
        true
    }

    async fn search(&self, target: &str, params: &Params) -> Result<Value, ClientError> {
        self.answer(target, params)
    }

    async fn service(&self, target: &str, params: &Params) -> Result<Value, ClientError> {
        self.answer(target, params)
    }
}
