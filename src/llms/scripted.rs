//! Scripted backend for tests: replays one canned reply and counts calls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::backend::{BackendError, GenerativeBackend};
use crate::prompts::RenderedPrompt;

#[derive(Debug, Clone)]
enum Reply {
    Json(Value),
    Fail(String),
}

#[derive(Debug)]
pub(crate) struct ScriptedBackend {
    reply: Reply,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<RenderedPrompt>>,
    last_schema: Mutex<Option<Value>>,
}

impl ScriptedBackend {
    pub(crate) fn replying(value: Value) -> Self {
        Self::with_reply(Reply::Json(value))
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self::with_reply(Reply::Fail(message.to_string()))
    }

    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
            last_schema: Mutex::new(None),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_prompt(&self) -> Option<RenderedPrompt> {
        self.last_prompt.lock().unwrap().clone()
    }

    pub(crate) fn last_schema(&self) -> Option<Value> {
        self.last_schema.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        prompt: &RenderedPrompt,
        output_schema: &Value,
    ) -> Result<Value, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = Some(prompt.clone());
        *self.last_schema.lock().unwrap() = Some(output_schema.clone());
        tokio::task::yield_now().await;

        match &self.reply {
            Reply::Json(value) => Ok(value.clone()),
            Reply::Fail(message) => Err(BackendError::Other(message.clone())),
        }
    }
}
