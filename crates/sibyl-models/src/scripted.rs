use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use sibyl_core::{ChatModel, ChatRequest, ChatResponse, SibylError};
use tokio::sync::Mutex;

/// Test double that replays a fixed sequence of responses.
#[derive(Clone)]
pub struct ScriptedChatModel {
    responses: Arc<Mutex<VecDeque<ChatResponse>>>,
}

impl ScriptedChatModel {
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
        }
    }

    /// Number of scripted responses not yet consumed.
    pub async fn remaining(&self) -> usize {
        self.responses.lock().await.len()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, SibylError> {
        let mut responses = self.responses.lock().await;
        responses
            .pop_front()
            .ok_or_else(|| SibylError::Model("scripted model exhausted responses".to_string()))
    }
}
