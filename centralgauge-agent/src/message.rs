//! The four message kinds an agent's asynchronous message stream can
//! produce, and the trait the execution loop consumes them through.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
    ToolResult { tool_use_id: String, content: String, is_error: bool },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// The terminal `result` message's subtype. The SDK's own notion of
/// success here is advisory only; the harness decides success from tool
/// output, not from this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSubtype {
    Success,
    ErrorMaxTurns,
    ErrorDuringExecution,
    ErrorMaxBudgetUsd,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentMessage {
    SystemInit { tools: Vec<String>, tool_server_healthy: bool },
    Assistant { usage: Option<Usage>, content: Vec<ContentBlock> },
    User { content: Vec<ContentBlock> },
    Result { subtype: ResultSubtype },
}

impl AgentMessage {
    /// Concatenate every text-bearing block (`Text` and `ToolResult`
    /// content) into the aggregated output success detection and failure
    /// analysis run over.
    pub fn textual_payload(&self) -> String {
        let blocks: &[ContentBlock] = match self {
            AgentMessage::Assistant { content, .. } | AgentMessage::User { content } => content,
            AgentMessage::SystemInit { .. } | AgentMessage::Result { .. } => return String::new(),
        };
        blocks
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::ToolResult { content, .. } => Some(content.as_str()),
                ContentBlock::ToolUse { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A single-reader source of agent messages. The execution loop consumes
/// exactly one of these per task.
#[async_trait]
pub trait AgentMessageSource: Send {
    async fn next(&mut self) -> Option<AgentMessage>;
}

/// The production `AgentMessageSource`: an mpsc channel fed by whatever
/// adapter drives the underlying coding-agent SDK.
pub struct ChannelMessageSource {
    receiver: mpsc::Receiver<AgentMessage>,
}

impl ChannelMessageSource {
    pub fn new(receiver: mpsc::Receiver<AgentMessage>) -> Self {
        Self { receiver }
    }
}

#[async_trait]
impl AgentMessageSource for ChannelMessageSource {
    async fn next(&mut self) -> Option<AgentMessage> {
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textual_payload_joins_text_and_tool_result_blocks_only() {
        let message = AgentMessage::User {
            content: vec![
                ContentBlock::ToolResult {
                    tool_use_id: "t1".to_string(),
                    content: "compilation successful".to_string(),
                    is_error: false,
                },
                ContentBlock::ToolUse {
                    id: "t2".to_string(),
                    name: "al_compile".to_string(),
                    input: Value::Null,
                },
            ],
        };
        assert_eq!(message.textual_payload(), "compilation successful");
    }

    #[tokio::test]
    async fn channel_message_source_forwards_sent_messages() {
        let (tx, rx) = mpsc::channel(4);
        let mut source = ChannelMessageSource::new(rx);
        tx.send(AgentMessage::SystemInit { tools: vec![], tool_server_healthy: true })
            .await
            .unwrap();
        drop(tx);
        assert!(source.next().await.is_some());
        assert!(source.next().await.is_none());
    }
}
