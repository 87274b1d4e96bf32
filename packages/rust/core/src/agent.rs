//! Registration assistant: knowledge base loading, system prompt and
//! per-conversation question answering.

use std::path::Path;

use tracing::{debug, info, instrument, warn};

use regassist_shared::policy::{SYSTEM_PROMPT_REMINDER, SYSTEM_PROMPT_RULES};
use regassist_shared::{AgentConfig, RegAssistError, Result};

use crate::llm::{Completion, CompletionClient, CompletionRequest, Message, Role};

/// Read the knowledge base artifact.
///
/// A missing file is not an error: the assistant starts with an empty
/// knowledge base and answers from the fallback rules alone.
pub fn load_knowledge_base(path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(kb) => {
            info!(path = %path.display(), chars = kb.chars().count(), "knowledge base loaded");
            Ok(kb)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(
                path = %path.display(),
                "knowledge base not found, run `regassist collect` first"
            );
            Ok(String::new())
        }
        Err(e) => Err(RegAssistError::io(path, e)),
    }
}

/// Build the advisor system prompt around a verbatim knowledge base.
pub fn system_prompt(knowledge_base: &str) -> String {
    format!("{SYSTEM_PROMPT_RULES}\nKNOWLEDGE BASE:\n{knowledge_base}\n\n{SYSTEM_PROMPT_REMINDER}\n")
}

/// Ordered message history of one user's chat.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Forget everything said so far.
    pub fn reset(&mut self) {
        self.messages.clear();
    }
}

/// The assistant. Holds no per-user state, so one instance serves every
/// conversation.
#[derive(Debug)]
pub struct Agent<C> {
    client: C,
    model: String,
    max_tokens: u32,
    system_prompt: String,
    knowledge_base_chars: usize,
}

impl<C: CompletionClient> Agent<C> {
    pub fn new(client: C, config: &AgentConfig, knowledge_base: &str) -> Self {
        Self {
            client,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            system_prompt: system_prompt(knowledge_base),
            knowledge_base_chars: knowledge_base.chars().count(),
        }
    }

    /// Load the knowledge base from `config.knowledge_base_path` and build an agent.
    pub fn load(client: C, config: &AgentConfig) -> Result<Self> {
        let kb = load_knowledge_base(&config.knowledge_base_path)?;
        Ok(Self::new(client, config, &kb))
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn knowledge_base_chars(&self) -> usize {
        self.knowledge_base_chars
    }

    /// Ask a question within `conversation` and return the answer.
    ///
    /// On success the question and answer are both appended. On failure the
    /// conversation is left as it was.
    #[instrument(skip_all, fields(history = conversation.len()))]
    pub async fn ask(&self, conversation: &mut Conversation, question: &str) -> Result<String> {
        self.push_question(conversation, question)?;
        let result = self.client.complete(&self.request(conversation)).await;
        finish_turn(conversation, result)
    }

    /// Like [`ask`](Self::ask), passing each piece of the answer to
    /// `on_text` as the model produces it.
    #[instrument(skip_all, fields(history = conversation.len()))]
    pub async fn ask_streaming<F>(
        &self,
        conversation: &mut Conversation,
        question: &str,
        on_text: F,
    ) -> Result<String>
    where
        F: FnMut(&str) + Send,
    {
        self.push_question(conversation, question)?;
        let result = self
            .client
            .complete_streaming(&self.request(conversation), on_text)
            .await;
        finish_turn(conversation, result)
    }

    fn push_question(&self, conversation: &mut Conversation, question: &str) -> Result<()> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RegAssistError::validation("question is empty"));
        }
        conversation.messages.push(Message::user(question));
        Ok(())
    }

    fn request<'a>(&'a self, conversation: &'a Conversation) -> CompletionRequest<'a> {
        CompletionRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: &self.system_prompt,
            messages: &conversation.messages,
        }
    }
}

/// Record the answer, or drop the unanswered question.
fn finish_turn(conversation: &mut Conversation, result: Result<Completion>) -> Result<String> {
    match result {
        Ok(completion) => {
            debug!(
                input_tokens = completion.input_tokens,
                output_tokens = completion.output_tokens,
                "answered"
            );
            conversation.messages.push(Message::assistant(completion.text.clone()));
            Ok(completion.text)
        }
        Err(e) => {
            if conversation.messages.last().map(|m| m.role) == Some(Role::User) {
                conversation.messages.pop();
            }
            warn!(error = %e, "completion failed");
            Err(e)
        }
    }
}
