//! RAG response generation.

use super::{build_prompt_with, format_context, RetrievedSource};
use crate::config::{Prompts, Settings};
use crate::conversation::{ConversationBuffer, Role};
use crate::embedding::{Embedder, OpenAiEmbedder};
use crate::error::Result;
use crate::generation::{Generator, OpenAiGenerator, APOLOGY};
use crate::vector_store::{open_store, QueryResults, VectorStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// RAG engine for question answering.
pub struct RagEngine {
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    generator: Arc<dyn Generator>,
    prompts: Prompts,
    top_k: usize,
    max_tokens: u32,
    max_context_tokens: usize,
}

impl RagEngine {
    /// Create a new RAG engine with default retrieval and generation limits.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            embedder,
            vector_store,
            generator,
            prompts: Prompts::default(),
            top_k: 3,
            max_tokens: 512,
            max_context_tokens: 4000,
        }
    }

    /// Build an engine with the OpenAI backends and the store selected in settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        Ok(Self::new(
            Arc::new(OpenAiEmbedder::from_settings(&settings.embedding)?),
            open_store(settings)?,
            Arc::new(OpenAiGenerator::from_settings(&settings.generation)?),
        )
        .with_settings(settings)
        .with_prompts(prompts))
    }

    /// Apply the limits from settings.
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.top_k = settings.rag.top_k;
        self.max_tokens = settings.generation.max_tokens;
        self.max_context_tokens = settings.generation.max_context_tokens;
        self
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Set the number of passages retrieved per question.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the context budget in approximate tokens.
    pub fn with_max_context_tokens(mut self, max_context_tokens: usize) -> Self {
        self.max_context_tokens = max_context_tokens;
        self
    }

    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    /// Answer `question` within the conversation held by `history`.
    ///
    /// Never fails: retrieval errors yield an empty context and generation
    /// errors yield an apology. The question and the answer are appended to
    /// `history` afterwards.
    #[instrument(skip(self, history), fields(question = %question))]
    pub async fn ask(&self, history: &mut ConversationBuffer, question: &str) -> RagResponse {
        info!("Processing question");

        let results = match self.retrieve(question).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Retrieval failed, answering without context: {}", e);
                QueryResults::default()
            }
        };

        let (context, sources) = format_context(&results);
        let context = self
            .generator
            .truncate_to_tokens(&context, self.max_context_tokens);
        let prompt = build_prompt_with(&self.prompts, question, &context, &history.render());

        let answer = match self.generator.generate(&prompt, self.max_tokens).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Generation failed: {}", e);
                APOLOGY.to_string()
            }
        };

        history.append(Role::User, question);
        history.append(Role::Assistant, answer.clone());

        debug!("Answered with {} sources", sources.len());

        RagResponse { answer, sources }
    }

    async fn retrieve(&self, question: &str) -> Result<QueryResults> {
        let query_embedding = self.embedder.embed(question).await?;
        self.vector_store.query(&query_embedding, self.top_k).await
    }
}

/// A RAG response with answer and sources.
#[derive(Debug, Clone, Serialize)]
pub struct RagResponse {
    /// The generated answer.
    pub answer: String,
    /// Passages the answer was grounded on.
    pub sources: Vec<RetrievedSource>,
}

impl RagResponse {
    /// Format the response for display.
    pub fn format_for_display(&self) -> String {
        let mut output = self.answer.clone();

        if !self.sources.is_empty() {
            output.push_str("\n\n--- Sources ---\n");
            for source in &self.sources {
                output.push_str(&format!("\n{} (chunk {})", source.source, source.chunk_index));
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::Chunk;
    use crate::error::DocketError;
    use crate::generation::TokenCounter;
    use crate::vector_store::{MemoryVectorStore, StoredChunk};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Embeds by keyword presence so similarity is predictable.
    struct KeywordEmbedder;

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let text = text.to_lowercase();
            Ok(vec![
                if text.contains("usb") { 1.0 } else { 0.0 },
                if text.contains("camera") { 1.0 } else { 0.0 },
                0.1,
            ])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::new();
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(DocketError::Embedding("offline".into()))
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(DocketError::Embedding("offline".into()))
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    /// Records prompts and replies with a fixed answer or fails.
    struct RecordingGenerator {
        reply: Option<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl RecordingGenerator {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    impl TokenCounter for RecordingGenerator {}

    #[async_trait]
    impl Generator for RecordingGenerator {
        async fn generate(&self, prompt: &str, _max_tokens: u32) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply
                .clone()
                .ok_or_else(|| DocketError::Generation("model unavailable".into()))
        }
    }

    async fn seeded_store() -> Arc<dyn VectorStore> {
        let store = MemoryVectorStore::new();
        let usb = Chunk::new(
            "USB device serial numbers are recorded under the USBSTOR registry key.".into(),
            "usb.txt",
            0,
        );
        let camera = Chunk::new(
            "Camera make and model are stored in the EXIF block of each JPEG image.".into(),
            "camera.pdf",
            4,
        );
        store
            .add(&[
                StoredChunk::new(&usb, KeywordEmbedder.embed(&usb.content).await.unwrap()),
                StoredChunk::new(&camera, KeywordEmbedder.embed(&camera.content).await.unwrap()),
            ])
            .await
            .unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_ask_retrieves_and_records_history() {
        let generator = Arc::new(RecordingGenerator::replying("Check USBSTOR."));
        let engine = RagEngine::new(Arc::new(KeywordEmbedder), seeded_store().await, generator.clone())
            .with_top_k(1);
        let mut history = ConversationBuffer::new(1000);

        let response = engine.ask(&mut history, "Where are USB serials?").await;

        assert_eq!(response.answer, "Check USBSTOR.");
        assert_eq!(response.sources.len(), 1);
        assert_eq!(response.sources[0].source, "usb.txt");
        assert_eq!(response.sources[0].chunk_index, 0);

        let prompt = generator.last_prompt();
        assert!(prompt.contains("[Document 1]: USB device serial numbers"));
        assert!(!prompt.contains("Previous Conversation:"));

        assert_eq!(history.len(), 2);
        assert_eq!(history.turns()[0].role, Role::User);
        assert_eq!(history.turns()[1].content, "Check USBSTOR.");
    }

    #[tokio::test]
    async fn test_follow_up_includes_history() {
        let generator = Arc::new(RecordingGenerator::replying("Look at EXIF."));
        let engine = RagEngine::new(Arc::new(KeywordEmbedder), seeded_store().await, generator.clone());
        let mut history = ConversationBuffer::new(1000);

        engine.ask(&mut history, "Where is camera metadata?").await;
        engine.ask(&mut history, "And the model?").await;

        let prompt = generator.last_prompt();
        assert!(prompt.contains("Previous Conversation:\nUser: Where is camera metadata?"));
        assert_eq!(history.len(), 4);
    }

    #[tokio::test]
    async fn test_generation_failure_apologizes() {
        let engine = RagEngine::new(
            Arc::new(KeywordEmbedder),
            seeded_store().await,
            Arc::new(RecordingGenerator::failing()),
        );
        let mut history = ConversationBuffer::new(1000);

        let response = engine.ask(&mut history, "usb?").await;
        assert_eq!(response.answer, APOLOGY);
        assert_eq!(history.turns()[1].content, APOLOGY);
    }

    #[tokio::test]
    async fn test_retrieval_failure_uses_empty_context() {
        let generator = Arc::new(RecordingGenerator::replying("From general knowledge."));
        let engine = RagEngine::new(Arc::new(FailingEmbedder), seeded_store().await, generator.clone());
        let mut history = ConversationBuffer::new(1000);

        let response = engine.ask(&mut history, "usb?").await;
        assert!(response.sources.is_empty());
        assert_eq!(response.answer, "From general knowledge.");
        assert!(generator.last_prompt().contains("Context Information:\n\n\nCurrent Question: usb?"));
    }

    #[tokio::test]
    async fn test_context_is_truncated() {
        let generator = Arc::new(RecordingGenerator::replying("ok."));
        let engine = RagEngine::new(Arc::new(KeywordEmbedder), seeded_store().await, generator.clone())
            .with_top_k(1)
            .with_max_context_tokens(4);
        let mut history = ConversationBuffer::new(1000);

        engine.ask(&mut history, "usb").await;
        assert!(generator
            .last_prompt()
            .contains("Context Information:\n[Document 1]: USB device\n\n"));
    }

    #[test]
    fn test_format_for_display() {
        let response = RagResponse {
            answer: "Use a write blocker.".to_string(),
            sources: vec![RetrievedSource {
                content: "...".to_string(),
                source: "guide.pdf".to_string(),
                chunk_index: 2,
            }],
        };
        let shown = response.format_for_display();
        assert!(shown.starts_with("Use a write blocker."));
        assert!(shown.contains("guide.pdf (chunk 2)"));
    }
}
