use async_trait::async_trait;
use gemini_relay::{
    Error, Result,
    catalog::Category,
    llm::{InferenceGateway, InferenceReply},
    staging::StagedFile,
};
use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

/// What the gateway saw for one call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub category: Category,
    pub prompt: String,
    pub staged_path: Option<PathBuf>,
    pub staged_existed: bool,
    pub mime_type: Option<String>,
    pub contents: Option<Vec<u8>>,
}

/// Mock inference gateway for testing. Replies with
/// `"{category}:{prompt}"` unless configured to fail.
#[derive(Debug, Default)]
pub struct MockGateway {
    pub calls: Arc<Mutex<Vec<RecordedCall>>>,
    pub error: Option<String>,
    pub delays: Vec<(Category, Duration)>,
    pub panic_on_attachment: bool,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_delay(mut self, category: Category, delay: Duration) -> Self {
        self.delays.push((category, delay));
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic_on_attachment = true;
        self
    }

    pub fn get_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    async fn pause(&self, category: Category) {
        if let Some((_, delay)) = self.delays.iter().find(|(c, _)| *c == category) {
            tokio::time::sleep(*delay).await;
        }
    }

    fn respond(&self, category: Category, prompt: &str) -> Result<InferenceReply> {
        if let Some(ref error) = self.error {
            return Err(Error::inference(error.clone()));
        }
        Ok(InferenceReply::new(format!("{}:{}", category, prompt)))
    }
}

#[async_trait]
impl InferenceGateway for MockGateway {
    async fn submit_text(&self, prompt: &str) -> Result<InferenceReply> {
        self.calls.lock().unwrap().push(RecordedCall {
            category: Category::Text,
            prompt: prompt.to_string(),
            staged_path: None,
            staged_existed: false,
            mime_type: None,
            contents: None,
        });

        self.pause(Category::Text).await;
        self.respond(Category::Text, prompt)
    }

    async fn submit_with_attachment(
        &self,
        category: Category,
        prompt: &str,
        file: &StagedFile,
    ) -> Result<InferenceReply> {
        let contents = tokio::fs::read(file.path()).await.ok();
        self.calls.lock().unwrap().push(RecordedCall {
            category,
            prompt: prompt.to_string(),
            staged_path: Some(file.path().to_path_buf()),
            staged_existed: file.path().exists(),
            mime_type: Some(file.mime_type().to_string()),
            contents,
        });

        if self.panic_on_attachment {
            panic!("gateway exploded");
        }

        self.pause(category).await;
        self.respond(category, prompt)
    }
}
