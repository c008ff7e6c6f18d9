use crate::analysis::{score_from_review, FileAnalyzer};
use crate::error::ToolError;
use crate::format::Payload;
use std::sync::Arc;

#[derive(Clone)]
pub struct CodeHealthScore {
    analyzer: Arc<dyn FileAnalyzer>,
}

impl CodeHealthScore {
    pub fn new(analyzer: Arc<dyn FileAnalyzer>) -> Self {
        Self { analyzer }
    }

    pub async fn run(&self, file_path: &str) -> Result<Payload, ToolError> {
        let review = self.analyzer.review(file_path).await?;
        score_from_review(&review).map(Payload::Score)
    }
}

#[derive(Clone)]
pub struct CodeHealthReview {
    analyzer: Arc<dyn FileAnalyzer>,
}

impl CodeHealthReview {
    pub fn new(analyzer: Arc<dyn FileAnalyzer>) -> Self {
        Self { analyzer }
    }

    pub async fn run(&self, file_path: &str) -> Result<Payload, ToolError> {
        self.analyzer.review(file_path).await.map(Payload::Text)
    }
}
