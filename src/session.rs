//! Session context and lifecycle.
//!
//! A [`Session`] holds everything one user works with: pending uploads, the
//! documents and risks of the last analysis, the selected risk, one chat
//! transcript per risk, cached follow-up questions and the active prompts.
//!
//! ```text
//! idle → documents_uploaded → analyzed → risk_selected → chatting
//! ```
//!
//! Every operation either completes and moves the state forward or fails
//! and leaves the session as it was. The vector store is the only state that
//! outlives a failed analysis.

use anyhow::Result;
use std::fmt;
use std::sync::Arc;

use crate::chat::ChatResponder;
use crate::chunk::Chunker;
use crate::config::Config;
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::extract::extract_text_from_file;
use crate::index::Indexer;
use crate::llm::{ChatModel, OpenAIChat};
use crate::models::{ChatMessage, DocumentRecord, RiskRecord, Upload};
use crate::prompts::PromptSettings;
use crate::retrieve::Retriever;
use crate::risk::{RiskAnalysis, RiskExtractor};
use crate::store::sqlite::SqliteVectorStore;
use crate::store::VectorStore;
use crate::{db, migrate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    DocumentsUploaded,
    Analyzed,
    RiskSelected,
    Chatting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::DocumentsUploaded => "documents_uploaded",
            SessionState::Analyzed => "analyzed",
            SessionState::RiskSelected => "risk_selected",
            SessionState::Chatting => "chatting",
        };
        f.write_str(name)
    }
}

/// Operations attempted in the wrong state.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no documents uploaded")]
    NoUploads,
    #[error("documents have not been analyzed yet")]
    NotAnalyzed,
    #[error("risk {index} does not exist (there are {count})")]
    RiskOutOfRange { index: usize, count: usize },
    #[error("no risk selected")]
    NoRiskSelected,
    #[error("question is empty")]
    EmptyQuestion,
}

/// The pipeline components a session drives.
pub struct Advisor {
    indexer: Indexer,
    risk_extractor: RiskExtractor,
    responder: ChatResponder,
}

impl Advisor {
    pub fn new(
        config: &Config,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        model: Arc<dyn ChatModel>,
    ) -> Self {
        let indexer = Indexer::new(
            store.clone(),
            embedder.clone(),
            Chunker::new(&config.chunking),
            config.db.collection.clone(),
            config.retrieval.metric,
        );
        let retriever = Arc::new(Retriever::new(
            store,
            embedder,
            config.db.collection.clone(),
            config.retrieval.top_k,
        ));

        Self {
            indexer,
            risk_extractor: RiskExtractor::new(model.clone(), &config.analysis),
            responder: ChatResponder::new(model, retriever, &config.analysis),
        }
    }

    /// Wire the SQLite store and OpenAI clients from configuration.
    pub async fn from_config(config: &Config) -> Result<Self> {
        migrate::run_migrations(config).await?;
        let pool = db::connect(config).await?;
        let store: Arc<dyn VectorStore> = Arc::new(SqliteVectorStore::new(pool));
        let embedder: Arc<dyn EmbeddingProvider> = Arc::from(create_provider(config)?);
        let model: Arc<dyn ChatModel> = Arc::new(OpenAIChat::from_config(config)?);
        Ok(Self::new(config, store, embedder, model))
    }
}

pub struct Session {
    advisor: Arc<Advisor>,
    state: SessionState,
    uploads: Vec<Upload>,
    documents: Vec<DocumentRecord>,
    analysis: Option<RiskAnalysis>,
    selected: Option<usize>,
    transcripts: Vec<Vec<ChatMessage>>,
    follow_ups: Option<Vec<String>>,
    prompts: PromptSettings,
    initial_prompts: PromptSettings,
}

impl Session {
    pub fn new(advisor: Arc<Advisor>, prompts: PromptSettings) -> Self {
        Self {
            advisor,
            state: SessionState::Idle,
            uploads: Vec::new(),
            documents: Vec::new(),
            analysis: None,
            selected: None,
            transcripts: Vec::new(),
            follow_ups: None,
            initial_prompts: prompts.clone(),
            prompts,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn uploads(&self) -> &[Upload] {
        &self.uploads
    }

    pub fn documents(&self) -> &[DocumentRecord] {
        &self.documents
    }

    pub fn risks(&self) -> &[RiskRecord] {
        self.analysis
            .as_ref()
            .map(|a| a.risks.as_slice())
            .unwrap_or(&[])
    }

    pub fn prompts(&self) -> &PromptSettings {
        &self.prompts
    }

    /// Index and record of the selected risk.
    pub fn selected_risk(&self) -> Option<(usize, &RiskRecord)> {
        let index = self.selected?;
        self.risks().get(index).map(|risk| (index, risk))
    }

    /// Transcript of the selected risk; empty when none is selected.
    pub fn transcript(&self) -> &[ChatMessage] {
        self.selected
            .and_then(|i| self.transcripts.get(i))
            .map(|t| t.as_slice())
            .unwrap_or(&[])
    }

    pub fn transcript_for(&self, index: usize) -> &[ChatMessage] {
        self.transcripts
            .get(index)
            .map(|t| t.as_slice())
            .unwrap_or(&[])
    }

    /// Queue a file for the next analysis.
    pub fn add_upload(&mut self, upload: Upload) {
        tracing::debug!(
            category = upload.category.slug(),
            filename = %upload.filename,
            "upload added"
        );
        self.uploads.push(upload);
        if self.state == SessionState::Idle {
            self.state = SessionState::DocumentsUploaded;
        }
    }

    pub fn clear_uploads(&mut self) {
        self.uploads.clear();
        if self.state == SessionState::DocumentsUploaded {
            self.state = SessionState::Idle;
        }
    }

    /// Extract, index and analyze the current uploads.
    ///
    /// On success the previous documents, risks, selection, transcripts and
    /// follow-ups are replaced. On failure the session is unchanged.
    pub async fn analyze(&mut self) -> Result<RiskAnalysis> {
        if self.uploads.is_empty() {
            return Err(SessionError::NoUploads.into());
        }

        let documents: Vec<DocumentRecord> = self
            .uploads
            .iter()
            .map(|upload| DocumentRecord {
                category: upload.category,
                filename: upload.filename.clone(),
                text: extract_text_from_file(&upload.bytes, &upload.filename),
            })
            .collect();
        tracing::info!(documents = documents.len(), "documents extracted");

        self.advisor.indexer.index_documents(&documents).await?;
        let analysis = self.advisor.risk_extractor.extract(&documents).await?;

        self.documents = documents;
        self.transcripts = vec![Vec::new(); analysis.risks.len()];
        self.analysis = Some(analysis.clone());
        self.selected = None;
        self.follow_ups = None;
        self.state = SessionState::Analyzed;

        Ok(analysis)
    }

    /// Select a risk by zero-based index.
    ///
    /// A risk's transcript starts with an assistant greeting the first time
    /// it is selected.
    pub fn select_risk(&mut self, index: usize) -> Result<&RiskRecord> {
        let count = self.risks().len();
        if count == 0 {
            return Err(SessionError::NotAnalyzed.into());
        }
        if index >= count {
            return Err(SessionError::RiskOutOfRange { index, count }.into());
        }

        let title = self.risks()[index].title.clone();
        let transcript = &mut self.transcripts[index];
        if transcript.is_empty() {
            transcript.push(ChatMessage::assistant(greeting(&title)));
        }

        self.selected = Some(index);
        self.follow_ups = None;
        self.state = SessionState::RiskSelected;
        Ok(&self.risks()[index])
    }

    /// Ask a question about the selected risk and return the answer.
    pub async fn ask(&mut self, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(SessionError::EmptyQuestion.into());
        }
        let (index, title) = match self.selected_risk() {
            Some((index, risk)) => (index, risk.title.clone()),
            None => return Err(SessionError::NoRiskSelected.into()),
        };

        self.transcripts[index].push(ChatMessage::user(question));

        match self
            .advisor
            .responder
            .answer(&title, question, &self.prompts)
            .await
        {
            Ok(answer) => {
                self.transcripts[index].push(ChatMessage::assistant(answer.clone()));
                self.follow_ups = None;
                self.state = SessionState::Chatting;
                Ok(answer)
            }
            Err(e) => {
                self.transcripts[index].pop();
                Err(e)
            }
        }
    }

    /// Suggested next questions for the selected risk.
    ///
    /// Empty until the transcript holds more than the greeting. A non-empty
    /// result is cached until the next answer or selection.
    pub async fn follow_up_questions(&mut self) -> Result<Vec<String>> {
        let title = match self.selected_risk() {
            Some((_, risk)) => risk.title.clone(),
            None => return Err(SessionError::NoRiskSelected.into()),
        };
        if self.transcript().len() <= 1 {
            return Ok(Vec::new());
        }
        if let Some(cached) = &self.follow_ups {
            return Ok(cached.clone());
        }

        let questions = self
            .advisor
            .responder
            .follow_up_questions(&title, self.transcript())
            .await?;
        if !questions.is_empty() {
            self.follow_ups = Some(questions.clone());
        }
        Ok(questions)
    }

    /// Replace the system and persona prompts for later answers.
    pub fn update_prompts(&mut self, prompts: PromptSettings) {
        self.prompts = prompts;
    }

    /// Back to idle with nothing uploaded, analyzed or said.
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.uploads.clear();
        self.documents.clear();
        self.analysis = None;
        self.selected = None;
        self.transcripts.clear();
        self.follow_ups = None;
        self.prompts = self.initial_prompts.clone();
    }
}

fn greeting(title: &str) -> String {
    format!(
        "Ask me anything about **{}**. I will analyze it from the contractor, \
         owner and arbitrator viewpoints.",
        title
    )
}
