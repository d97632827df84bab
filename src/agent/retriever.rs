//! Page-context retrieval: reduce the live page to the handful of
//! fragments relevant to the next decision.
//!
//! Each cycle splits the page HTML into overlapping chunks, embeds them
//! into an in-memory similarity index, and — concurrently — asks the fast
//! model what DOM details the requirement probably needs. The model's
//! answer is then used as the query against the index. Retrieval never
//! fails a cycle: any error degrades to an empty context string.

use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use tracing::warn;

use crate::agent::state::{AgentState, StateUpdate};
use crate::config::Config;
use crate::llm::{ChatMessage, FAST_MODEL, LanguageModel};

const FIND_DOM_DETAILS_PROMPT: &str =
    "Based on the below requirement, provide possible DOM elements and details which the next action applies to";

pub struct PageContextRetriever {
    llm: Arc<dyn LanguageModel>,
    chunk_size: usize,
    chunk_overlap: usize,
    top_k: usize,
}

impl PageContextRetriever {
    pub fn new(llm: Arc<dyn LanguageModel>, config: &Config) -> Self {
        Self {
            llm,
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            top_k: config.retrieve_top_k,
        }
    }

    /// Produce the `docs` update for the current cycle. Index build and
    /// query generation run concurrently and are jointly awaited; there is
    /// no partial-result path.
    pub async fn retrieve(&self, state: &AgentState) -> StateUpdate {
        let (index, query) = tokio::join!(self.index_page(state), self.possible_dom_details(state));

        let (index, query) = match (index, query) {
            (Ok(index), Ok(query)) => (index, query),
            (Err(e), _) | (_, Err(e)) => {
                warn!("context retrieval degraded: {e:#}");
                return StateUpdate::docs("");
            }
        };

        match self.search(&index, &query).await {
            Ok(docs) => StateUpdate::docs(docs),
            Err(e) => {
                warn!("context retrieval degraded: {e:#}");
                StateUpdate::docs("")
            }
        }
    }

    async fn index_page(&self, state: &AgentState) -> Result<VectorIndex> {
        let content = state.page.content().await?;
        let chunks = split_text(&content, self.chunk_size, self.chunk_overlap);
        if chunks.is_empty() {
            bail!("page produced no indexable content");
        }
        let vectors = self.llm.embed(&chunks).await?;
        Ok(VectorIndex::new(chunks, vectors))
    }

    /// Ask the fast model which DOM details the requirement calls for,
    /// given everything done so far.
    async fn possible_dom_details(&self, state: &AgentState) -> Result<String> {
        let mut messages = vec![
            ChatMessage::system(FIND_DOM_DETAILS_PROMPT),
            ChatMessage::user(format!("Requirement: {}", state.requirement)),
        ];
        messages.extend(state.transcript_messages());
        Ok(self.llm.chat(FAST_MODEL, &messages).await?)
    }

    async fn search(&self, index: &VectorIndex, query: &str) -> Result<String> {
        let mut vectors = self.llm.embed(&[query.to_string()]).await?;
        let query_vector = vectors
            .pop()
            .ok_or_else(|| anyhow!("no embedding returned for query"))?;

        let parts: Vec<String> = index
            .search(&query_vector, self.top_k)
            .into_iter()
            .map(|part| format!("<Part/>\n{part}\n</Part>"))
            .collect();
        Ok(parts.join("\n"))
    }
}

/// In-memory similarity index over page chunks, rebuilt once per cycle.
pub(crate) struct VectorIndex {
    entries: Vec<(String, Vec<f32>)>,
}

impl VectorIndex {
    pub(crate) fn new(chunks: Vec<String>, vectors: Vec<Vec<f32>>) -> Self {
        Self {
            entries: chunks.into_iter().zip(vectors).collect(),
        }
    }

    /// Chunks ordered by descending cosine similarity to the query.
    pub(crate) fn search(&self, query: &[f32], top_k: usize) -> Vec<&str> {
        let norm_q = l2(query);
        if norm_q == 0.0 {
            return Vec::new();
        }
        let mut scored: Vec<(&str, f32)> = self
            .entries
            .iter()
            .map(|(chunk, vector)| (chunk.as_str(), cosine(query, vector, norm_q)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored.into_iter().map(|(chunk, _)| chunk).collect()
    }
}

fn l2(vector: &[f32]) -> f32 {
    vector.iter().map(|v| v * v).sum::<f32>().sqrt()
}

fn cosine(query: &[f32], item: &[f32], norm_q: f32) -> f32 {
    let norm_i = l2(item);
    if norm_i == 0.0 {
        return 0.0;
    }
    let len = query.len().min(item.len());
    let mut dot = 0.0;
    for i in 0..len {
        dot += query[i] * item[i];
    }
    dot / (norm_q * norm_i)
}

/// Split text into chunks of `chunk_size` characters where consecutive
/// chunks share `overlap` characters. Whitespace-only chunks are dropped.
pub(crate) fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if chunk_size == 0 {
        return Vec::new();
    }
    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size.saturating_sub(overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        if !chunk.trim().is_empty() {
            chunks.push(chunk);
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}
