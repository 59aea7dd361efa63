use std::{path::Path, sync::Arc};

use strum::Display;
use tracing::{info, warn};

use crate::pool::{read_lines, LoadError};

/// An immutable list of seed strings, shared between every worker.
pub type Corpus = Arc<[Box<str>]>;

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum CorpusKind {
    Dictionary,
    Names,
}

/// Loads a seed file into a [`Corpus`]. A missing file yields an empty corpus.
pub async fn load_corpus(path: &Path, kind: CorpusKind) -> Result<Corpus, LoadError> {
    let Some(lines) = read_lines(path).await? else {
        info!(%kind, path = %path.display(), "Seed file not found, continuing without it");
        return Ok(Corpus::from(Vec::new()));
    };

    info!(%kind, path = %path.display(), count = lines.len(), "Loaded seed corpus");

    Ok(lines.into_iter().map(String::into_boxed_str).collect())
}

/// Same as [`load_corpus`], but logs read failures and falls back to an empty corpus.
pub async fn load_corpus_or_empty(path: &Path, kind: CorpusKind) -> Corpus {
    load_corpus(path, kind).await.unwrap_or_else(|e| {
        warn!(%kind, "Failed to load seed corpus, continuing without it: {e}");
        Corpus::from(Vec::new())
    })
}
