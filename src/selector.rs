use crate::candidate::{Candidate, CandidateId};
use crate::error::PipelineError;
use crate::used_set::UsedSetStore;
use crate::{logi, logok};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Stock-footage provider as seen by the selector.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// One query per keyword. An empty list means no match, not an error.
    async fn search(&self, keyword: &str) -> Result<Vec<Candidate>>;

    async fn download(&self, candidate: &Candidate, dest: &Path) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionFilters {
    /// Lowercase tags that disqualify a candidate.
    pub deny_tags: Vec<String>,
    /// Closed `[min, max]` window in seconds. `None` disables the check.
    pub duration_window: Option<(f64, f64)>,
}

impl SelectionFilters {
    pub fn rejection(&self, candidate: &Candidate, used: &BTreeSet<CandidateId>) -> Option<&'static str> {
        if used.contains(&candidate.id) {
            return Some("already used");
        }
        if candidate.has_any_tag(&self.deny_tags) {
            return Some("denied tag");
        }
        if let Some((min, max)) = self.duration_window {
            let d = candidate.duration_seconds;
            if d < min || d > max {
                return Some("duration out of window");
            }
        }
        None
    }
}

/// First candidate in provider order that passes every filter.
pub fn first_acceptable<'a>(
    candidates: &'a [Candidate],
    used: &BTreeSet<CandidateId>,
    filters: &SelectionFilters,
) -> Option<&'a Candidate> {
    candidates.iter().find(|c| filters.rejection(c, used).is_none())
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub keyword: String,
    pub candidate: Candidate,
    pub local_path: PathBuf,
}

/// Shuffles the keywords and searches them in turn until one yields an
/// acceptable candidate.
pub async fn find_candidate<C, R>(
    catalog: &C,
    keywords: &[String],
    used: &BTreeSet<CandidateId>,
    filters: &SelectionFilters,
    rng: &mut R,
) -> Result<(String, Candidate)>
where
    C: CatalogSource + ?Sized,
    R: Rng + ?Sized,
{
    let mut order = keywords.to_vec();
    order.shuffle(rng);

    for keyword in &order {
        let candidates = catalog
            .search(keyword)
            .await
            .with_context(|| format!("Catalog search failed for {keyword:?}"))?;
        logi(format!("Catalog returned {} candidates for {:?}", candidates.len(), keyword));

        if let Some(found) = first_acceptable(&candidates, used, filters) {
            return Ok((keyword.clone(), found.clone()));
        }
    }

    Err(PipelineError::NoAcceptableCandidate { keywords: order }.into())
}

/// Picks a candidate, downloads it to `dest` and records it as used.
///
/// The used set is only written after the download succeeded.
pub async fn select_and_fetch<C, R>(
    catalog: &C,
    keywords: &[String],
    filters: &SelectionFilters,
    store: &UsedSetStore,
    dest: &Path,
    rng: &mut R,
) -> Result<Selection>
where
    C: CatalogSource + ?Sized,
    R: Rng + ?Sized,
{
    let used = store.load().await?;
    logi(format!("Loaded used set: {} ids ({})", used.len(), store.path().display()));

    let (keyword, candidate) = find_candidate(catalog, keywords, &used, filters, rng).await?;
    let size = match (candidate.width, candidate.height) {
        (Some(w), Some(h)) => format!("{w}x{h}"),
        _ => "size unknown".to_string(),
    };
    logi(format!(
        "Selected {} for {:?} ({:.1}s, {}) -> {}",
        candidate.id,
        keyword,
        candidate.duration_seconds,
        size,
        dest.display()
    ));

    catalog
        .download(&candidate, dest)
        .await
        .with_context(|| format!("Failed to download candidate {}", candidate.id))?;

    store.record(&candidate.id).await?;
    logok(format!("New video used: {}", candidate.id));

    Ok(Selection {
        keyword,
        candidate,
        local_path: dest.to_path_buf(),
    })
}
