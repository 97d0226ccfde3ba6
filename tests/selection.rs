use animal_reels::candidate::{Candidate, CandidateId, parse_tag_list};
use animal_reels::error::PipelineError;
use animal_reels::selector::{CatalogSource, SelectionFilters, select_and_fetch};
use animal_reels::used_set::UsedSetStore;
use anyhow::Result;
use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Mutex;

#[derive(Default)]
struct FakeCatalog {
    by_keyword: HashMap<String, Vec<Candidate>>,
    searched: Mutex<Vec<String>>,
    fail_downloads: bool,
}

impl FakeCatalog {
    fn with(mut self, keyword: &str, candidates: Vec<Candidate>) -> Self {
        self.by_keyword.insert(keyword.to_string(), candidates);
        self
    }

    fn searched(&self) -> Vec<String> {
        self.searched.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn search(&self, keyword: &str) -> Result<Vec<Candidate>> {
        self.searched.lock().unwrap().push(keyword.to_string());
        Ok(self.by_keyword.get(keyword).cloned().unwrap_or_default())
    }

    async fn download(&self, candidate: &Candidate, dest: &Path) -> Result<()> {
        if self.fail_downloads {
            anyhow::bail!("connection reset while fetching {}", candidate.media_url);
        }
        tokio::fs::write(dest, candidate.media_url.as_bytes()).await?;
        Ok(())
    }
}

fn candidate(id: &str, tags: &str, duration: f64) -> Candidate {
    Candidate {
        id: CandidateId::native(id),
        media_url: format!("https://cdn.example.com/{id}.mp4"),
        tags: parse_tag_list(tags),
        duration_seconds: duration,
        width: Some(1920),
        height: Some(1080),
    }
}

fn keywords(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn ids(values: &[&str]) -> BTreeSet<CandidateId> {
    values.iter().map(|v| CandidateId::native(*v)).collect()
}

fn strict_filters() -> SelectionFilters {
    SelectionFilters {
        deny_tags: vec!["bird".to_string()],
        duration_window: Some((8.0, 10.0)),
    }
}

#[tokio::test]
async fn skips_used_clip_and_records_the_new_one() {
    let dir = tempfile::tempdir().unwrap();
    let store = UsedSetStore::new(dir.path().join("used_videos.json"));
    store.save(&ids(&["101"])).await.unwrap();

    let catalog = FakeCatalog::default().with(
        "dog",
        vec![candidate("101", "dog", 9.0), candidate("202", "dog", 9.0)],
    );
    let dest = dir.path().join("video.mp4");
    let mut rng = StdRng::seed_from_u64(1);

    let selection = select_and_fetch(&catalog, &keywords(&["dog"]), &strict_filters(), &store, &dest, &mut rng)
        .await
        .unwrap();

    assert_eq!(selection.candidate.id.as_str(), "202");
    assert_eq!(selection.keyword, "dog");
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "https://cdn.example.com/202.mp4");
    assert_eq!(store.load().await.unwrap(), ids(&["101", "202"]));
}

#[tokio::test]
async fn empty_keyword_results_move_on_to_the_next_keyword() {
    let dir = tempfile::tempdir().unwrap();
    let store = UsedSetStore::new(dir.path().join("used_videos.json"));
    let catalog = FakeCatalog::default()
        .with("cat", vec![])
        .with("lion", vec![candidate("7", "lion, savanna", 8.5)]);
    let mut rng = StdRng::seed_from_u64(42);

    let selection = select_and_fetch(
        &catalog,
        &keywords(&["cat", "lion", "horse"]),
        &strict_filters(),
        &store,
        &dir.path().join("video.mp4"),
        &mut rng,
    )
    .await
    .unwrap();

    assert_eq!(selection.candidate.id.as_str(), "7");
    let searched = catalog.searched();
    assert!(searched.contains(&"lion".to_string()));
    assert_eq!(searched.last().unwrap(), "lion");
}

#[tokio::test]
async fn exhausted_search_is_terminal_and_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = UsedSetStore::new(dir.path().join("used_videos.json"));
    let catalog = FakeCatalog::default()
        .with("dog", vec![candidate("1", "dog, bird", 9.0), candidate("2", "dog", 30.0)])
        .with("cat", vec![candidate("3", "cat", 9.0)]);
    store.save(&ids(&["3"])).await.unwrap();
    let mut rng = StdRng::seed_from_u64(3);

    let err = select_and_fetch(
        &catalog,
        &keywords(&["dog", "cat"]),
        &strict_filters(),
        &store,
        &dir.path().join("video.mp4"),
        &mut rng,
    )
    .await
    .unwrap_err();

    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::NoAcceptableCandidate { keywords }) => assert_eq!(keywords.len(), 2),
        other => panic!("unexpected error: {other:?}"),
    }
    let mut searched = catalog.searched();
    searched.sort();
    assert_eq!(searched, vec!["cat", "dog"]);
    assert_eq!(store.load().await.unwrap(), ids(&["3"]));
    assert!(!dir.path().join("video.mp4").exists());
}

#[tokio::test]
async fn download_failure_is_fatal_and_not_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let store = UsedSetStore::new(dir.path().join("used_videos.json"));
    let catalog = FakeCatalog {
        fail_downloads: true,
        ..FakeCatalog::default()
    }
    .with("dog", vec![candidate("5", "dog", 9.0), candidate("6", "dog", 9.0)]);
    let mut rng = StdRng::seed_from_u64(9);

    let result = select_and_fetch(
        &catalog,
        &keywords(&["dog"]),
        &SelectionFilters::default(),
        &store,
        &dir.path().join("video.mp4"),
        &mut rng,
    )
    .await;

    assert!(result.is_err());
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn every_accepted_candidate_passes_the_filters() {
    let dir = tempfile::tempdir().unwrap();
    let store = UsedSetStore::new(dir.path().join("used_videos.json"));
    let pool = vec![
        candidate("a", "bird", 9.0),
        candidate("b", "dog", 7.0),
        candidate("c", "dog", 11.0),
        candidate("d", "dog", 8.0),
        candidate("e", "Bird, dog", 9.5),
        candidate("f", "dog", 10.0),
        candidate("g", "horse", 9.0),
    ];
    let catalog = FakeCatalog::default().with("dog", pool);
    let filters = strict_filters();

    let mut picked = Vec::new();
    for seed in 0..3 {
        let mut rng = StdRng::seed_from_u64(seed);
        let selection = select_and_fetch(
            &catalog,
            &keywords(&["dog"]),
            &filters,
            &store,
            &dir.path().join("video.mp4"),
            &mut rng,
        )
        .await
        .unwrap();
        let c = selection.candidate;
        assert!(!c.tags.contains("bird"));
        assert!((8.0..=10.0).contains(&c.duration_seconds));
        picked.push(c.id.as_str().to_string());
    }

    assert_eq!(picked, vec!["d", "f", "g"]);
    assert_eq!(store.load().await.unwrap(), ids(&["d", "f", "g"]));
}
