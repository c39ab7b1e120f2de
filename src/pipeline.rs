//! Batch orchestration.
//!
//! For every input name: clean → resolve (full name, then first/last) →
//! crawl works → classify career stage on the full set → build rows. Each
//! author is isolated: a failure is logged and counted, and the batch moves
//! on. With `workers > 1` authors run concurrently but rows are still
//! concatenated in input order.

use crate::career::CareerStage;
use crate::config::CollectConfig;
use crate::error::Result;
use crate::fetch::{Fetcher, ReqwestTransport, RetryPolicy, Sleeper, TokioSleeper, Transport};
use crate::names::clean_author_name;
use crate::openalex::Endpoints;
use crate::random::{sample_without_replacement, RandomSource, StdRandom};
use crate::resolver::{AuthorResolver, Resolution, Strategy};
use crate::rows::{PaperRow, RowBuilder, RowStats};
use crate::works::{CollectOutcome, WorkCollector};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{info, warn};

/// How one input name ended.
#[derive(Debug)]
pub enum AuthorOutcome {
    Rows {
        resolution: Resolution,
        stage: CareerStage,
        rows: Vec<PaperRow>,
        stats: RowStats,
    },
    NotFound,
    NoUsableData,
    Failed(String),
}

/// Counts of every skip category across a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub names: usize,
    pub resolved: usize,
    pub resolved_by_fallback: usize,
    pub not_found: usize,
    pub no_usable_data: usize,
    pub failed: usize,
    pub rows: RowStats,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub rows: Vec<PaperRow>,
    pub stats: BatchStats,
}

/// Drives resolution, crawling and row building over a list of names.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<CollectConfig>,
    resolver: AuthorResolver,
    collector: WorkCollector,
}

impl Pipeline {
    /// Production wiring: reqwest transport, tokio sleeps, entropy-seeded delays.
    pub fn new(config: CollectConfig) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self::with_parts(
            config,
            transport,
            Arc::new(TokioSleeper),
            Arc::new(StdRandom::from_entropy()),
        ))
    }

    /// Wire a pipeline from explicit parts. A sample without a seed gets one
    /// drawn from `random`.
    pub fn with_parts(
        mut config: CollectConfig,
        transport: Arc<dyn Transport>,
        sleeper: Arc<dyn Sleeper>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        if config.sample_size.is_some() && config.seed.is_none() {
            let seed = random.uniform(0.0, u32::MAX as f64) as u64;
            info!(seed = seed, "No sample seed given, drew one");
            config.seed = Some(seed);
        }
        let fetcher = Fetcher::new(transport, sleeper, random, RetryPolicy::from_config(&config));
        let endpoints = Endpoints::from_config(&config);
        Self {
            resolver: AuthorResolver::new(fetcher.clone(), endpoints.clone()),
            collector: WorkCollector::new(fetcher, endpoints, config.courtesy_delay),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &CollectConfig {
        &self.config
    }

    pub fn resolver(&self) -> &AuthorResolver {
        &self.resolver
    }

    /// The names this run will process: all of them, or a seeded sample.
    pub fn select_names(&self, names: &[String]) -> Vec<String> {
        match (self.config.sample_size, self.config.seed) {
            (Some(size), Some(seed)) => {
                if names.len() < size {
                    info!(available = names.len(), requested = size, "Fewer names than sample size, taking all");
                }
                let sampled = sample_without_replacement(names, size, seed);
                info!(selected = sampled.len(), seed = seed, "Sampled authors");
                sampled
            }
            _ => names.to_vec(),
        }
    }

    /// Process one raw input name. Never returns an error; failures become
    /// [`AuthorOutcome::Failed`].
    pub async fn process_author(&self, raw_name: &str) -> AuthorOutcome {
        match self.try_process_author(raw_name).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(name = raw_name, error = %e, "Author failed, skipping");
                AuthorOutcome::Failed(e.to_string())
            }
        }
    }

    async fn try_process_author(&self, raw_name: &str) -> Result<AuthorOutcome> {
        let name = clean_author_name(raw_name);
        if name.is_empty() {
            warn!(raw = raw_name, "Name is empty after cleanup");
            return Ok(AuthorOutcome::NotFound);
        }

        let Some(resolution) = self.resolver.resolve(&name).await? else {
            warn!(name = %name, "No author found");
            return Ok(AuthorOutcome::NotFound);
        };
        info!(
            name = %name,
            author = %resolution.author.display_name,
            id = %resolution.author.id,
            strategy = ?resolution.strategy,
            rule = ?resolution.rule,
            "Resolved author"
        );

        let works = match self.collector.collect(&resolution.author).await? {
            CollectOutcome::Works(works) => works,
            CollectOutcome::NoUsableData => {
                warn!(author = %resolution.author.display_name, "No dated publications");
                return Ok(AuthorOutcome::NoUsableData);
            }
        };

        // Classified on every dated work, before the year window applies
        let Some(stage) = CareerStage::classify(works.years()) else {
            return Ok(AuthorOutcome::NoUsableData);
        };
        info!(
            author = %resolution.author.display_name,
            first_year = works.first_year,
            last_year = works.last_year,
            stage = %stage,
            "Classified career stage"
        );

        let builder = RowBuilder::new(&resolution.author, stage, &self.config.years_of_interest);
        let (rows, mut stats) = builder.build(&works.publications);
        stats.malformed += works.unreadable;

        Ok(AuthorOutcome::Rows {
            resolution,
            stage,
            rows,
            stats,
        })
    }

    /// Process `names` (after sampling) and assemble the output table.
    pub async fn run(&self, names: &[String]) -> BatchReport {
        let selected = self.select_names(names);
        let workers = self.config.workers.max(1);
        info!(names = selected.len(), workers = workers, "Starting collection");

        // `buffered` yields in input order regardless of completion order
        let outcomes: Vec<AuthorOutcome> = stream::iter(selected.iter())
            .map(|name| self.process_author(name))
            .buffered(workers)
            .collect()
            .await;

        let mut report = BatchReport::default();
        report.stats.names = selected.len();
        for outcome in outcomes {
            match outcome {
                AuthorOutcome::Rows {
                    resolution,
                    rows,
                    stats,
                    ..
                } => {
                    report.stats.resolved += 1;
                    if resolution.strategy == Strategy::Fallback {
                        report.stats.resolved_by_fallback += 1;
                    }
                    report.stats.rows.absorb(stats);
                    report.rows.extend(rows);
                }
                AuthorOutcome::NotFound => report.stats.not_found += 1,
                AuthorOutcome::NoUsableData => report.stats.no_usable_data += 1,
                AuthorOutcome::Failed(_) => report.stats.failed += 1,
            }
        }

        let stats = &report.stats;
        info!(
            names = stats.names,
            resolved = stats.resolved,
            fallback = stats.resolved_by_fallback,
            not_found = stats.not_found,
            no_usable_data = stats.no_usable_data,
            failed = stats.failed,
            rows = stats.rows.emitted,
            outside_window = stats.rows.outside_window,
            excluded_title = stats.rows.excluded_title,
            malformed = stats.rows.malformed,
            "Collection complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::{FixedRandom, RecordingSleeper, ScriptedTransport};
    use crate::fetch::RawResponse;
    use reqwest::StatusCode;
    use serde_json::{json, Value};

    fn config() -> CollectConfig {
        CollectConfig {
            api_base: "http://upstream".to_string(),
            ..CollectConfig::default()
        }
    }

    fn pipeline(config: CollectConfig, transport: Arc<ScriptedTransport>) -> Pipeline {
        Pipeline::with_parts(
            config,
            transport,
            Arc::new(RecordingSleeper::default()),
            Arc::new(FixedRandom(0.5)),
        )
    }

    fn work(id: &str, year: i32, authors: &[&str]) -> Value {
        let authorships: Vec<Value> = authors
            .iter()
            .map(|a| json!({"author": {"display_name": a}, "institutions": [{"country_code": "US"}]}))
            .collect();
        json!({"id": id, "doi": null, "title": format!("Study {}", id),
               "publication_year": year, "cited_by_count": 2, "authorships": authorships})
    }

    fn script_author(transport: &ScriptedTransport, search: &str, id: &str, name: &str, works: Vec<Value>) {
        transport.ok(search, json!({"results": [{"id": format!("https://openalex.org/{}", id), "display_name": name}]}));
        transport.ok(
            &format!("author.id%3A{}&", id),
            json!({"meta": {"count": works.len(), "next_cursor": null}, "results": works}),
        );
    }

    #[tokio::test]
    async fn test_end_to_end_fallback_and_full_set_classification() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.ok("display_name.search%3AJohn+P.+Doe", json!({"results": []}));
        script_author(
            &transport,
            "display_name.search%3AJohn+Doe",
            "A42",
            "John Doe",
            vec![
                work("W1", 2015, &["John Doe"]),
                work("W2", 2016, &["John Doe", "Ana Ruiz"]),
                work("W3", 2021, &["John Doe", "Ana Ruiz"]),
                work("W4", 2022, &["Lee Chen", "John Doe"]),
            ],
        );

        let report = pipeline(config(), transport)
            .run(&["John P. Doe, MD".to_string()])
            .await;

        assert_eq!(report.rows.len(), 2);
        let years: Vec<i32> = report.rows.iter().map(|r| r.paper_year).collect();
        assert_eq!(years, vec![2021, 2022]);
        assert!(report.rows.iter().all(|r| r.career_stage == CareerStage::MidCareer));
        assert_eq!(report.rows[1].coauthors, "Lee Chen");
        assert_eq!(report.stats.resolved_by_fallback, 1);
        assert_eq!(report.stats.rows.outside_window, 2);
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_batch() {
        let transport = Arc::new(ScriptedTransport::default());
        // Garbage body for the first author's search
        transport.push(
            "display_name.search%3ABroken+Author",
            Ok(RawResponse::new(StatusCode::OK, "<html>oops</html>")),
        );
        // No candidates for the second, including fallback
        transport.ok("display_name.search%3AGhost+Writer", json!({"results": []}));
        transport.ok("display_name.search%3AGhost+Writer", json!({"results": []}));
        // Third resolves but has nothing dated
        transport.ok("display_name.search%3AEmpty+Shelf", json!({"results": [{"id": "A3", "display_name": "Empty Shelf"}]}));
        transport.ok("author.id%3AA3&", json!({"meta": {"next_cursor": null}, "results": [{"id": "W9"}]}));
        // Fourth is fine
        script_author(&transport, "display_name.search%3AJane+Doe", "A4", "Jane Doe", vec![work("W1", 2020, &["Jane Doe", "John Smith"])]);

        let names: Vec<String> = ["Broken Author", "Ghost Writer", "Empty Shelf", "Jane Doe, PhD"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let report = pipeline(config(), transport).run(&names).await;

        assert_eq!(report.stats.failed, 1);
        assert_eq!(report.stats.not_found, 1);
        assert_eq!(report.stats.no_usable_data, 1);
        assert_eq!(report.stats.resolved, 1);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].author_name, "Jane Doe");
        assert_eq!(report.rows[0].coauthors, "John Smith");
    }

    #[tokio::test]
    async fn test_parallel_workers_keep_input_order() {
        let transport = Arc::new(ScriptedTransport::default());
        let people = [("Ada Byron", "A1"), ("Ben Cole", "A2"), ("Cy Dunn", "A3")];
        for (name, id) in people {
            script_author(
                &transport,
                &format!("display_name.search%3A{}", name.replace(' ', "+")),
                id,
                name,
                vec![work(&format!("{}-W", id), 2019, &[name])],
            );
        }
        let names: Vec<String> = people.iter().map(|(n, _)| n.to_string()).collect();
        let report = pipeline(CollectConfig { workers: 3, ..config() }, transport)
            .run(&names)
            .await;

        let authors: Vec<&str> = report.rows.iter().map(|r| r.author_name.as_str()).collect();
        assert_eq!(authors, vec!["Ada Byron", "Ben Cole", "Cy Dunn"]);
    }

    #[test]
    fn test_select_names_samples_with_seed() {
        let names: Vec<String> = (0..20).map(|i| format!("Person {}", i)).collect();
        let sampled = CollectConfig {
            sample_size: Some(5),
            seed: Some(42),
            ..config()
        };
        let transport = Arc::new(ScriptedTransport::default());
        let a = pipeline(sampled.clone(), transport.clone()).select_names(&names);
        let b = pipeline(sampled, transport.clone()).select_names(&names);
        assert_eq!(a.len(), 5);
        assert_eq!(a, b);

        let everyone = pipeline(config(), transport).select_names(&names);
        assert_eq!(everyone, names);
    }

    #[test]
    fn test_sample_without_seed_draws_one() {
        let names: Vec<String> = (0..20).map(|i| format!("Person {}", i)).collect();
        let unseeded = CollectConfig {
            sample_size: Some(5),
            seed: None,
            ..config()
        };
        let transport = Arc::new(ScriptedTransport::default());
        let first = pipeline(unseeded.clone(), transport.clone());
        let seed = first.config().seed.expect("drawn seed");
        assert_eq!(seed, (0.5 * u32::MAX as f64) as u64);

        let sampled = first.select_names(&names);
        assert_eq!(sampled.len(), 5);
        assert_eq!(sampled, sample_without_replacement(&names, 5, seed));

        let explicit = CollectConfig {
            seed: Some(seed),
            ..unseeded
        };
        assert_eq!(pipeline(explicit, transport).select_names(&names), sampled);
    }

    #[tokio::test]
    async fn test_unreadable_records_count_as_malformed() {
        let transport = Arc::new(ScriptedTransport::default());
        script_author(
            &transport,
            "display_name.search%3AJane+Doe",
            "A4",
            "Jane Doe",
            vec![
                work("W1", 2020, &["Jane Doe", "John Smith"]),
                json!({"id": "W2", "title": "Typed wrong", "publication_year": "2021"}),
            ],
        );

        let report = pipeline(config(), transport)
            .run(&["Jane Doe".to_string()])
            .await;

        assert_eq!(report.stats.failed, 0);
        assert_eq!(report.stats.resolved, 1);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.stats.rows.malformed, 1);
    }
}
