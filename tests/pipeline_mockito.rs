//! End-to-end collection against a mock OpenAlex server.

use futures::future::BoxFuture;
use mockito::{Matcher, Server};
use rustcoauthors::career::CareerStage;
use rustcoauthors::config::CollectConfig;
use rustcoauthors::fetch::{ReqwestTransport, Sleeper};
use rustcoauthors::pipeline::Pipeline;
use rustcoauthors::random::StdRandom;
use rustcoauthors::rows::PAPER_COLUMNS;
use rustcoauthors::table;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

struct NoSleep;

impl Sleeper for NoSleep {
    fn sleep(&self, _duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }
}

fn pipeline(base: String) -> Pipeline {
    let config = CollectConfig {
        api_base: base,
        mailto: Some("tests@example.org".to_string()),
        ..CollectConfig::default()
    };
    let transport = Arc::new(ReqwestTransport::new(&config).expect("client"));
    Pipeline::with_parts(config, transport, Arc::new(NoSleep), Arc::new(StdRandom::seeded(1)))
}

fn authorship(name: &str, country: Option<&str>) -> serde_json::Value {
    json!({
        "author": {"display_name": name},
        "institutions": match country {
            Some(code) => json!([{"country_code": code}]),
            None => json!([]),
        }
    })
}

#[tokio::test]
async fn collects_rows_through_fallback_and_pagination() {
    let mut server = Server::new_async().await;

    let primary = server
        .mock("GET", "/authors")
        .match_query(Matcher::UrlEncoded(
            "filter".into(),
            "display_name.search:John P. Doe".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"results": []}).to_string())
        .expect(1)
        .create_async()
        .await;

    let fallback = server
        .mock("GET", "/authors")
        .match_query(Matcher::UrlEncoded(
            "filter".into(),
            "display_name.search:John Doe".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"results": [
                {"id": "https://openalex.org/A7", "display_name": "Jonathan Doe",
                 "display_name_alternatives": ["John Doe"]},
                {"id": "https://openalex.org/A8", "display_name": "Johnny Doe"}
            ]})
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let first_page = server
        .mock("GET", "/works")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("filter".into(), "author.id:A7".into()),
            Matcher::UrlEncoded("cursor".into(), "*".into()),
            Matcher::UrlEncoded("mailto".into(), "tests@example.org".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "meta": {"count": 4, "next_cursor": "page2"},
                "results": [
                    {"id": "https://openalex.org/W1", "doi": "https://doi.org/10.1/one",
                     "title": "Early sepsis bundles", "publication_year": 2015, "cited_by_count": 40,
                     "authorships": [authorship("Jonathan Doe", Some("US"))]},
                    {"id": "https://openalex.org/W2", "doi": "https://doi.org/10.1/two",
                     "title": "Fluid balance in the ICU", "publication_year": 2021, "cited_by_count": 5,
                     "authorships": [authorship("Jonathan Doe", Some("US")),
                                     authorship("Ana Ruiz", Some("BR")),
                                     authorship("Lee Chen", None)]}
                ]
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let second_page = server
        .mock("GET", "/works")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("filter".into(), "author.id:A7".into()),
            Matcher::UrlEncoded("cursor".into(), "page2".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "meta": {"count": 4, "next_cursor": null},
                "results": [
                    {"id": "https://openalex.org/W2b", "doi": "https://doi.org/10.1/two",
                     "title": "Fluid balance in the ICU (preprint)", "publication_year": 2020,
                     "cited_by_count": 1, "authorships": [authorship("Jonathan Doe", None)]},
                    {"id": "https://openalex.org/W3", "doi": null,
                     "title": "Editorial Board", "publication_year": 2022, "cited_by_count": 0,
                     "authorships": [authorship("Jonathan Doe", None)]}
                ]
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let report = pipeline(server.url())
        .run(&["John P. Doe, MD".to_string()])
        .await;

    primary.assert_async().await;
    fallback.assert_async().await;
    first_page.assert_async().await;
    second_page.assert_async().await;

    assert_eq!(report.stats.resolved, 1);
    assert_eq!(report.stats.resolved_by_fallback, 1);
    assert_eq!(report.rows.len(), 1);

    let row = &report.rows[0];
    assert_eq!(row.author_name, "Jonathan Doe");
    assert_eq!(row.career_stage, CareerStage::MidCareer);
    assert_eq!(row.paper_title, "Fluid balance in the ICU");
    assert_eq!(row.paper_year, 2021);
    assert_eq!(row.times_cited, 5);
    assert_eq!(row.total_authors_listed, 3);
    assert_eq!(row.coauthors, "Ana Ruiz, Lee Chen");
    assert_eq!(row.coauthor_count, 2);
    assert_eq!(row.coauthor_countries_counts.get("US"), Some(&1));
    assert_eq!(row.coauthor_countries_counts.get("BR"), Some(&1));

    assert_eq!(report.stats.rows.outside_window, 1);
    assert_eq!(report.stats.rows.excluded_title, 1);

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("papers.csv");
    table::write_rows_to_path(&path, &report.rows).expect("write");
    let written = std::fs::read_to_string(&path).expect("read");
    let mut lines = written.lines();
    assert_eq!(lines.next(), Some(PAPER_COLUMNS.join(",").as_str()));
    assert_eq!(lines.count(), 1);
}

#[tokio::test]
async fn unknown_author_is_skipped_and_batch_continues() {
    let mut server = Server::new_async().await;

    let nobody = server
        .mock("GET", "/authors")
        .match_query(Matcher::UrlEncoded(
            "filter".into(),
            "display_name.search:Nobody Here".into(),
        ))
        .with_status(200)
        .with_body(json!({"results": []}).to_string())
        .expect(2)
        .create_async()
        .await;

    let jane = server
        .mock("GET", "/authors")
        .match_query(Matcher::UrlEncoded(
            "filter".into(),
            "display_name.search:Jane Roe".into(),
        ))
        .with_status(200)
        .with_body(json!({"results": [{"id": "https://openalex.org/A2", "display_name": "Jane Roe"}]}).to_string())
        .create_async()
        .await;

    let works = server
        .mock("GET", "/works")
        .match_query(Matcher::UrlEncoded("filter".into(), "author.id:A2".into()))
        .with_status(200)
        .with_body(
            json!({
                "meta": {"count": 1, "next_cursor": null},
                "results": [
                    {"id": "https://openalex.org/W5", "title": "Triage at scale",
                     "publication_year": 2019, "cited_by_count": 2,
                     "authorships": [authorship("Jane Roe", Some("CA")), authorship("JANE ROE", None)]}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let names = vec!["Nobody Here".to_string(), "Jane Roe, RN".to_string()];
    let report = pipeline(server.url()).run(&names).await;

    nobody.assert_async().await;
    jane.assert_async().await;
    works.assert_async().await;

    assert_eq!(report.stats.not_found, 1);
    assert_eq!(report.stats.resolved, 1);
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].career_stage, CareerStage::EarlyCareer);
    assert_eq!(report.rows[0].coauthors, "");
    assert_eq!(report.rows[0].coauthor_count, 0);
}
