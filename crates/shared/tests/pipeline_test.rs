use mockito::{Matcher, Mock, ServerGuard};
use shared::{run, Config, DeliveryOutcome, RunOptions};
use std::collections::HashMap;
use std::path::Path;

fn config(pairs: &[(&str, String)]) -> Config {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    Config::from_lookup(|key| map.get(key).cloned())
}

fn options(recipient: Option<&str>) -> RunOptions {
    RunOptions {
        topics: vec!["ai".to_string(), "technology".to_string()],
        max_articles: 2,
        recipient: recipient.map(str::to_string),
        subject: "AI Newsletter".to_string(),
        no_open: true,
    }
}

async fn mock_guardian(server: &mut ServerGuard) -> Vec<Mock> {
    let search = server
        .mock("GET", "/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "ai OR technology".into()),
            Matcher::UrlEncoded("page-size".into(), "2".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"response": {"results": [
                {"id": "technology/one", "webUrl": "https://www.theguardian.com/technology/one",
                 "fields": {"headline": "Robots learn to fold laundry", "trailText": "Folding"}},
                {"id": "technology/two", "webUrl": "https://www.theguardian.com/technology/two",
                 "fields": {"headline": "Chips get smaller", "trailText": "Smaller"}}
            ]}}"#,
        )
        .expect(1)
        .create_async()
        .await;

    let first = server
        .mock("GET", "/technology/one")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"response": {"content": {"fields": {"bodyText":
                "Researchers built a robot. It folds shirts. It also folds towels. It cannot fold fitted sheets."}}}}"#,
        )
        .expect(1)
        .create_async()
        .await;

    let second = server
        .mock("GET", "/technology/two")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"response": {"content": {"fields": {"bodyText": "Transistors shrank again"}}}}"#)
        .expect(1)
        .create_async()
        .await;

    vec![search, first, second]
}

fn single_output_file(dir: &Path) -> std::path::PathBuf {
    let entries: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(entries.len(), 1);
    entries.into_iter().next().unwrap()
}

#[tokio::test]
async fn test_two_articles_without_llm_key() {
    let mut server = mockito::Server::new_async().await;
    let mocks = mock_guardian(&mut server).await;
    let temp = tempfile::tempdir().unwrap();

    let config = config(&[
        ("GUARDIAN_API_KEY", "test-key".to_string()),
        ("GUARDIAN_BASE_URL", server.url()),
        ("NEWSLETTER_OUTPUT_DIR", temp.path().display().to_string()),
    ]);

    let report = run(&config, &options(None)).await.unwrap();

    assert_eq!(report.item_count, 2);
    assert_eq!(report.delivery, DeliveryOutcome::NoRecipient);
    assert_eq!(single_output_file(temp.path()), report.output_path);

    let html = std::fs::read_to_string(&report.output_path).unwrap();
    assert_eq!(html.matches("class=\"item\"").count(), 2);
    assert!(html.contains("Robots learn to fold laundry"));
    assert!(html.contains("- Researchers built a robot\n- It folds shirts\n- It also folds towels</pre>"));
    assert!(html.contains("- Transistors shrank again</pre>"));
    assert!(
        html.find("Robots learn to fold laundry").unwrap() < html.find("Chips get smaller").unwrap()
    );

    for mock in mocks {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn test_recipient_without_smtp_password() {
    let mut server = mockito::Server::new_async().await;
    let _mocks = mock_guardian(&mut server).await;
    let temp = tempfile::tempdir().unwrap();

    let config = config(&[
        ("GUARDIAN_API_KEY", "test-key".to_string()),
        ("GUARDIAN_BASE_URL", server.url()),
        ("NEWSLETTER_OUTPUT_DIR", temp.path().display().to_string()),
        ("SMTP_USER", "sender@example.com".to_string()),
    ]);

    let report = run(&config, &options(Some("reader@example.com")))
        .await
        .unwrap();

    assert_eq!(
        report.delivery,
        DeliveryOutcome::MissingConfig(vec!["SMTP_PASSWORD"])
    );
    assert!(report.output_path.exists());
}

#[tokio::test]
async fn test_missing_guardian_key_makes_no_requests() {
    let mut server = mockito::Server::new_async().await;
    let untouched = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let temp = tempfile::tempdir().unwrap();

    let config = config(&[
        ("GUARDIAN_BASE_URL", server.url()),
        ("NEWSLETTER_OUTPUT_DIR", temp.path().join("out").display().to_string()),
    ]);

    let err = run(&config, &options(None)).await.unwrap_err();

    assert!(err.to_string().contains("GUARDIAN_API_KEY"));
    assert!(!temp.path().join("out").exists());
    untouched.assert_async().await;
}
