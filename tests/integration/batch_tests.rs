/*!
 * Tests for batch and folder translation.
 */

use vault_translator::errors::ErrorKind;
use vault_translator::pipeline::ApplyMode;
use vault_translator::providers::mock::MockProvider;
use vault_translator::translation::Document;

use crate::common::{TestVault, init_logging, url};

#[tokio::test]
async fn test_batch_with_one_failure_should_report_in_order() {
    init_logging();
    let vault = TestVault::new().unwrap();
    vault.write("one.md", "First").unwrap();
    vault.write("three.md", "Third").unwrap();
    let pipeline = vault.pipeline(MockProvider::working());
    let urls = vec![url("one.md"), url("two.md"), url("three.md")];

    let results = pipeline.translate_notes(&urls, "French", ApplyMode::Replace).await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().original_content, "First");
    assert_eq!(results[1].as_ref().unwrap_err().kind(), ErrorKind::ResourceNotFound);
    assert_eq!(results[2].as_ref().unwrap().original_content, "Third");
    assert_eq!(Document::parse(&vault.read("one.md")).body, "[TRANSLATED] First");
    assert_eq!(Document::parse(&vault.read("three.md")).body, "[TRANSLATED] Third");
}

#[tokio::test]
async fn test_batch_should_cap_concurrent_provider_calls() {
    let vault = TestVault::new().unwrap();
    let mut urls = Vec::new();
    for i in 0..8 {
        let path = format!("n{}.md", i);
        vault.write(&path, "Hello").unwrap();
        urls.push(url(&path));
    }
    let provider = MockProvider::slow(40);
    let pipeline = vault.pipeline(provider.clone()).with_batch_concurrency(3);

    let results = pipeline.translate_notes(&urls, "French", ApplyMode::Parallel).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(provider.request_count(), 8);
    assert!(provider.peak_in_flight() <= 3, "peak was {}", provider.peak_in_flight());
    assert!(provider.peak_in_flight() >= 2);
}

#[tokio::test]
async fn test_intermittent_failures_should_not_stop_siblings() {
    let vault = TestVault::new().unwrap();
    let urls: Vec<String> = (0..6)
        .map(|i| {
            let path = format!("n{}.md", i);
            vault.write(&path, "Hello").unwrap();
            url(&path)
        })
        .collect();
    let pipeline = vault
        .pipeline(MockProvider::intermittent(3))
        .with_batch_concurrency(1);

    let results = pipeline.translate_notes(&urls, "French", ApplyMode::Replace).await;

    let failed: Vec<usize> = results
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_err())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(failed, vec![2, 5]);
    assert_eq!(vault.read("n2.md"), "Hello");
    assert_eq!(Document::parse(&vault.read("n3.md")).body, "[TRANSLATED] Hello");
}

#[tokio::test]
async fn test_folder_should_translate_only_visible_notes() {
    let vault = TestVault::new().unwrap();
    vault.write("journal/a.md", "Alpha").unwrap();
    vault.write("journal/sub/b.md", "Beta").unwrap();
    vault.write("journal/a.backup-5.md", "old copy").unwrap();
    vault.write("journal/.trash/c.md", "gone").unwrap();
    vault.write("journal/image.png", "binary").unwrap();
    vault.write("elsewhere.md", "Other").unwrap();
    let provider = MockProvider::working();
    let pipeline = vault.pipeline(provider.clone());

    let addresses = pipeline.folder_addresses("journal").await.unwrap();
    assert_eq!(addresses, vec![pipeline.address_for("journal/a.md"), pipeline.address_for("journal/sub/b.md")]);

    let results = pipeline
        .translate_folder("journal", "Japanese", ApplyMode::Parallel)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(vault.exists("journal/a.ja.md"));
    assert!(vault.exists("journal/sub/b.ja.md"));
    assert_eq!(vault.read("journal/a.md"), "Alpha");
    assert_eq!(vault.read("elsewhere.md"), "Other");
    assert_eq!(provider.request_count(), 2);
}

#[tokio::test]
async fn test_folder_should_reject_unsafe_directory() {
    let vault = TestVault::new().unwrap();
    let pipeline = vault.pipeline(MockProvider::working());

    let error = pipeline
        .translate_folder("../", "French", ApplyMode::Replace)
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::UnsafePath);
}
