/*!
 * End-to-end tests for single note translation.
 *
 * Every test runs the full pipeline against a temporary vault with a mock
 * provider standing in for the generation API.
 */

use vault_translator::errors::{ErrorClass, ErrorKind};
use vault_translator::pipeline::{ApplyMode, TranslateRequest};
use vault_translator::providers::mock::MockProvider;
use vault_translator::translation::{Document, MetaValue};

use crate::common::{TestVault, init_logging, url};

#[tokio::test]
async fn test_replace_mode_should_rewrite_note_and_keep_backup() {
    init_logging();
    let vault = TestVault::new().unwrap();
    vault.write("notes/a.md", "Hello").unwrap();
    let pipeline = vault.pipeline(MockProvider::working());

    let outcome = pipeline
        .translate_note(&url("notes/a.md"), "French", ApplyMode::Replace)
        .await
        .unwrap();

    let written = vault.read("notes/a.md");
    let doc = Document::parse(&written);
    assert_eq!(doc.body, "[TRANSLATED] Hello");
    let record = doc.front_matter.get("translated").and_then(MetaValue::as_map).unwrap();
    assert_eq!(record.get("targetLanguage").and_then(MetaValue::as_text), Some("French"));
    assert_eq!(record.get("model").and_then(MetaValue::as_text), Some("mock-model"));

    assert_eq!(outcome.original_content, "Hello");
    assert_eq!(outcome.translated_content, written);
    assert_eq!(outcome.written_path, "notes/a.md");
    assert_eq!(vault.read(&outcome.backup_path), "Hello");
    assert_eq!(vault.backups_in("notes").len(), 1);
    assert!(outcome.timestamp_iso.ends_with('Z'));
}

#[tokio::test]
async fn test_parallel_mode_should_leave_source_untouched() {
    let vault = TestVault::new().unwrap();
    vault.write("notes/a.md", "---\ntitle: Greeting\n---\nHello").unwrap();
    let pipeline = vault.pipeline(MockProvider::working());

    let outcome = pipeline
        .translate_note(&url("notes/a.md"), "French", ApplyMode::Parallel)
        .await
        .unwrap();

    assert_eq!(outcome.written_path, "notes/a.fr.md");
    assert_eq!(vault.read("notes/a.md"), "---\ntitle: Greeting\n---\nHello");
    let translated = Document::parse(&vault.read("notes/a.fr.md"));
    assert_eq!(translated.body, "[TRANSLATED] Hello");
    assert_eq!(translated.front_matter.get("title").and_then(MetaValue::as_text), Some("Greeting"));
    assert_eq!(vault.backups_in("notes").len(), 1);
}

#[tokio::test]
async fn test_parallel_mode_should_back_up_existing_sibling() {
    let vault = TestVault::new().unwrap();
    vault.write("notes/a.md", "Hello").unwrap();
    vault.write("notes/a.fr.md", "Bonjour, edited by hand").unwrap();
    let pipeline = vault.pipeline(MockProvider::working());

    let outcome = pipeline
        .translate_note(&url("notes/a.md"), "French", ApplyMode::Parallel)
        .await
        .unwrap();

    let sibling_backup = outcome.sibling_backup_path.clone().unwrap();
    assert!(sibling_backup.starts_with("notes/a.fr.backup-"));
    assert_eq!(vault.read(&sibling_backup), "Bonjour, edited by hand");
    assert_eq!(Document::parse(&vault.read("notes/a.fr.md")).body, "[TRANSLATED] Hello");
    assert_eq!(vault.backups_in("notes").len(), 2);
}

#[tokio::test]
async fn test_parallel_mode_without_sibling_should_make_one_backup() {
    let vault = TestVault::new().unwrap();
    vault.write("a.md", "Hello").unwrap();
    let pipeline = vault.pipeline(MockProvider::working());

    let outcome = pipeline
        .translate_note(&url("a.md"), "de", ApplyMode::Parallel)
        .await
        .unwrap();

    assert!(outcome.sibling_backup_path.is_none());
    assert_eq!(vault.backups_in("").len(), 1);
}

#[tokio::test]
async fn test_unparseable_front_matter_should_pass_through_verbatim() {
    let vault = TestVault::new().unwrap();
    let original = "---\ntitle: Meeting: notes\ntags: [x]\n---\nHello";
    vault.write("meeting.md", original).unwrap();
    let provider = MockProvider::working();
    let pipeline = vault.pipeline(provider.clone());

    let outcome = pipeline
        .translate_note(&url("meeting.md"), "French", ApplyMode::Replace)
        .await
        .unwrap();

    let expected = "---\ntitle: Meeting: notes\ntags: [x]\n---\n[TRANSLATED] Hello";
    assert_eq!(vault.read("meeting.md"), expected);
    assert_eq!(outcome.translated_content, expected);
    assert_eq!(provider.received_bodies(), vec!["Hello".to_string()]);
    assert_eq!(vault.read(&outcome.backup_path), original);
}

#[tokio::test]
async fn test_read_only_note_should_fail_with_write_denied() {
    let vault = TestVault::new().unwrap();
    vault.write("locked.md", "Hello").unwrap();
    let mut permissions = std::fs::metadata(vault.path("locked.md")).unwrap().permissions();
    permissions.set_readonly(true);
    std::fs::set_permissions(vault.path("locked.md"), permissions).unwrap();
    let pipeline = vault.pipeline(MockProvider::working());

    let error = pipeline
        .translate_note(&url("locked.md"), "French", ApplyMode::Replace)
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::WriteDenied);
    assert_eq!(error.class(), ErrorClass::Internal);
    assert_eq!(vault.read("locked.md"), "Hello");
}

#[tokio::test]
async fn test_append_mode_should_keep_original_above_translation() {
    let vault = TestVault::new().unwrap();
    vault.write("a.md", "Hello").unwrap();
    let pipeline = vault.pipeline(MockProvider::working());

    pipeline
        .translate_note(&url("a.md"), "Spanish", ApplyMode::Append)
        .await
        .unwrap();

    let written = vault.read("a.md");
    assert!(written.starts_with("Hello\n\n---\n\n## Translation (Spanish)\n\n"));
    assert!(written.ends_with("[TRANSLATED] Hello"));
    assert!(written.contains("targetLanguage: Spanish"));
}

#[tokio::test]
async fn test_empty_body_should_not_call_provider() {
    let vault = TestVault::new().unwrap();
    let original = "---\ntitle: Only metadata\n---\n";
    vault.write("meta.md", original).unwrap();
    let provider = MockProvider::working();
    let pipeline = vault.pipeline(provider.clone());

    let outcome = pipeline
        .translate_note(&url("meta.md"), "French", ApplyMode::Replace)
        .await
        .unwrap();

    assert_eq!(provider.request_count(), 0);
    assert_eq!(vault.read("meta.md"), original);
    assert_eq!(outcome.translated_content, original);
}

#[tokio::test]
async fn test_code_and_links_should_survive_translation() {
    let vault = TestVault::new().unwrap();
    vault
        .write(
            "code.md",
            "# Setup\n\nRun `cargo build` then see [[Other Note]].\n\n```sh\necho hello\n```\n",
        )
        .unwrap();
    let pipeline = vault.pipeline(MockProvider::working().with_custom_response(|body| body.to_uppercase()));

    pipeline
        .translate_note(&url("code.md"), "German", ApplyMode::Replace)
        .await
        .unwrap();

    let doc = Document::parse(&vault.read("code.md"));
    assert_eq!(
        doc.body,
        "# SETUP\n\nRUN `cargo build` THEN SEE [[OTHER NOTE]].\n\n```sh\necho hello\n```\n"
    );
}

#[tokio::test]
async fn test_collection_mismatch_should_fail_before_any_io() {
    let vault = TestVault::new().unwrap();
    let pipeline = vault.pipeline(MockProvider::working());

    // The note does not exist, so any I/O would surface as ResourceNotFound
    let error = pipeline
        .translate_note("obsidian://open?vault=Other&file=x.md", "French", ApplyMode::Replace)
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::CollectionMismatch);
    assert_eq!(error.class(), ErrorClass::InvalidInput);
}

#[tokio::test]
async fn test_unsafe_and_malformed_addresses_should_be_rejected() {
    let vault = TestVault::new().unwrap();
    vault.write(".obsidian/app.md", "secret").unwrap();
    let provider = MockProvider::working();
    let pipeline = vault.pipeline(provider.clone());

    for (address, kind) in [
        (url("../outside.md"), ErrorKind::UnsafePath),
        (url(".obsidian/app.md"), ErrorKind::UnsafePath),
        ("obsidian://open?vault=Main".to_string(), ErrorKind::MalformedAddress),
        ("file:///etc/passwd".to_string(), ErrorKind::MalformedAddress),
    ] {
        let error = pipeline
            .translate_note(&address, "French", ApplyMode::Replace)
            .await
            .unwrap_err();
        assert_eq!(error.kind(), kind, "{address}");
    }
    assert_eq!(provider.request_count(), 0);
    assert!(vault.backups_in(".obsidian").is_empty());
}

#[tokio::test]
async fn test_missing_note_should_fail_without_backup() {
    let vault = TestVault::new().unwrap();
    std::fs::create_dir_all(vault.path("notes")).unwrap();
    let pipeline = vault.pipeline(MockProvider::working());

    let error = pipeline
        .translate_note(&url("notes/missing.md"), "French", ApplyMode::Replace)
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::ResourceNotFound);
    assert!(vault.backups_in("notes").is_empty());
}

#[tokio::test]
async fn test_provider_failure_should_keep_source_and_backup() {
    init_logging();
    let vault = TestVault::new().unwrap();
    vault.write("notes/a.md", "Hello").unwrap();
    let pipeline = vault.pipeline(MockProvider::failing());

    let error = pipeline
        .translate_note(&url("notes/a.md"), "French", ApplyMode::Replace)
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::TranslationFailed);
    assert_eq!(error.class(), ErrorClass::Internal);
    assert_eq!(vault.read("notes/a.md"), "Hello");
    let backups = vault.backups_in("notes");
    assert_eq!(backups.len(), 1);
    assert_eq!(vault.read(&format!("notes/{}", backups[0])), "Hello");
}

#[tokio::test]
async fn test_successful_run_should_prune_expired_backups() {
    let vault = TestVault::new().unwrap();
    vault.write("notes/a.md", "Hello").unwrap();
    vault.write("notes/a.backup-1.md", "ancient").unwrap();
    vault.age("notes/a.backup-1.md", 45).unwrap();
    let pipeline = vault.pipeline(MockProvider::working()).with_retention_days(30);

    pipeline
        .translate_note(&url("notes/a.md"), "French", ApplyMode::Replace)
        .await
        .unwrap();

    let backups = vault.backups_in("notes");
    assert_eq!(backups.len(), 1);
    assert_ne!(backups[0], "a.backup-1.md");
}

#[tokio::test]
async fn test_handle_should_apply_request_defaults_and_reject_bad_mode() {
    let vault = TestVault::new().unwrap();
    vault.write("a.md", "Hello").unwrap();
    let pipeline = vault
        .pipeline(MockProvider::working())
        .with_default_target_language("Italian");

    let request: TranslateRequest = serde_json::from_value(serde_json::json!({
        "url": url("a.md"),
        "mode": "parallel"
    }))
    .unwrap();
    let outcome = pipeline.handle(&request).await.unwrap();
    assert_eq!(outcome.target_language, "Italian");
    assert_eq!(outcome.written_path, "a.it.md");

    let bad = TranslateRequest {
        url: url("a.md"),
        target_language: Some("French".to_string()),
        mode: Some("overwrite".to_string()),
    };
    let error = pipeline.handle(&bad).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidMode);
    assert_eq!(vault.backups_in("").len(), 1);
}

#[tokio::test]
async fn test_strict_placeholders_should_fail_translation() {
    let vault = TestVault::new().unwrap();
    vault.write("a.md", "Keep `this` intact").unwrap();
    let mut pipeline = vault.pipeline(MockProvider::dropping_placeholders());
    pipeline.engine_mut().options.strict_placeholders = true;

    let error = pipeline
        .translate_note(&url("a.md"), "French", ApplyMode::Replace)
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::TranslationFailed);
    assert_eq!(vault.read("a.md"), "Keep `this` intact");
}

#[test]
fn test_pipeline_should_run_on_current_thread_runtime() {
    let vault = TestVault::new().unwrap();
    vault.write("a.md", "Hello").unwrap();
    let pipeline = vault.pipeline(MockProvider::working());

    let outcome = tokio_test::block_on(pipeline.translate_note(&url("a.md"), "fr", ApplyMode::Parallel));

    let outcome = tokio_test::assert_ok!(outcome);
    assert_eq!(outcome.written_path, "a.fr.md");
}

#[tokio::test]
async fn test_plus_sign_in_address_should_reach_the_note() {
    let vault = TestVault::new().unwrap();
    vault.write("C++ notes.md", "Hello").unwrap();
    let pipeline = vault.pipeline(MockProvider::working());

    let outcome = pipeline
        .translate_note(&url("C++%20notes.md"), "French", ApplyMode::Replace)
        .await
        .unwrap();

    assert_eq!(outcome.written_path, "C++ notes.md");
    assert!(vault.read("C++ notes.md").ends_with("[TRANSLATED] Hello"));
}
