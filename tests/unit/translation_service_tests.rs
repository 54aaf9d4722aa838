/*!
 * Tests for the LLM-backed translation service
 */

use std::sync::Arc;

use subtrans::app_config::Config;
use subtrans::errors::TranslationError;
use subtrans::providers::CompletionRequest;
use subtrans::providers::mock::MockProvider;
use subtrans::translation::batch::validate_batch;
use subtrans::translation::{TranslationBackend, TranslationService};

fn service_with(provider: MockProvider) -> TranslationService {
    let mut config = Config::default();
    config.source_language = "en".to_string();
    config.target_language = "fr".to_string();
    TranslationService::with_provider(Arc::new(provider), &config)
}

fn items(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|t| t.to_string()).collect()
}

/// Reverses the order of the entries in a batch prompt
fn reversed_batch(request: &CompletionRequest) -> String {
    let mut blocks: Vec<String> = request
        .prompt
        .trim_end_matches("<<END>>")
        .split("<<ENTRY_")
        .filter(|block| !block.trim().is_empty())
        .map(|block| format!("<<ENTRY_{}", block.trim_end()))
        .collect();
    blocks.reverse();
    format!("{}\n<<END>>", blocks.join("\n"))
}

/// Test a well-formed batch
#[tokio::test]
async fn test_translate_batch_withWorkingProvider_shouldKeepOrder() {
    let service = service_with(MockProvider::working());

    let translated = service
        .translate_batch(&items(&["One", "Two[BR]lines", "Three"]), Some("Heat"))
        .await
        .unwrap();

    assert_eq!(translated, vec!["[TRANSLATED] One", "[TRANSLATED] Two[BR]lines", "[TRANSLATED] Three"]);
}

/// Test that entries answered out of order are placed by their marker
#[tokio::test]
async fn test_translate_batch_withReorderedMarkers_shouldPlaceByIndex() {
    let service = service_with(MockProvider::working().with_custom_response(reversed_batch));

    let translated = service.translate_batch(&items(&["a", "b", "c"]), None).await.unwrap();
    assert_eq!(translated, vec!["a", "b", "c"]);
}

/// Test that a missing end marker is tolerated
#[tokio::test]
async fn test_translate_batch_withoutEndMarker_shouldStillParse() {
    let service = service_with(
        MockProvider::working().with_custom_response(|_| "<<ENTRY_0>>\nUn\n<<ENTRY_1>>\nDeux".to_string()),
    );

    let translated = service.translate_batch(&items(&["One", "Two"]), None).await.unwrap();
    assert_eq!(translated, vec!["Un", "Deux"]);
}

/// Test a canned, well-formed batch answer
#[tokio::test]
async fn test_translate_batch_withCannedBatchResponse_shouldReturnEveryItem() {
    let service = service_with(
        MockProvider::working().with_custom_response(|_| MockProvider::generate_batch_response(&["Un", "Deux"])),
    );

    let translated = service.translate_batch(&items(&["One", "Two"]), None).await.unwrap();
    assert_eq!(translated, vec!["[TRANSLATED] Un", "[TRANSLATED] Deux"]);
}

/// Test that an answer with the middle marker missing is rejected
#[tokio::test]
async fn test_translate_batch_withMiddleMarkerMissing_shouldFailValidation() {
    let service = service_with(
        MockProvider::working().with_custom_response(|_| MockProvider::generate_partial_response(&["a", "b", "c"])),
    );

    let translated = service.translate_batch(&items(&["a", "b", "c"]), None).await.unwrap();
    assert_eq!(translated[1], "");

    let result = validate_batch(translated, 3);
    assert!(matches!(result, Err(TranslationError::MissingItems(ref idx)) if idx == &vec![1]));
}

/// Test an answer cut off before its last entry and end marker
#[tokio::test]
async fn test_translate_batch_withTruncatedResponse_shouldLeaveLastItemEmpty() {
    let service = service_with(MockProvider::truncated());

    let translated = service.translate_batch(&items(&["One", "Two", "Three"]), None).await.unwrap();
    assert_eq!(translated, vec!["[TRANSLATED] One", "[TRANSLATED] Two", ""]);
    assert!(matches!(validate_batch(translated, 3), Err(TranslationError::MissingItems(_))));
}

/// Test a single answer without end marker
#[tokio::test]
async fn test_translate_one_withTruncatedResponse_shouldStillReturnText() {
    let service = service_with(MockProvider::truncated());

    let translated = service.translate_one("Hello", None).await.unwrap();
    assert_eq!(translated, "[TRANSLATED] Hello");
}

/// Test provider failures surface as translation errors
#[tokio::test]
async fn test_translate_batch_withFailingProvider_shouldReturnProviderError() {
    let service = service_with(MockProvider::failing());

    let result = service.translate_batch(&items(&["One"]), None).await;
    assert!(matches!(result, Err(TranslationError::Provider(_))));
}

/// Test an empty answer to a batch
#[tokio::test]
async fn test_translate_batch_withEmptyResponse_shouldFail() {
    let service = service_with(MockProvider::empty());

    let result = service.translate_batch(&items(&["One"]), None).await;
    assert!(matches!(result, Err(TranslationError::EmptyResponse)));
}

/// Test single requests
#[tokio::test]
async fn test_translate_one_withWorkingProvider_shouldTrimAnswer() {
    let service = service_with(MockProvider::working().with_custom_response(|_| "  Bonjour\n".to_string()));

    let translated = service.translate_one("Hello", None).await.unwrap();
    assert_eq!(translated, "Bonjour");
}

/// Test single requests answered in the batch format
#[tokio::test]
async fn test_translate_one_withTaggedAnswer_shouldStripMarkers() {
    let service = service_with(
        MockProvider::working().with_custom_response(|_| "<<ENTRY_0>>\nBonjour\n<<END>>".to_string()),
    );

    let translated = service.translate_one("Hello", None).await.unwrap();
    assert_eq!(translated, "Bonjour");
}

/// Test the prompts carry the language names
#[test]
fn test_system_prompt_withLanguages_shouldUseFullNames() {
    let service = service_with(MockProvider::working());
    let prompt = service.system_prompt(None, None);

    assert!(prompt.contains("from English to French"));
    assert!(prompt.contains("[BR]"));
    assert!(!prompt.contains("Title:"));
}

/// Test token accounting across requests
#[tokio::test]
async fn test_token_usage_afterRequests_shouldAccumulate() {
    let service = service_with(MockProvider::working());

    service.translate_batch(&items(&["One", "Two"]), None).await.unwrap();
    service.translate_one("Three", None).await.unwrap();

    let usage = service.token_usage();
    assert_eq!(usage.requests, 2);
    assert!(usage.total_tokens > 0);
    assert_eq!(usage.total_tokens, usage.prompt_tokens + usage.completion_tokens);
    assert!(usage.summary().contains("Provider: Mock"));
}

/// Test the availability probe
#[tokio::test]
async fn test_check_availability_withWorkingProvider_shouldSucceed() {
    let service = service_with(MockProvider::working());
    assert!(service.check_availability().await.is_ok());
}
