mod common;

use std::{sync::Arc, time::Duration};

use common::{citation, expansion, section, table, MockApi};
use lexcite_core::{
    expander::{ContentExpander, ResolveSettings},
    ContentOrigin,
};
use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;

const EXCERPT: &str = "Every person has the right...";
const SECTION_TEXT: &str =
    "(2) Every person has the right to equal protection and benefit of the law.";

fn expander(api: MockApi) -> (ContentExpander, Arc<MockApi>) {
    let api = Arc::new(api);
    let settings = ResolveSettings {
        request_timeout: Some(Duration::from_millis(200)),
        ..ResolveSettings::default()
    };
    (ContentExpander::new(api.clone(), settings), api)
}

// =============================================================================
// Direct section lookup
// =============================================================================

#[tokio::test]
async fn verified_section_is_used() {
    let (ex, api) = expander(MockApi::new().with_section(
        "doc1",
        "sec_9__subsec_2",
        section("sec_9__subsec_2", "subsection", "2", SECTION_TEXT),
    ));
    let c = citation("doc1", EXCERPT, Some("sec_9__subsec_2"));

    let resolved = ex.resolve(&c, &CancellationToken::new()).await.unwrap();
    assert_eq!(resolved.origin, ContentOrigin::Section);
    assert_eq!(resolved.content, SECTION_TEXT);
    assert_eq!(resolved.section_id.as_deref(), Some("sec_9__subsec_2"));
    assert!(resolved.section_data.is_some());
    // Expansion is never consulted after a verified section.
    assert_eq!(api.calls(), (1, 0));
}

#[tokio::test]
async fn section_html_is_sanitized() {
    let mut s = section("sec_9", "section", "9", SECTION_TEXT);
    s.html_content = Some("<p onclick=\"x()\">(2) Every person</p><script>bad()</script>".into());
    let (ex, _) = expander(MockApi::new().with_section("doc1", "sec_9", s));
    let c = citation("doc1", EXCERPT, Some("sec_9"));

    let resolved = ex.resolve(&c, &CancellationToken::new()).await.unwrap();
    assert_eq!(resolved.html.as_deref(), Some("<p>(2) Every person</p>"));
}

#[tokio::test]
async fn mismatched_section_falls_back_to_expansion() {
    let (ex, api) = expander(
        MockApi::new()
            .with_section(
                "doc1",
                "sec_9",
                section("sec_9", "section", "9", "(1) Everyone is equal before the law."),
            )
            .with_expansion("doc1", expansion(&format!("{EXCERPT} to equal protection."))),
    );
    let c = citation("doc1", EXCERPT, Some("sec_9"));

    let resolved = ex.resolve(&c, &CancellationToken::new()).await.unwrap();
    assert_eq!(resolved.origin, ContentOrigin::Expansion);
    assert!(resolved.section_data.is_none());
    assert_eq!(api.calls(), (1, 1));
}

#[tokio::test]
async fn missing_section_falls_back_to_expansion() {
    let (ex, api) = expander(
        MockApi::new().with_expansion("doc1", expansion("Every person has the right to vote.")),
    );
    let c = citation("doc1", EXCERPT, Some("sec_19"));

    let resolved = ex.resolve(&c, &CancellationToken::new()).await.unwrap();
    assert_eq!(resolved.content, "Every person has the right to vote.");
    assert_eq!(api.calls(), (1, 1));
}

#[tokio::test]
async fn tabular_excerpt_skips_section_lookup() {
    let (ex, api) = expander(
        MockApi::new()
            .with_section("doc1", "sec_4", section("sec_4", "section", "4", "Item | Fee"))
            .with_expansion("doc1", expansion("Item | Fee\nLicence | R100\nPermit | R50")),
    );
    let c = citation("doc1", "Item | Fee\nLicence | R100", Some("sec_4"));

    let resolved = ex.resolve(&c, &CancellationToken::new()).await.unwrap();
    assert_eq!(resolved.origin, ContentOrigin::Expansion);
    assert_eq!(api.calls(), (0, 1));
}

#[tokio::test]
async fn unspaced_pipe_excerpt_skips_section_lookup() {
    let (ex, api) = expander(
        MockApi::new()
            .with_section("doc1", "sec_4", section("sec_4", "section", "4", "Item|Fee|Amount"))
            .with_expansion("doc1", expansion("Item|Fee|Amount\nLicence|R100|1")),
    );
    let c = citation("doc1", "Item|Fee|Amount", Some("sec_4"));

    let resolved = ex.resolve(&c, &CancellationToken::new()).await.unwrap();
    assert_ne!(resolved.origin, ContentOrigin::Section);
    assert_eq!(api.calls(), (0, 1));
}

#[tokio::test]
async fn plain_section_id_skips_section_lookup() {
    let (ex, api) = expander(MockApi::new().with_expansion("doc1", expansion("short")));
    let c = citation("doc1", EXCERPT, Some("9"));

    ex.resolve(&c, &CancellationToken::new()).await.unwrap();
    assert_eq!(api.calls(), (0, 1));
}

// =============================================================================
// Expansion
// =============================================================================

#[tokio::test]
async fn shorter_expansion_keeps_original_excerpt() {
    let mut exp = expansion("Every person");
    exp.section_id = Some("sec_9__subsec_2".into());
    let (ex, _) = expander(MockApi::new().with_expansion("doc1", exp));
    let c = citation("doc1", EXCERPT, None);

    let resolved = ex.resolve(&c, &CancellationToken::new()).await.unwrap();
    assert_eq!(resolved.content, EXCERPT);
    assert_eq!(resolved.origin, ContentOrigin::Excerpt);
    // The resolved section id is still new information.
    assert_eq!(resolved.section_id.as_deref(), Some("sec_9__subsec_2"));
}

#[tokio::test]
async fn equal_length_expansion_keeps_original_excerpt() {
    let same_len = "x".repeat(EXCERPT.chars().count());
    let (ex, _) = expander(MockApi::new().with_expansion("doc1", expansion(&same_len)));
    let c = citation("doc1", EXCERPT, None);

    let resolved = ex.resolve(&c, &CancellationToken::new()).await.unwrap();
    assert_eq!(resolved.content, EXCERPT);
}

#[tokio::test]
async fn expansion_tables_are_captured_and_normalized() {
    let mut exp = expansion("[Schedule 1] fees payable under section 4");
    exp.tables = vec![
        table(&[&[" Item ", "Fee"], &["Licence", "R100"]]),
        table(&[&["", ""]]),
    ];
    let (ex, _) = expander(MockApi::new().with_expansion("doc1", exp));
    let c = citation("doc1", "[Schedule 1] fees", None);

    let resolved = ex.resolve(&c, &CancellationToken::new()).await.unwrap();
    assert_eq!(resolved.tables.len(), 1);
    assert_eq!(resolved.tables[0].rows[0], vec!["Item", "Fee"]);
}

// =============================================================================
// Failures never surface
// =============================================================================

#[tokio::test]
#[traced_test]
async fn transport_failure_falls_back_to_excerpt_and_warns() {
    let (ex, _) = expander(MockApi::new().failing("doc1"));
    let c = citation("doc1", EXCERPT, Some("sec_9"));

    let resolved = ex.resolve(&c, &CancellationToken::new()).await.unwrap();
    assert_eq!(resolved.content, EXCERPT);
    assert_eq!(resolved.origin, ContentOrigin::Excerpt);
    assert!(logs_contain("section fetch failed"));
    assert!(logs_contain("source expansion failed"));
}

#[tokio::test]
#[traced_test]
async fn slow_backend_times_out_to_excerpt() {
    let api = MockApi::new()
        .with_expansion("doc1", expansion("much longer text that never arrives in time"))
        .with_delay(Duration::from_secs(5));
    let (ex, _) = expander(api);
    let c = citation("doc1", EXCERPT, None);

    let resolved = ex.resolve(&c, &CancellationToken::new()).await.unwrap();
    assert_eq!(resolved.content, EXCERPT);
    assert!(logs_contain("source expansion timed out"));
}

#[tokio::test]
async fn cancelled_resolution_returns_none() {
    let (api, _gate) = MockApi::new()
        .with_expansion("doc1", expansion("much longer text"))
        .gated("doc1");
    let (ex, _) = expander(api);
    let c = citation("doc1", EXCERPT, None);
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });
    assert!(ex.resolve(&c, &cancel).await.is_none());
}

#[tokio::test]
async fn pre_cancelled_token_makes_no_progress() {
    let (ex, _) = expander(MockApi::new().with_expansion("doc1", expansion("longer text here!!!!!!!!!!!!!!!!")));
    let cancel = CancellationToken::new();
    cancel.cancel();
    assert!(ex.resolve(&citation("doc1", EXCERPT, None), &cancel).await.is_none());
}
