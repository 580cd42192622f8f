use markweave::{parse, render, AsyncPluginProcessor, ParseOptions, ResolverConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn deferred_embeds_resolve_independently() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/intro.md"))
        .respond_with(ResponseTemplate::new(200).set_body_string("## Embedded\n\n*remote* text\n"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing.md"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let markdown = format!(
        "Before\n\n{{{{markdown {base}/intro.md}}}}\n\n{{{{markdown {base}/missing.md}}}}\n\nAfter",
        base = mock_server.uri()
    );
    let html = render(&parse(&markdown, &ParseOptions::default())).html;
    assert!(html.contains("id=\"md-embed-1\""));
    assert!(html.contains("id=\"md-embed-2\""));

    let processor = AsyncPluginProcessor::with_defaults(ResolverConfig::default())
        .expect("client builds");
    let resolved = processor.process(&html).await;

    assert!(resolved.starts_with("<p>Before</p>\n"));
    assert!(resolved.contains("<p>After</p>"));
    assert!(resolved.contains("<div id=\"md-embed-1\" class=\"markdown-embed\">"));
    assert!(resolved.contains("<h2 id=\"embedded\">Embedded</h2>"));
    assert!(resolved.contains("<p><em>remote</em> text</p>"));
    assert!(resolved.contains(
        "<div id=\"md-embed-2\" class=\"async-plugin-error\"><strong>Error loading markdown:</strong>"
    ));
    assert!(resolved.contains("HTTP 404"));
    assert!(!resolved.contains("async-plugin-placeholder"));
    assert!(!resolved.contains("markdown-embed-loading"));
}

#[tokio::test]
async fn html_without_placeholders_is_unchanged() {
    let html = render(&parse("# Plain\n\n<div>raw</div>", &ParseOptions::default())).html;
    let processor = AsyncPluginProcessor::new(ResolverConfig::default());
    assert_eq!(processor.process(&html).await, html);
}

#[tokio::test]
async fn disallowed_scheme_never_becomes_placeholder() {
    let html = render(&parse("{{markdown ftp://host/doc.md}}", &ParseOptions::default())).html;
    assert!(html.contains("markdown-embed-error"));
    assert!(!html.contains("async-plugin-placeholder"));
}
