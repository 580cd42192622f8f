//! Built-in plugins.

use super::{Plugin, PluginCall, PluginOutcome, Rendered, Shape};
use crate::render::escape_html;
use regex::Regex;
use std::sync::LazyLock;

static EMOJI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{\{emoji\s+([\w\s-]+)\}\}$").unwrap());
static BADGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{\{badge\s+(\w+)\s*:\s*([^}]+)\}\}$").unwrap());
static SMILES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\{\{smiles\s+([A-Za-z0-9\-()=#+\\/%@\[\]]+)\}\}$").unwrap()
});
static REACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\{\{reaction\s+([^}|]+)(?:\s*\|\s*([^}]+))?\}\}$").unwrap()
});
static YOUTUBE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{\{youtube\s+([A-Za-z0-9_-]+)\s*\}\}$").unwrap());
static MARKDOWN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{\{(?:markdown|md)\s+(\S+)\s*\}\}$").unwrap());
static DIAGRAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\{\{diagram\s+(\w+)[ \t]*\n(.*)\}\}$").unwrap());
static YAML: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\{\{(?:yaml|yml)[ \t]*\n(.*)\}\}$").unwrap());

const EMOJI_MAP: &[(&str, &str)] = &[
    ("smile", "😊"),
    ("laugh", "😄"),
    ("happy", "😃"),
    ("sad", "😢"),
    ("angry", "😠"),
    ("thumbsup", "👍"),
    ("thumbsdown", "👎"),
    ("heart", "❤️"),
    ("star", "⭐"),
    ("fire", "🔥"),
    ("rocket", "🚀"),
    ("party", "🎉"),
    ("thinking", "🤔"),
    ("eyes", "👀"),
    ("check", "✅"),
    ("cross", "❌"),
];

const BADGE_TYPES: &[&str] = &["success", "danger", "warning", "info", "primary", "secondary"];

/// All built-ins in registration order.
pub fn builtin_plugins() -> Vec<Plugin> {
    vec![
        emoji_plugin(),
        badge_plugin(),
        smiles_plugin(),
        reaction_plugin(),
        youtube_plugin(),
        markdown_plugin(),
        diagram_plugin(),
        yaml_plugin(),
    ]
}

/// `{{emoji smile}}` → the glyph. Unknown names render as the name.
pub fn emoji_plugin() -> Plugin {
    Plugin::from_regex("emoji", Shape::Inline, Shape::Inline, EMOJI.clone(), |call| {
        let Some(caps) = EMOJI.captures(call.text) else {
            return PluginOutcome::Fallthrough;
        };
        let name = caps[1].trim().to_lowercase();
        let glyph = EMOJI_MAP
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, glyph)| glyph.to_string())
            .unwrap_or(name);
        PluginOutcome::Rendered(Rendered::Text(glyph))
    })
}

/// `{{badge success: Shipped}}`
pub fn badge_plugin() -> Plugin {
    Plugin::from_regex("badge", Shape::Inline, Shape::Inline, BADGE.clone(), |call| {
        let Some(caps) = BADGE.captures(call.text) else {
            return PluginOutcome::Fallthrough;
        };
        let requested = caps[1].to_lowercase();
        let kind = if BADGE_TYPES.contains(&requested.as_str()) {
            requested.as_str()
        } else {
            "info"
        };
        PluginOutcome::Rendered(Rendered::Html(format!(
            "<span class=\"badge badge-{}\">{}</span>",
            kind,
            escape_html(caps[2].trim())
        )))
    })
}

/// `{{smiles CCO}}` → a canvas drawn client-side by SmilesDrawer.
pub fn smiles_plugin() -> Plugin {
    Plugin::from_regex("smiles", Shape::Inline, Shape::Inline, SMILES.clone(), |call| {
        let Some(caps) = SMILES.captures(call.text) else {
            return PluginOutcome::Fallthrough;
        };
        PluginOutcome::Rendered(Rendered::Html(format!(
            "<span class=\"smiles-container\"><canvas id=\"smiles-{}\" data-smiles=\"{}\" \
             width=\"300\" height=\"300\"></canvas></span>",
            call.sequence,
            escape_html(&caps[1])
        )))
    })
}

/// `{{reaction A>B>C | key: value, ...}}` → an SVG reaction scheme.
///
/// Options after `|` become a JSON object in `data-smiles-options`;
/// `true`/`false` and numbers are typed, anything else stays a string.
pub fn reaction_plugin() -> Plugin {
    Plugin::from_regex("reaction", Shape::Inline, Shape::Inline, REACTION.clone(), |call| {
        let Some(caps) = REACTION.captures(call.text) else {
            return PluginOutcome::Fallthrough;
        };
        let options = caps
            .get(2)
            .map(|m| reaction_options(m.as_str()))
            .unwrap_or_default();
        let options_attr = if options.is_empty() {
            String::new()
        } else {
            let json = serde_json::Value::Object(options).to_string();
            format!(" data-smiles-options=\"{}\"", escape_html(&json))
        };
        PluginOutcome::Rendered(Rendered::Html(format!(
            "<span class=\"reaction-container\"><svg id=\"reaction-{}\" data-smiles=\"{}\"{}>\
             </svg></span>",
            call.sequence,
            escape_html(caps[1].trim()),
            options_attr
        )))
    })
}

fn reaction_options(text: &str) -> serde_json::Map<String, serde_json::Value> {
    use serde_json::Value;

    let mut options = serde_json::Map::new();
    for pair in text.split(',') {
        let Some((key, value)) = pair.split_once(':') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            continue;
        }
        let value = match value {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => {
                if let Ok(int) = value.parse::<i64>() {
                    Value::from(int)
                } else if let Some(number) = value
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                {
                    Value::Number(number)
                } else {
                    Value::String(strip_quotes(value).to_string())
                }
            }
        };
        options.insert(key.to_string(), value);
    }
    options
}

/// Drops one leading and one trailing quote character, if present.
fn strip_quotes(value: &str) -> &str {
    let value = value.strip_prefix(['"', '\'']).unwrap_or(value);
    value.strip_suffix(['"', '\'']).unwrap_or(value)
}

/// `{{youtube VIDEO_ID}}` → embedded player.
pub fn youtube_plugin() -> Plugin {
    Plugin::from_regex("youtube", Shape::Inline, Shape::Block, YOUTUBE.clone(), |call| {
        let Some(caps) = YOUTUBE.captures(call.text) else {
            return PluginOutcome::Fallthrough;
        };
        PluginOutcome::Rendered(Rendered::Html(format!(
            "<div class=\"youtube-embed\"><iframe width=\"560\" height=\"315\" \
             src=\"https://www.youtube.com/embed/{}\" frameborder=\"0\" \
             allow=\"accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture\" \
             allowfullscreen></iframe></div>",
            &caps[1]
        )))
    })
}

/// `{{markdown https://...}}` → placeholder resolved by the async pass.
pub fn markdown_plugin() -> Plugin {
    Plugin::from_regex(
        "markdown",
        Shape::Inline,
        Shape::Block,
        MARKDOWN.clone(),
        render_markdown_placeholder,
    )
    .with_aliases(&["md"])
    .deferred()
}

fn render_markdown_placeholder(call: &PluginCall<'_>) -> PluginOutcome {
    let Some(caps) = MARKDOWN.captures(call.text) else {
        return PluginOutcome::Fallthrough;
    };
    let url = &caps[1];
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return PluginOutcome::Rendered(Rendered::Html(
            "<div class=\"markdown-embed-error\">Invalid URL protocol: only HTTP(S) allowed</div>"
                .to_string(),
        ));
    }
    let url = escape_html(url);
    PluginOutcome::Rendered(Rendered::Html(format!(
        "<div id=\"md-embed-{seq}\" class=\"async-plugin-placeholder\" data-plugin=\"markdown\" data-markdown-url=\"{url}\">\n\
         <div class=\"markdown-embed-loading\">Loading content from <a href=\"{url}\" target=\"_blank\" rel=\"noopener\">{url}</a>...</div>\n\
         </div>",
        seq = call.sequence,
        url = url
    )))
}

/// Multi-line `{{diagram mermaid ...}}`. Other diagram kinds fall through.
pub fn diagram_plugin() -> Plugin {
    Plugin::from_regex("diagram", Shape::Block, Shape::Block, DIAGRAM.clone(), |call| {
        let Some(caps) = DIAGRAM.captures(call.text) else {
            return PluginOutcome::Fallthrough;
        };
        if !caps[1].eq_ignore_ascii_case("mermaid") {
            return PluginOutcome::Fallthrough;
        }
        PluginOutcome::Rendered(Rendered::Html(format!(
            "<div class=\"mermaid\">{}</div>",
            escape_html(caps[2].trim())
        )))
    })
}

/// Multi-line `{{yaml ...}}`: data embedded as JSON for client scripts.
pub fn yaml_plugin() -> Plugin {
    Plugin::from_regex("yaml", Shape::Block, Shape::Block, YAML.clone(), |call| {
        let Some(caps) = YAML.captures(call.text) else {
            return PluginOutcome::Fallthrough;
        };
        let html = match serde_yaml::from_str::<serde_json::Value>(&caps[1]) {
            Ok(value) => match serde_json::to_string(&value) {
                Ok(json) => format!(
                    "<div class=\"yaml-data\" id=\"yaml-data-{}\" style=\"display:none\">\
                     <script type=\"application/json\">{}</script></div>",
                    call.sequence,
                    json.replace('<', "\\u003c")
                ),
                Err(err) => yaml_error(&err.to_string()),
            },
            Err(err) => yaml_error(&err.to_string()),
        };
        PluginOutcome::Rendered(Rendered::Html(html))
    })
    .with_aliases(&["yml"])
}

fn yaml_error(message: &str) -> String {
    format!(
        "<div class=\"yaml-error\">Invalid YAML: {}</div>",
        escape_html(message)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(text: &str) -> PluginCall<'_> {
        PluginCall { text, sequence: 7 }
    }

    fn html(outcome: PluginOutcome) -> String {
        match outcome {
            PluginOutcome::Rendered(Rendered::Html(html)) => html,
            other => panic!("expected html, got {:?}", other),
        }
    }

    #[test]
    fn test_emoji_known_and_unknown() {
        let plugin = emoji_plugin();
        assert_eq!(
            plugin.apply(&call("{{emoji rocket}}")),
            PluginOutcome::Rendered(Rendered::Text("🚀".to_string()))
        );
        assert_eq!(
            plugin.apply(&call("{{emoji unicorn}}")),
            PluginOutcome::Rendered(Rendered::Text("unicorn".to_string()))
        );
    }

    #[test]
    fn test_badge_defaults_unknown_type_to_info() {
        let plugin = badge_plugin();
        assert_eq!(
            html(plugin.apply(&call("{{badge success: Done}}"))),
            "<span class=\"badge badge-success\">Done</span>"
        );
        assert_eq!(
            html(plugin.apply(&call("{{badge weird: <b>}}"))),
            "<span class=\"badge badge-info\">&lt;b&gt;</span>"
        );
    }

    #[test]
    fn test_smiles_canvas_uses_sequence_id() {
        let plugin = smiles_plugin();
        assert_eq!(
            html(plugin.apply(&call("{{smiles C1=CC=CC=C1[N+]}}"))),
            "<span class=\"smiles-container\"><canvas id=\"smiles-7\" \
             data-smiles=\"C1=CC=CC=C1[N+]\" width=\"300\" height=\"300\"></canvas></span>"
        );
        assert_eq!(
            plugin.apply(&call("{{smiles not smiles!}}")),
            PluginOutcome::Fallthrough
        );
    }

    #[test]
    fn test_reaction_with_typed_options() {
        let plugin = reaction_plugin();
        let out = html(plugin.apply(&call(
            "{{reaction C=CCBr>CC(=O)C>C=CCI | textBelowArrow: 90%, scale: 1.5, \
             compact: true, theme: 'oldschool', broken}}",
        )));
        assert!(out.starts_with(
            "<span class=\"reaction-container\"><svg id=\"reaction-7\" \
             data-smiles=\"C=CCBr&gt;CC(=O)C&gt;C=CCI\" data-smiles-options=\""
        ));
        for field in [
            "&quot;textBelowArrow&quot;:&quot;90%&quot;",
            "&quot;scale&quot;:1.5",
            "&quot;compact&quot;:true",
            "&quot;theme&quot;:&quot;oldschool&quot;",
        ] {
            assert!(out.contains(field), "missing {field} in {out}");
        }
        assert!(!out.contains("broken"));

        let plain = html(plugin.apply(&call("{{reaction A>B>C}}")));
        assert!(plain.contains("data-smiles=\"A&gt;B&gt;C\""));
        assert!(!plain.contains("data-smiles-options"));
    }

    #[test]
    fn test_youtube_embed_url() {
        let out = html(youtube_plugin().apply(&call("{{youtube dQw4w9WgXcQ}}")));
        assert!(out.contains("src=\"https://www.youtube.com/embed/dQw4w9WgXcQ\""));
    }

    #[test]
    fn test_markdown_placeholder_uses_sequence_id() {
        let out = html(markdown_plugin().apply(&call("{{md https://example.com/a.md}}")));
        assert!(out.starts_with("<div id=\"md-embed-7\" class=\"async-plugin-placeholder\""));
        assert!(out.contains("data-markdown-url=\"https://example.com/a.md\""));

        let rejected = html(markdown_plugin().apply(&call("{{markdown ftp://example.com/a.md}}")));
        assert!(rejected.contains("markdown-embed-error"));
    }

    #[test]
    fn test_diagram_only_handles_mermaid() {
        let plugin = diagram_plugin();
        let out = html(plugin.apply(&call("{{diagram mermaid\ngraph TD\nA --> B\n}}")));
        assert_eq!(out, "<div class=\"mermaid\">graph TD\nA --&gt; B</div>");
        assert_eq!(
            plugin.apply(&call("{{diagram plantuml\nA -> B\n}}")),
            PluginOutcome::Fallthrough
        );
    }

    #[test]
    fn test_yaml_embeds_json() {
        let out = html(yaml_plugin().apply(&call("{{yaml\ntitle: Hello\ntags: [a, b]\n}}")));
        assert!(out.contains("id=\"yaml-data-7\""));
        assert!(out.contains(r#"{"tags":["a","b"],"title":"Hello"}"#) || out.contains(r#"{"title":"Hello","tags":["a","b"]}"#));

        let broken = html(yaml_plugin().apply(&call("{{yaml\nkey: [unclosed\n}}")));
        assert!(broken.starts_with("<div class=\"yaml-error\">Invalid YAML:"));
    }
}
