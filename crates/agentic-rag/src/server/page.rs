//! Server-rendered chat page

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};

use super::session::{ChatSession, Flash};
use crate::types::FileType;

const TITLE: &str = "Agentic RAG Chatbot with MCP";

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 860px; margin: 2rem auto; padding: 0 1rem; color: #222; }
h1 { font-size: 1.8rem; }
form { margin: 1rem 0; }
input[type=text] { width: 70%; padding: .4rem; }
button { padding: .4rem .9rem; margin-right: .4rem; }
.flash { padding: .6rem 1rem; border-radius: 4px; margin: 1rem 0; }
.flash.success { background: #e6f4ea; color: #1e4620; }
.flash.warning { background: #fff4e5; color: #663c00; }
.flash.error { background: #fdecea; color: #611a15; }
.current { color: #555; font-size: .9rem; }
.turn { border-top: 1px solid #ddd; padding: .6rem 0; }
.sources { font-size: .85rem; color: #555; }
.sources pre { white-space: pre-wrap; background: #f6f6f6; padding: .4rem; }
"#;

/// Render the full page for a session
pub fn render_page(session: &ChatSession, flash: Option<&Flash>) -> String {
    let mut out = String::with_capacity(4096);

    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!("<title>{}</title>\n<style>{}</style>\n", TITLE, STYLE));
    out.push_str("</head>\n<body>\n");
    out.push_str(&format!("<h1>{}</h1>\n", TITLE));

    if let Some(flash) = flash {
        out.push_str(&format!(
            "<div class=\"flash {}\">{}</div>\n",
            flash.level.as_str(),
            escape_html(&flash.message)
        ));
    }

    out.push_str(&format!(
        "<form action=\"/upload\" method=\"post\" enctype=\"multipart/form-data\">\n\
         <label>Upload a document: <input type=\"file\" name=\"file\" accept=\"{}\" required></label>\n\
         <button type=\"submit\">Upload</button>\n</form>\n",
        accept_list()
    ));

    if let Some(path) = &session.file_path {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        out.push_str(&format!(
            "<p class=\"current\">Current document: {}</p>\n",
            escape_html(&name)
        ));
    }

    out.push_str(
        "<form action=\"/ask\" method=\"post\">\n\
         <input type=\"text\" name=\"query\" placeholder=\"Ask a question:\" autocomplete=\"off\">\n\
         <button type=\"submit\">Ask</button>\n</form>\n\
         <form action=\"/reset\" method=\"post\">\n\
         <button type=\"submit\">Reset Chat</button>\n</form>\n",
    );

    if !session.history.is_empty() {
        out.push_str("<h2>Chat History</h2>\n");
    }
    for (idx, turn) in session.history.iter().rev().enumerate() {
        let n = idx + 1;
        out.push_str("<div class=\"turn\">\n");
        out.push_str(&format!(
            "<p><strong>Q{}:</strong> {}</p>\n",
            n,
            escape_html(&turn.question)
        ));
        out.push_str(&format!(
            "<div><strong>A{}:</strong> {}</div>\n",
            n,
            render_markdown(&turn.answer)
        ));

        if !turn.sources.is_empty() {
            out.push_str(&format!(
                "<details class=\"sources\"><summary>{} sources</summary>\n",
                turn.sources.len()
            ));
            for chunk in &turn.sources {
                let score = chunk
                    .score
                    .map(|s| format!(" (score {:.3})", s))
                    .unwrap_or_default();
                out.push_str(&format!(
                    "<p>{}{}</p><pre>{}</pre>\n",
                    escape_html(&chunk.metadata.format_location()),
                    score,
                    escape_html(&chunk.preview(300))
                ));
            }
            out.push_str("</details>\n");
        }
        out.push_str("</div>\n");
    }

    out.push_str("</body>\n</html>\n");
    out
}

/// `.pdf,.txt,...` for the file input
fn accept_list() -> String {
    FileType::EXTENSIONS
        .iter()
        .map(|ext| format!(".{}", ext))
        .collect::<Vec<_>>()
        .join(",")
}

/// Render Markdown to HTML, escaping any raw HTML in the source and
/// replacing link and image targets outside http, https and mailto with `#`
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    if is_safe_url(&url) {
        url
    } else {
        tracing::debug!("Dropping link target {:?}", url.as_ref());
        CowStr::Borrowed("#")
    }
}

/// Relative URLs and the http, https and mailto schemes
fn is_safe_url(url: &str) -> bool {
    // Browsers ignore whitespace and control characters inside a scheme
    let compact: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    let scheme_end = compact.find(|c| matches!(c, ':' | '/' | '?' | '#'));
    match scheme_end {
        Some(i) if compact[i..].starts_with(':') => {
            matches!(&compact[..i], "http" | "https" | "mailto")
        }
        _ => true,
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatTurn;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>\"x\" & 'y'</b>"), "&lt;b&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/b&gt;");
    }

    #[test]
    fn test_markdown_escapes_raw_html() {
        let html = render_markdown("**bold** <script>alert(1)</script>");
        assert!(html.contains("<strong>bold</strong>"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_markdown_neutralises_script_links() {
        let html = render_markdown("[click](javascript:alert(document.cookie))");
        assert_eq!(html.trim(), "<p><a href=\"#\">click</a></p>");

        let html = render_markdown("[x](JavaScript:alert(1)) ![img](data:text/html;base64,AAAA)");
        assert!(!html.to_lowercase().contains("javascript"));
        assert!(!html.contains("data:"));
        assert!(html.contains("src=\"#\""));
    }

    #[test]
    fn test_markdown_keeps_web_and_relative_links() {
        let html = render_markdown(
            "[docs](https://example.com/a?b=1) [mail](mailto:team@example.com) [page](/api/info) [anchor](#top)",
        );
        assert!(html.contains("href=\"https://example.com/a?b=1\""));
        assert!(html.contains("href=\"mailto:team@example.com\""));
        assert!(html.contains("href=\"/api/info\""));
        assert!(html.contains("href=\"#top\""));
    }

    #[test]
    fn test_history_newest_first() {
        let session = ChatSession {
            history: vec![
                ChatTurn::new("first?".to_string(), "one".to_string(), vec![]),
                ChatTurn::new("second?".to_string(), "two".to_string(), vec![]),
            ],
            ..ChatSession::default()
        };

        let page = render_page(&session, Some(&Flash::success("Document uploaded and ready!")));

        let q1 = page.find("<strong>Q1:</strong> second?").unwrap();
        let q2 = page.find("<strong>Q2:</strong> first?").unwrap();
        assert!(q1 < q2);
        assert!(page.contains("flash success"));
        assert!(page.contains(TITLE));
        assert!(page.contains("accept=\".pdf,"));
    }
}
