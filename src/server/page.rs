//! Server-rendered HTML for the single-page form UI.

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

use crate::models::{Answer, MAX_K, MAX_UI_CHUNK_SIZE, MIN_K, MIN_UI_CHUNK_SIZE};
use crate::services::DocumentFormat;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Error,
}

impl Level {
    fn class(self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Info => "info",
            Level::Error => "error",
        }
    }
}

/// A banner shown above the main panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            text: text.into(),
        }
    }
}

const STYLE: &str = r#"
body { font-family: sans-serif; margin: 0; display: flex; min-height: 100vh; }
aside { width: 300px; background: #f0f2f6; padding: 1.5rem; box-sizing: border-box; }
main { flex: 1; padding: 2rem 3rem; max-width: 960px; }
label { display: block; margin-top: 1rem; font-size: 0.9rem; }
input[type=text], input[type=password], input[type=number], textarea { width: 100%; box-sizing: border-box; padding: 0.4rem; }
textarea { font-family: monospace; }
button { margin-top: 0.8rem; }
.notice { padding: 0.6rem 1rem; margin: 0.5rem 0; border-radius: 4px; }
.success { background: #dff5e3; } .info { background: #e3ecfa; } .error { background: #fde2e2; }
.doc { font-size: 0.9rem; color: #333; }
"#;

fn accept_list() -> String {
    DocumentFormat::EXTENSIONS
        .iter()
        .map(|e| format!(".{e}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn render_sidebar(session: &Session) -> String {
    let disabled = if session.has_valid_key() { "" } else { " disabled" };
    let key_status = if session.has_valid_key() {
        r#"<p class="doc">API key checked.</p>"#
    } else {
        ""
    };
    let document = match &session.document {
        Some(report) => format!(
            r#"<p class="doc">Indexed: {}<br>{}<br>{}</p>"#,
            text(&report.filename),
            text(&report.chunk_summary()),
            text(&report.cost.summary())
        ),
        None => String::new(),
    };

    format!(
        r#"<aside>
<form method="post" action="/key">
<label for="api_key">OPENAI_API_KEY:</label>
<input type="password" id="api_key" name="api_key" autocomplete="off">
<button type="submit">Check key</button>
</form>
{key_status}
<form method="post" action="/upload" enctype="multipart/form-data">
<label for="file">Upload a file</label>
<input type="file" id="file" name="file" accept="{accept}"{disabled}>
<label for="chunk_size">Chunk Size:</label>
<input type="number" id="chunk_size" name="chunk_size" min="{min_chunk}" max="{max_chunk}" value="{chunk_size}"{disabled}>
<label for="k">k</label>
<input type="number" id="k" name="k" min="{min_k}" max="{max_k}" value="{k}"{disabled}>
<button type="submit"{disabled}>Add data</button>
</form>
{document}
<form method="post" action="/reset">
<button type="submit">Reset</button>
</form>
</aside>"#,
        accept = attr(&accept_list()),
        min_chunk = MIN_UI_CHUNK_SIZE,
        max_chunk = MAX_UI_CHUNK_SIZE,
        chunk_size = session.chunk_size,
        min_k = MIN_K,
        max_k = MAX_K,
        k = session.k,
    )
}

fn render_answer(answer: Option<&Answer>) -> String {
    let Some(answer) = answer else {
        return String::new();
    };
    format!(
        r#"<p>k= {}</p>
<label for="answer">LLM Answer: </label>
<textarea id="answer" readonly rows="8">{}</textarea>
<hr>"#,
        answer.k,
        text(&answer.text)
    )
}

/// Render the whole page for `session`.
pub fn render_page(session: &Session, notices: &[Notice], answer: Option<&Answer>) -> String {
    let notices: String = notices
        .iter()
        .map(|n| {
            format!(
                r#"<div class="notice {}">{}</div>"#,
                n.level.class(),
                text(&n.text)
            )
        })
        .collect();

    let question = answer.map(|a| a.question.as_str()).unwrap_or_default();
    let history = if session.history.is_empty() {
        String::new()
    } else {
        format!(
            r#"<label for="history">Chat History</label>
<textarea id="history" readonly rows="16">{}</textarea>
<form method="post" action="/history/clear"><button type="submit">Clear history</button></form>"#,
            text(&session.history.render())
        )
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>LLM Question-Answering Application</title>
<style>{STYLE}</style>
</head>
<body>
{sidebar}
<main>
<h2>LLM Question-Answering Application</h2>
{notices}
<form method="post" action="/ask">
<label for="question">Ask a question about the context of your file:</label>
<input type="text" id="question" name="question" value="{question}">
<label for="ask_k">k</label>
<input type="number" id="ask_k" name="k" min="{min_k}" max="{max_k}" value="{k}">
<button type="submit">Ask</button>
</form>
{answer}
{history}
</main>
</body>
</html>"#,
        sidebar = render_sidebar(session),
        question = attr(question),
        min_k = MIN_K,
        max_k = MAX_K,
        k = session.k,
        answer = render_answer(answer),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn session() -> Session {
        Session::new(Uuid::new_v4(), 512, 3)
    }

    #[test]
    fn test_upload_controls_disabled_without_key() {
        let html = render_page(&session(), &[], None);
        assert!(html.contains(r#"<button type="submit" disabled>Add data</button>"#));
        assert!(html.contains(r#"accept=".pdf,.docx,.txt""#));
        assert!(html.contains(r#"value="512""#));
    }

    #[test]
    fn test_upload_enabled_with_key() {
        let mut session = session();
        session.api_key = Some("sk".to_string());
        let html = render_page(&session, &[], None);
        assert!(html.contains(r#"<button type="submit">Add data</button>"#));
    }

    #[test]
    fn test_user_text_is_escaped() {
        let mut session = session();
        session.history.push("<script>", "a & b");
        let notices = [Notice::error("bad <input>")];
        let html = render_page(&session, &notices, None);

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("a &amp; b"));
        assert!(html.contains(r#"<div class="notice error">bad &lt;input&gt;</div>"#));
    }

    #[test]
    fn test_answer_section() {
        let answer = Answer {
            question: "why \"this\"?".to_string(),
            text: "because".to_string(),
            k: 4,
            sources: Vec::new(),
        };
        let html = render_page(&session(), &[], Some(&answer));
        assert!(html.contains("k= 4"));
        assert!(html.contains(">because</textarea>"));
        assert!(html.contains("why &quot;this&quot;?"));
    }

    #[test]
    fn test_ask_form_has_editable_k() {
        let mut session = session();
        session.k = 7;
        let html = render_page(&session, &[], None);

        let ask_form = html
            .split(r#"<form method="post" action="/ask">"#)
            .nth(1)
            .and_then(|rest| rest.split("</form>").next())
            .unwrap();
        assert!(ask_form.contains(
            r#"<input type="number" id="ask_k" name="k" min="1" max="20" value="7">"#
        ));
        assert!(!ask_form.contains(r#"type="hidden""#));
    }

    #[test]
    fn test_no_history_section_when_empty() {
        let html = render_page(&session(), &[], None);
        assert!(!html.contains("Chat History"));
    }
}
