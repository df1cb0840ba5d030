//! The transcript page.

use std::fmt::Write as _;

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::conversation::HISTORY_FIELD_PREFIX;

const TITLE: &str = "Civicscape Chatbot (Beta)";

const STYLE: &str = r#"
    html, body { background-color: #fff; }
    body {
        font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Helvetica, Arial, sans-serif;
        margin: 0;
    }
    .content-wrapper { padding: 2rem; }
    h1 { text-align: center; color: #1c1e21; margin-top: 0; }
    textarea, input[type="text"] {
        width: 100%;
        padding: 10px;
        background-color: #f0f2f5;
        margin-bottom: 10px;
        border: 1px solid #ddd;
        border-radius: 6px;
        box-sizing: border-box;
        resize: none;
        overflow-y: hidden;
        font-size: 1rem;
    }
    button {
        background-color: #007bff;
        color: white;
        border: none;
        padding: 10px 15px;
        border-radius: 6px;
        cursor: pointer;
        font-size: 1rem;
        margin-top: 5px;
    }
    button:hover { background-color: #0056b3; }
    hr { border: none; border-top: 1px solid #eee; margin: 2rem 0; }
    a { text-decoration: none; }
    .edit-controls { display: flex; align-items: center; gap: 15px; }
    .notice { font-size: 0.85rem; color: #666; margin: 0; }
    .flash {
        padding: 10px 15px;
        margin-bottom: 1rem;
        border-radius: 6px;
        background-color: #fdecea;
        color: #8a1c12;
        border: 1px solid #f5c2bd;
    }
"#;

const SCRIPT: &str = r"
    function autoResize(textarea) {
        textarea.style.height = 'auto';
        textarea.style.height = textarea.scrollHeight + 'px';
    }
    document.addEventListener('DOMContentLoaded', () => {
        document.querySelectorAll('textarea').forEach((t) => {
            autoResize(t);
            t.addEventListener('input', () => autoResize(t));
        });
    });
";

/// Render the chat page for a transcript.
///
/// Each entry becomes a `history_<index>` textarea in the edit form; the
/// save button only appears when there is something to edit. `flash` is shown
/// above the forms when present.
#[must_use]
pub fn render_chat_page(history: &[String], flash: Option<&str>) -> String {
    let mut entries = String::new();
    for (i, entry) in history.iter().enumerate() {
        // Browsers drop one newline right after <textarea>; the leading
        // newline keeps entries that start with one intact.
        let _ = writeln!(
            entries,
            r#"        <textarea name="{HISTORY_FIELD_PREFIX}{i}" rows="2">
{}</textarea>"#,
            encode_text(entry)
        );
    }

    let save_controls = if history.is_empty() {
        ""
    } else {
        r#"        <div class="edit-controls">
            <button type="submit">Save Edits</button>
            <p class="notice">Click text to edit chat history</p>
        </div>
"#
    };

    let flash = flash.map_or_else(String::new, |message| {
        format!(
            r#"    <div class="flash" role="alert">{}</div>
"#,
            encode_text(message)
        )
    });

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <style>{STYLE}</style>
</head>
<body>
<div class="content-wrapper">
    <h1>{title}</h1>
    <p class="notice">NOTE: Responses can take up to a minute while agent is thinking. This ensures better quality output.</p>
{flash}    <form method="post" action="/update">
{entries}{save_controls}    </form>
    <hr>
    <form method="post" action="/">
        <input type="text" name="user_input" autofocus placeholder="{placeholder}">
        <button type="submit">Run New Prompt</button>
        <a href="/download"><button type="button">Download History</button></a>
    </form>
</div>
<script>{SCRIPT}</script>
</body>
</html>"#,
        title = encode_text(TITLE),
        placeholder =
            encode_double_quoted_attribute("Create an activity or type 'help' for guidance"),
    )
}
