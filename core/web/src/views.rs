//! HTML pages served by the front end.

use chrono::DateTime;
use url::form_urlencoded;

use boxbridge_dropbox::ListingEntry;

/// Landing page with controls for each operation.
pub const INDEX_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Boxbridge</title>
</head>
<body>
<h1>Boxbridge</h1>
<p id="status">Not authorized yet.</p>
<button id="authorize">Authorize with Dropbox</button>
<button id="upload">Upload demo file</button>
<button id="create-folder">Create folder</button>
<a href="/list?path=/">List root folder</a>
<pre id="output"></pre>
<script>
const output = document.getElementById('output');
const show = (value) => { output.textContent = JSON.stringify(value, null, 2); };

document.getElementById('authorize').onclick = async () => {
  const res = await fetch('/api/auth/start', { credentials: 'same-origin' });
  const body = await res.json();
  window.open(body.authorize_url, '_blank');
};

window.addEventListener('message', (event) => {
  if (event.origin === window.location.origin && event.data && event.data.type === 'dropbox-auth') {
    document.getElementById('status').textContent = 'Authorized.';
  }
});

const post = async (url, body) => {
  const res = await fetch(url, {
    method: 'POST',
    credentials: 'same-origin',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify(body),
  });
  show(await res.json());
};

document.getElementById('upload').onclick = () => post('/api/upload', {});
document.getElementById('create-folder').onclick = () => post('/api/create-folder', {});

if (new URLSearchParams(window.location.search).get('auth') === 'ok') {
  document.getElementById('status').textContent = 'Authorized.';
}
</script>
</body>
</html>
"#;

/// Served after a successful callback. Notifies the opener window when the
/// flow ran in a popup, otherwise redirects home.
pub const AUTH_COMPLETE_PAGE: &str = r#"<!doctype html><meta charset="utf-8"><title>Authorized</title>
<script>
(function () {
  try {
    if (window.opener && !window.opener.closed) {
      window.opener.postMessage({type:'dropbox-auth', status:'ok'}, window.location.origin);
      window.close();
      return;
    }
  } catch (e) {}
  window.location = '/?auth=ok';
})();
</script>
<p>Authorization complete. You can close this tab.</p>
"#;

/// Escape text for inclusion in HTML content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render a folder listing as an HTML table.
pub fn listing_page(path: &str, recursive: bool, entries: &[ListingEntry]) -> String {
    let path = escape_html(path);
    let mut html = String::new();

    html.push_str("<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>Listing {}</title>\n</head>\n<body>\n", path));
    html.push_str(&format!("<h1>Listing {}</h1>\n", path));
    html.push_str(&format!(
        "<p>Recursive: {} &middot; {} entries &middot; <a href=\"/\">Home</a></p>\n",
        recursive,
        entries.len()
    ));

    if entries.is_empty() {
        html.push_str("<p>This folder is empty.</p>\n");
    } else {
        html.push_str(
            "<table>\n<thead><tr><th>Type</th><th>Name</th><th>Path</th>\
             <th>Size</th><th>Modified</th><th>Revision</th></tr></thead>\n<tbody>\n",
        );
        for entry in entries {
            let name = escape_html(entry.name.as_deref().unwrap_or(""));
            let display = escape_html(entry.path_display.as_deref().unwrap_or(""));
            let name_cell = if entry.is_folder() {
                format!(
                    "<a href=\"{}\">{}</a>",
                    escape_html(&folder_href(entry.path_display.as_deref().unwrap_or(""))),
                    name
                )
            } else {
                name
            };

            let (size, modified, rev) = match &entry.file {
                Some(file) => (
                    file.size.map(|s| s.to_string()).unwrap_or_default(),
                    file.server_modified
                        .as_deref()
                        .map(display_timestamp)
                        .unwrap_or_default(),
                    escape_html(file.rev.as_deref().unwrap_or("")),
                ),
                None => (String::new(), String::new(), String::new()),
            };

            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                entry.tag.as_str(),
                name_cell,
                display,
                size,
                modified,
                rev
            ));
        }
        html.push_str("</tbody>\n</table>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

/// Link to the listing of a folder.
fn folder_href(path: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(path.as_bytes()).collect();
    format!("/list?path={}", encoded)
}

/// Provider timestamp as shown in the table; anything unparsable is shown as sent.
fn display_timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(time) => time.format("%Y-%m-%d %H:%M:%S %:z").to_string(),
        Err(_) => escape_html(raw),
    }
}
