// SPDX-License-Identifier: GPL-3.0-only

//! Static index page

/// Page showing the live stream next to the latest still
pub fn index_html(title: &str) -> String {
    let title = escape_html(title);
    format!(
        "<!DOCTYPE html>
<html>
\t<head>
\t\t<meta charset=\"utf-8\" />
\t\t<title>{title}</title>
\t</head>
\t<body>
\t\t<h1>{title}</h1>
\t\t<img src=\"stream.mjpg\" />
\t\t<img src=\"still.jpg\" />
\t</body>
</html>
"
    )
}

fn escape_html(text: &str) -> String {
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
