//! Pulls readable body text out of a news article page.

use super::BROWSER_USER_AGENT;
use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;

/// Paragraphs shorter than this are usually bylines, captions or buttons.
const MIN_PARAGRAPH_CHARS: usize = 40;

static PARAGRAPH_RE: OnceCell<Regex> = OnceCell::new();
static SCRIPT_RE: OnceCell<Regex> = OnceCell::new();
static TAG_RE: OnceCell<Regex> = OnceCell::new();
static SPACE_RE: OnceCell<Regex> = OnceCell::new();

fn cached_regex(cell: &'static OnceCell<Regex>, pattern: &str) -> Result<&'static Regex> {
    cell.get_or_try_init(|| {
        Regex::new(pattern).with_context(|| format!("failed to compile regex {pattern}"))
    })
}

pub async fn fetch_article_text(client: &Client, url: &str) -> Result<String> {
    let resp = client
        .get(url)
        .header("User-Agent", BROWSER_USER_AGENT)
        .timeout(Duration::from_secs(15))
        .send()
        .await
        .with_context(|| format!("article request failed: {url}"))?
        .error_for_status()
        .with_context(|| format!("article HTTP error: {url}"))?;
    let html = resp.text().await.context("article body read failed")?;
    extract_paragraphs(&html)
}

/// Joins the text of every substantial `<p>` element with newlines.
pub fn extract_paragraphs(html: &str) -> Result<String> {
    let scripts = cached_regex(&SCRIPT_RE, r"(?is)<(script|style|noscript)\b.*?</(script|style|noscript)>")?;
    let paragraphs = cached_regex(&PARAGRAPH_RE, r"(?is)<p(?:\s[^>]*)?>(.*?)</p>")?;

    let cleaned = scripts.replace_all(html, " ");
    let mut kept = Vec::new();
    for cap in paragraphs.captures_iter(&cleaned) {
        let Some(m) = cap.get(1) else { continue };
        let text = html_to_text(m.as_str())?;
        if text.chars().count() >= MIN_PARAGRAPH_CHARS {
            kept.push(text);
        }
    }
    Ok(kept.join("\n"))
}

pub fn html_to_text(fragment: &str) -> Result<String> {
    let tags = cached_regex(&TAG_RE, r"(?s)<[^>]*>")?;
    let spaces = cached_regex(&SPACE_RE, r"\s+")?;
    let stripped = tags.replace_all(fragment, " ");
    let decoded = decode_entities(&stripped);
    Ok(spaces.replace_all(decoded.trim(), " ").into_owned())
}

fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = tail.find(';').filter(|&i| i <= 12) else {
            out.push('&');
            rest = &tail[1..];
            continue;
        };
        let entity = &tail[1..semi];
        match decode_entity(entity) {
            Some(ch) => {
                out.push(ch);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        "rsquo" | "lsquo" => Some('\''),
        "rdquo" | "ldquo" => Some('"'),
        "mdash" | "ndash" => Some('-'),
        "hellip" => Some('…'),
        _ => {
            let num = entity.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_long_paragraphs_only() {
        let html = r#"
            <html><head><script>var p = "<p>not this one, it's inside a script tag</p>";</script></head>
            <body>
              <p class="byline">By Staff</p>
              <p>The city council voted on Tuesday to <a href="/x">expand</a> the bus network.</p>
              <P>Officials said the first new routes would open next spring &amp; summer.</P>
            </body></html>"#;

        assert_eq!(
            extract_paragraphs(html).unwrap(),
            "The city council voted on Tuesday to expand the bus network.\n\
             Officials said the first new routes would open next spring & summer."
        );
    }

    #[test]
    fn decodes_common_entities() {
        assert_eq!(
            html_to_text("Tom&rsquo;s &quot;big&quot; day&#33; &#x263A;").unwrap(),
            "Tom's \"big\" day! ☺"
        );
        assert_eq!(html_to_text("AT&T &unknown; & more").unwrap(), "AT&T &unknown; & more");
    }
}
