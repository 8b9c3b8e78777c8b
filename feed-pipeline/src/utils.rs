/// Text processing utilities
pub mod text {
    /// Remove tags from an HTML fragment and decode the common entities.
    pub fn strip_html(html: &str) -> String {
        let mut out = String::with_capacity(html.len());
        let mut tag = String::new();
        let mut in_tag = false;
        for c in html.chars() {
            match c {
                '<' if !in_tag => {
                    in_tag = true;
                    tag.clear();
                }
                '>' if in_tag => {
                    in_tag = false;
                    if is_block_tag(&tag) {
                        out.push(' ');
                    }
                }
                _ if in_tag => tag.push(c),
                _ => out.push(c),
            }
        }
        collapse_whitespace(&decode_entities(&out))
    }

    // Block-level tags separate words; inline ones do not.
    fn is_block_tag(tag: &str) -> bool {
        let name: String = tag
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        matches!(
            name.as_str(),
            "p" | "br" | "div" | "li" | "ul" | "ol" | "tr" | "td" | "blockquote" | "pre"
                | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
        )
    }

    pub fn decode_entities(text: &str) -> String {
        text.replace("&nbsp;", " ")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&#x27;", "'")
            .replace("&#x2F;", "/")
            .replace("&amp;", "&")
    }

    pub fn collapse_whitespace(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Truncate to at most `max_chars` characters, preferring a sentence or word boundary.
    pub fn smart_truncate(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }

        let truncated: String = text.chars().take(max_chars).collect();
        if let Some(last_sentence) = truncated.rfind(". ") {
            truncated[..last_sentence + 1].to_string()
        } else if let Some(last_space) = truncated.rfind(' ') {
            format!("{}...", &truncated[..last_space])
        } else {
            format!("{}...", truncated)
        }
    }

    /// Extract the first `count` sentences from text
    pub fn extract_sentences(text: &str, count: usize) -> String {
        let mut out = String::new();
        for (taken, sentence) in text.split_inclusive(". ").enumerate() {
            if taken == count {
                break;
            }
            out.push_str(sentence);
        }
        out.trim().to_string()
    }

}

/// URL utilities
pub mod url {
    use url::Url;

    /// Extract the host of a URL, lowercased.
    pub fn extract_domain(url_str: &str) -> Option<String> {
        Url::parse(url_str)
            .ok()
            .and_then(|url| url.host_str().map(|h| h.to_ascii_lowercase()))
    }

    /// True when `url_str` is on `domain` or one of its subdomains.
    pub fn is_on_domain(url_str: &str, domain: &str) -> bool {
        match extract_domain(url_str) {
            Some(host) => host == domain || host.ends_with(&format!(".{}", domain)),
            None => false,
        }
    }

    /// Value of the first query parameter called `name`.
    pub fn query_param(url_str: &str, name: &str) -> Option<String> {
        let url = Url::parse(url_str).ok()?;
        let value = url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned());
        value
    }
}
