//! Extracts and canonicalizes URLs from free-text queries so the engine
//! can attempt the URL fast path before falling back to hybrid search.

use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UrlDetection {
    pub has_url: bool,
    pub urls: Vec<String>,
}

pub struct UrlDetector;

impl UrlDetector {
    pub fn detect(text: &str) -> UrlDetection {
        let mut urls = Vec::new();
        for token in text.split_whitespace() {
            let candidate = token.trim_matches(|c: char| matches!(c, '.' | ',' | ')' | ']' | '>' | '"' | '\''));
            if !(candidate.starts_with("http://") || candidate.starts_with("https://")) {
                continue;
            }
            let normalized = match Url::parse(candidate) {
                Ok(parsed) => Self::canonicalize(&parsed),
                Err(_) => continue,
            };
            if !urls.contains(&normalized) {
                urls.push(normalized);
            }
        }
        UrlDetection {
            has_url: !urls.is_empty(),
            urls,
        }
    }

    fn canonicalize(parsed: &Url) -> String {
        let mut s = parsed.to_string();
        if s.ends_with('/') && parsed.path() == "/" {
            s.pop();
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_a_single_url() {
        let d = UrlDetector::detect("see https://example.com/doc for details");
        assert!(d.has_url);
        assert_eq!(d.urls, vec!["https://example.com/doc".to_string()]);
    }

    #[test]
    fn dedupes_repeated_urls() {
        let d = UrlDetector::detect("https://example.com/doc and https://example.com/doc again");
        assert_eq!(d.urls.len(), 1);
    }

    #[test]
    fn strips_trailing_punctuation() {
        let d = UrlDetector::detect("check (https://example.com/doc).");
        assert_eq!(d.urls, vec!["https://example.com/doc".to_string()]);
    }

    #[test]
    fn no_urls_yields_empty() {
        let d = UrlDetector::detect("what is the deployment process");
        assert!(!d.has_url);
        assert!(d.urls.is_empty());
    }
}
