//! Source deduplication keyed by canonical URL.

use std::collections::HashMap;
use url::Url;

use super::SearchResult;

/// Canonical identity of a URL.
///
/// Drops the fragment and `utm_*` tracking parameters, normalizes scheme and
/// host case, and strips a trailing slash from non-root paths. Strings that do
/// not parse as URLs are only trimmed.
pub fn canonical_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut url) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };

    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !key.starts_with("utm_"))
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    url.to_string()
}

/// Merge results so each canonical URL appears once.
///
/// A URL keeps the position of its first occurrence and the payload of its
/// last occurrence.
pub fn dedup_by_url(results: impl IntoIterator<Item = SearchResult>) -> Vec<SearchResult> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<SearchResult> = Vec::new();

    for result in results {
        let key = canonical_url(&result.url);
        match positions.get(&key) {
            Some(&index) => unique[index] = result,
            None => {
                positions.insert(key, unique.len());
                unique.push(result);
            }
        }
    }

    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn result(title: &str, url: &str) -> SearchResult {
        SearchResult {
            title: title.to_string(),
            url: url.to_string(),
            content: format!("content of {}", title),
            raw_content: None,
            score: None,
        }
    }

    #[test]
    fn test_canonical_url_normalizes() {
        assert_eq!(
            canonical_url("HTTPS://Example.COM/docs/?utm_source=x#intro"),
            "https://example.com/docs"
        );
        assert_eq!(
            canonical_url("https://example.com/a?id=3&utm_medium=mail"),
            "https://example.com/a?id=3"
        );
        assert_eq!(canonical_url("https://example.com"), "https://example.com/");
        assert_eq!(canonical_url("  not a url  "), "not a url");
    }

    #[test]
    fn test_dedup_first_position_last_value() {
        let merged = dedup_by_url(vec![
            result("a1", "https://a.example/x"),
            result("b", "https://b.example/"),
            result("a2", "https://a.example/x/#frag"),
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].title, "a2");
        assert_eq!(merged[1].title, "b");
    }

    proptest! {
        #[test]
        fn dedup_keeps_exactly_one_per_key(
            picks in proptest::collection::vec((0usize..6, 0usize..3), 0..40)
        ) {
            let urls = [
                "https://a.example/x",
                "https://a.example/x/",
                "https://b.example/y#top",
                "https://b.example/y",
                "https://c.example/?utm_source=feed",
                "https://d.example/z?q=1",
            ];
            let input: Vec<SearchResult> = picks
                .iter()
                .map(|(u, t)| result(&format!("t{}", t), urls[*u]))
                .collect();

            let merged = dedup_by_url(input.clone());
            let keys: Vec<String> = merged.iter().map(|r| canonical_url(&r.url)).collect();
            let unique: HashSet<&String> = keys.iter().collect();
            prop_assert_eq!(unique.len(), keys.len());

            let input_keys: HashSet<String> = input.iter().map(|r| canonical_url(&r.url)).collect();
            prop_assert_eq!(input_keys.len(), merged.len());

            // Last write wins
            for merged_result in &merged {
                let key = canonical_url(&merged_result.url);
                let last = input.iter().rev().find(|r| canonical_url(&r.url) == key);
                prop_assert_eq!(last, Some(merged_result));
            }
        }
    }
}
