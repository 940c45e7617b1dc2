//! Filtering, pagination, and statistics over an enriched dataset.
//!
//! The hosted search page narrows results by free text and a single
//! character facet and pages through them; [`QueryFilter`] and [`paginate`]
//! reproduce that shape locally, together with the sentiment, emotion, score
//! and tag filters that only make sense once a dataset is enriched.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::models::Quote;

/// Default page size of the search page.
pub const DEFAULT_HITS_PER_PAGE: usize = 4;

/// Conjunctive filter over quotes. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
    /// Case-insensitive substring of the quote text.
    pub text: Option<String>,
    /// Exact character name (the search page's facet).
    pub character: Option<String>,
    pub sentiment: Option<String>,
    pub emotion: Option<String>,
    pub min_score: Option<i64>,
    pub max_score: Option<i64>,
    /// Matches when any quote tag contains any of these (case-insensitive).
    pub tags: Vec<String>,
}

impl QueryFilter {
    pub fn matches(&self, quote: &Quote) -> bool {
        if let Some(text) = &self.text {
            if !quote.quote.to_lowercase().contains(&text.to_lowercase()) {
                return false;
            }
        }
        if let Some(character) = &self.character {
            if &quote.character != character {
                return false;
            }
        }
        if let Some(sentiment) = &self.sentiment {
            if quote.sentiment_label.as_ref() != Some(sentiment) {
                return false;
            }
        }
        if let Some(emotion) = &self.emotion {
            if quote.emotion.as_ref() != Some(emotion) {
                return false;
            }
        }
        if self.min_score.is_some() || self.max_score.is_some() {
            let Some(score) = quote.sentiment_score else {
                return false;
            };
            if self.min_score.is_some_and(|min| score < min) {
                return false;
            }
            if self.max_score.is_some_and(|max| score > max) {
                return false;
            }
        }
        if !self.tags.is_empty() && !has_any_tag(quote, &self.tags) {
            return false;
        }
        true
    }

    pub fn apply<'a>(&self, quotes: &'a [Quote]) -> Vec<&'a Quote> {
        quotes.iter().filter(|q| self.matches(q)).collect()
    }
}

pub fn filter_by_sentiment<'a>(quotes: &'a [Quote], label: &str) -> Vec<&'a Quote> {
    QueryFilter {
        sentiment: Some(label.to_string()),
        ..Default::default()
    }
    .apply(quotes)
}

pub fn filter_by_emotion<'a>(quotes: &'a [Quote], emotion: &str) -> Vec<&'a Quote> {
    QueryFilter {
        emotion: Some(emotion.to_string()),
        ..Default::default()
    }
    .apply(quotes)
}

/// Quotes whose score lies in `min..=max`.
pub fn filter_by_score(quotes: &[Quote], min: i64, max: i64) -> Vec<&Quote> {
    QueryFilter {
        min_score: Some(min),
        max_score: Some(max),
        ..Default::default()
    }
    .apply(quotes)
}

pub fn search_by_tags<'a>(quotes: &'a [Quote], needles: &[String]) -> Vec<&'a Quote> {
    quotes.iter().filter(|q| has_any_tag(q, needles)).collect()
}

fn has_any_tag(quote: &Quote, needles: &[String]) -> bool {
    needles.iter().any(|needle| {
        let needle = needle.to_lowercase();
        quote
            .tag_list()
            .iter()
            .any(|tag| tag.to_lowercase().contains(&needle))
    })
}

/// Every distinct tag, sorted.
pub fn all_tags(quotes: &[Quote]) -> Vec<String> {
    quotes
        .iter()
        .flat_map(|q| q.tag_list().iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// One page of hits plus the metadata a result pager needs.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub hits: Vec<T>,
    pub page: usize,
    pub nb_pages: usize,
    pub nb_hits: usize,
    pub hits_per_page: usize,
}

/// Slice `items` into pages of `hits_per_page` and return page `page` (0-based).
///
/// A page past the end yields no hits but still reports the totals.
pub fn paginate<T: Clone>(items: &[T], page: usize, hits_per_page: usize) -> Page<T> {
    let hits_per_page = hits_per_page.max(1);
    let nb_hits = items.len();
    let nb_pages = nb_hits.div_ceil(hits_per_page);
    let hits = items
        .iter()
        .skip(page.saturating_mul(hits_per_page))
        .take(hits_per_page)
        .cloned()
        .collect();
    Page {
        hits,
        page,
        nb_pages,
        nb_hits,
        hits_per_page,
    }
}

/// A label with its count and share of the total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub label: String,
    pub count: usize,
    pub percent: f64,
}

/// Count labels and sort by count (descending), then label.
pub fn distribution<'a, I>(labels: I, total: usize) -> Vec<Bucket>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    let mut buckets: Vec<Bucket> = counts
        .into_iter()
        .map(|(label, count)| Bucket {
            label: label.to_string(),
            count,
            percent: if total > 0 {
                count as f64 * 100.0 / total as f64
            } else {
                0.0
            },
        })
        .collect();
    buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    buckets
}

pub fn sentiment_distribution(quotes: &[Quote]) -> Vec<Bucket> {
    distribution(
        quotes.iter().filter_map(|q| q.sentiment_label.as_deref()),
        quotes.len(),
    )
}

pub fn emotion_distribution(quotes: &[Quote]) -> Vec<Bucket> {
    distribution(quotes.iter().filter_map(|q| q.emotion.as_deref()), quotes.len())
}

/// Average sentiment score over records that have one.
pub fn average_score(quotes: &[Quote]) -> Option<f64> {
    let scores: Vec<i64> = quotes.iter().filter_map(|q| q.sentiment_score).collect();
    if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<i64>() as f64 / scores.len() as f64)
    }
}

/// Aggregate numbers printed after a pipeline run and by `qenrich stats`.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub total: usize,
    pub defaulted: usize,
    pub average_score: Option<f64>,
    pub sentiment: Vec<Bucket>,
    pub emotions: Vec<Bucket>,
    pub unique_tags: usize,
    /// First tags in first-seen order.
    pub sample_tags: Vec<String>,
}

pub fn summarize(quotes: &[Quote]) -> DatasetSummary {
    let mut seen = BTreeSet::new();
    let mut sample_tags = Vec::new();
    for tag in quotes.iter().flat_map(|q| q.tag_list()) {
        if seen.insert(tag.as_str()) && sample_tags.len() < 10 {
            sample_tags.push(tag.clone());
        }
    }
    DatasetSummary {
        total: quotes.len(),
        defaulted: quotes.iter().filter(|q| q.is_defaulted()).count(),
        average_score: average_score(quotes),
        sentiment: sentiment_distribution(quotes),
        emotions: emotion_distribution(quotes),
        unique_tags: seen.len(),
        sample_tags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enriched(text: &str, character: &str, score: i64, label: &str, tags: &[&str]) -> Quote {
        Quote {
            sentiment_score: Some(score),
            sentiment_label: Some(label.to_string()),
            tags: Some(tags.iter().map(|t| t.to_string()).collect()),
            ..Quote::new(text, character, "Show")
        }
        .with_derived_emotion()
    }

    fn dataset() -> Vec<Quote> {
        vec![
            enriched("I will never give up", "Naruto", 9, "positive", &["determination", "hope"]),
            enriched("Everyone dies alone", "Itachi", 2, "negative", &["Death", "loneliness"]),
            enriched("Love is a battlefield", "Naruto", 6, "mixed", &["love", "war"]),
            enriched("The weather is fine", "Shikamaru", 5, "neutral", &["clouds"]),
        ]
    }

    #[test]
    fn filters_by_sentiment_and_emotion() {
        let quotes = dataset();
        assert_eq!(filter_by_sentiment(&quotes, "negative").len(), 1);
        let romantic = filter_by_emotion(&quotes, "Romantic");
        assert_eq!(romantic.len(), 1);
        assert_eq!(romantic[0].quote, "Love is a battlefield");
        assert_eq!(filter_by_emotion(&quotes, "Reflective").len(), 1);
    }

    #[test]
    fn score_range_is_inclusive() {
        let quotes = dataset();
        assert_eq!(filter_by_score(&quotes, 5, 9).len(), 3);
        assert_eq!(filter_by_score(&quotes, 10, 10).len(), 0);
    }

    #[test]
    fn unenriched_quotes_never_match_score_filters() {
        let quotes = vec![Quote::new("raw", "X", "Y")];
        assert!(filter_by_score(&quotes, 1, 10).is_empty());
    }

    #[test]
    fn tag_search_is_case_insensitive_substring() {
        let quotes = dataset();
        let hits = search_by_tags(&quotes, &["deat".to_string()]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].character, "Itachi");
        assert_eq!(search_by_tags(&quotes, &["LOVE".into(), "cloud".into()]).len(), 2);
    }

    #[test]
    fn combined_filter_with_character_facet() {
        let quotes = dataset();
        let filter = QueryFilter {
            character: Some("Naruto".into()),
            text: Some("LOVE".into()),
            ..Default::default()
        };
        let hits = filter.apply(&quotes);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].sentiment_label.as_deref(), Some("mixed"));
    }

    #[test]
    fn all_tags_sorted_unique() {
        let mut quotes = dataset();
        quotes.push(enriched("again", "Naruto", 8, "positive", &["hope"]));
        assert_eq!(
            all_tags(&quotes),
            vec!["Death", "clouds", "determination", "hope", "loneliness", "love", "war"]
        );
    }

    #[test]
    fn pagination_metadata() {
        let items: Vec<u32> = (0..10).collect();
        let page = paginate(&items, 2, 4);
        assert_eq!(page.hits, vec![8, 9]);
        assert_eq!(page.nb_pages, 3);
        assert_eq!(page.nb_hits, 10);

        let past_end = paginate(&items, 5, 4);
        assert!(past_end.hits.is_empty());
        assert_eq!(past_end.nb_pages, 3);

        let empty: Page<u32> = paginate(&[], 0, 4);
        assert_eq!(empty.nb_pages, 0);
    }

    #[test]
    fn distribution_sorted_descending_with_percentages() {
        let buckets = distribution(["a", "b", "b", "c", "b", "a"], 6);
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["b", "a", "c"]);
        assert_eq!(buckets[0].count, 3);
        assert!((buckets[0].percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn summary_counts() {
        let quotes = dataset();
        let summary = summarize(&quotes);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.defaulted, 0);
        assert_eq!(summary.unique_tags, 7);
        assert_eq!(summary.sample_tags[0], "determination");
        assert!((summary.average_score.unwrap() - 5.5).abs() < 1e-9);
        assert_eq!(summary.sentiment.len(), 4);
        assert_eq!(summary.emotions.iter().map(|b| b.count).sum::<usize>(), 4);
    }
}
