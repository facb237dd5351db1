//! Best-effort extraction of channel metadata from page HTML.
//!
//! YouTube embeds channel data in several JSON shapes that drift across
//! page revisions. Each field has an ordered pattern list; patterns are
//! tried in sequence and the first match wins, so a new page format is
//! handled by appending a pattern, not by touching control flow.

use regex::Regex;

/// Fields recovered from one page. Channel ID is the only field whose
/// absence makes the page invalid; the rest are enrichments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelExtract {
    pub channel_id: Option<String>,
    pub handle: Option<String>,
    pub subscriber_count: Option<String>,
}

/// Compiled pattern lists. Built once per run and shared by all tasks.
pub struct Extractor {
    channel_id: Vec<Regex>,
    handle: Vec<Regex>,
    subscriber_count: Vec<Regex>,
    subscriber_suffix: Regex,
}

impl Extractor {
    pub fn new() -> Self {
        Self {
            channel_id: compile(&[
                r#""channelId":"([^"]+)""#,
                r#""externalChannelId":"([^"]+)""#,
                r#""ucid":"([^"]+)""#,
                r#"channel/([^/"]+)"#,
            ]),
            handle: compile(&[
                r#""channelHandle":"(@[^"]+)""#,
                r#""vanityChannelUrl":"http://www.youtube.com/(@[^"]+)""#,
                r#"youtube\.com/(@[^"\s/]+)"#,
            ]),
            subscriber_count: compile(&[
                r#"(?i)"metadataParts":\[\{"text":\{"content":"([^"]+?\s*subscribers?)"\}\}\]"#,
                r#"(?i)"text":\{"content":"([^"]+?\s*subscribers?)"\}"#,
                r#"(?i)subscribers"[^>]*?>([^<]+?)\s*(?:subscriber|subscribers)"#,
            ]),
            subscriber_suffix: Regex::new(r"(?i)\s*subscribers?\s*$")
                .expect("subscriber suffix pattern is valid"),
        }
    }

    /// Run all pattern lists over the page text. Pure function of its
    /// input; no network access.
    pub fn extract(&self, html: &str) -> ChannelExtract {
        let subscriber_count = first_match(&self.subscriber_count, html).map(|text| {
            self.subscriber_suffix
                .replace(text.trim(), "")
                .into_owned()
        });

        ChannelExtract {
            channel_id: first_match(&self.channel_id, html),
            handle: first_match(&self.handle, html),
            subscriber_count,
        }
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("extraction pattern is valid"))
        .collect()
}

/// First capture of the first pattern that matches, in list order.
fn first_match(patterns: &[Regex], html: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|pattern| pattern.captures(html))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
