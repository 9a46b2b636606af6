//! Prompt templates sent to the text model

/// Prompt asking for a two-speaker dialogue about `content`
pub fn script_prompt(content: &str, duration_min: u32, duration_max: u32) -> String {
    format!(
        "You are a professional podcast script writer. Based on the material below, \
write a two-person podcast dialogue lasting {duration_min}-{duration_max} minutes.\n\
\n\
Requirements:\n\
1. Tone: relaxed and humorous, natural and fluent\n\
2. Speakers: Speaker1 (host, steers the topic) and Speaker2 (guest, gives deeper analysis)\n\
3. Keep the wording natural, with the repetitions, filler words and pauses of real conversation\n\
4. Put every utterance on its own line, formatted as `Speaker1: text` or `Speaker2: text`\n\
5. Open with a hook and close with a summary\n\
6. Output only the dialogue, no extra commentary\n\
\n\
Material:\n\
{content}\n\
\n\
Start the script now:"
    )
}

/// Prompt asking for a short image description of the episode
pub fn cover_prompt(summary: &str) -> String {
    format!(
        "Based on the podcast summary below, write a concise image description prompt.\n\
\n\
Requirements:\n\
1. Style: comic\n\
2. Characters: one man and one woman\n\
3. Scene: a podcast studio or a related setting\n\
4. Keep it short and concrete, at most 30 words\n\
\n\
Podcast summary:\n\
{summary}\n\
\n\
Output only the image prompt:"
    )
}

/// Lines scanned for keywords
const DIGEST_LINES: usize = 10;
const MAX_KEYWORDS: usize = 5;
const DIGEST_SUMMARY_CHARS: usize = 300;
const DEFAULT_TITLE: &str = "Podcast";

/// Title, keywords and opening of a finished script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptDigest {
    pub title: String,
    pub keywords: Vec<String>,
    pub summary: String,
}

impl ScriptDigest {
    /// Digest of `Speaker: text` transcript lines
    ///
    /// Keywords are the distinct words longer than three characters in the
    /// first lines, in order of appearance. The first keyword is the title.
    pub fn from_lines(lines: &[String]) -> Self {
        let mut keywords: Vec<String> = Vec::new();
        let words = lines
            .iter()
            .take(DIGEST_LINES)
            .filter_map(|line| line.split_once(": "))
            .flat_map(|(_, text)| text.split_whitespace())
            .map(|word| word.trim_matches(|c: char| c.is_ascii_punctuation()));
        for word in words {
            if keywords.len() == MAX_KEYWORDS {
                break;
            }
            if word.chars().count() > 3 && !keywords.iter().any(|k| k == word) {
                keywords.push(word.to_string());
            }
        }

        let script = lines.join("\n");
        Self {
            title: keywords
                .first()
                .cloned()
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            summary: summarize(&script, DIGEST_SUMMARY_CHARS).to_string(),
            keywords,
        }
    }

    /// Summary handed to [`cover_prompt`]
    pub fn brief(&self) -> String {
        format!(
            "Podcast topic: {title}\n\
Keywords: {keywords}\n\
Summary: {summary}\n\
\n\
This is a podcast about {title}; the cover should draw listeners in.",
            title = self.title,
            keywords = self.keywords.join(", "),
            summary = self.summary,
        )
    }
}

/// First `max_chars` characters of `content`
pub fn summarize(content: &str, max_chars: usize) -> &str {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_prompt_embeds_content_and_range() {
        let prompt = script_prompt("Rust 2024 edition", 3, 5);
        assert!(prompt.contains("3-5 minutes"));
        assert!(prompt.contains("Rust 2024 edition"));
        assert!(prompt.contains("Speaker1: text"));
    }

    #[test]
    fn cover_prompt_embeds_summary() {
        let prompt = cover_prompt("an episode about tea");
        assert!(prompt.contains("an episode about tea"));
        assert!(prompt.contains("30 words"));
    }

    #[test]
    fn summarize_respects_char_boundaries() {
        assert_eq!(summarize("播客内容摘要", 2), "播客");
        assert_eq!(summarize("short", 500), "short");
        assert_eq!(summarize("", 3), "");
    }

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn digest_collects_distinct_long_words() {
        let digest = ScriptDigest::from_lines(&lines(&[
            "Speaker1: Welcome back, today we talk about sourdough baking.",
            "Speaker2: Sourdough needs patience and a lively starter.",
            "Speaker1: baking bread at home is popular again.",
        ]));

        assert_eq!(
            digest.keywords,
            vec!["Welcome", "back", "today", "talk", "about"]
        );
        assert_eq!(digest.title, "Welcome");
        assert!(digest.summary.starts_with("Speaker1: Welcome back"));
    }

    #[test]
    fn digest_only_reads_the_opening_lines() {
        let mut raw = vec!["Speaker1: ok".to_string(); 10];
        raw.push("Speaker2: photosynthesis".to_string());
        let digest = ScriptDigest::from_lines(&raw);
        assert!(digest.keywords.is_empty());
        assert_eq!(digest.title, "Podcast");
    }

    #[test]
    fn digest_skips_lines_without_speaker() {
        let digest = ScriptDigest::from_lines(&lines(&["no separator here", "Speaker2: glaciers melt"]));
        assert_eq!(digest.keywords, vec!["glaciers", "melt"]);
    }

    #[test]
    fn digest_summary_is_capped() {
        let digest = ScriptDigest::from_lines(&[format!("Speaker1: {}", "a".repeat(400))]);
        assert_eq!(digest.summary.chars().count(), 300);
    }

    #[test]
    fn brief_names_title_and_keywords() {
        let digest = ScriptDigest {
            title: "tea".to_string(),
            keywords: vec!["tea".to_string(), "oolong".to_string()],
            summary: "Speaker1: tea time".to_string(),
        };
        let brief = digest.brief();
        assert!(brief.contains("Podcast topic: tea"));
        assert!(brief.contains("Keywords: tea, oolong"));
        assert!(brief.contains("Summary: Speaker1: tea time"));
    }
}
