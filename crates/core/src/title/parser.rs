use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Fields extracted from a release name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedName {
    /// Title, or `None` when nothing precedes the first marker.
    pub title: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub year: Option<u32>,
    pub resolution: Option<String>,
}

static SEASON_EPISODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bs(\d{1,2}) ?e(\d{1,3})\b").expect("season/episode pattern")
});

static CROSS_EPISODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})x(\d{2,3})\b").expect("NxNN pattern"));

static SEASON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:s|season ?)(\d{1,2})\b").expect("season pattern"));

static EPISODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:episode|ep) ?(\d{1,3})\b").expect("episode pattern"));

static YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").expect("year pattern"));

static RESOLUTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{3,4}p|4k)\b").expect("resolution pattern"));

static QUALITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(hdtv|web-?dl|web-?rip|webrip|bluray|blu-ray|brrip|bdrip|dvdrip|dvdscr|dvd|hdrip|hdcam|cam|ts|x264|x265|h ?264|h ?265|hevc|xvid|divx|aac|ac3|dts|flac|mp3|remux|proper|repack|complete|extended|unrated|internal|multi|subbed|dubbed)\b",
    )
    .expect("quality pattern")
});

static LEADING_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[\[【][^\]】]*[\]】]\s*").expect("group pattern"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// Parse a release name.
pub fn parse_name(name: &str) -> ParsedName {
    let stripped = LEADING_GROUP.replace(name, "");
    let text: String = stripped
        .chars()
        .map(|c| if c == '.' || c == '_' { ' ' } else { c })
        .collect();

    let mut parsed = ParsedName::default();
    let mut cut = text.len();

    if let Some(caps) = SEASON_EPISODE
        .captures(&text)
        .or_else(|| CROSS_EPISODE.captures(&text))
    {
        parsed.season = caps.get(1).and_then(|m| m.as_str().parse().ok());
        parsed.episode = caps.get(2).and_then(|m| m.as_str().parse().ok());
        cut = cut.min(caps.get(0).map_or(cut, |m| m.start()));
    } else {
        if let Some(caps) = SEASON.captures(&text) {
            parsed.season = caps.get(1).and_then(|m| m.as_str().parse().ok());
            cut = cut.min(caps.get(0).map_or(cut, |m| m.start()));
        }
        if let Some(caps) = EPISODE.captures(&text) {
            parsed.episode = caps.get(1).and_then(|m| m.as_str().parse().ok());
            cut = cut.min(caps.get(0).map_or(cut, |m| m.start()));
        }
    }

    // A year at the very start is part of the title ("2001 A Space Odyssey")
    if let Some(m) = YEAR.find_iter(&text).find(|m| m.start() > 0) {
        parsed.year = m.as_str().parse().ok();
        cut = cut.min(m.start());
    }

    if let Some(m) = RESOLUTION.find(&text) {
        parsed.resolution = Some(m.as_str().to_lowercase());
        cut = cut.min(m.start());
    }

    if let Some(m) = QUALITY.find(&text) {
        cut = cut.min(m.start());
    }

    if let Some(pos) = text.find(['[', '{', '【']) {
        cut = cut.min(pos);
    }

    parsed.title = clean_title(&text[..cut]);
    parsed
}

fn clean_title(raw: &str) -> Option<String> {
    let collapsed = WHITESPACE.replace_all(raw, " ");
    let title = collapsed
        .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '(' | '[' | '{' | '+'))
        .trim_start_matches(|c: char| c.is_whitespace() || c == '-')
        .to_string();
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

/// Key used to match titles across sources: lowercase, `é` folded to `e`,
/// whitespace collapsed.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase().replace('é', "e");
    WHITESPACE.replace_all(lowered.trim(), " ").into_owned()
}

/// Capitalize the first letter of every word and lowercase the rest.
pub fn title_case(title: &str) -> String {
    title
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tv_episode() {
        let parsed = parse_name("Show.Name.S02E05.720p.HDTV.x264-GRP");
        assert_eq!(parsed.title.as_deref(), Some("Show Name"));
        assert_eq!(parsed.season, Some(2));
        assert_eq!(parsed.episode, Some(5));
        assert_eq!(parsed.resolution.as_deref(), Some("720p"));
        assert_eq!(parsed.year, None);
    }

    #[test]
    fn test_parse_cross_notation() {
        let parsed = parse_name("The Office 3x07 Branch Wars");
        assert_eq!(parsed.title.as_deref(), Some("The Office"));
        assert_eq!(parsed.season, Some(3));
        assert_eq!(parsed.episode, Some(7));
    }

    #[test]
    fn test_parse_season_pack() {
        let parsed = parse_name("Breaking Bad Season 4 Complete 1080p");
        assert_eq!(parsed.title.as_deref(), Some("Breaking Bad"));
        assert_eq!(parsed.season, Some(4));
        assert_eq!(parsed.episode, None);
    }

    #[test]
    fn test_parse_movie_with_year() {
        let parsed = parse_name("Blade Runner (1982) [1080p] BluRay");
        assert_eq!(parsed.title.as_deref(), Some("Blade Runner"));
        assert_eq!(parsed.year, Some(1982));
        assert_eq!(parsed.resolution.as_deref(), Some("1080p"));
    }

    #[test]
    fn test_leading_year_is_title() {
        let parsed = parse_name("2001.A.Space.Odyssey.1968.2160p");
        assert_eq!(parsed.title.as_deref(), Some("2001 A Space Odyssey"));
        assert_eq!(parsed.year, Some(1968));
    }

    #[test]
    fn test_leading_group_is_stripped() {
        let parsed = parse_name("[HorribleSubs] Some Anime - Episode 12 [720p].mkv");
        assert_eq!(parsed.title.as_deref(), Some("Some Anime"));
        assert_eq!(parsed.episode, Some(12));
    }

    #[test]
    fn test_plain_name_is_whole_title() {
        let parsed = parse_name("ubuntu-24.04-desktop-amd64");
        assert!(parsed.title.is_some());
        assert_eq!(parsed.season, None);
    }

    #[test]
    fn test_unparseable_name() {
        assert_eq!(parse_name("S01E01.720p").title, None);
        assert_eq!(parse_name("").title, None);
        assert_eq!(parse_name("[GRP] 1080p").title, None);
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  Amélie   Poulain "), "amelie poulain");
        assert_eq!(normalize_title("THE MATRIX"), "the matrix");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("the WALKING dead"), "The Walking Dead");
        assert_eq!(title_case(""), "");
    }
}
