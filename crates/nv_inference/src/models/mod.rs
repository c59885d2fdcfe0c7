use nv_core::{ArticleDigest, Error, Result};

pub mod chat;
pub mod ollama;

/// Trims the article text and bounds its length.
pub fn prepare_input(text: &str, min_chars: usize, max_chars: usize) -> Result<String> {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let len = text.chars().count();
    if len == 0 {
        return Err(Error::Summarization("article text is empty".to_string()));
    }
    if len < min_chars {
        return Err(Error::Summarization(format!(
            "article text too short to summarize ({} < {} chars)",
            len, min_chars
        )));
    }
    if len > max_chars {
        tracing::debug!("✂️ Truncating article text from {} to {} chars", len, max_chars);
        return Ok(text.chars().take(max_chars).collect());
    }
    Ok(text)
}

pub fn build_prompt(text: &str, language: &str) -> String {
    format!(
        "I will send you an article. Your answer should have the following structure: \
         the first sentence of your answer should be a short headline in {language} of at most 12 words. \
         After that sentence write a short summary of the article of at most 3 sentences in {language}. \
         Focus on the important information and do not include anything else in your answer. \
         Do not separate the sentences with newlines and end every sentence with a dot. \
         This is the article: {text}"
    )
}

/// Splits text into sentences on ". " unless the dot follows a digit,
/// so dates such as "12. 10. 2023" stay in one piece.
fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        current.push(c);
        let ends_sentence = c == '.'
            && chars.get(i + 1).map_or(false, |next| next.is_whitespace())
            && !(i > 0 && chars[i - 1].is_ascii_digit());
        if ends_sentence {
            sentences.push(current.trim().to_string());
            current.clear();
        }
    }
    if !current.trim().is_empty() {
        sentences.push(current.trim().to_string());
    }

    sentences
        .into_iter()
        .filter(|s| !s.is_empty() && s != ".")
        .map(|s| if s.ends_with('.') { s } else { format!("{}.", s) })
        .collect()
}

/// Turns raw model output into a headline and a summary.
pub fn parse_digest(output: &str, strip_markers: &[String]) -> Result<ArticleDigest> {
    let mut text = output.replace("\n-", " ").replace('\n', " ");
    for marker in strip_markers {
        text = text.replace(marker.as_str(), "");
    }
    let text = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(" .", ".");

    let mut sentences = split_sentences(&text).into_iter();
    let headline = sentences
        .next()
        .map(|s| s.trim_end_matches('.').trim().to_string())
        .unwrap_or_default();
    let summary = sentences.collect::<Vec<_>>().join(" ");

    Ok(ArticleDigest { headline, summary })
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .to_lowercase()
}

/// Rejects output that cannot be a headline followed by a summary.
pub fn validate_digest(digest: &ArticleDigest, body: &str) -> Result<()> {
    if digest.headline.trim().is_empty() {
        return Err(Error::Summarization("model returned an empty headline".to_string()));
    }
    if digest.summary.trim().is_empty() {
        return Err(Error::Summarization("model returned no summary".to_string()));
    }
    if normalize(body).starts_with(&normalize(&digest.headline)) {
        return Err(Error::Summarization(
            "headline is a truncation of the article body".to_string(),
        ));
    }
    Ok(())
}

/// Maps a non-success HTTP status of a model endpoint to an error.
pub(crate) fn status_error(endpoint: &str, status: reqwest::StatusCode) -> Error {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        Error::Summarization(format!("rate limited by {}", endpoint))
    } else if status.is_server_error() {
        Error::Summarization(format!("{} is unavailable ({})", endpoint, status))
    } else {
        Error::Summarization(format!("{} answered with status {}", endpoint, status))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    pub const ARTICLE: &str = "Vlada je v četrtek sprejela nov zakon o davkih, ki bo začel veljati \
        1. januarja 2025. Zakon prinaša nižje stopnje za mlade in višje olajšave za družine. \
        Opozicija je napovedala referendum, sindikati pa so spremembe pozdravili.";
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::test_support::ARTICLE;

    #[test]
    fn test_prepare_input() {
        assert!(matches!(prepare_input("   ", 1, 10), Err(Error::Summarization(_))));
        assert!(matches!(prepare_input("short", 10, 100), Err(Error::Summarization(_))));
        assert_eq!(prepare_input("  a   b  ", 1, 100).unwrap(), "a b");
        assert_eq!(prepare_input("čšžčšžčšž", 1, 4).unwrap(), "čšžč");
    }

    #[test]
    fn test_parse_digest() {
        let output = "Nov davčni zakon znižuje stopnje za mlade.\n- Vlada je sprejela zakon, ki velja od 1. 1. 2025. \
                      Opozicija napoveduje referendum (dopolnjeno).";
        let digest = parse_digest(output, &["(dopolnjeno)".to_string()]).unwrap();
        assert_eq!(digest.headline, "Nov davčni zakon znižuje stopnje za mlade");
        assert_eq!(
            digest.summary,
            "Vlada je sprejela zakon, ki velja od 1. 1. 2025. Opozicija napoveduje referendum."
        );
    }

    #[test]
    fn test_parse_digest_single_sentence() {
        let digest = parse_digest("Samo naslov brez povzetka", &[]).unwrap();
        assert_eq!(digest.headline, "Samo naslov brez povzetka");
        assert!(digest.summary.is_empty());
    }

    #[test]
    fn test_validate_digest() {
        let good = ArticleDigest {
            headline: "Nov davčni zakon".to_string(),
            summary: "Vlada je sprejela zakon.".to_string(),
        };
        assert!(validate_digest(&good, ARTICLE).is_ok());

        let truncated = ArticleDigest {
            headline: "Vlada je v četrtek sprejela nov zakon".to_string(),
            summary: "Nekaj.".to_string(),
        };
        assert!(validate_digest(&truncated, ARTICLE).is_err());

        let empty = ArticleDigest {
            headline: "Naslov".to_string(),
            summary: " ".to_string(),
        };
        assert!(validate_digest(&empty, ARTICLE).is_err());
    }

    #[test]
    fn test_build_prompt() {
        let prompt = build_prompt("Besedilo.", "Slovenian");
        assert!(prompt.contains("headline in Slovenian"));
        assert!(prompt.ends_with("This is the article: Besedilo."));
    }

    #[test]
    fn test_status_error() {
        let err = status_error("api", reqwest::StatusCode::TOO_MANY_REQUESTS);
        assert!(err.to_string().contains("rate limited"));
        let err = status_error("api", reqwest::StatusCode::BAD_GATEWAY);
        assert!(err.to_string().contains("unavailable"));
    }
}
