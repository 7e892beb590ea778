/*!
 * Language utilities for file naming.
 *
 * Target languages arrive as free text ("French", "fr", "fra", "Brazilian
 * Portuguese"). Parallel translations need a short, filesystem-safe suffix,
 * so recognised languages map to their ISO 639-1 code and anything else
 * becomes a lowercase slug.
 */

use isolang::Language;

/// Resolve a language from an ISO 639-1/639-3 code or an English name
pub fn resolve_language(input: &str) -> Option<Language> {
    let normalized = input.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }

    match normalized.len() {
        2 => {
            if let Some(lang) = Language::from_639_1(&normalized) {
                return Some(lang);
            }
        }
        3 => {
            if let Some(lang) = Language::from_639_3(part2b_to_part2t(&normalized)) {
                return Some(lang);
            }
        }
        _ => {}
    }

    Language::from_name(&title_case(&normalized))
}

/// Suffix inserted before the extension of a parallel translation
pub fn language_suffix(target_language: &str) -> String {
    if let Some(lang) = resolve_language(target_language) {
        return lang
            .to_639_1()
            .map(str::to_string)
            .unwrap_or_else(|| lang.to_639_3().to_string());
    }

    let slug = target_language
        .trim()
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() { "translated".to_string() } else { slug }
}

/// ISO 639-2/B codes that differ from their 639-2/T form
fn part2b_to_part2t(code: &str) -> &str {
    match code {
        "fre" => "fra",
        "ger" => "deu",
        "dut" => "nld",
        "gre" => "ell",
        "chi" => "zho",
        "cze" => "ces",
        "ice" => "isl",
        "alb" => "sqi",
        "arm" => "hye",
        "baq" => "eus",
        "bur" => "mya",
        "per" => "fas",
        "geo" => "kat",
        "may" => "msa",
        "mac" => "mkd",
        "rum" => "ron",
        "slo" => "slk",
        "wel" => "cym",
        _ => code,
    }
}

fn title_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
