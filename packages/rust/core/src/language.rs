//! Language resolution.
//!
//! Maps a free-form user token to a [`LanguageProfile`] through a static,
//! exhaustive alias table. There is no fuzzy matching: a token either
//! appears in the table or resolves to English with a warning.

use std::fmt;

use newsdigest_shared::{ENGLISH_LABELS, HeaderLabels, LanguageProfile};

/// A supported language with every token that selects it.
#[derive(Debug, Clone, Copy)]
pub struct LanguageEntry {
    pub profile: LanguageProfile,
    /// Lower-case tokens accepted for this profile, canonical code first.
    pub aliases: &'static [&'static str],
}

/// Non-fatal warning for a token that matched no profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageUnsupported {
    /// The token as the user typed it.
    pub token: String,
}

impl fmt::Display for LanguageUnsupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unsupported language '{}', falling back to English",
            self.token
        )
    }
}

/// Outcome of [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub profile: LanguageProfile,
    /// Set only when a non-empty token matched nothing.
    pub warning: Option<LanguageUnsupported>,
}

const fn english_labelled(code: &'static str, display_name: &'static str) -> LanguageProfile {
    LanguageProfile {
        code,
        display_name,
        labels: ENGLISH_LABELS,
        has_native_headers: false,
    }
}

const fn native(
    code: &'static str,
    display_name: &'static str,
    labels: HeaderLabels,
) -> LanguageProfile {
    LanguageProfile {
        code,
        display_name,
        labels,
        has_native_headers: true,
    }
}

/// The default profile.
pub const ENGLISH: LanguageProfile = english_labelled("en", "English");

static LANGUAGES: &[LanguageEntry] = &[
    LanguageEntry {
        profile: ENGLISH,
        aliases: &["en", "english", "eng", "en-us", "en-gb", "en-au"],
    },
    LanguageEntry {
        profile: native(
            "zh",
            "Chinese (中文)",
            HeaderLabels {
                title: "综合新闻摘要",
                executive_summary: "执行摘要",
                highlights: "分类要点",
                correlations: "跨来源关联",
            },
        ),
        aliases: &[
            "zh",
            "chinese",
            "mandarin",
            "ch",
            "cn",
            "simplified",
            "zh-cn",
            "zh_cn",
            "zh-hans",
            "中文",
            "简体中文",
        ],
    },
    LanguageEntry {
        profile: native(
            "zh-Hant",
            "Traditional Chinese (繁體中文)",
            HeaderLabels {
                title: "綜合新聞摘要",
                executive_summary: "執行摘要",
                highlights: "分類重點",
                correlations: "跨來源關聯",
            },
        ),
        aliases: &[
            "zh-hant",
            "traditional",
            "traditional chinese",
            "zh-tw",
            "zh_tw",
            "zh-hk",
            "cantonese",
            "繁體中文",
        ],
    },
    LanguageEntry {
        profile: native(
            "ja",
            "Japanese (日本語)",
            HeaderLabels {
                title: "総合ニュース要約",
                executive_summary: "エグゼクティブサマリー",
                highlights: "カテゴリ別ハイライト",
                correlations: "ソース間の関連性",
            },
        ),
        aliases: &["ja", "japanese", "jp", "jpn", "日本語"],
    },
    LanguageEntry {
        profile: native(
            "ko",
            "Korean (한국어)",
            HeaderLabels {
                title: "종합 뉴스 요약",
                executive_summary: "핵심 요약",
                highlights: "분야별 주요 소식",
                correlations: "출처 간 연관성",
            },
        ),
        aliases: &["ko", "korean", "kr", "kor", "한국어"],
    },
    LanguageEntry {
        profile: english_labelled("es", "Spanish (Español)"),
        aliases: &["es", "spanish", "español", "espanol", "spa"],
    },
    LanguageEntry {
        profile: english_labelled("fr", "French (Français)"),
        aliases: &["fr", "french", "français", "francais", "fra"],
    },
    LanguageEntry {
        profile: english_labelled("de", "German (Deutsch)"),
        aliases: &["de", "german", "deutsch", "deu", "ger"],
    },
    LanguageEntry {
        profile: english_labelled("it", "Italian (Italiano)"),
        aliases: &["it", "italian", "italiano", "ita"],
    },
    LanguageEntry {
        profile: english_labelled("pt", "Portuguese (Português)"),
        aliases: &["pt", "portuguese", "português", "portugues", "pt-br", "por"],
    },
    LanguageEntry {
        profile: english_labelled("ru", "Russian (Русский)"),
        aliases: &["ru", "russian", "русский", "rus"],
    },
    LanguageEntry {
        profile: english_labelled("ar", "Arabic (العربية)"),
        aliases: &["ar", "arabic", "العربية", "ara"],
    },
    LanguageEntry {
        profile: english_labelled("hi", "Hindi (हिन्दी)"),
        aliases: &["hi", "hindi", "हिन्दी", "hin"],
    },
    LanguageEntry {
        profile: english_labelled("th", "Thai (ไทย)"),
        aliases: &["th", "thai", "ไทย", "tha"],
    },
    LanguageEntry {
        profile: english_labelled("vi", "Vietnamese (Tiếng Việt)"),
        aliases: &["vi", "vietnamese", "tiếng việt", "tieng viet", "vie"],
    },
    LanguageEntry {
        profile: english_labelled("id", "Indonesian (Bahasa Indonesia)"),
        aliases: &["id", "indonesian", "bahasa indonesia", "ind"],
    },
    LanguageEntry {
        profile: english_labelled("ms", "Malay (Bahasa Melayu)"),
        aliases: &["ms", "malay", "bahasa melayu", "melayu", "msa"],
    },
];

/// Every supported language, in display order.
pub fn supported_languages() -> &'static [LanguageEntry] {
    LANGUAGES
}

/// Resolve a user token to a profile.
///
/// Absent or blank tokens give English without a warning. Matching is exact
/// on the trimmed, lower-cased token.
pub fn resolve(token: Option<&str>) -> Resolution {
    let Some(raw) = token.map(str::trim).filter(|t| !t.is_empty()) else {
        return Resolution {
            profile: ENGLISH,
            warning: None,
        };
    };

    let needle = raw.to_lowercase();
    match lookup(&needle) {
        Some(profile) => Resolution {
            profile,
            warning: None,
        },
        None => Resolution {
            profile: ENGLISH,
            warning: Some(LanguageUnsupported {
                token: raw.to_string(),
            }),
        },
    }
}

fn lookup(needle: &str) -> Option<LanguageProfile> {
    LANGUAGES
        .iter()
        .find(|entry| entry.aliases.iter().any(|alias| *alias == needle))
        .map(|entry| entry.profile)
}
