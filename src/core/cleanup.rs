//! Text normalization applied to bug titles and comments before they are
//! exported as text columns.

use once_cell::sync::Lazy;
use regex::Regex;

const SYNONYMS: &[(&str, &[&str])] = &[
    ("safemode", &["safemode", "safe mode"]),
    ("str", &["str", "steps to reproduce", "repro steps"]),
    ("uaf", &["uaf", "use after free", "use-after-free"]),
    ("asan", &["asan", "address sanitizer", "addresssanitizer"]),
    (
        "permafailure",
        &[
            "permafailure",
            "permafailing",
            "permafail",
            "perma failure",
            "perma failing",
            "perma fail",
            "perma-failure",
            "perma-failing",
            "perma-fail",
        ],
    ),
    ("spec", &["spec", "specification"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cleanup {
    FileRef,
    Url,
    Synonyms,
    Hex,
    Dll,
    Crash,
}

static FILEREF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\w+\.(?:py|json|jsm|js|html|css|cpp|c|h)\b").expect("Invalid file reference regex")
});

static URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://\S+|www\.\S+").expect("Invalid URL regex"));

static HEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b0[xX][0-9a-fA-F]+\b").expect("Invalid hex regex"));

static DLL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w+\.(?:dll|so|dylib)\b").expect("Invalid DLL regex"));

static CRASH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"bp-[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}\b")
        .expect("Invalid crash-stats regex")
});

/// One case-insensitive, word-bounded alternation per synonym group.
static SYNONYM_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    SYNONYMS
        .iter()
        .map(|(canonical, variants)| {
            let alternatives: Vec<String> = variants.iter().map(|v| regex::escape(v)).collect();
            let pattern = format!(r"(?i)\b(?:{})\b", alternatives.join("|"));
            (Regex::new(&pattern).expect("Invalid synonym regex"), *canonical)
        })
        .collect()
});

impl Cleanup {
    pub fn apply(&self, text: &str) -> String {
        let (pattern, token) = match self {
            Cleanup::FileRef => (&*FILEREF, "__FILE_REFERENCE__"),
            Cleanup::Url => (&*URL, "__URL__"),
            Cleanup::Hex => (&*HEX, "__HEX_NUMBER__"),
            Cleanup::Dll => (&*DLL, "__DLL_NAME__"),
            Cleanup::Crash => (&*CRASH, "__CRASH_STATS_LINK__"),
            Cleanup::Synonyms => {
                return SYNONYM_PATTERNS
                    .iter()
                    .fold(text.to_string(), |acc, (pattern, canonical)| {
                        pattern.replace_all(&acc, *canonical).into_owned()
                    })
            }
        };
        pattern.replace_all(text, token).into_owned()
    }
}

/// The cleanup chain used for bug text, in application order.
pub fn default_chain() -> Vec<Cleanup> {
    vec![
        Cleanup::FileRef,
        Cleanup::Url,
        Cleanup::Synonyms,
        Cleanup::Hex,
        Cleanup::Dll,
        Cleanup::Crash,
    ]
}

pub fn apply_all(chain: &[Cleanup], text: &str) -> String {
    chain
        .iter()
        .fold(text.to_string(), |acc, cleanup| cleanup.apply(&acc))
}
