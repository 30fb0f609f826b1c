use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::normalize::squash_ws;

/// Market region of an observation: the storefronts sell domestic (TR)
/// and global variants of the same product as separate listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Tr,
    Global,
}

impl Region {
    /// Convert from the persisted/query string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "tr" => Ok(Region::Tr),
            "global" => Ok(Region::Global),
            _ => Err(format!("Invalid region: {}", s)),
        }
    }

    /// Convert to the persisted/query string
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Tr => "tr",
            Region::Global => "global",
        }
    }
}

/// Resolved identity of one observed listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemIdentity {
    /// Normalized join key, stable across stores, casing, punctuation
    /// noise and region decoration.
    pub join_key: String,
    /// Human-readable name with the trailing region marker stripped.
    pub display_name: String,
    pub region: Region,
}

// Region/server decoration words the storefronts append to product names,
// in the languages they use.
static STOP_WORDS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(tr|türkiye|turkiye|global|world|server|sunucu)\b").unwrap());

// ASCII word characters plus '+' and '.', matching how the storefront
// names are tokenized upstream; everything else becomes a space.
static NON_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9a-z_+.\s]").unwrap());

static REGION_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+\(?(tr|global)\)?\s*$").unwrap());

static GLOBAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)global").unwrap());

/// Derive the cross-store join key for a raw display name.
///
/// Lowercase, drop region stop words, strip punctuation except
/// alphanumerics / '+' / '.', collapse whitespace. Deterministic and
/// best-effort: two distinct products sharing all non-stop-word tokens
/// would collide, which is accepted (data quality, not an error).
pub fn join_key(raw_name: &str) -> String {
    let lowered = raw_name.to_lowercase();
    let no_stop_words = STOP_WORDS_RE.replace_all(&lowered, " ");
    let tokens_only = NON_TOKEN_RE.replace_all(&no_stop_words, " ");
    squash_ws(&tokens_only)
}

/// Presentation name: the raw name with one trailing region marker
/// (optionally parenthesized) removed, everything else verbatim.
pub fn display_name(raw_name: &str) -> String {
    REGION_SUFFIX_RE.replace(raw_name.trim(), "").to_string()
}

/// Tag an observation's region: global iff the category id or the raw
/// name carries a global marker, domestic otherwise.
pub fn classify_region(category_name: &str, raw_name: &str) -> Region {
    if GLOBAL_RE.is_match(category_name) || GLOBAL_RE.is_match(raw_name) {
        Region::Global
    } else {
        Region::Tr
    }
}

/// Resolve a raw name + category into a full [`ItemIdentity`].
pub fn resolve(raw_name: &str, category_name: &str) -> ItemIdentity {
    ItemIdentity {
        join_key: join_key(raw_name),
        display_name: display_name(raw_name),
        region: classify_region(category_name, raw_name),
    }
}
