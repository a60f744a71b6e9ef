//! Canonical Taxonomy (C1): the closed classification hierarchy and the
//! policy for resolving free-text LLM output against it.

pub mod data;

use crate::error::TaxonomyError;
use crate::llm::gateway::{parse_json_response, LlmGateway};
use crate::llm::GenerationParams;
use data::{CategoryEntry, SubcategoryEntry, BASELINE_CATEGORY_QUOTAS, LEGACY_SUBCATEGORY_CATEGORY, TAXONOMY};
use serde::Deserialize;

/// A resolved (category, subcategory, type_of_question) triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalTriple {
    /// Resolved category.
    pub category: String,
    /// Resolved subcategory.
    pub subcategory: String,
    /// Resolved type of question.
    pub type_of_question: String,
}

/// Whether `(category, subcategory, type_of_question)` is a valid path in
/// the closed taxonomy, using case-insensitive comparison against the
/// stored canonical names.
pub fn valid_path(category: &str, subcategory: &str, type_of_question: &str) -> bool {
    find_subcategory_entry(category, subcategory)
        .map(|entry| entry.types.iter().any(|t| t.eq_ignore_ascii_case(type_of_question)))
        .unwrap_or(false)
}

fn find_category_entry(category: &str) -> Option<&'static CategoryEntry> {
    TAXONOMY.iter().find(|c| c.category.eq_ignore_ascii_case(category))
}

fn find_subcategory_entry(category: &str, subcategory: &str) -> Option<&'static SubcategoryEntry> {
    find_category_entry(category)?
        .subcategories
        .iter()
        .find(|s| s.subcategory.eq_ignore_ascii_case(subcategory))
}

/// Canonical name for a subcategory, normalizing case against the stored
/// taxonomy. Returns `None` if the subcategory has no canonical entry.
fn canonical_subcategory_name(subcategory: &str) -> Option<&'static str> {
    TAXONOMY
        .iter()
        .flat_map(|c| c.subcategories.iter())
        .find(|s| s.subcategory.eq_ignore_ascii_case(subcategory))
        .map(|s| s.subcategory)
}

/// Canonical name for a type within a known subcategory.
fn canonical_type_name(subcategory: &str, type_of_question: &str) -> Option<&'static str> {
    TAXONOMY
        .iter()
        .flat_map(|c| c.subcategories.iter())
        .find(|s| s.subcategory.eq_ignore_ascii_case(subcategory))?
        .types
        .iter()
        .find(|t| t.eq_ignore_ascii_case(type_of_question))
        .copied()
}

/// Deterministic reverse lookup: given a (subcategory, type) pair, return
/// the category that owns it, consulting both the closed taxonomy and the
/// legacy subcategory name map.
pub fn lookup_category_by(subcategory: &str, type_of_question: &str) -> Option<&'static str> {
    for entry in TAXONOMY {
        for sub in entry.subcategories {
            if sub.subcategory.eq_ignore_ascii_case(subcategory)
                && sub.types.iter().any(|t| t.eq_ignore_ascii_case(type_of_question))
            {
                return Some(entry.category);
            }
        }
    }
    // A subcategory can still resolve via the legacy name map even when the
    // (sub, type) pair above didn't land an exact type match.
    LEGACY_SUBCATEGORY_CATEGORY
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(subcategory))
        .map(|(_, category)| *category)
}

#[derive(Deserialize)]
struct MatchResponse {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    subcategory: Option<String>,
    #[serde(default)]
    type_of_question: Option<String>,
}

/// Uses an LLM call with the canonical taxonomy as context and the
/// original question alongside the free-text terms to resolve a full
/// canonical triple. Returns `None` (⊥) when the model cannot place the
/// question, or when the returned path doesn't validate against the closed
/// taxonomy.
pub async fn semantic_match(
    gateway: &LlmGateway,
    free_cat: &str,
    free_sub: &str,
    free_type: &str,
    question_stem: &str,
) -> Result<Option<CanonicalTriple>, TaxonomyError> {
    let system = "You map free-text classification terms onto a closed canonical taxonomy. \
        Respond with JSON only: {\"category\": ..., \"subcategory\": ..., \"type_of_question\": ...}. \
        Use null for any field that cannot be confidently matched.";
    let user = format!(
        "Canonical taxonomy:\n{}\n\nQuestion:\n{question_stem}\n\nFree-text terms to map:\n\
        category={free_cat}\nsubcategory={free_sub}\ntype_of_question={free_type}",
        render_taxonomy_context(),
    );

    let response = gateway
        .complete(
            system,
            &user,
            &GenerationParams {
                max_tokens: 256,
                temperature: 0.1,
                system_prompt: None,
            },
        )
        .await?;

    let parsed: MatchResponse = parse_json_response(&response.text)?;

    let (Some(category), Some(subcategory), Some(type_of_question)) =
        (parsed.category, parsed.subcategory, parsed.type_of_question)
    else {
        return Ok(None);
    };

    if !valid_path(&category, &subcategory, &type_of_question) {
        return Ok(None);
    }

    let canonical_sub = canonical_subcategory_name(&subcategory).unwrap_or(&subcategory).to_string();
    let canonical_type = canonical_type_name(&canonical_sub, &type_of_question)
        .unwrap_or(&type_of_question)
        .to_string();
    let canonical_cat = find_category_entry(&category).map(|c| c.category).unwrap_or(&category).to_string();

    Ok(Some(CanonicalTriple {
        category: canonical_cat,
        subcategory: canonical_sub,
        type_of_question: canonical_type,
    }))
}

/// The three-step resolution policy (§4.1): try context-aware semantic
/// match first; fall back to independently normalizing subcategory and
/// type and deriving the category deterministically.
pub async fn resolve(
    gateway: &LlmGateway,
    free_cat: &str,
    free_sub: &str,
    free_type: &str,
    question_stem: &str,
) -> Result<Option<CanonicalTriple>, TaxonomyError> {
    if let Some(triple) = semantic_match(gateway, free_cat, free_sub, free_type, question_stem).await? {
        return Ok(Some(triple));
    }

    let Some(subcategory) = canonical_subcategory_name(free_sub) else {
        return Ok(None);
    };
    let Some(type_of_question) = canonical_type_name(subcategory, free_type) else {
        return Ok(None);
    };
    let Some(category) = lookup_category_by(subcategory, type_of_question) else {
        return Ok(None);
    };

    Ok(Some(CanonicalTriple {
        category: category.to_string(),
        subcategory: subcategory.to_string(),
        type_of_question: type_of_question.to_string(),
    }))
}

pub(crate) fn render_taxonomy_context() -> String {
    let mut out = String::new();
    for category in TAXONOMY {
        out.push_str(category.category);
        out.push('\n');
        for sub in category.subcategories {
            out.push_str("  - ");
            out.push_str(sub.subcategory);
            out.push_str(": ");
            out.push_str(&sub.types.join(", "));
            out.push('\n');
        }
    }
    out
}

/// The category that owns `subcategory`, ignoring type. Used by the
/// planner's per-category mastery rollup, where only the subcategory is
/// known.
pub fn category_for_subcategory(subcategory: &str) -> Option<&'static str> {
    TAXONOMY
        .iter()
        .find(|c| c.subcategories.iter().any(|s| s.subcategory.eq_ignore_ascii_case(subcategory)))
        .map(|c| c.category)
}

/// Baseline quota for a category in a 12-question pack (§4.7), or `None`
/// if the category is unrecognized.
pub fn baseline_quota(category: &str) -> Option<u32> {
    BASELINE_CATEGORY_QUOTAS
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(category))
        .map(|(_, q)| *q)
}
