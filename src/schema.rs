use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use utoipa::ToSchema;

/// Wire key wrapping the whole analysis.
pub const ROOT_KEY: &str = "SEO_Analysis_and_Enhancement_Suggestions";

/// The five per-element analysis sections. Each is required to exist in a
/// valid payload, though its value may be null or an empty mapping.
pub const SECTION_KEYS: [&str; 5] = [
    "Title_Analysis_and_Suggestions",
    "Meta_Description_Analysis_and_Suggestions",
    "H1_Tag_Analysis_and_Suggestions",
    "Content_Analysis_and_Suggestions",
    "Link_Analysis_and_Suggestions",
];

pub const ASSESSMENT_KEY: &str = "Overall_SEO_Assessment";
pub const KEYWORD_SUGGESTIONS_KEY: &str = "Keyword_Optimization_Suggestions";
pub const SCHEMA_MARKUP_KEY: &str = "Schema_Markup_Suggestion";
pub const MOBILE_KEY: &str = "Mobile_Optimization_Suggestion";
pub const PAGE_SPEED_KEY: &str = "Page_Speed_Suggestion";

const ANALYSIS_FIELD: &str = "Analysis";
const SUGGESTIONS_FIELD: &str = "Suggestions";

/// Versioned description of the target shape, shared between prompt building
/// and validation so the two can never disagree about what "valid" means.
pub struct SchemaDescription {
    pub version: &'static str,
}

static CURRENT: SchemaDescription = SchemaDescription { version: "1" };

impl SchemaDescription {
    pub fn current() -> &'static SchemaDescription {
        &CURRENT
    }

    /// Render the textual schema block embedded into completion prompts.
    pub fn prompt_block(&self) -> String {
        let suggestion = json!({
            "Suggestion": "string|null",
            "Title": "string|null",
            "Meta_Description": "string|null",
            "H1_Tag": "string|null",
            "Keyword": "string|null",
            "Reason": "string|null",
            "Insertion": "string|null",
            "Frequency": "integer|null",
        });
        let section = json!({
            "Analysis": "string|null",
            "Suggestions": [suggestion.clone()],
        });

        let mut inner = Map::new();
        for key in SECTION_KEYS {
            inner.insert(key.to_string(), section.clone());
        }
        inner.insert(ASSESSMENT_KEY.to_string(), json!("string|null"));
        inner.insert(KEYWORD_SUGGESTIONS_KEY.to_string(), json!([suggestion]));
        inner.insert(SCHEMA_MARKUP_KEY.to_string(), json!("string|null"));
        inner.insert(MOBILE_KEY.to_string(), json!("string|null"));
        inner.insert(PAGE_SPEED_KEY.to_string(), json!("string|null"));

        let mut root = Map::new();
        root.insert(ROOT_KEY.to_string(), Value::Object(inner));
        Value::Object(root).to_string()
    }
}

/// One improvement suggestion. Every field is optional; a suggestion is
/// whatever subset the backend chose to fill in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct SuggestionItem {
    #[serde(rename = "Suggestion")]
    pub suggestion: Option<String>,
    #[serde(rename = "Title")]
    pub title: Option<String>,
    #[serde(rename = "Meta_Description")]
    pub meta_description: Option<String>,
    #[serde(rename = "H1_Tag")]
    pub h1_tag: Option<String>,
    #[serde(rename = "Keyword")]
    pub keyword: Option<String>,
    #[serde(rename = "Reason")]
    pub reason: Option<String>,
    #[serde(rename = "Insertion")]
    pub insertion: Option<String>,
    #[serde(rename = "Frequency")]
    pub frequency: Option<u64>,
}

/// A per-element section: free-text analysis plus its suggestion list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct SectionAnalysis {
    #[serde(rename = "Analysis")]
    pub analysis: Option<String>,
    #[serde(rename = "Suggestions", default)]
    pub suggestions: Vec<SuggestionItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct SeoAnalysis {
    #[serde(rename = "Title_Analysis_and_Suggestions")]
    pub title: SectionAnalysis,
    #[serde(rename = "Meta_Description_Analysis_and_Suggestions")]
    pub meta_description: SectionAnalysis,
    #[serde(rename = "H1_Tag_Analysis_and_Suggestions")]
    pub h1_tag: SectionAnalysis,
    #[serde(rename = "Content_Analysis_and_Suggestions")]
    pub content: SectionAnalysis,
    #[serde(rename = "Link_Analysis_and_Suggestions")]
    pub links: SectionAnalysis,
    #[serde(rename = "Overall_SEO_Assessment")]
    pub overall_assessment: Option<String>,
    #[serde(rename = "Keyword_Optimization_Suggestions", default)]
    pub keyword_suggestions: Vec<SuggestionItem>,
    #[serde(rename = "Schema_Markup_Suggestion")]
    pub schema_markup: Option<String>,
    #[serde(rename = "Mobile_Optimization_Suggestion")]
    pub mobile_optimization: Option<String>,
    #[serde(rename = "Page_Speed_Suggestion")]
    pub page_speed: Option<String>,
}

/// The validated target structure returned to callers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct SeoAnalysisResponse {
    #[serde(rename = "SEO_Analysis_and_Enhancement_Suggestions")]
    pub analysis: SeoAnalysis,
}

/// Structurally validate a normalized payload against the target shape.
///
/// Validation is lenient where it can be: scalar fields of the wrong type
/// become absent, suggestion lists default to empty, and `Frequency` accepts
/// integer-shaped strings. A container of the wrong kind (a list where a
/// mapping is expected, or vice versa) is a hard failure. Failures report the
/// dotted paths of every offending field rather than stopping at the first.
pub fn validate(payload: &Value) -> Result<SeoAnalysisResponse, Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    let Some(root) = payload.as_object() else {
        return Err(vec!["$".to_string()]);
    };

    let inner = match root.get(ROOT_KEY) {
        Some(Value::Object(map)) => map,
        Some(_) | None => return Err(vec![ROOT_KEY.to_string()]),
    };

    let sections: Vec<SectionAnalysis> = SECTION_KEYS
        .iter()
        .map(|key| validate_section(inner, key, &mut errors))
        .collect();

    let keyword_path = format!("{}.{}", ROOT_KEY, KEYWORD_SUGGESTIONS_KEY);
    let keyword_suggestions =
        validate_suggestions(inner.get(KEYWORD_SUGGESTIONS_KEY), &keyword_path, &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }

    let mut sections = sections.into_iter();
    Ok(SeoAnalysisResponse {
        analysis: SeoAnalysis {
            title: sections.next().unwrap_or_default(),
            meta_description: sections.next().unwrap_or_default(),
            h1_tag: sections.next().unwrap_or_default(),
            content: sections.next().unwrap_or_default(),
            links: sections.next().unwrap_or_default(),
            overall_assessment: opt_string(inner.get(ASSESSMENT_KEY)),
            keyword_suggestions,
            schema_markup: opt_string(inner.get(SCHEMA_MARKUP_KEY)),
            mobile_optimization: opt_string(inner.get(MOBILE_KEY)),
            page_speed: opt_string(inner.get(PAGE_SPEED_KEY)),
        },
    })
}

fn validate_section(
    inner: &Map<String, Value>,
    key: &str,
    errors: &mut Vec<String>,
) -> SectionAnalysis {
    let path = format!("{}.{}", ROOT_KEY, key);
    match inner.get(key) {
        None => {
            errors.push(path);
            SectionAnalysis::default()
        }
        Some(Value::Null) => SectionAnalysis::default(),
        Some(Value::Object(section)) => SectionAnalysis {
            analysis: opt_string(section.get(ANALYSIS_FIELD)),
            suggestions: validate_suggestions(
                section.get(SUGGESTIONS_FIELD),
                &format!("{}.{}", path, SUGGESTIONS_FIELD),
                errors,
            ),
        },
        Some(_) => {
            errors.push(path);
            SectionAnalysis::default()
        }
    }
}

fn validate_suggestions(
    value: Option<&Value>,
    path: &str,
    errors: &mut Vec<String>,
) -> Vec<SuggestionItem> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| match item.as_object() {
                Some(map) => Some(suggestion_from(map)),
                None => {
                    errors.push(format!("{}[{}]", path, index));
                    None
                }
            })
            .collect(),
        Some(_) => {
            errors.push(path.to_string());
            Vec::new()
        }
    }
}

fn suggestion_from(map: &Map<String, Value>) -> SuggestionItem {
    SuggestionItem {
        suggestion: opt_string(map.get("Suggestion")),
        title: opt_string(map.get("Title")),
        meta_description: opt_string(map.get("Meta_Description")),
        h1_tag: opt_string(map.get("H1_Tag")),
        keyword: opt_string(map.get("Keyword")),
        reason: opt_string(map.get("Reason")),
        insertion: opt_string(map.get("Insertion")),
        frequency: opt_frequency(map.get("Frequency")),
    }
}

fn opt_string(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

/// Integers, or strings that parse as non-negative integers. Anything else
/// is treated as absent rather than failing validation.
fn opt_frequency(value: Option<&Value>) -> Option<u64> {
    match value {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}
