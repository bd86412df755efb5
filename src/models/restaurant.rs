use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// A catalogued restaurant with bilingual metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    /// Unique identifier
    pub id: Uuid,

    /// English display name
    pub name: String,

    /// Hebrew display name
    pub name_he: String,

    pub address: String,

    /// English long-form description
    pub description: String,

    /// Hebrew long-form description
    pub description_he: String,

    /// English cuisine type
    #[serde(rename = "type")]
    pub cuisine: String,

    /// Hebrew cuisine type
    pub type_he: String,

    /// Editorial score (0-10), fixed at import time
    pub madad_number: f64,

    /// Review date, `YYYY-MM-DD`
    pub date: String,

    pub youtube_url: String,
    pub video_id: String,

    /// Unique URL slug
    pub slug: String,

    /// Mean of all user review scores, owned by the score aggregator
    pub user_score: Option<f64>,

    /// Number of user reviews, owned by the score aggregator
    pub user_review_count: Option<u32>,

    /// Semantic search vector, owned by the embedding backfill
    pub embedding: Option<Vec<f32>>,
}

impl Restaurant {
    /// Build a restaurant from an import record, deriving a slug and video id when absent
    pub fn from_import(record: NewRestaurant) -> Self {
        let slug = if record.slug.trim().is_empty() {
            slugify(&record.name)
        } else {
            record.slug
        };
        let video_id = if record.video_id.is_empty() {
            extract_video_id(&record.youtube_url)
        } else {
            record.video_id
        };

        Self {
            id: Uuid::new_v4(),
            name: record.name,
            name_he: record.name_he,
            address: record.address,
            description: record.description,
            description_he: record.description_he,
            cuisine: record.cuisine,
            type_he: record.type_he,
            madad_number: record.madad_number,
            date: record.date,
            youtube_url: record.youtube_url,
            video_id,
            slug,
            user_score: None,
            user_review_count: None,
            embedding: None,
        }
    }

    /// Text of one searchable field
    pub fn field_text(&self, field: SearchField) -> &str {
        match field {
            SearchField::Name => &self.name,
            SearchField::NameHe => &self.name_he,
            SearchField::Address => &self.address,
            SearchField::Type => &self.cuisine,
            SearchField::TypeHe => &self.type_he,
            SearchField::Description => &self.description,
            SearchField::DescriptionHe => &self.description_he,
        }
    }

    /// Text used to generate the semantic search embedding
    pub fn embedding_text(&self) -> String {
        [
            self.name.as_str(),
            self.name_he.as_str(),
            self.cuisine.as_str(),
            self.type_he.as_str(),
            self.address.as_str(),
            self.description.as_str(),
            self.description_he.as_str(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(". ")
    }

    pub fn has_embedding(&self) -> bool {
        self.embedding.as_ref().is_some_and(|e| !e.is_empty())
    }

    pub fn to_card(&self) -> RestaurantCard {
        RestaurantCard::from(self)
    }
}

/// Restaurant projection for list and search results.
///
/// Omits the embedding vector and both long-form descriptions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantCard {
    pub id: Uuid,
    pub name: String,
    pub name_he: String,
    pub address: String,
    #[serde(rename = "type")]
    pub cuisine: String,
    pub type_he: String,
    pub madad_number: f64,
    pub date: String,
    pub youtube_url: String,
    pub video_id: String,
    pub slug: String,
    pub user_score: Option<f64>,
    pub user_review_count: Option<u32>,
}

impl From<&Restaurant> for RestaurantCard {
    fn from(r: &Restaurant) -> Self {
        Self {
            id: r.id,
            name: r.name.clone(),
            name_he: r.name_he.clone(),
            address: r.address.clone(),
            cuisine: r.cuisine.clone(),
            type_he: r.type_he.clone(),
            madad_number: r.madad_number,
            date: r.date.clone(),
            youtube_url: r.youtube_url.clone(),
            video_id: r.video_id.clone(),
            slug: r.slug.clone(),
            user_score: r.user_score,
            user_review_count: r.user_review_count,
        }
    }
}

impl From<Restaurant> for RestaurantCard {
    fn from(r: Restaurant) -> Self {
        Self::from(&r)
    }
}

/// A semantic search hit with its cosine similarity to the query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredRestaurant {
    #[serde(flatten)]
    pub restaurant: RestaurantCard,
    pub similarity: f32,
}

/// Import record, as produced by the CSV export
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct NewRestaurant {
    pub name: String,
    pub name_he: String,
    pub address: String,
    pub description: String,
    pub description_he: String,
    #[serde(rename = "type")]
    pub cuisine: String,
    pub type_he: String,
    pub madad_number: f64,
    pub date: String,
    pub youtube_url: String,
    pub video_id: String,
    pub slug: String,
}

/// Caller's display language
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Language {
    #[default]
    He,
    En,
}

impl Language {
    pub fn other(self) -> Self {
        match self {
            Language::He => Language::En,
            Language::En => Language::He,
        }
    }
}

/// Ordering for catalog listings, always descending
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, EnumString, Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum SortBy {
    #[default]
    Madad,
    UserScore,
    Date,
}

/// Text fields with their own search index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SearchField {
    Name,
    NameHe,
    Address,
    Type,
    TypeHe,
    Description,
    DescriptionHe,
}

impl SearchField {
    pub const ALL: [SearchField; 7] = [
        SearchField::Name,
        SearchField::NameHe,
        SearchField::Address,
        SearchField::Type,
        SearchField::TypeHe,
        SearchField::Description,
        SearchField::DescriptionHe,
    ];

    pub fn name_in(lang: Language) -> Self {
        match lang {
            Language::He => SearchField::NameHe,
            Language::En => SearchField::Name,
        }
    }

    pub fn type_in(lang: Language) -> Self {
        match lang {
            Language::He => SearchField::TypeHe,
            Language::En => SearchField::Type,
        }
    }

    pub fn description_in(lang: Language) -> Self {
        match lang {
            Language::He => SearchField::DescriptionHe,
            Language::En => SearchField::Description,
        }
    }

    pub fn is_description(self) -> bool {
        matches!(self, SearchField::Description | SearchField::DescriptionHe)
    }
}

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").expect("valid regex"));
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_]+").expect("valid regex"));
static DASH_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("valid regex"));
static VIDEO_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?&]v=([a-zA-Z0-9_-]{11})").expect("valid regex"));

/// URL-friendly slug
pub fn slugify(text: &str) -> String {
    let lower = text.trim().to_lowercase();
    let stripped = NON_WORD.replace_all(&lower, "");
    let dashed = SEPARATORS.replace_all(&stripped, "-");
    let collapsed = DASH_RUNS.replace_all(&dashed, "-");
    collapsed.trim_matches('-').to_string()
}

/// YouTube video id from a watch URL, empty when absent
pub fn extract_video_id(url: &str) -> String {
    VIDEO_ID
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}
