use serde::{Deserialize, Serialize};

// --- Source enums ---

/// Editorial weight of a content origin. Drives the source-signal score used
/// to order variants and arbitrate headlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCategory {
    Official,
    Press,
    Other,
}

impl SourceCategory {
    /// Source signal score: official=3, press=2, other=1.
    pub fn source_signal(&self) -> i32 {
        match self {
            SourceCategory::Official => 3,
            SourceCategory::Press => 2,
            SourceCategory::Other => 1,
        }
    }
}

impl std::fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceCategory::Official => write!(f, "official"),
            SourceCategory::Press => write!(f, "press"),
            SourceCategory::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for SourceCategory {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "official" => Ok(Self::Official),
            "press" => Ok(Self::Press),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown SourceCategory: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestMethod {
    Rss,
    Html,
    Api,
    Reddit,
    Twitter,
}

impl std::fmt::Display for IngestMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestMethod::Rss => write!(f, "rss"),
            IngestMethod::Html => write!(f, "html"),
            IngestMethod::Api => write!(f, "api"),
            IngestMethod::Reddit => write!(f, "reddit"),
            IngestMethod::Twitter => write!(f, "twitter"),
        }
    }
}

impl std::str::FromStr for IngestMethod {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "rss" => Ok(Self::Rss),
            "html" => Ok(Self::Html),
            "api" => Ok(Self::Api),
            "reddit" => Ok(Self::Reddit),
            "twitter" => Ok(Self::Twitter),
            other => Err(format!("unknown IngestMethod: {other}")),
        }
    }
}

/// Lifecycle of a source or candidate source.
/// Only `approved` sources participate in scheduled fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Candidate,
    QueuedForReview,
    Approved,
    Rejected,
}

impl std::fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceStatus::Candidate => write!(f, "candidate"),
            SourceStatus::QueuedForReview => write!(f, "queued_for_review"),
            SourceStatus::Approved => write!(f, "approved"),
            SourceStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for SourceStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "candidate" => Ok(Self::Candidate),
            "queued_for_review" => Ok(Self::QueuedForReview),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown SourceStatus: {other}")),
        }
    }
}

// --- Story enums ---

/// Primary classification of the real-world event a story describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Trade,
    Injury,
    Lineup,
    Recall,
    Waiver,
    Signing,
    Prospect,
    Game,
    Opinion,
    Other,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::Trade => write!(f, "trade"),
            EventType::Injury => write!(f, "injury"),
            EventType::Lineup => write!(f, "lineup"),
            EventType::Recall => write!(f, "recall"),
            EventType::Waiver => write!(f, "waiver"),
            EventType::Signing => write!(f, "signing"),
            EventType::Prospect => write!(f, "prospect"),
            EventType::Game => write!(f, "game"),
            EventType::Opinion => write!(f, "opinion"),
            EventType::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for EventType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "trade" => Ok(Self::Trade),
            "injury" => Ok(Self::Injury),
            "lineup" => Ok(Self::Lineup),
            "recall" => Ok(Self::Recall),
            "waiver" => Ok(Self::Waiver),
            "signing" => Ok(Self::Signing),
            "prospect" => Ok(Self::Prospect),
            "game" => Ok(Self::Game),
            "opinion" => Ok(Self::Opinion),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown EventType: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterStatus {
    Active,
    Archived,
    Merged,
}

impl std::fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusterStatus::Active => write!(f, "active"),
            ClusterStatus::Archived => write!(f, "archived"),
            ClusterStatus::Merged => write!(f, "merged"),
        }
    }
}

impl std::str::FromStr for ClusterStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            "merged" => Ok(Self::Merged),
            other => Err(format!("unknown ClusterStatus: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Article,
    Video,
    Podcast,
    SocialPost,
    ForumPost,
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentType::Article => write!(f, "article"),
            ContentType::Video => write!(f, "video"),
            ContentType::Podcast => write!(f, "podcast"),
            ContentType::SocialPost => write!(f, "social_post"),
            ContentType::ForumPost => write!(f, "forum_post"),
        }
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "article" => Ok(Self::Article),
            "video" => Ok(Self::Video),
            "podcast" => Ok(Self::Podcast),
            "social_post" => Ok(Self::SocialPost),
            "forum_post" => Ok(Self::ForumPost),
            other => Err(format!("unknown ContentType: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantStatus {
    Active,
    PendingCluster,
    Archived,
}

impl std::fmt::Display for VariantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VariantStatus::Active => write!(f, "active"),
            VariantStatus::PendingCluster => write!(f, "pending_cluster"),
            VariantStatus::Archived => write!(f, "archived"),
        }
    }
}

impl std::str::FromStr for VariantStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "pending_cluster" => Ok(Self::PendingCluster),
            "archived" => Ok(Self::Archived),
            other => Err(format!("unknown VariantStatus: {other}")),
        }
    }
}

// --- Submission enums ---

/// Processing state of a user-submitted link. Terminal once it leaves
/// `received`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Received,
    Published,
    PendingReview,
    Rejected,
    Duplicate,
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionStatus::Received => write!(f, "received"),
            SubmissionStatus::Published => write!(f, "published"),
            SubmissionStatus::PendingReview => write!(f, "pending_review"),
            SubmissionStatus::Rejected => write!(f, "rejected"),
            SubmissionStatus::Duplicate => write!(f, "duplicate"),
        }
    }
}

impl std::str::FromStr for SubmissionStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "received" => Ok(Self::Received),
            "published" => Ok(Self::Published),
            "pending_review" => Ok(Self::PendingReview),
            "rejected" => Ok(Self::Rejected),
            "duplicate" => Ok(Self::Duplicate),
            other => Err(format!("unknown SubmissionStatus: {other}")),
        }
    }
}

// --- Validation enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMethod {
    Llm,
    Keyword,
    Skip,
}

impl std::fmt::Display for ValidationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationMethod::Llm => write!(f, "llm"),
            ValidationMethod::Keyword => write!(f, "keyword"),
            ValidationMethod::Skip => write!(f, "skip"),
        }
    }
}

impl std::str::FromStr for ValidationMethod {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "llm" => Ok(Self::Llm),
            "keyword" => Ok(Self::Keyword),
            "skip" => Ok(Self::Skip),
            other => Err(format!("unknown ValidationMethod: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationResult {
    Approved,
    Rejected,
    Error,
}

impl std::fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationResult::Approved => write!(f, "approved"),
            ValidationResult::Rejected => write!(f, "rejected"),
            ValidationResult::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for ValidationResult {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown ValidationResult: {other}")),
        }
    }
}

// --- Entity types ---

/// Entity classification. Team entities are stored like any other but are
/// excluded from clustering comparisons and relevance decisions.
pub const ENTITY_TYPE_PLAYER: &str = "player";
pub const ENTITY_TYPE_COACH: &str = "coach";
pub const ENTITY_TYPE_TEAM: &str = "team";
pub const ENTITY_TYPE_STAFF: &str = "staff";

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn source_signal_ranking() {
        assert_eq!(SourceCategory::Official.source_signal(), 3);
        assert_eq!(SourceCategory::Press.source_signal(), 2);
        assert_eq!(SourceCategory::Other.source_signal(), 1);
    }

    #[test]
    fn event_type_display_fromstr_roundtrip() {
        for et in [
            EventType::Trade,
            EventType::Injury,
            EventType::Lineup,
            EventType::Recall,
            EventType::Waiver,
            EventType::Signing,
            EventType::Prospect,
            EventType::Game,
            EventType::Opinion,
            EventType::Other,
        ] {
            assert_eq!(EventType::from_str(&et.to_string()).unwrap(), et);
        }
    }

    #[test]
    fn source_status_queued_for_review_spelling() {
        assert_eq!(SourceStatus::QueuedForReview.to_string(), "queued_for_review");
        assert_eq!(
            SourceStatus::from_str("queued_for_review").unwrap(),
            SourceStatus::QueuedForReview
        );
    }

    #[test]
    fn unknown_values_are_rejected() {
        assert!(EventType::from_str("scrum").is_err());
        assert!(SubmissionStatus::from_str("accepted").is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&ContentType::SocialPost).unwrap();
        assert_eq!(json, "\"social_post\"");
        let back: ContentType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ContentType::SocialPost);
    }
}
