use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub mod badge;
pub mod module;
pub mod progress_log;
pub mod quest;
pub mod quiz;
pub mod user;

/// Current time as a fixed-width RFC 3339 string, so stored timestamps
/// order correctly as plain strings.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Stored shape of every record: entity fields plus server timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stamped<E> {
    pub created_at: String,
    pub updated_at: String,
    #[serde(flatten)]
    pub data: E,
}

impl<E> Stamped<E> {
    pub fn new(data: E) -> Self {
        let now = now_timestamp();
        Self {
            created_at: now.clone(),
            updated_at: now,
            data,
        }
    }
}

/// A stored record as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct Record<E> {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(flatten)]
    pub data: E,
}

impl<E> Record<E> {
    pub fn new(id: impl Into<String>, stamped: Stamped<E>) -> Self {
        Self {
            id: id.into(),
            created_at: stamped.created_at,
            updated_at: stamped.updated_at,
            data: stamped.data,
        }
    }
}

/// Blank optional strings count as absent.
pub(crate) fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        title: String,
        #[serde(default, deserialize_with = "empty_as_none")]
        reward: Option<String>,
    }

    #[test]
    fn records_flatten_entity_fields() {
        let stamped = Stamped::new(Sample {
            title: "Anti-doping basics".into(),
            reward: None,
        });
        let record = Record::new("abc", stamped);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "abc");
        assert_eq!(json["title"], "Anti-doping basics");
        assert!(json["created_at"].is_string());
    }

    #[test]
    fn blank_strings_deserialize_as_none() {
        let sample: Sample = serde_json::from_str(r#"{"title":"x","reward":"  "}"#).unwrap();
        assert_eq!(sample.reward, None);

        let sample: Sample = serde_json::from_str(r#"{"title":"x"}"#).unwrap();
        assert_eq!(sample.reward, None);
    }

    #[test]
    fn timestamps_sort_chronologically_as_strings() {
        let earlier = now_timestamp();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let later = now_timestamp();
        assert!(earlier < later);
        assert!(earlier.ends_with('Z'));
    }
}
