use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum MovieEvent {
    MovieAdded(MovieAddedData),
}

impl DomainEvent for MovieEvent {
    fn event_type(&self) -> &'static str {
        match self {
            MovieEvent::MovieAdded(_) => "MovieAdded",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieAddedData {
    pub movie_id: AggregateId,
    pub title: String,
    pub description: String,
    pub duration_minutes: u32,
    pub poster_url: String,
    pub added_at: DateTime<Utc>,
}
