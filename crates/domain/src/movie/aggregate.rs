use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::command::Command;

use super::{MovieAddedData, MovieError, MovieEvent};

pub const DEFAULT_DURATION_MINUTES: u32 = 90;

/// A film that showings can be scheduled for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Movie {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    title: String,
    description: String,
    duration_minutes: u32,
    poster_url: String,
    created_at: Option<DateTime<Utc>>,
}

impl Aggregate for Movie {
    type Event = MovieEvent;
    type Error = MovieError;

    fn aggregate_type() -> &'static str {
        "Movie"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            MovieEvent::MovieAdded(data) => {
                self.id = Some(data.movie_id);
                self.title = data.title;
                self.description = data.description;
                self.duration_minutes = data.duration_minutes;
                self.poster_url = data.poster_url;
                self.created_at = Some(data.added_at);
            }
        }
    }
}

impl Movie {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    pub fn poster_url(&self) -> &str {
        &self.poster_url
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn add(&self, cmd: &AddMovie) -> Result<Vec<MovieEvent>, MovieError> {
        if self.id.is_some() {
            return Err(MovieError::AlreadyAdded);
        }

        let title = cmd.title.trim();
        if title.is_empty() {
            return Err(MovieError::TitleRequired);
        }

        let duration_minutes = cmd.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
        if duration_minutes == 0 {
            return Err(MovieError::InvalidDuration(duration_minutes));
        }

        Ok(vec![MovieEvent::MovieAdded(MovieAddedData {
            movie_id: cmd.movie_id,
            title: title.to_string(),
            description: cmd.description.clone().unwrap_or_default(),
            duration_minutes,
            poster_url: cmd.poster_url.clone().unwrap_or_default(),
            added_at: Utc::now(),
        })])
    }
}

/// Command to add a movie to the catalog.
#[derive(Debug, Clone)]
pub struct AddMovie {
    pub movie_id: AggregateId,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: Option<u32>,
    pub poster_url: Option<String>,
}

impl AddMovie {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            movie_id: AggregateId::new(),
            title: title.into(),
            description: None,
            duration_minutes: None,
            poster_url: None,
        }
    }
}

impl Command for AddMovie {
    type Aggregate = Movie;

    fn aggregate_id(&self) -> AggregateId {
        self.movie_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn added(cmd: &AddMovie) -> Movie {
        let mut movie = Movie::default();
        let events = movie.add(cmd).unwrap();
        movie.apply_events(events);
        movie
    }

    #[test]
    fn defaults_are_filled_in() {
        let movie = added(&AddMovie::new("  Metropolis "));

        assert_eq!(movie.title(), "Metropolis");
        assert_eq!(movie.description(), "");
        assert_eq!(movie.duration_minutes(), DEFAULT_DURATION_MINUTES);
        assert_eq!(movie.poster_url(), "");
        assert!(movie.created_at().is_some());
    }

    #[test]
    fn blank_title_is_rejected() {
        let result = Movie::default().add(&AddMovie::new("   "));
        assert!(matches!(result, Err(MovieError::TitleRequired)));
    }

    #[test]
    fn zero_duration_is_rejected() {
        let mut cmd = AddMovie::new("Short");
        cmd.duration_minutes = Some(0);
        assert!(matches!(
            Movie::default().add(&cmd),
            Err(MovieError::InvalidDuration(0))
        ));
    }

    #[test]
    fn cannot_add_twice() {
        let cmd = AddMovie::new("Nosferatu");
        let movie = added(&cmd);
        assert!(matches!(movie.add(&cmd), Err(MovieError::AlreadyAdded)));
    }
}
