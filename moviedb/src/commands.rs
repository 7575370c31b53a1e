//! Subcommand handlers.
//!
//! Each handler takes the [`Models`] registry so it runs against either
//! backend; `main` wires in SQLite, the tests wire in the in-memory store.

use movies::validator::validate_movie;
use movies::{ErrorKind, Models, Movie, MovieRepository, Runtime, StoreError, ValidationErrors, Validator};
use serde::Serialize;

/// Fields supplied for a new movie.
#[derive(Debug, Clone)]
pub struct MovieInput {
    pub title: String,
    pub year: i32,
    pub runtime: Runtime,
    pub genres: Vec<String>,
}

/// Partial update; `None` leaves the stored value as it is.
#[derive(Debug, Clone, Default)]
pub struct MoviePatch {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub runtime: Option<Runtime>,
    pub genres: Option<Vec<String>>,
}

impl MoviePatch {
    fn apply(self, movie: &mut Movie) {
        if let Some(title) = self.title {
            movie.title = title;
        }
        if let Some(year) = self.year {
            movie.year = year;
        }
        if let Some(runtime) = self.runtime {
            movie.runtime = runtime;
        }
        if let Some(genres) = self.genres {
            movie.genres = genres;
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CommandError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            CommandError::Validation(_) => 2,
            CommandError::Store(e) => match e.kind() {
                ErrorKind::NotFound => 3,
                ErrorKind::EditConflict => 4,
                ErrorKind::Storage => 1,
            },
        }
    }
}

/// JSON envelope printed on success.
#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    pub movie: &'a Movie,
}

fn validate(movie: &Movie) -> Result<(), ValidationErrors> {
    let mut v = Validator::new();
    validate_movie(&mut v, movie);
    v.into_result()
}

#[tracing::instrument(level = "info", skip_all, fields(title = %input.title))]
pub async fn insert_movie<M: MovieRepository>(
    models: &Models<M>,
    input: MovieInput,
) -> Result<Movie, CommandError> {
    let mut movie = Movie::new(input.title, input.year, input.runtime, input.genres);
    validate(&movie)?;
    models.movies.insert(&mut movie).await?;
    tracing::info!(id = movie.id, "Created movie");
    Ok(movie)
}

#[tracing::instrument(level = "info", skip(models))]
pub async fn show_movie<M: MovieRepository>(
    models: &Models<M>,
    id: i64,
) -> Result<Movie, CommandError> {
    Ok(models.movies.get(id).await?)
}

/// Fetch, patch, validate and write back under the fetched version.
///
/// When `expected_version` is given and the stored version differs, the
/// command fails with an edit conflict before attempting the write.
#[tracing::instrument(level = "info", skip(models, patch))]
pub async fn update_movie<M: MovieRepository>(
    models: &Models<M>,
    id: i64,
    expected_version: Option<i32>,
    patch: MoviePatch,
) -> Result<Movie, CommandError> {
    let mut movie = models.movies.get(id).await?;
    if let Some(expected) = expected_version {
        if expected != movie.version {
            return Err(StoreError::EditConflict.into());
        }
    }

    patch.apply(&mut movie);
    validate(&movie)?;
    models.movies.update(&mut movie).await?;
    tracing::info!(id, version = movie.version, "Updated movie");
    Ok(movie)
}

#[tracing::instrument(level = "info", skip(models))]
pub async fn delete_movie<M: MovieRepository>(
    models: &Models<M>,
    id: i64,
) -> Result<(), CommandError> {
    models.movies.delete(id).await?;
    tracing::info!(id, "Deleted movie");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use movies::QueryTimeouts;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Records the name of every span opened while installed.
    #[derive(Clone, Default)]
    struct SpanNames(Arc<Mutex<Vec<&'static str>>>);

    impl<S: tracing::Subscriber> Layer<S> for SpanNames {
        fn on_new_span(
            &self,
            attrs: &tracing::span::Attributes<'_>,
            _id: &tracing::span::Id,
            _ctx: Context<'_, S>,
        ) {
            self.0.lock().unwrap().push(attrs.metadata().name());
        }
    }

    fn models() -> Models<movies::MemoryMovieRepository> {
        Models::in_memory(QueryTimeouts::default())
    }

    fn input() -> MovieInput {
        MovieInput {
            title: "Arrival".to_string(),
            year: 2016,
            runtime: Runtime(116),
            genres: vec!["sci-fi".to_string(), "drama".to_string()],
        }
    }

    #[tokio::test]
    async fn test_insert_then_show() {
        let models = models();
        let created = insert_movie(&models, input()).await.unwrap();
        assert_eq!(created.version, 1);
        let shown = show_movie(&models, created.id).await.unwrap();
        assert_eq!(shown, created);
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_without_storing() {
        let models = models();
        let mut bad = input();
        bad.genres.clear();
        let err = insert_movie(&models, bad).await.unwrap_err();
        assert_eq!(err.exit_code(), 2);
        match err {
            CommandError::Validation(v) => {
                assert_eq!(v.get("genres"), Some("must contain at least 1 genre"))
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(models.movies.backend_calls(), 0);
    }

    #[tokio::test]
    async fn test_update_applies_patch() {
        let models = models();
        let created = insert_movie(&models, input()).await.unwrap();
        let patch = MoviePatch {
            runtime: Some(Runtime(118)),
            ..MoviePatch::default()
        };
        let updated = update_movie(&models, created.id, Some(1), patch).await.unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.runtime, Runtime(118));
        assert_eq!(updated.title, "Arrival");
    }

    #[tokio::test]
    async fn test_update_with_wrong_expected_version() {
        let models = models();
        let created = insert_movie(&models, input()).await.unwrap();
        let err = update_movie(&models, created.id, Some(5), MoviePatch::default())
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 4);
        assert_eq!(show_movie(&models, created.id).await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_patch() {
        let models = models();
        let created = insert_movie(&models, input()).await.unwrap();
        let patch = MoviePatch {
            year: Some(1800),
            ..MoviePatch::default()
        };
        let err = update_movie(&models, created.id, None, patch).await.unwrap_err();
        assert!(matches!(err, CommandError::Validation(_)));
        assert_eq!(show_movie(&models, created.id).await.unwrap().year, 2016);
    }

    #[tokio::test]
    async fn test_delete_missing_movie() {
        let models = models();
        let err = delete_movie(&models, 99).await.unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test]
    async fn test_handlers_open_spans() {
        let names = SpanNames::default();
        let subscriber = tracing_subscriber::registry().with(names.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let models = models();
        let created = insert_movie(&models, input()).await.unwrap();
        show_movie(&models, created.id).await.unwrap();
        update_movie(&models, created.id, None, MoviePatch::default())
            .await
            .unwrap();
        delete_movie(&models, created.id).await.unwrap();

        let recorded = names.0.lock().unwrap().clone();
        assert_eq!(
            recorded,
            vec!["insert_movie", "show_movie", "update_movie", "delete_movie"]
        );
    }

    #[test]
    fn test_envelope_shape() {
        let mut movie = Movie::new("Arrival", 2016, 116, ["sci-fi"]);
        movie.id = 3;
        movie.version = 1;
        let json = serde_json::to_value(Envelope { movie: &movie }).unwrap();
        assert_eq!(json["movie"]["runtime"], "116 mins");
        assert_eq!(json["movie"]["id"], 3);
    }
}
