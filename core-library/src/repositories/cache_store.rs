//! Persistent store for cached series, season and episode metadata
//!
//! All reads and collection writes are scoped to one user. Garbage collection
//! is age-scoped and spans every user.

use crate::error::{LibraryError, Result};
use crate::models::{Episode, EpisodeId, Season, SeasonId, SeriesDetails, SeriesId, UserId};
use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Sqlite, SqlitePool};
use tracing::{debug, error, instrument};

const SEASON_COLUMNS: &str =
    "user_id, season_id, series_id, name, index_number, episode_count, image_tag, last_write";

const EPISODE_COLUMNS: &str = "user_id, episode_id, series_id, season_id, name, overview, \
     index_number, run_time_ticks, premiere_date, image_tag, playback_position_ticks, played, \
     is_favorite, last_write";

/// Storage contract used by the read path, prefetch and maintenance.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Seasons of a series, by index ascending with specials last.
    async fn get_seasons(&self, user_id: UserId, series_id: SeriesId) -> Result<Vec<Season>>;

    /// Latest `last_write` across the series' seasons.
    async fn get_seasons_last_write(
        &self,
        user_id: UserId,
        series_id: SeriesId,
    ) -> Result<Option<i64>>;

    /// Insert or overwrite individual seasons.
    async fn put_seasons(&self, seasons: &[Season]) -> Result<()>;

    /// Atomically swap the whole season list of a series.
    async fn replace_seasons_of_series(
        &self,
        user_id: UserId,
        series_id: SeriesId,
        seasons: &[Season],
    ) -> Result<()>;

    /// Episodes of a season, by index ascending.
    async fn get_episodes(&self, user_id: UserId, season_id: SeasonId) -> Result<Vec<Episode>>;

    /// Every cached episode of a series, grouped by season order.
    async fn get_episodes_of_series(
        &self,
        user_id: UserId,
        series_id: SeriesId,
    ) -> Result<Vec<Episode>>;

    /// Latest `last_write` across the season's episodes.
    async fn get_episodes_last_write(
        &self,
        user_id: UserId,
        season_id: SeasonId,
    ) -> Result<Option<i64>>;

    /// Insert or overwrite individual episodes.
    async fn put_episodes(&self, episodes: &[Episode]) -> Result<()>;

    /// Atomically swap the whole episode list of a season.
    async fn replace_episodes_of_season(
        &self,
        user_id: UserId,
        season_id: SeasonId,
        episodes: &[Episode],
    ) -> Result<()>;

    /// Update playback fields of one episode. Returns whether a row matched.
    async fn update_playback_state(
        &self,
        user_id: UserId,
        episode_id: EpisodeId,
        position_ticks: i64,
        played: bool,
    ) -> Result<bool>;

    async fn delete_episodes_of_series(&self, user_id: UserId, series_id: SeriesId) -> Result<u64>;

    async fn delete_seasons_of_series(&self, user_id: UserId, series_id: SeriesId) -> Result<u64>;

    /// Delete episodes of all users written strictly before `cutoff_millis`.
    async fn delete_episodes_older_than(&self, cutoff_millis: i64) -> Result<u64>;

    /// Delete seasons of all users written strictly before `cutoff_millis`.
    async fn delete_seasons_older_than(&self, cutoff_millis: i64) -> Result<u64>;

    /// Number of series with at least one cached season for the user.
    async fn count_distinct_cached_series(&self, user_id: UserId) -> Result<u64>;

    async fn get_series_details(
        &self,
        user_id: UserId,
        series_id: SeriesId,
    ) -> Result<Option<SeriesDetails>>;

    async fn put_series_details(&self, details: &SeriesDetails) -> Result<()>;

    /// Delete series details of all users written strictly before `cutoff_millis`.
    async fn delete_series_details_older_than(&self, cutoff_millis: i64) -> Result<u64>;
}

/// SQLite implementation of [`CacheStore`].
#[derive(Clone)]
pub struct SqliteCacheStore {
    pool: SqlitePool,
}

impl SqliteCacheStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn upsert_season(season: &Season) -> Query<'static, Sqlite, SqliteArguments<'static>> {
        sqlx::query(
            r#"
            INSERT INTO cached_seasons (
                user_id, season_id, series_id, name, index_number,
                episode_count, image_tag, last_write
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, season_id) DO UPDATE SET
                series_id = excluded.series_id,
                name = excluded.name,
                index_number = excluded.index_number,
                episode_count = excluded.episode_count,
                image_tag = excluded.image_tag,
                last_write = excluded.last_write
            "#,
        )
        .bind(season.user_id)
        .bind(season.season_id)
        .bind(season.series_id)
        .bind(season.name.clone())
        .bind(season.index_number)
        .bind(season.episode_count)
        .bind(season.image_tag.clone())
        .bind(season.last_write)
    }

    fn upsert_episode(episode: &Episode) -> Query<'static, Sqlite, SqliteArguments<'static>> {
        sqlx::query(
            r#"
            INSERT INTO cached_episodes (
                user_id, episode_id, series_id, season_id, name, overview,
                index_number, run_time_ticks, premiere_date, image_tag,
                playback_position_ticks, played, is_favorite, last_write
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, episode_id) DO UPDATE SET
                series_id = excluded.series_id,
                season_id = excluded.season_id,
                name = excluded.name,
                overview = excluded.overview,
                index_number = excluded.index_number,
                run_time_ticks = excluded.run_time_ticks,
                premiere_date = excluded.premiere_date,
                image_tag = excluded.image_tag,
                playback_position_ticks = excluded.playback_position_ticks,
                played = excluded.played,
                is_favorite = excluded.is_favorite,
                last_write = excluded.last_write
            "#,
        )
        .bind(episode.user_id)
        .bind(episode.episode_id)
        .bind(episode.series_id)
        .bind(episode.season_id)
        .bind(episode.name.clone())
        .bind(episode.overview.clone())
        .bind(episode.index_number)
        .bind(episode.run_time_ticks)
        .bind(episode.premiere_date.clone())
        .bind(episode.image_tag.clone())
        .bind(episode.playback_position_ticks)
        .bind(episode.played)
        .bind(episode.is_favorite)
        .bind(episode.last_write)
    }

    fn check_season_scope(user_id: UserId, series_id: SeriesId, seasons: &[Season]) -> Result<()> {
        match seasons
            .iter()
            .find(|s| s.user_id != user_id || s.series_id != series_id)
        {
            Some(season) => Err(LibraryError::InvalidInput {
                field: "seasons".to_string(),
                message: format!(
                    "season {} does not belong to series {} of user {}",
                    season.season_id, series_id, user_id
                ),
            }),
            None => Ok(()),
        }
    }

    fn check_episode_scope(
        user_id: UserId,
        season_id: SeasonId,
        episodes: &[Episode],
    ) -> Result<()> {
        match episodes
            .iter()
            .find(|e| e.user_id != user_id || e.season_id != season_id)
        {
            Some(episode) => Err(LibraryError::InvalidInput {
                field: "episodes".to_string(),
                message: format!(
                    "episode {} does not belong to season {} of user {}",
                    episode.episode_id, season_id, user_id
                ),
            }),
            None => Ok(()),
        }
    }
}

fn db_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> LibraryError {
    move |e| {
        error!(operation, error = %e, "Cache store query failed");
        LibraryError::Database(e)
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    #[instrument(skip(self))]
    async fn get_seasons(&self, user_id: UserId, series_id: SeriesId) -> Result<Vec<Season>> {
        let sql = format!(
            "SELECT {} FROM cached_seasons WHERE user_id = ? AND series_id = ? \
             ORDER BY index_number IS NULL, index_number ASC",
            SEASON_COLUMNS
        );

        sqlx::query_as::<_, Season>(&sql)
            .bind(user_id)
            .bind(series_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("get_seasons"))
    }

    #[instrument(skip(self))]
    async fn get_seasons_last_write(
        &self,
        user_id: UserId,
        series_id: SeriesId,
    ) -> Result<Option<i64>> {
        sqlx::query_scalar::<_, Option<i64>>(
            "SELECT MAX(last_write) FROM cached_seasons WHERE user_id = ? AND series_id = ?",
        )
        .bind(user_id)
        .bind(series_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("get_seasons_last_write"))
    }

    #[instrument(skip(self, seasons), fields(count = seasons.len()))]
    async fn put_seasons(&self, seasons: &[Season]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error("put_seasons"))?;
        for season in seasons {
            Self::upsert_season(season)
                .execute(&mut *tx)
                .await
                .map_err(db_error("put_seasons"))?;
        }
        tx.commit().await.map_err(db_error("put_seasons"))?;
        Ok(())
    }

    #[instrument(skip(self, seasons), fields(count = seasons.len()))]
    async fn replace_seasons_of_series(
        &self,
        user_id: UserId,
        series_id: SeriesId,
        seasons: &[Season],
    ) -> Result<()> {
        Self::check_season_scope(user_id, series_id, seasons)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("replace_seasons_of_series"))?;

        let removed = sqlx::query("DELETE FROM cached_seasons WHERE user_id = ? AND series_id = ?")
            .bind(user_id)
            .bind(series_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("replace_seasons_of_series"))?
            .rows_affected();

        for season in seasons {
            Self::upsert_season(season)
                .execute(&mut *tx)
                .await
                .map_err(db_error("replace_seasons_of_series"))?;
        }

        tx.commit()
            .await
            .map_err(db_error("replace_seasons_of_series"))?;

        debug!(removed, inserted = seasons.len(), "Replaced season list");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_episodes(&self, user_id: UserId, season_id: SeasonId) -> Result<Vec<Episode>> {
        let sql = format!(
            "SELECT {} FROM cached_episodes WHERE user_id = ? AND season_id = ? \
             ORDER BY index_number IS NULL, index_number ASC",
            EPISODE_COLUMNS
        );

        sqlx::query_as::<_, Episode>(&sql)
            .bind(user_id)
            .bind(season_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("get_episodes"))
    }

    #[instrument(skip(self))]
    async fn get_episodes_of_series(
        &self,
        user_id: UserId,
        series_id: SeriesId,
    ) -> Result<Vec<Episode>> {
        sqlx::query_as::<_, Episode>(
            r#"
            SELECT e.user_id, e.episode_id, e.series_id, e.season_id, e.name, e.overview,
                   e.index_number, e.run_time_ticks, e.premiere_date, e.image_tag,
                   e.playback_position_ticks, e.played, e.is_favorite, e.last_write
            FROM cached_episodes e
            LEFT JOIN cached_seasons s
                ON s.user_id = e.user_id AND s.season_id = e.season_id
            WHERE e.user_id = ? AND e.series_id = ?
            ORDER BY s.index_number IS NULL, s.index_number ASC,
                     e.index_number IS NULL, e.index_number ASC
            "#,
        )
        .bind(user_id)
        .bind(series_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("get_episodes_of_series"))
    }

    #[instrument(skip(self))]
    async fn get_episodes_last_write(
        &self,
        user_id: UserId,
        season_id: SeasonId,
    ) -> Result<Option<i64>> {
        sqlx::query_scalar::<_, Option<i64>>(
            "SELECT MAX(last_write) FROM cached_episodes WHERE user_id = ? AND season_id = ?",
        )
        .bind(user_id)
        .bind(season_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("get_episodes_last_write"))
    }

    #[instrument(skip(self, episodes), fields(count = episodes.len()))]
    async fn put_episodes(&self, episodes: &[Episode]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error("put_episodes"))?;
        for episode in episodes {
            Self::upsert_episode(episode)
                .execute(&mut *tx)
                .await
                .map_err(db_error("put_episodes"))?;
        }
        tx.commit().await.map_err(db_error("put_episodes"))?;
        Ok(())
    }

    #[instrument(skip(self, episodes), fields(count = episodes.len()))]
    async fn replace_episodes_of_season(
        &self,
        user_id: UserId,
        season_id: SeasonId,
        episodes: &[Episode],
    ) -> Result<()> {
        Self::check_episode_scope(user_id, season_id, episodes)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("replace_episodes_of_season"))?;

        let removed =
            sqlx::query("DELETE FROM cached_episodes WHERE user_id = ? AND season_id = ?")
                .bind(user_id)
                .bind(season_id)
                .execute(&mut *tx)
                .await
                .map_err(db_error("replace_episodes_of_season"))?
                .rows_affected();

        for episode in episodes {
            Self::upsert_episode(episode)
                .execute(&mut *tx)
                .await
                .map_err(db_error("replace_episodes_of_season"))?;
        }

        tx.commit()
            .await
            .map_err(db_error("replace_episodes_of_season"))?;

        debug!(removed, inserted = episodes.len(), "Replaced episode list");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_playback_state(
        &self,
        user_id: UserId,
        episode_id: EpisodeId,
        position_ticks: i64,
        played: bool,
    ) -> Result<bool> {
        if position_ticks < 0 {
            return Err(LibraryError::InvalidInput {
                field: "position_ticks".to_string(),
                message: format!("must not be negative, got {}", position_ticks),
            });
        }

        let result = sqlx::query(
            r#"
            UPDATE cached_episodes
            SET playback_position_ticks = ?, played = ?
            WHERE user_id = ? AND episode_id = ?
            "#,
        )
        .bind(position_ticks)
        .bind(played)
        .bind(user_id)
        .bind(episode_id)
        .execute(&self.pool)
        .await
        .map_err(db_error("update_playback_state"))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn delete_episodes_of_series(&self, user_id: UserId, series_id: SeriesId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cached_episodes WHERE user_id = ? AND series_id = ?")
            .bind(user_id)
            .bind(series_id)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete_episodes_of_series"))?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn delete_seasons_of_series(&self, user_id: UserId, series_id: SeriesId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cached_seasons WHERE user_id = ? AND series_id = ?")
            .bind(user_id)
            .bind(series_id)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete_seasons_of_series"))?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn delete_episodes_older_than(&self, cutoff_millis: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cached_episodes WHERE last_write < ?")
            .bind(cutoff_millis)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete_episodes_older_than"))?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn delete_seasons_older_than(&self, cutoff_millis: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cached_seasons WHERE last_write < ?")
            .bind(cutoff_millis)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete_seasons_older_than"))?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn count_distinct_cached_series(&self, user_id: UserId) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT series_id) FROM cached_seasons WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("count_distinct_cached_series"))?;

        Ok(count.max(0) as u64)
    }

    #[instrument(skip(self))]
    async fn get_series_details(
        &self,
        user_id: UserId,
        series_id: SeriesId,
    ) -> Result<Option<SeriesDetails>> {
        sqlx::query_as::<_, SeriesDetails>(
            r#"
            SELECT user_id, series_id, name, overview, production_year, image_tag, last_write
            FROM cached_series
            WHERE user_id = ? AND series_id = ?
            "#,
        )
        .bind(user_id)
        .bind(series_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get_series_details"))
    }

    #[instrument(skip(self, details), fields(series_id = %details.series_id))]
    async fn put_series_details(&self, details: &SeriesDetails) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cached_series (
                user_id, series_id, name, overview, production_year, image_tag, last_write
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, series_id) DO UPDATE SET
                name = excluded.name,
                overview = excluded.overview,
                production_year = excluded.production_year,
                image_tag = excluded.image_tag,
                last_write = excluded.last_write
            "#,
        )
        .bind(details.user_id)
        .bind(details.series_id)
        .bind(&details.name)
        .bind(&details.overview)
        .bind(details.production_year)
        .bind(&details.image_tag)
        .bind(details.last_write)
        .execute(&self.pool)
        .await
        .map_err(db_error("put_series_details"))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_series_details_older_than(&self, cutoff_millis: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cached_series WHERE last_write < ?")
            .bind(cutoff_millis)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete_series_details_older_than"))?;

        Ok(result.rows_affected())
    }
}
