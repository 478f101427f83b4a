use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, LoaderTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};

use super::crud::{CrudRepository, Resource, ensure_exists, insert_as, new_id};
use super::filter::{Filter, Inclusions, prefix_match};
use super::relations::{HasMany, HasManyThrough};
use crate::db::RepoError;
use crate::entities::{actors, movie_actors, movies, prelude::*, reviews};

impl Resource for Movies {
    const NAME: &'static str = "Movie";

    fn id_column() -> movies::Column {
        movies::Column::Id
    }

    fn column(field: &str) -> Option<movies::Column> {
        Some(match field {
            "id" => movies::Column::Id,
            "title" => movies::Column::Title,
            "description" => movies::Column::Description,
            "cost" => movies::Column::Cost,
            "released_date" => movies::Column::ReleasedDate,
            "duration" => movies::Column::Duration,
            "image" => movies::Column::Image,
            _ => return None,
        })
    }
}

/// A movie with its linked actor ids and any relations a filter asked for.
#[derive(Debug, Clone)]
pub struct MovieWithRelations {
    pub movie: movies::Model,
    pub actor_ids: Vec<String>,
    pub actors: Option<Vec<actors::Model>>,
    pub reviews: Option<Vec<reviews::Model>>,
}

pub struct MovieRepository {
    conn: DatabaseConnection,
    crud: CrudRepository<Movies>,
}

impl MovieRepository {
    pub const INCLUDES: &'static [&'static str] = &["actors", "reviews"];

    #[must_use]
    pub fn new(conn: DatabaseConnection) -> Self {
        Self {
            crud: CrudRepository::new(conn.clone()),
            conn,
        }
    }

    #[must_use]
    pub const fn crud(&self) -> &CrudRepository<Movies> {
        &self.crud
    }

    #[must_use]
    pub fn reviews(&self, movie_id: &str) -> HasMany<Movies, Reviews> {
        HasMany::new(self.conn.clone(), movie_id, reviews::Column::MovieId)
    }

    #[must_use]
    pub fn actors(&self, movie_id: &str) -> HasManyThrough<Movies, Actors> {
        HasManyThrough::new(
            self.conn.clone(),
            movie_id,
            movie_actors::Column::MovieId,
            movie_actors::Column::ActorId,
        )
    }

    pub async fn create(&self, movie: movies::ActiveModel) -> Result<movies::Model, RepoError> {
        self.crud.create(movie).await
    }

    /// Inserts a movie and, when `actor_ids` is given, links exactly those actors.
    /// Both happen in one transaction; an unknown actor id leaves nothing behind.
    pub async fn create_with_actors(
        &self,
        movie: movies::ActiveModel,
        actor_ids: Option<&[String]>,
    ) -> Result<movies::Model, RepoError> {
        let txn = self.conn.begin().await?;

        let id = new_id();
        let created = insert_as(&txn, &id, movie).await?;
        if let Some(actor_ids) = actor_ids {
            self.actors(&id).replace_in(&txn, actor_ids).await?;
        }

        txn.commit().await?;
        Ok(created)
    }

    /// Partial update plus an optional rewrite of the actor set, in one transaction.
    pub async fn update_with_actors(
        &self,
        id: &str,
        mut changes: movies::ActiveModel,
        actor_ids: Option<&[String]>,
    ) -> Result<movies::Model, RepoError> {
        changes.not_set(movies::Column::Id);

        let txn = self.conn.begin().await?;

        if changes.is_changed() {
            let result = Movies::update_many()
                .set(changes)
                .filter(movies::Column::Id.eq(id))
                .exec(&txn)
                .await?;
            if result.rows_affected == 0 {
                return Err(RepoError::not_found(Movies::NAME, id));
            }
        } else {
            ensure_exists::<Movies, _>(&txn, id).await?;
        }

        if let Some(actor_ids) = actor_ids {
            self.actors(id).replace_in(&txn, actor_ids).await?;
        }

        txn.commit().await?;
        self.crud.find_by_id(id).await
    }

    pub async fn find(&self, filter: &Filter) -> Result<Vec<MovieWithRelations>, RepoError> {
        let inclusions = filter.inclusions(Self::INCLUDES)?;
        let movies = self.crud.find(filter).await?;
        self.resolve(movies, &inclusions).await
    }

    pub async fn find_by_id(
        &self,
        id: &str,
        filter: &Filter,
    ) -> Result<MovieWithRelations, RepoError> {
        let inclusions = filter.inclusions(Self::INCLUDES)?;
        let movie = self.crud.find_by_id(id).await?;
        let mut resolved = self.resolve(vec![movie], &inclusions).await?;
        resolved
            .pop()
            .ok_or_else(|| RepoError::not_found(Movies::NAME, id))
    }

    async fn resolve(
        &self,
        movies: Vec<movies::Model>,
        inclusions: &Inclusions,
    ) -> Result<Vec<MovieWithRelations>, RepoError> {
        let mut actor_ids = self.actor_ids_for(&movies).await?;

        let actors: Vec<Option<Vec<actors::Model>>> = if inclusions.has("actors") {
            movies
                .load_many_to_many(Actors, MovieActors, &self.conn)
                .await?
                .into_iter()
                .map(Some)
                .collect()
        } else {
            vec![None; movies.len()]
        };

        let reviews: Vec<Option<Vec<reviews::Model>>> = if inclusions.has("reviews") {
            movies
                .load_many(Reviews, &self.conn)
                .await?
                .into_iter()
                .map(Some)
                .collect()
        } else {
            vec![None; movies.len()]
        };

        Ok(movies
            .into_iter()
            .zip(actors)
            .zip(reviews)
            .map(|((movie, actors), reviews)| MovieWithRelations {
                actor_ids: actor_ids.remove(&movie.id).unwrap_or_default(),
                movie,
                actors,
                reviews,
            })
            .collect())
    }

    async fn actor_ids_for(
        &self,
        movies: &[movies::Model],
    ) -> Result<HashMap<String, Vec<String>>, RepoError> {
        if movies.is_empty() {
            return Ok(HashMap::new());
        }

        let movie_ids: Vec<&str> = movies.iter().map(|m| m.id.as_str()).collect();
        let rows = MovieActors::find()
            .filter(movie_actors::Column::MovieId.is_in(movie_ids))
            .all(&self.conn)
            .await?;

        let mut by_movie: HashMap<String, Vec<String>> = HashMap::new();
        for row in rows {
            by_movie.entry(row.movie_id).or_default().push(row.actor_id);
        }
        Ok(by_movie)
    }

    /// Movies whose title starts with `prefix`, ignoring case.
    pub async fn search_by_title(&self, prefix: &str) -> Result<Vec<movies::Model>, RepoError> {
        Ok(Movies::find()
            .filter(prefix_match(movies::Column::Title, prefix))
            .order_by_asc(movies::Column::Title)
            .all(&self.conn)
            .await?)
    }

    /// Deletes a movie with its reviews and actor links.
    pub async fn delete_by_id(&self, id: &str) -> Result<(), RepoError> {
        let txn = self.conn.begin().await?;

        Reviews::delete_many()
            .filter(reviews::Column::MovieId.eq(id))
            .exec(&txn)
            .await?;

        MovieActors::delete_many()
            .filter(movie_actors::Column::MovieId.eq(id))
            .exec(&txn)
            .await?;

        let deleted = Movies::delete_many()
            .filter(movies::Column::Id.eq(id))
            .exec(&txn)
            .await?;

        if deleted.rows_affected == 0 {
            return Err(RepoError::not_found(Movies::NAME, id));
        }

        txn.commit().await?;
        Ok(())
    }
}
