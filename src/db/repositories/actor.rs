use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, LoaderTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

use super::crud::{CrudRepository, Resource};
use super::filter::{Filter, Inclusions, prefix_match};
use super::relations::HasManyThrough;
use crate::db::RepoError;
use crate::entities::{actors, movie_actors, movies, prelude::*};

impl Resource for Actors {
    const NAME: &'static str = "Actor";

    fn id_column() -> actors::Column {
        actors::Column::Id
    }

    fn column(field: &str) -> Option<actors::Column> {
        Some(match field {
            "id" => actors::Column::Id,
            "firstName" => actors::Column::FirstName,
            "lastName" => actors::Column::LastName,
            "gender" => actors::Column::Gender,
            "age" => actors::Column::Age,
            "image" => actors::Column::Image,
            _ => return None,
        })
    }
}

/// An actor with the relations a filter asked for.
#[derive(Debug, Clone)]
pub struct ActorWithRelations {
    pub actor: actors::Model,
    pub movies: Option<Vec<movies::Model>>,
}

pub struct ActorRepository {
    conn: DatabaseConnection,
    crud: CrudRepository<Actors>,
}

impl ActorRepository {
    pub const INCLUDES: &'static [&'static str] = &["movies"];

    #[must_use]
    pub fn new(conn: DatabaseConnection) -> Self {
        Self {
            crud: CrudRepository::new(conn.clone()),
            conn,
        }
    }

    #[must_use]
    pub const fn crud(&self) -> &CrudRepository<Actors> {
        &self.crud
    }

    #[must_use]
    pub fn movies(&self, actor_id: &str) -> HasManyThrough<Actors, Movies> {
        HasManyThrough::new(
            self.conn.clone(),
            actor_id,
            movie_actors::Column::ActorId,
            movie_actors::Column::MovieId,
        )
    }

    pub async fn create(&self, actor: actors::ActiveModel) -> Result<actors::Model, RepoError> {
        self.crud.create(actor).await
    }

    pub async fn find(&self, filter: &Filter) -> Result<Vec<ActorWithRelations>, RepoError> {
        let inclusions = filter.inclusions(Self::INCLUDES)?;
        let actors = self.crud.find(filter).await?;
        self.resolve(actors, &inclusions).await
    }

    pub async fn find_by_id(
        &self,
        id: &str,
        filter: &Filter,
    ) -> Result<ActorWithRelations, RepoError> {
        let inclusions = filter.inclusions(Self::INCLUDES)?;
        let actor = self.crud.find_by_id(id).await?;
        let mut resolved = self.resolve(vec![actor], &inclusions).await?;
        resolved
            .pop()
            .ok_or_else(|| RepoError::not_found(Actors::NAME, id))
    }

    async fn resolve(
        &self,
        actors: Vec<actors::Model>,
        inclusions: &Inclusions,
    ) -> Result<Vec<ActorWithRelations>, RepoError> {
        let movies: Vec<Option<Vec<movies::Model>>> = if inclusions.has("movies") {
            actors
                .load_many_to_many(Movies, MovieActors, &self.conn)
                .await?
                .into_iter()
                .map(Some)
                .collect()
        } else {
            vec![None; actors.len()]
        };

        Ok(actors
            .into_iter()
            .zip(movies)
            .map(|(actor, movies)| ActorWithRelations { actor, movies })
            .collect())
    }

    /// Actors whose first name starts with `prefix`, ignoring case.
    pub async fn search_by_first_name(
        &self,
        prefix: &str,
    ) -> Result<Vec<actors::Model>, RepoError> {
        Ok(Actors::find()
            .filter(prefix_match(actors::Column::FirstName, prefix))
            .order_by_asc(actors::Column::FirstName)
            .order_by_asc(actors::Column::LastName)
            .all(&self.conn)
            .await?)
    }

    pub async fn update_by_id(
        &self,
        id: &str,
        changes: actors::ActiveModel,
    ) -> Result<actors::Model, RepoError> {
        self.crud.update_by_id(id, changes).await
    }

    /// Deletes an actor. Refused while any movie still links to it.
    pub async fn delete_by_id(&self, id: &str) -> Result<(), RepoError> {
        if !self.crud.exists(id).await? {
            return Err(RepoError::not_found(Actors::NAME, id));
        }

        let linked = MovieActors::find()
            .filter(movie_actors::Column::ActorId.eq(id))
            .count(&self.conn)
            .await?;
        if linked > 0 {
            return Err(RepoError::Conflict(format!(
                "Actor {id} is still linked to {linked} movie(s); unlink them first"
            )));
        }

        self.crud.delete_by_id(id).await
    }
}
