use std::collections::HashSet;
use std::marker::PhantomData;

use sea_orm::sea_query::{OnConflict, SelectStatement};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter, QuerySelect, QueryTrait, Select, TransactionTrait,
};

use super::crud::{Resource, ensure_exists, insert_as, new_id};
use super::filter::{Filter, Where, condition};
use crate::db::RepoError;
use crate::entities::{movie_actors, prelude::MovieActors};

/// One-to-many accessor scoped to a single owner, e.g. the reviews of one movie.
pub struct HasMany<O, T: Resource> {
    conn: DatabaseConnection,
    owner_id: String,
    foreign_key: T::Column,
    owner: PhantomData<O>,
}

impl<O: Resource, T: Resource> HasMany<O, T> {
    pub(crate) fn new(conn: DatabaseConnection, owner_id: &str, foreign_key: T::Column) -> Self {
        Self {
            conn,
            owner_id: owner_id.to_owned(),
            foreign_key,
            owner: PhantomData,
        }
    }

    fn scoped(&self) -> Select<T> {
        T::find().filter(self.foreign_key.eq(self.owner_id.as_str()))
    }

    pub async fn find(&self, filter: &Filter) -> Result<Vec<T::Model>, RepoError> {
        Ok(filter.apply(self.scoped())?.all(&self.conn).await?)
    }

    /// Creates a target owned by this owner. The foreign key is always the owner's id.
    pub async fn create<A>(&self, mut model: A) -> Result<T::Model, RepoError>
    where
        A: ActiveModelTrait<Entity = T> + ActiveModelBehavior + Send,
        T::Model: IntoActiveModel<A>,
    {
        let txn = self.conn.begin().await?;
        ensure_exists::<O, _>(&txn, &self.owner_id).await?;

        model.set(self.foreign_key, self.owner_id.clone().into());
        let created = insert_as(&txn, &new_id(), model).await?;

        txn.commit().await?;
        Ok(created)
    }

    /// Bulk update of the owner's targets matching `where_clause`. Returns the count.
    pub async fn patch<A>(&self, mut changes: A, where_clause: Option<&Where>) -> Result<u64, RepoError>
    where
        A: ActiveModelTrait<Entity = T> + Send,
    {
        changes.not_set(T::id_column());
        changes.not_set(self.foreign_key);
        if !changes.is_changed() {
            return Ok(0);
        }

        let mut update = T::update_many()
            .set(changes)
            .filter(self.foreign_key.eq(self.owner_id.as_str()));
        if let Some(where_clause) = where_clause {
            update = update.filter(condition::<T>(where_clause)?);
        }

        Ok(update.exec(&self.conn).await?.rows_affected)
    }

    pub async fn delete(&self, where_clause: Option<&Where>) -> Result<u64, RepoError> {
        let mut delete = T::delete_many().filter(self.foreign_key.eq(self.owner_id.as_str()));
        if let Some(where_clause) = where_clause {
            delete = delete.filter(condition::<T>(where_clause)?);
        }

        Ok(delete.exec(&self.conn).await?.rows_affected)
    }
}

/// Many-to-many accessor over the `movie_actors` join table, scoped to one owner.
/// `owner_key`/`target_key` pick which join column points at which side.
pub struct HasManyThrough<O, T> {
    conn: DatabaseConnection,
    owner_id: String,
    owner_key: movie_actors::Column,
    target_key: movie_actors::Column,
    sides: PhantomData<(O, T)>,
}

impl<O: Resource, T: Resource> HasManyThrough<O, T> {
    pub(crate) fn new(
        conn: DatabaseConnection,
        owner_id: &str,
        owner_key: movie_actors::Column,
        target_key: movie_actors::Column,
    ) -> Self {
        Self {
            conn,
            owner_id: owner_id.to_owned(),
            owner_key,
            target_key,
            sides: PhantomData,
        }
    }

    fn linked_ids(&self) -> SelectStatement {
        MovieActors::find()
            .select_only()
            .column(self.target_key)
            .filter(self.owner_key.eq(self.owner_id.as_str()))
            .into_query()
    }

    fn scoped(&self) -> Select<T> {
        T::find().filter(T::id_column().in_subquery(self.linked_ids()))
    }

    fn scoped_where(&self, where_clause: Option<&Where>) -> Result<Select<T>, RepoError> {
        let mut select = self.scoped();
        if let Some(where_clause) = where_clause {
            select = select.filter(condition::<T>(where_clause)?);
        }
        Ok(select)
    }

    fn link_row(&self, target_id: &str) -> movie_actors::ActiveModel {
        let mut row: movie_actors::ActiveModel = Default::default();
        row.set(self.owner_key, self.owner_id.clone().into());
        row.set(self.target_key, target_id.to_owned().into());
        row
    }

    /// Inserts a join row unless the pair already exists. Returns whether a row was added.
    async fn insert_link<C: ConnectionTrait>(&self, db: &C, target_id: &str) -> Result<bool, RepoError> {
        let inserted = MovieActors::insert(self.link_row(target_id))
            .on_conflict(
                OnConflict::columns([movie_actors::Column::MovieId, movie_actors::Column::ActorId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
        Ok(inserted > 0)
    }

    pub async fn find(&self, filter: &Filter) -> Result<Vec<T::Model>, RepoError> {
        Ok(filter.apply(self.scoped())?.all(&self.conn).await?)
    }

    /// Target ids linked to the owner, in join-table order.
    pub async fn ids(&self) -> Result<Vec<String>, RepoError> {
        Ok(MovieActors::find()
            .select_only()
            .column(self.target_key)
            .filter(self.owner_key.eq(self.owner_id.as_str()))
            .into_tuple::<String>()
            .all(&self.conn)
            .await?)
    }

    /// Creates a target and links it to the owner in one transaction.
    pub async fn create<A>(&self, model: A) -> Result<T::Model, RepoError>
    where
        A: ActiveModelTrait<Entity = T> + ActiveModelBehavior + Send,
        T::Model: IntoActiveModel<A>,
    {
        let txn = self.conn.begin().await?;
        ensure_exists::<O, _>(&txn, &self.owner_id).await?;

        let id = new_id();
        let created = insert_as(&txn, &id, model).await?;
        self.insert_link(&txn, &id).await?;

        txn.commit().await?;
        Ok(created)
    }

    /// Bulk update of linked targets matching `where_clause`. Returns the count.
    pub async fn patch<A>(&self, mut changes: A, where_clause: Option<&Where>) -> Result<u64, RepoError>
    where
        A: ActiveModelTrait<Entity = T> + Send,
    {
        changes.not_set(T::id_column());
        if !changes.is_changed() {
            return Ok(0);
        }

        let mut update = T::update_many()
            .set(changes)
            .filter(T::id_column().in_subquery(self.linked_ids()));
        if let Some(where_clause) = where_clause {
            update = update.filter(condition::<T>(where_clause)?);
        }

        Ok(update.exec(&self.conn).await?.rows_affected)
    }

    /// Deletes linked targets matching `where_clause` together with their join rows.
    /// Fails with `Conflict` when a matched target is also linked to another owner.
    /// Returns the number of targets removed.
    pub async fn delete(&self, where_clause: Option<&Where>) -> Result<u64, RepoError> {
        let txn = self.conn.begin().await?;

        let ids: Vec<String> = self
            .scoped_where(where_clause)?
            .select_only()
            .column(T::id_column())
            .into_tuple()
            .all(&txn)
            .await?;

        if ids.is_empty() {
            return Ok(0);
        }

        let shared = MovieActors::find()
            .filter(self.target_key.is_in(ids.clone()))
            .filter(self.owner_key.ne(self.owner_id.as_str()))
            .count(&txn)
            .await?;
        if shared > 0 {
            return Err(RepoError::Conflict(format!(
                "A matching {} still has {shared} other link(s); unlink them first",
                T::NAME
            )));
        }

        MovieActors::delete_many()
            .filter(self.target_key.is_in(ids.clone()))
            .exec(&txn)
            .await?;

        let deleted = T::delete_many()
            .filter(T::id_column().is_in(ids))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(deleted.rows_affected)
    }

    /// Links an existing target. Linking an already linked pair is a no-op that
    /// returns `false`.
    pub async fn link(&self, target_id: &str) -> Result<bool, RepoError> {
        ensure_exists::<O, _>(&self.conn, &self.owner_id).await?;
        ensure_exists::<T, _>(&self.conn, target_id).await?;
        self.insert_link(&self.conn, target_id).await
    }

    /// Removes the link to `target_id`. Returns whether a link existed.
    pub async fn unlink(&self, target_id: &str) -> Result<bool, RepoError> {
        ensure_exists::<O, _>(&self.conn, &self.owner_id).await?;

        let removed = MovieActors::delete_many()
            .filter(self.owner_key.eq(self.owner_id.as_str()))
            .filter(self.target_key.eq(target_id))
            .exec(&self.conn)
            .await?;
        Ok(removed.rows_affected > 0)
    }

    /// Links every id in `target_ids` that is not linked yet. Returns how many were added.
    pub async fn link_all(&self, target_ids: &[String]) -> Result<u64, RepoError> {
        let txn = self.conn.begin().await?;
        ensure_exists::<O, _>(&txn, &self.owner_id).await?;

        let mut linked = 0;
        for target_id in unique(target_ids) {
            ensure_exists::<T, _>(&txn, target_id).await?;
            if self.insert_link(&txn, target_id).await? {
                linked += 1;
            }
        }

        txn.commit().await?;
        Ok(linked)
    }

    /// Rewrites the whole linked set to exactly `target_ids`.
    pub async fn replace(&self, target_ids: &[String]) -> Result<(), RepoError> {
        let txn = self.conn.begin().await?;
        self.replace_in(&txn, target_ids).await?;
        txn.commit().await?;
        Ok(())
    }

    /// `replace` on a caller-owned connection or transaction.
    pub(crate) async fn replace_in<C: ConnectionTrait>(
        &self,
        db: &C,
        target_ids: &[String],
    ) -> Result<(), RepoError> {
        ensure_exists::<O, _>(db, &self.owner_id).await?;

        let wanted = unique(target_ids);
        for target_id in &wanted {
            ensure_exists::<T, _>(db, target_id).await?;
        }

        MovieActors::delete_many()
            .filter(self.owner_key.eq(self.owner_id.as_str()))
            .exec(db)
            .await?;

        for target_id in wanted {
            self.insert_link(db, target_id).await?;
        }
        Ok(())
    }
}

/// Order-preserving dedup.
fn unique(ids: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    ids.iter()
        .map(String::as_str)
        .filter(|id| seen.insert(*id))
        .collect()
}
