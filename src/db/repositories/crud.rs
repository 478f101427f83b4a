use std::marker::PhantomData;

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
};
use uuid::Uuid;

use super::filter::{Filter, Where, condition};
use crate::db::RepoError;

/// An entity exposed through the CRUD base: a display name, its id column, and the
/// mapping from wire field names (`firstName`, `released_date`) to columns.
pub trait Resource: EntityTrait {
    const NAME: &'static str;

    fn id_column() -> Self::Column;

    fn column(field: &str) -> Option<Self::Column>;
}

#[must_use]
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Inserts `model` under `id`, overwriting whatever id the caller may have set.
pub(crate) async fn insert_as<E, A, C>(db: &C, id: &str, mut model: A) -> Result<E::Model, RepoError>
where
    E: Resource,
    A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send,
    E::Model: IntoActiveModel<A>,
    C: ConnectionTrait,
{
    model.set(E::id_column(), id.to_owned().into());
    Ok(model.insert(db).await?)
}

pub(crate) async fn exists<E, C>(db: &C, id: &str) -> Result<bool, RepoError>
where
    E: Resource,
    C: ConnectionTrait,
{
    Ok(E::find()
        .filter(E::id_column().eq(id))
        .one(db)
        .await?
        .is_some())
}

pub(crate) async fn ensure_exists<E, C>(db: &C, id: &str) -> Result<(), RepoError>
where
    E: Resource,
    C: ConnectionTrait,
{
    if exists::<E, C>(db, id).await? {
        Ok(())
    } else {
        Err(RepoError::not_found(E::NAME, id))
    }
}

/// Create/read/update/delete over a single table, shared by every entity repository.
pub struct CrudRepository<E> {
    conn: DatabaseConnection,
    entity: PhantomData<E>,
}

impl<E: Resource> CrudRepository<E> {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self {
            conn,
            entity: PhantomData,
        }
    }

    /// Inserts a new row under a freshly generated id.
    pub async fn create<A>(&self, model: A) -> Result<E::Model, RepoError>
    where
        A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send,
        E::Model: IntoActiveModel<A>,
    {
        insert_as(&self.conn, &new_id(), model).await
    }

    pub async fn find(&self, filter: &Filter) -> Result<Vec<E::Model>, RepoError> {
        Ok(filter.apply(E::find())?.all(&self.conn).await?)
    }

    pub async fn find_one(&self, filter: &Filter) -> Result<Option<E::Model>, RepoError> {
        Ok(filter.apply(E::find())?.one(&self.conn).await?)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<E::Model, RepoError> {
        E::find()
            .filter(E::id_column().eq(id))
            .one(&self.conn)
            .await?
            .ok_or_else(|| RepoError::not_found(E::NAME, id))
    }

    /// Writes the set fields of `changes` to the row and returns the stored result.
    /// The id column is never written.
    pub async fn update_by_id<A>(&self, id: &str, mut changes: A) -> Result<E::Model, RepoError>
    where
        A: ActiveModelTrait<Entity = E> + Send,
    {
        changes.not_set(E::id_column());

        if changes.is_changed() {
            let result = E::update_many()
                .set(changes)
                .filter(E::id_column().eq(id))
                .exec(&self.conn)
                .await?;

            if result.rows_affected == 0 {
                return Err(RepoError::not_found(E::NAME, id));
            }
        }

        self.find_by_id(id).await
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<(), RepoError> {
        let result = E::delete_many()
            .filter(E::id_column().eq(id))
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(RepoError::not_found(E::NAME, id));
        }
        Ok(())
    }

    pub async fn count(&self, where_clause: Option<&Where>) -> Result<u64, RepoError>
    where
        E::Model: Sync,
    {
        let mut select = E::find();
        if let Some(where_clause) = where_clause {
            select = select.filter(condition::<E>(where_clause)?);
        }
        Ok(select.count(&self.conn).await?)
    }

    pub async fn exists(&self, id: &str) -> Result<bool, RepoError> {
        exists::<E, _>(&self.conn, id).await
    }
}
