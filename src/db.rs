use std::time::Duration;

use axum::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, ConnectOptions, Database,
    DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
};
use ulid::Ulid;

use crate::framework::AppError;

pub mod connections;

use self::connections::{ConnectionPatch, NewConnection};

pub async fn connect(url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(url);
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(8))
        .max_lifetime(Duration::from_secs(8))
        .sqlx_logging(true);

    Database::connect(opt).await
}

/// つながりの保存先. すべての操作は `owner_id` の行だけを対象にする.
#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    async fn list(&self, owner_id: &str) -> Result<Vec<connections::Model>, AppError>;

    async fn find(&self, owner_id: &str, id: &str)
        -> Result<Option<connections::Model>, AppError>;

    async fn create(
        &self,
        owner_id: &str,
        input: NewConnection,
    ) -> Result<connections::Model, AppError>;

    /// 見つからなければ `None`
    async fn update(
        &self,
        owner_id: &str,
        id: &str,
        patch: ConnectionPatch,
    ) -> Result<Option<connections::Model>, AppError>;

    /// 消した行があれば `true`
    async fn delete(&self, owner_id: &str, id: &str) -> Result<bool, AppError>;
}

/// Postgres (外部のマネージドDB) に対する実装
#[derive(Clone, Debug)]
pub struct SeaOrmConnections {
    db: DatabaseConnection,
}

impl SeaOrmConnections {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConnectionRepository for SeaOrmConnections {
    async fn list(&self, owner_id: &str) -> Result<Vec<connections::Model>, AppError> {
        let rows = connections::Entity::find()
            .filter(connections::Column::OwnerId.eq(owner_id))
            .order_by_desc(connections::Column::UpdatedAt)
            .all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn find(
        &self,
        owner_id: &str,
        id: &str,
    ) -> Result<Option<connections::Model>, AppError> {
        let row = connections::Entity::find_by_id(id.to_owned())
            .filter(connections::Column::OwnerId.eq(owner_id))
            .one(&self.db)
            .await?;
        Ok(row)
    }

    async fn create(
        &self,
        owner_id: &str,
        input: NewConnection,
    ) -> Result<connections::Model, AppError> {
        let model = input.into_model(Ulid::new().to_string(), owner_id, Utc::now());
        let active = connections::ActiveModel {
            id: Set(model.id),
            owner_id: Set(model.owner_id),
            full_name: Set(model.full_name),
            profile_url: Set(model.profile_url),
            headline: Set(model.headline),
            company: Set(model.company),
            notes: Set(model.notes),
            created_at: Set(model.created_at),
            updated_at: Set(model.updated_at),
        };
        Ok(active.insert(&self.db).await?)
    }

    async fn update(
        &self,
        owner_id: &str,
        id: &str,
        patch: ConnectionPatch,
    ) -> Result<Option<connections::Model>, AppError> {
        let Some(mut model) = self.find(owner_id, id).await? else {
            return Ok(None);
        };
        patch.apply(&mut model, Utc::now());

        let active = connections::ActiveModel {
            id: Unchanged(model.id),
            owner_id: Unchanged(model.owner_id),
            full_name: Set(model.full_name),
            profile_url: Set(model.profile_url),
            headline: Set(model.headline),
            company: Set(model.company),
            notes: Set(model.notes),
            created_at: Unchanged(model.created_at),
            updated_at: Set(model.updated_at),
        };
        Ok(Some(active.update(&self.db).await?))
    }

    async fn delete(&self, owner_id: &str, id: &str) -> Result<bool, AppError> {
        let res = connections::Entity::delete_many()
            .filter(connections::Column::Id.eq(id))
            .filter(connections::Column::OwnerId.eq(owner_id))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected > 0)
    }
}
