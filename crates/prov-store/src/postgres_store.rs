use prov_domain::{ClusterId, DataCentreId, NodeId, Payload, TaskState, TaskType};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::error::StoreError;
use crate::store::{EdgeRow, NodeRow, Store};

const MIGRATIONS: &str = r#"
CREATE TABLE IF NOT EXISTS cluster (
    id   UUID PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS data_centre (
    id      UUID PRIMARY KEY,
    cluster UUID NOT NULL REFERENCES cluster(id)
);

CREATE TABLE IF NOT EXISTS node (
    id          UUID PRIMARY KEY,
    type        TEXT NOT NULL,
    cluster     UUID NOT NULL REFERENCES cluster(id),
    data_centre UUID REFERENCES data_centre(id),
    state       TEXT NOT NULL,
    payload     JSONB NOT NULL DEFAULT '{}'::jsonb
);
CREATE INDEX IF NOT EXISTS node_cluster_idx ON node(cluster);
CREATE INDEX IF NOT EXISTS node_state_idx ON node(state);

CREATE TABLE IF NOT EXISTS edge (
    id          UUID PRIMARY KEY,
    cluster     UUID NOT NULL REFERENCES cluster(id),
    data_centre UUID REFERENCES data_centre(id),
    from_node   UUID NOT NULL REFERENCES node(id),
    to_node     UUID NOT NULL REFERENCES node(id)
);
CREATE INDEX IF NOT EXISTS edge_cluster_idx ON edge(cluster);
CREATE INDEX IF NOT EXISTS edge_to_node_idx ON edge(to_node);
"#;

/// The relational backend. Deployment, pooling, and migration strategy
/// beyond the idempotent `CREATE TABLE IF NOT EXISTS` below are this
/// struct's caller's concern — the core engine only needs the `Store` trait
/// satisfied.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(MIGRATIONS).execute(&self.pool).await?;
        Ok(())
    }

    fn row_to_node(row: &sqlx::postgres::PgRow) -> Result<NodeRow, StoreError> {
        let type_str: String = row.try_get("type")?;
        let state_str: String = row.try_get("state")?;
        let data_centre: Option<uuid::Uuid> = row.try_get("data_centre")?;
        Ok(NodeRow {
            id: NodeId::from_uuid(row.try_get("id")?),
            task_type: TaskType::parse(&type_str)
                .ok_or_else(|| StoreError::Backend(format!("unknown node type {type_str:?}")))?,
            cluster: ClusterId::from_uuid(row.try_get("cluster")?),
            data_centre: data_centre.map(DataCentreId::from_uuid),
            state: TaskState::parse(&state_str)
                .ok_or_else(|| StoreError::Backend(format!("unknown node state {state_str:?}")))?,
            payload: row.try_get::<serde_json::Value, _>("payload")?,
        })
    }
}

#[async_trait::async_trait]
impl Store for PostgresStore {
    async fn insert_cluster(&self, name: &str) -> Result<ClusterId, StoreError> {
        let id = ClusterId::new();
        sqlx::query("INSERT INTO cluster (id, name) VALUES ($1, $2)")
            .bind(id.as_uuid())
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    async fn insert_data_centre(&self, cluster: ClusterId) -> Result<DataCentreId, StoreError> {
        let id = DataCentreId::new();
        sqlx::query("INSERT INTO data_centre (id, cluster) VALUES ($1, $2)")
            .bind(id.as_uuid())
            .bind(cluster.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    async fn insert_node(
        &self,
        cluster: ClusterId,
        data_centre: Option<DataCentreId>,
        task_type: TaskType,
        state: TaskState,
    ) -> Result<NodeId, StoreError> {
        let id = NodeId::new();
        sqlx::query(
            "INSERT INTO node (id, type, cluster, data_centre, state, payload) \
             VALUES ($1, $2, $3, $4, $5, '{}'::jsonb)",
        )
        .bind(id.as_uuid())
        .bind(task_type.as_str())
        .bind(cluster.as_uuid())
        .bind(data_centre.map(|d| d.as_uuid()))
        .bind(state.as_str())
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn insert_edge(
        &self,
        cluster: ClusterId,
        data_centre: Option<DataCentreId>,
        from_node: NodeId,
        to_node: NodeId,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO edge (id, cluster, data_centre, from_node, to_node) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(uuid::Uuid::new_v4())
        .bind(cluster.as_uuid())
        .bind(data_centre.map(|d| d.as_uuid()))
        .bind(from_node.as_uuid())
        .bind(to_node.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_nodes(&self, cluster: ClusterId) -> Result<Vec<NodeRow>, StoreError> {
        let rows = sqlx::query("SELECT * FROM node WHERE cluster = $1")
            .bind(cluster.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_node).collect()
    }

    async fn list_edges(&self, cluster: ClusterId) -> Result<Vec<EdgeRow>, StoreError> {
        // A plain distinct read suffices per §4.2 — the recursive-CTE
        // transitive closure the original computed here exists only to
        // deduplicate, and the edge table has no duplicate rows to begin
        // with under this builder.
        let rows = sqlx::query(
            "SELECT DISTINCT from_node, to_node FROM edge WHERE cluster = $1",
        )
        .bind(cluster.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|r| EdgeRow {
                from_node: NodeId::from_uuid(r.get("from_node")),
                to_node: NodeId::from_uuid(r.get("to_node")),
            })
            .collect())
    }

    async fn get_node(&self, node: NodeId) -> Result<NodeRow, StoreError> {
        let row = sqlx::query("SELECT * FROM node WHERE id = $1")
            .bind(node.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NodeNotFound(node.to_string()))?;
        Self::row_to_node(&row)
    }

    async fn set_state(&self, node: NodeId, state: TaskState) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE node SET state = $1 WHERE id = $2")
            .bind(state.as_str())
            .bind(node.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NodeNotFound(node.to_string()));
        }
        Ok(())
    }

    async fn set_payload(&self, node: NodeId, payload: Payload) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE node SET payload = $1 WHERE id = $2")
            .bind(payload)
            .bind(node.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NodeNotFound(node.to_string()));
        }
        Ok(())
    }

    async fn parent_rows(&self, node: NodeId) -> Result<Vec<NodeRow>, StoreError> {
        let rows = sqlx::query(
            "SELECT n.* FROM node n \
             JOIN edge e ON e.from_node = n.id \
             WHERE e.to_node = $1",
        )
        .bind(node.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_node).collect()
    }

    async fn find_node_in_data_centre(
        &self,
        cluster: ClusterId,
        data_centre: Option<DataCentreId>,
        task_type: TaskType,
    ) -> Result<Option<NodeRow>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM node WHERE cluster = $1 AND data_centre IS NOT DISTINCT FROM $2 AND type = $3",
        )
        .bind(cluster.as_uuid())
        .bind(data_centre.map(|d| d.as_uuid()))
        .bind(task_type.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_node).transpose()
    }
}
