use sqlx::{PgPool, Postgres, QueryBuilder};
use sqlx::postgres::PgPoolOptions;
use tracing::error;
use tokio::time::sleep;
use crate::acquisition::domain::RecordSink;
use crate::record::domain::FieldValue;
use crate::system::domain::database::{MAX_CONNECTIONS, WAIT_FOR};


#[derive(Clone, Debug)]
pub struct Repository {
    pool: PgPool,
}

impl Repository {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = create_pool(database_url).await?;
        Ok(Self { pool })
    }

    pub async fn create_repository(database_url: &str) -> Self {
        loop {
            match Self::new(database_url).await {
                Ok(repo) => return repo,
                Err(e) => {
                    error!("Error: inicializando repo: {:?}", e);
                    sleep(WAIT_FOR).await;
                }
            }
        }
    }

    /// Inserta una fila en la tabla calificada, con un bind por columna en el
    /// orden recibido. Adquiere una conexión del pool, ejecuta y confirma; en
    /// cualquier salida (éxito o error) la conexión vuelve al pool y el error
    /// se registra y se devuelve al llamador, nunca se traga.
    pub async fn insert_record(&self,
                               qualified_table: &str,
                               row: Vec<FieldValue>
    ) -> Result<(), sqlx::Error> {

        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            format!("INSERT INTO {} ", qualified_table)
        );

        query_builder.push_values(std::iter::once(row), |mut b, row| {
            for value in row {
                match value {
                    FieldValue::Integer(v) => { b.push_bind(v); }
                    FieldValue::Float(v) => { b.push_bind(v); }
                    FieldValue::Text(v) => { b.push_bind(v); }
                    FieldValue::Timestamp(v) => { b.push_bind(v); }
                }
            }
        });

        let result = execute_insert(&self.pool, query_builder).await;

        if let Err(e) = &result {
            error!("Error: fallo el INSERT sobre {}: {}", qualified_table, e);
        }

        result
    }
}


impl RecordSink for Repository {
    async fn upload(&self,
                    qualified_table: &str,
                    row: Vec<FieldValue>) -> Result<(), sqlx::Error> {
        self.insert_record(qualified_table, row).await
    }
}


async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await?;

    Ok(pool)
}


async fn execute_insert(pool: &PgPool,
                        mut query_builder: QueryBuilder<'_, Postgres>
) -> Result<(), sqlx::Error> {

    let mut tx = pool.begin().await?;
    query_builder.build().execute(&mut *tx).await?;
    tx.commit().await?;

    Ok(())
}
