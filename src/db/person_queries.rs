use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Row, Transaction};

use crate::db::{PersonBatchWriter, PersonStore, StoreError};
use crate::models::person::{PersonDetails, PersonRecord};

/// Keeps every multi-row INSERT well under the Postgres bind-parameter limit.
const ROWS_PER_STATEMENT: usize = 1000;

/// Postgres-backed [`PersonStore`].
#[derive(Clone)]
pub struct PgPersonStore {
    pool: PgPool,
}

impl PgPersonStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PersonStore for PgPersonStore {
    async fn begin(&self) -> Result<Box<dyn PersonBatchWriter>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgPersonBatchWriter { tx }))
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM persons")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("total")?)
    }
}

/// The import transaction on Postgres.
pub struct PgPersonBatchWriter {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl PersonBatchWriter for PgPersonBatchWriter {
    async fn insert_batch(&mut self, batch: &[PersonRecord]) -> Result<(), StoreError> {
        for chunk in batch.chunks(ROWS_PER_STATEMENT) {
            insert_chunk(&mut self.tx, chunk).await.map_err(map_conflict)?;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(map_conflict)
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

fn map_conflict(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Conflict(db_err.message().to_string())
        }
        _ => StoreError::Database(err),
    }
}

/// Write one chunk: the common rows first, then each subtype table.
async fn insert_chunk(conn: &mut PgConnection, chunk: &[PersonRecord]) -> Result<(), sqlx::Error> {
    let mut persons: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO persons (id, person_type, first_name, last_name, pesel, height, weight, email) ",
    );
    persons.push_values(chunk, |mut b, person| {
        b.push_bind(person.id)
            .push_bind(&person.person_type)
            .push_bind(&person.first_name)
            .push_bind(&person.last_name)
            .push_bind(&person.pesel)
            .push_bind(person.height)
            .push_bind(person.weight)
            .push_bind(&person.email);
    });
    persons.build().execute(&mut *conn).await?;

    let mut students = Vec::new();
    let mut employees = Vec::new();
    let mut retirees = Vec::new();
    for person in chunk {
        match &person.details {
            PersonDetails::Student {
                university,
                study_year,
                field_of_study,
                scholarship,
            } => students.push((person.id, university, *study_year, field_of_study, *scholarship)),
            PersonDetails::Employee {
                start_date,
                current_position,
                current_salary,
            } => employees.push((person.id, *start_date, current_position, *current_salary)),
            PersonDetails::Retiree {
                pension_amount,
                years_worked,
            } => retirees.push((person.id, *pension_amount, *years_worked)),
        }
    }

    if !students.is_empty() {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO students (person_id, university, study_year, field_of_study, scholarship) ",
        );
        builder.push_values(&students, |mut b, (id, university, year, field, scholarship)| {
            b.push_bind(*id)
                .push_bind(*university)
                .push_bind(*year)
                .push_bind(*field)
                .push_bind(*scholarship);
        });
        builder.build().execute(&mut *conn).await?;
    }

    if !employees.is_empty() {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO employees (person_id, start_date, current_position, current_salary) ",
        );
        builder.push_values(&employees, |mut b, (id, start_date, position, salary)| {
            b.push_bind(*id)
                .push_bind(*start_date)
                .push_bind(*position)
                .push_bind(*salary);
        });
        builder.build().execute(&mut *conn).await?;
    }

    if !retirees.is_empty() {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO retirees (person_id, pension_amount, years_worked) ",
        );
        builder.push_values(&retirees, |mut b, (id, pension, years)| {
            b.push_bind(*id).push_bind(*pension).push_bind(*years);
        });
        builder.build().execute(&mut *conn).await?;
    }

    Ok(())
}
