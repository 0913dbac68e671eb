use std::collections::HashMap;

use sqlx::Row;

use ielts_core::model::{
    AnswerOption, QuestionId, ReadingQuestion, ReadingTest, ReadingTestId, ReadingTestSummary,
};

use super::SqliteRepository;
use super::mapping::{conn, parse_question_type, ser};
use crate::repository::{NewReadingTest, ReadingRepository, StorageError};

#[async_trait::async_trait]
impl ReadingRepository for SqliteRepository {
    async fn list_tests(&self) -> Result<Vec<ReadingTestSummary>, StorageError> {
        let rows = sqlx::query("SELECT id, title, description FROM reading_tests ORDER BY id")
            .fetch_all(self.pool())
            .await
            .map_err(conn)?;
        rows.iter()
            .map(|row| {
                Ok(ReadingTestSummary {
                    id: ReadingTestId::new(row.try_get("id").map_err(ser)?),
                    title: row.try_get("title").map_err(ser)?,
                    description: row.try_get("description").map_err(ser)?,
                })
            })
            .collect()
    }

    async fn get_test(&self, id: ReadingTestId) -> Result<Option<ReadingTest>, StorageError> {
        let Some(test_row) = sqlx::query(
            "SELECT id, title, description, created_at FROM reading_tests WHERE id = ?1",
        )
        .bind(id.value())
        .fetch_optional(self.pool())
        .await
        .map_err(conn)?
        else {
            return Ok(None);
        };

        let question_rows = sqlx::query(
            r"
            SELECT
                q.id, q.position, q.question_type, q.question_text, q.paragraph_ref,
                k.correct_answer
            FROM reading_questions q
            LEFT JOIN answer_keys k ON k.question_id = q.id
            WHERE q.test_id = ?1
            ORDER BY q.position, q.id
            ",
        )
        .bind(id.value())
        .fetch_all(self.pool())
        .await
        .map_err(conn)?;

        let option_rows = sqlx::query(
            r"
            SELECT o.question_id, o.label, o.text
            FROM answer_options o
            JOIN reading_questions q ON q.id = o.question_id
            WHERE q.test_id = ?1
            ORDER BY o.id
            ",
        )
        .bind(id.value())
        .fetch_all(self.pool())
        .await
        .map_err(conn)?;

        let mut options_by_question: HashMap<i64, Vec<AnswerOption>> = HashMap::new();
        for row in &option_rows {
            let question_id: i64 = row.try_get("question_id").map_err(ser)?;
            options_by_question
                .entry(question_id)
                .or_default()
                .push(AnswerOption {
                    label: row.try_get("label").map_err(ser)?,
                    text: row.try_get("text").map_err(ser)?,
                });
        }

        let mut questions = Vec::with_capacity(question_rows.len());
        for row in &question_rows {
            let question_id: i64 = row.try_get("id").map_err(ser)?;
            let position_i64: i64 = row.try_get("position").map_err(ser)?;
            let type_str: String = row.try_get("question_type").map_err(ser)?;
            questions.push(ReadingQuestion {
                id: QuestionId::new(question_id),
                position: u32::try_from(position_i64)
                    .map_err(|_| StorageError::Serialization("invalid position".into()))?,
                question_type: parse_question_type(&type_str)?,
                question_text: row.try_get("question_text").map_err(ser)?,
                paragraph_ref: row.try_get("paragraph_ref").map_err(ser)?,
                options: options_by_question.remove(&question_id).unwrap_or_default(),
                answer_key: row.try_get("correct_answer").map_err(ser)?,
            });
        }

        Ok(Some(ReadingTest {
            id,
            title: test_row.try_get("title").map_err(ser)?,
            description: test_row.try_get("description").map_err(ser)?,
            created_at: test_row.try_get("created_at").map_err(ser)?,
            questions,
        }))
    }

    async fn insert_test(&self, new: NewReadingTest) -> Result<ReadingTestId, StorageError> {
        let mut tx = self.pool().begin().await.map_err(conn)?;

        let test_result = sqlx::query(
            "INSERT INTO reading_tests (title, description, created_at) VALUES (?1, ?2, ?3)",
        )
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.created_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;
        let test_id = test_result.last_insert_rowid();

        for question in &new.questions {
            let question_result = sqlx::query(
                r"
                INSERT INTO reading_questions
                    (test_id, position, question_type, question_text, paragraph_ref)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
            )
            .bind(test_id)
            .bind(i64::from(question.position))
            .bind(question.question_type.as_str())
            .bind(&question.question_text)
            .bind(&question.paragraph_ref)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
            let question_id = question_result.last_insert_rowid();

            for option in &question.options {
                sqlx::query(
                    "INSERT INTO answer_options (question_id, label, text) VALUES (?1, ?2, ?3)",
                )
                .bind(question_id)
                .bind(&option.label)
                .bind(&option.text)
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
            }

            if let Some(key) = &question.answer_key {
                sqlx::query(
                    "INSERT INTO answer_keys (question_id, correct_answer) VALUES (?1, ?2)",
                )
                .bind(question_id)
                .bind(key)
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
            }
        }

        tx.commit().await.map_err(conn)?;
        Ok(ReadingTestId::new(test_id))
    }
}
