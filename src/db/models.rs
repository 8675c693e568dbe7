// Database row structs

use chrono::{DateTime, Utc};
use sqlx::types::Json;

use crate::models::{
    AnswerEntry, Attempt, Difficulty, Module, Question, QuestionBody, Subject, Submodule,
    SubmoduleLeaf,
};

#[derive(sqlx::FromRow)]
pub struct SubjectRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub active: Option<bool>,
    pub module_ids: Json<Vec<i64>>,
}

impl From<SubjectRow> for Subject {
    fn from(row: SubjectRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            module_ids: row.module_ids.0,
            active: row.active,
        }
    }
}

#[derive(sqlx::FromRow)]
pub struct ModuleRow {
    pub id: i64,
    pub name: String,
    pub subject_id: i64,
    pub active: Option<bool>,
    pub submodule_ids: Json<Vec<i64>>,
}

impl From<ModuleRow> for Module {
    fn from(row: ModuleRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            subject_id: row.subject_id,
            submodule_ids: row.submodule_ids.0,
            active: row.active,
        }
    }
}

#[derive(sqlx::FromRow)]
pub struct SubmoduleRow {
    pub id: i64,
    pub name: String,
    pub module_id: i64,
    pub difficulty: Difficulty,
    pub is_pro: bool,
    pub active: Option<bool>,
    pub question_ids: Json<Vec<i64>>,
}

impl From<SubmoduleRow> for Submodule {
    fn from(row: SubmoduleRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            module_id: row.module_id,
            difficulty: row.difficulty,
            is_pro: row.is_pro,
            question_ids: row.question_ids.0,
            active: row.active,
        }
    }
}

/// Submodule row with its question count, for the subject tree.
#[derive(sqlx::FromRow)]
pub struct SubmoduleLeafRow {
    pub id: i64,
    pub name: String,
    pub module_id: i64,
    pub difficulty: Difficulty,
    pub is_pro: bool,
    pub active: Option<bool>,
    pub question_count: i64,
}

impl From<SubmoduleLeafRow> for SubmoduleLeaf {
    fn from(row: SubmoduleLeafRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            difficulty: row.difficulty,
            is_pro: row.is_pro,
            active: row.active,
            question_count: row.question_count,
        }
    }
}

#[derive(sqlx::FromRow)]
pub struct QuestionRow {
    pub id: i64,
    pub submodule_id: i64,
    pub question_text: String,
    pub body: Json<QuestionBody>,
}

impl From<QuestionRow> for Question {
    fn from(row: QuestionRow) -> Self {
        Self {
            id: row.id,
            submodule_id: row.submodule_id,
            question_text: row.question_text,
            body: row.body.0,
        }
    }
}

#[derive(sqlx::FromRow)]
pub struct AttemptRow {
    pub id: i64,
    pub user_id: String,
    pub subject_id: i64,
    pub submodule_id: i64,
    pub answers: Json<Vec<AnswerEntry>>,
    pub correct_answers: i64,
    pub incorrect_answers: i64,
    pub total_time_spent: i64,
    pub recorded_at: DateTime<Utc>,
}

impl From<AttemptRow> for Attempt {
    fn from(row: AttemptRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            subject_id: row.subject_id,
            submodule_id: row.submodule_id,
            answers: row.answers.0,
            correct_answers: row.correct_answers,
            incorrect_answers: row.incorrect_answers,
            total_time_spent: row.total_time_spent,
            recorded_at: row.recorded_at,
        }
    }
}
