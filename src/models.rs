use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl FromStr for Difficulty {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            "" => Err(Error::validation("difficulty is required")),
            other => Err(Error::validation(format!(
                "invalid difficulty '{other}', must be easy, medium, or hard"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub module_ids: Vec<i64>,
    /// `None` for rows written before the flag existed; those count as active.
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: i64,
    pub name: String,
    pub subject_id: i64,
    pub submodule_ids: Vec<i64>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submodule {
    pub id: i64,
    pub name: String,
    pub module_id: i64,
    pub difficulty: Difficulty,
    pub is_pro: bool,
    pub question_ids: Vec<i64>,
    pub active: Option<bool>,
}

impl Subject {
    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(true)
    }
}

impl Module {
    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(true)
    }
}

impl Submodule {
    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmoduleWithQuestions {
    #[serde(flatten)]
    pub submodule: Submodule,
    pub questions: Vec<Question>,
}

/// One page of a submodule's question list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionPage {
    pub questions: Vec<Question>,
    pub has_more: bool,
    /// Id of the last question on this page when more follow.
    pub next_cursor: Option<i64>,
    pub total_questions: i64,
}

/// A subject with its modules and their submodules, as browsed by name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectTree {
    pub subject: Subject,
    pub modules: Vec<ModuleBranch>,
    /// Every module of the subject, listed or not.
    pub total_modules: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleBranch {
    pub id: i64,
    pub name: String,
    pub active: Option<bool>,
    pub submodules: Vec<SubmoduleLeaf>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmoduleLeaf {
    pub id: i64,
    pub name: String,
    pub difficulty: Difficulty,
    pub is_pro: bool,
    pub active: Option<bool>,
    pub question_count: i64,
}

// ---------------------------------------------------------------------------
// Questions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionType {
    Mcq,
    TrueFalse,
    FillBlanks,
    MatchFollowing,
}

impl QuestionType {
    pub const ALL: [QuestionType; 4] = [
        Self::Mcq,
        Self::TrueFalse,
        Self::FillBlanks,
        Self::MatchFollowing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mcq => "mcq",
            Self::TrueFalse => "truefalse",
            Self::FillBlanks => "fillblanks",
            Self::MatchFollowing => "matchfollowing",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A blank tag means `mcq`. Case and surrounding whitespace are ignored.
impl FromStr for QuestionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let tag = s.trim().to_ascii_lowercase();
        if tag.is_empty() {
            return Ok(Self::Mcq);
        }
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == tag)
            .ok_or_else(|| {
                Error::parse(format!(
                    "invalid question type '{tag}', must be one of: mcq, truefalse, fillblanks, matchfollowing"
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McqOption {
    pub option_text: String,
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    pub left_index: i64,
    pub right_index: i64,
}

/// Type-specific payload of a question. Each variant carries only the
/// fields its type needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "questionType",
    rename_all = "lowercase",
    rename_all_fields = "camelCase"
)]
pub enum QuestionBody {
    Mcq {
        options: Vec<McqOption>,
    },
    TrueFalse {
        correct_answer: bool,
    },
    FillBlanks {
        blanks: Vec<String>,
    },
    MatchFollowing {
        left_items: Vec<String>,
        right_items: Vec<String>,
        #[serde(default)]
        correct_mappings: Vec<Mapping>,
    },
}

impl QuestionBody {
    pub fn question_type(&self) -> QuestionType {
        match self {
            Self::Mcq { .. } => QuestionType::Mcq,
            Self::TrueFalse { .. } => QuestionType::TrueFalse,
            Self::FillBlanks { .. } => QuestionType::FillBlanks,
            Self::MatchFollowing { .. } => QuestionType::MatchFollowing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestion {
    pub question_text: String,
    #[serde(flatten)]
    pub body: QuestionBody,
}

impl NewQuestion {
    /// Applied identically on create, update and import.
    pub fn validate(&self) -> Result<()> {
        if self.question_text.trim().is_empty() {
            return Err(Error::validation("questionText is required"));
        }

        match &self.body {
            QuestionBody::Mcq { options } => {
                if options.is_empty() {
                    return Err(Error::validation(
                        "mcq questions must have a non-empty options list",
                    ));
                }
                if let Some(idx) = options
                    .iter()
                    .position(|o| o.option_text.trim().is_empty())
                {
                    return Err(Error::validation(format!(
                        "mcq option {} is missing optionText",
                        idx + 1
                    )));
                }
            }
            QuestionBody::TrueFalse { .. } => {}
            QuestionBody::FillBlanks { blanks } => {
                if blanks.is_empty() || blanks.iter().any(|b| b.trim().is_empty()) {
                    return Err(Error::validation(
                        "fillblanks questions must have a non-empty blanks list",
                    ));
                }
            }
            QuestionBody::MatchFollowing {
                left_items,
                right_items,
                ..
            } => {
                if left_items.is_empty() || right_items.is_empty() {
                    return Err(Error::validation(
                        "matchfollowing questions must have non-empty leftItems and rightItems",
                    ));
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,
    pub submodule_id: i64,
    pub question_text: String,
    #[serde(flatten)]
    pub body: QuestionBody,
}

// ---------------------------------------------------------------------------
// Creation requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmoduleMeta {
    pub name: String,
    pub module_id: i64,
    pub difficulty: String,
    #[serde(default)]
    pub is_pro: bool,
}

/// Submodule metadata that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmoduleDraft {
    pub name: String,
    pub module_id: i64,
    pub difficulty: Difficulty,
    pub is_pro: bool,
}

impl SubmoduleMeta {
    pub fn validate(&self) -> Result<SubmoduleDraft> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(Error::validation("submodule name is required"));
        }
        Ok(SubmoduleDraft {
            name: name.to_string(),
            module_id: self.module_id,
            difficulty: self.difficulty.parse()?,
            is_pro: self.is_pro,
        })
    }
}

/// Trims a required name, failing with a message naming `what`.
pub(crate) fn required_name(name: &str, what: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation(format!("{what} name is required")));
    }
    Ok(name.to_string())
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerTag {
    Ok,
    Bad,
    Important,
}

impl FromStr for AnswerTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ok" => Ok(Self::Ok),
            "bad" => Ok(Self::Bad),
            "important" => Ok(Self::Important),
            other => Err(Error::validation(format!(
                "invalid tag '{other}', must be ok, bad, or important"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEntry {
    pub question_id: i64,
    #[serde(default)]
    pub user_answer: serde_json::Value,
    #[serde(default)]
    pub is_correct: Option<bool>,
    #[serde(default)]
    pub tag: Option<AnswerTag>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAttempt {
    pub user_id: String,
    pub subject_id: i64,
    pub submodule_id: i64,
    pub answers: Vec<AnswerEntry>,
    #[serde(default)]
    pub correct_answers: i64,
    #[serde(default)]
    pub incorrect_answers: i64,
    /// Seconds.
    #[serde(default)]
    pub total_time_spent: i64,
}

impl NewAttempt {
    /// Counters are non-negative and the correct and incorrect answers fit
    /// within the answers actually submitted.
    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(Error::validation("user id is required"));
        }
        for (name, value) in [
            ("correctAnswers", self.correct_answers),
            ("incorrectAnswers", self.incorrect_answers),
            ("totalTimeSpent", self.total_time_spent),
        ] {
            if value < 0 {
                return Err(Error::validation(format!("{name} must not be negative")));
            }
        }

        let answered = self.answers.len() as i64;
        if self.correct_answers.saturating_add(self.incorrect_answers) > answered {
            return Err(Error::validation(format!(
                "correctAnswers and incorrectAnswers add up to more than the {answered} answers submitted"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: i64,
    pub user_id: String,
    pub subject_id: i64,
    pub submodule_id: i64,
    pub answers: Vec<AnswerEntry>,
    pub correct_answers: i64,
    pub incorrect_answers: i64,
    pub total_time_spent: i64,
    pub recorded_at: DateTime<Utc>,
}
