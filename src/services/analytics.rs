use std::future::Future;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;

use crate::db::Db;
use crate::error::{Error, Result};
use crate::models::{AnswerTag, Attempt, NewAttempt};

/// Days covered by the activity histogram, today included.
const ACTIVITY_DAYS: u64 = 14;

// ---------------------------------------------------------------------------
// AnalyticsRepository trait
// ---------------------------------------------------------------------------

#[cfg_attr(test, mockall::automock)]
pub trait AnalyticsRepository: Send + Sync {
    fn insert_attempt(&self, attempt: &NewAttempt) -> impl Future<Output = Result<Attempt>> + Send;

    /// Oldest first.
    fn attempts(
        &self,
        user_id: &str,
        submodule_id: Option<i64>,
    ) -> impl Future<Output = Result<Vec<Attempt>>> + Send;

    fn delete_attempts(
        &self,
        user_id: &str,
        submodule_id: i64,
    ) -> impl Future<Output = Result<u64>> + Send;
}

impl AnalyticsRepository for Db {
    fn insert_attempt(&self, attempt: &NewAttempt) -> impl Future<Output = Result<Attempt>> + Send {
        Db::insert_attempt(self, attempt)
    }

    fn attempts(
        &self,
        user_id: &str,
        submodule_id: Option<i64>,
    ) -> impl Future<Output = Result<Vec<Attempt>>> + Send {
        Db::attempts(self, user_id, submodule_id)
    }

    fn delete_attempts(
        &self,
        user_id: &str,
        submodule_id: i64,
    ) -> impl Future<Output = Result<u64>> + Send {
        Db::delete_attempts(self, user_id, submodule_id)
    }
}

// ---------------------------------------------------------------------------
// Summary types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub total_questions: i64,
    pub correct_answers: i64,
    pub incorrect_answers: i64,
    pub total_time_spent: i64,
    pub total_quizzes: usize,
    /// Highest per-attempt score, in percent.
    pub best_score: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedAnswer {
    pub question_id: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub ok: Vec<ClassifiedAnswer>,
    pub bad: Vec<ClassifiedAnswer>,
    pub important: Vec<ClassifiedAnswer>,
    /// Every answer carrying notes, whatever its tag.
    pub noted: Vec<ClassifiedAnswer>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    pub attempt_id: i64,
    pub submodule_id: i64,
    pub score: i64,
    pub accuracy: i64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDay {
    pub day: NaiveDate,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub totals: Totals,
    pub classification: Classification,
    pub timeline: Vec<TimelinePoint>,
    pub activity: Vec<ActivityDay>,
}

fn percent(part: i64, whole: i64) -> i64 {
    if whole <= 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as i64
}

/// Folds attempts (oldest first) into a summary. `now` anchors the activity
/// window.
pub fn summarize(attempts: &[Attempt], now: DateTime<Utc>) -> Summary {
    let mut totals = Totals {
        total_quizzes: attempts.len(),
        ..Totals::default()
    };
    let mut classification = Classification::default();
    let mut timeline = Vec::with_capacity(attempts.len());

    for attempt in attempts {
        let answered = attempt.answers.len() as i64;
        totals.total_questions += answered;
        totals.correct_answers += attempt.correct_answers;
        totals.incorrect_answers += attempt.incorrect_answers;
        totals.total_time_spent += attempt.total_time_spent;

        let score = percent(attempt.correct_answers, answered);
        totals.best_score = totals.best_score.max(score);
        timeline.push(TimelinePoint {
            attempt_id: attempt.id,
            submodule_id: attempt.submodule_id,
            score,
            accuracy: percent(
                attempt.correct_answers,
                attempt.correct_answers + attempt.incorrect_answers,
            ),
            recorded_at: attempt.recorded_at,
        });

        for answer in &attempt.answers {
            let entry = || ClassifiedAnswer {
                question_id: answer.question_id,
                notes: answer.notes.clone(),
            };
            match answer.tag {
                Some(AnswerTag::Ok) => classification.ok.push(entry()),
                Some(AnswerTag::Bad) => classification.bad.push(entry()),
                Some(AnswerTag::Important) => classification.important.push(entry()),
                None => {}
            }
            if answer.notes.as_deref().is_some_and(|n| !n.trim().is_empty()) {
                classification.noted.push(entry());
            }
        }
    }

    Summary {
        totals,
        classification,
        timeline,
        activity: activity(attempts, now.date_naive()),
    }
}

fn activity(attempts: &[Attempt], today: NaiveDate) -> Vec<ActivityDay> {
    (0..ACTIVITY_DAYS)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .map(|day| ActivityDay {
            day,
            count: attempts
                .iter()
                .filter(|a| a.recorded_at.date_naive() == day)
                .count(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// AnalyticsService
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AnalyticsService<R: AnalyticsRepository = Db> {
    repo: R,
}

impl<R: AnalyticsRepository> AnalyticsService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub async fn record(&self, attempt: &NewAttempt) -> Result<Attempt> {
        attempt.validate().inspect_err(|e| {
            tracing::warn!("rejected quiz attempt: {e}");
        })?;
        self.repo.insert_attempt(attempt).await
    }

    /// Aggregates the user's attempts, optionally narrowed to one submodule.
    pub async fn summary(&self, user_id: &str, submodule_id: Option<i64>) -> Result<Summary> {
        let attempts = self.repo.attempts(user_id, submodule_id).await?;
        if attempts.is_empty() {
            return Err(Error::not_found("analytics data for user", user_id));
        }

        let summary = summarize(&attempts, Utc::now());
        tracing::debug!(
            user_id,
            quizzes = summary.totals.total_quizzes,
            timeline = summary.timeline.len(),
            "analytics summary prepared"
        );
        Ok(summary)
    }

    /// Removes every attempt the user made on the submodule.
    pub async fn reset(&self, user_id: &str, submodule_id: i64) -> Result<u64> {
        let deleted = self.repo.delete_attempts(user_id, submodule_id).await?;
        if deleted == 0 {
            return Err(Error::not_found("analytics data for submodule", submodule_id));
        }
        tracing::info!("reset {deleted} attempts of user_id: {user_id} on submodule {submodule_id}");
        Ok(deleted)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
