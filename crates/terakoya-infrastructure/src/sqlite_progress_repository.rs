//! SQLite-based ProgressRepository implementation.
//!
//! Normalized tables with foreign keys into the owning objective. Every row
//! is keyed by a stable composite identifier and written with
//! `INSERT OR REPLACE`, so repeated saves of the same logical entity replace
//! rather than duplicate. Nested lists and maps are JSON-encoded in TEXT
//! columns.

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use terakoya_core::error::{Result, TerakoyaError};
use terakoya_core::progress::{
    AssessmentRecord, ObjectiveRecord, ProgressRepository, StoredPlan, TopicProgress, UserRecord,
};
use tokio::sync::Mutex;

/// Relational progress repository backed by a single SQLite database.
pub struct SqliteProgressRepository {
    conn: Arc<Mutex<Connection>>,
}

/// Strength/weakness tags as stored in the `feedback` column.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Feedback {
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
}

fn db_err(e: rusqlite::Error) -> TerakoyaError {
    TerakoyaError::data_access(e.to_string())
}

impl SqliteProgressRepository {
    /// Opens (or creates) the database at the given path.
    ///
    /// The parent directory and the schema are created transparently.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory, database, or schema cannot be
    /// created.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path).map_err(db_err)?;
        Self::init_schema(&conn).map_err(db_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::init_schema(&conn).map_err(db_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                user_id TEXT PRIMARY KEY,
                created_at TEXT
            );
            CREATE TABLE IF NOT EXISTS learning_objectives (
                objective_id TEXT PRIMARY KEY,
                user_id TEXT,
                title TEXT,
                created_at TEXT,
                completed_at TEXT,
                FOREIGN KEY (user_id) REFERENCES users (user_id)
            );
            CREATE TABLE IF NOT EXISTS study_plans (
                plan_id TEXT PRIMARY KEY,
                objective_id TEXT,
                topics TEXT,
                learning_path TEXT,
                estimated_time TEXT,
                prerequisites TEXT,
                updated_at TEXT,
                FOREIGN KEY (objective_id) REFERENCES learning_objectives (objective_id)
            );
            CREATE TABLE IF NOT EXISTS topic_progress (
                progress_id TEXT PRIMARY KEY,
                user_id TEXT,
                objective_id TEXT,
                topic TEXT,
                mastery_level REAL,
                completed BOOLEAN,
                last_studied TEXT,
                FOREIGN KEY (user_id) REFERENCES users (user_id),
                FOREIGN KEY (objective_id) REFERENCES learning_objectives (objective_id)
            );
            CREATE TABLE IF NOT EXISTS quizzes (
                quiz_id TEXT PRIMARY KEY,
                user_id TEXT,
                objective_id TEXT,
                topic TEXT,
                questions TEXT,
                time_limit TEXT,
                FOREIGN KEY (user_id) REFERENCES users (user_id),
                FOREIGN KEY (objective_id) REFERENCES learning_objectives (objective_id)
            );
            CREATE TABLE IF NOT EXISTS quiz_results (
                result_id TEXT PRIMARY KEY,
                quiz_id TEXT,
                user_id TEXT,
                answers TEXT,
                score REAL,
                feedback TEXT,
                recorded_at TEXT,
                FOREIGN KEY (quiz_id) REFERENCES quizzes (quiz_id),
                FOREIGN KEY (user_id) REFERENCES users (user_id)
            );",
        )
    }

    fn save_objective(
        tx: &rusqlite::Transaction<'_>,
        user_id: &str,
        objective_id: &str,
        objective: &ObjectiveRecord,
    ) -> Result<()> {
        tx.execute(
            "INSERT OR REPLACE INTO learning_objectives
             (objective_id, user_id, title, created_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                objective_id,
                user_id,
                objective.title,
                objective.created_at,
                objective.completed_at,
            ],
        )
        .map_err(db_err)?;

        if let Some(plan) = &objective.study_plan {
            tx.execute(
                "INSERT OR REPLACE INTO study_plans
                 (plan_id, objective_id, topics, learning_path, estimated_time, prerequisites, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    format!("{}_plan", objective_id),
                    objective_id,
                    plan.topics.as_ref().map(serde_json::to_string).transpose()?,
                    plan.learning_path
                        .as_ref()
                        .map(serde_json::to_string)
                        .transpose()?,
                    plan.estimated_time
                        .as_ref()
                        .map(serde_json::to_string)
                        .transpose()?,
                    plan.prerequisites
                        .as_ref()
                        .map(serde_json::to_string)
                        .transpose()?,
                    chrono::Utc::now().to_rfc3339(),
                ],
            )
            .map_err(db_err)?;
        }

        for (topic, progress) in &objective.topic_progress {
            tx.execute(
                "INSERT OR REPLACE INTO topic_progress
                 (progress_id, user_id, objective_id, topic, mastery_level, completed, last_studied)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    format!("{}_{}_{}", user_id, objective_id, topic),
                    user_id,
                    objective_id,
                    topic,
                    progress.mastery_level,
                    progress.completed,
                    progress.last_studied,
                ],
            )
            .map_err(db_err)?;
        }

        for (quiz_id, quiz) in &objective.quizzes {
            tx.execute(
                "INSERT OR REPLACE INTO quizzes
                 (quiz_id, user_id, objective_id, topic, questions, time_limit)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    quiz_id,
                    user_id,
                    objective_id,
                    quiz.topic,
                    serde_json::to_string(&quiz.questions)?,
                    quiz.time_limit,
                ],
            )
            .map_err(db_err)?;

            if let Some(results) = &quiz.results {
                let feedback = Feedback {
                    strengths: results.strengths.clone(),
                    weaknesses: results.weaknesses.clone(),
                };
                tx.execute(
                    "INSERT OR REPLACE INTO quiz_results
                     (result_id, quiz_id, user_id, answers, score, feedback, recorded_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        format!("{}_result", quiz_id),
                        quiz_id,
                        user_id,
                        serde_json::to_string(&results.answers)?,
                        results.score,
                        serde_json::to_string(&feedback)?,
                        results.recorded_at,
                    ],
                )
                .map_err(db_err)?;
            }
        }

        Ok(())
    }

    fn load_objective(
        conn: &Connection,
        user_id: &str,
        objective_id: &str,
        mut objective: ObjectiveRecord,
    ) -> Result<ObjectiveRecord> {
        let plan_row: Option<(Option<String>, Option<String>, Option<String>, Option<String>)> =
            conn.query_row(
                "SELECT topics, learning_path, estimated_time, prerequisites
                 FROM study_plans WHERE objective_id = ?1",
                params![objective_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()
            .map_err(db_err)?;
        if let Some((topics, learning_path, estimated_time, prerequisites)) = plan_row {
            objective.study_plan = Some(StoredPlan {
                topics: topics.map(|t| serde_json::from_str(&t)).transpose()?,
                learning_path: learning_path.map(|t| serde_json::from_str(&t)).transpose()?,
                estimated_time: estimated_time
                    .map(|t| serde_json::from_str(&t))
                    .transpose()?,
                prerequisites: prerequisites
                    .map(|t| serde_json::from_str(&t))
                    .transpose()?,
            });
        }

        let mut stmt = conn
            .prepare(
                "SELECT topic, mastery_level, completed, last_studied
                 FROM topic_progress WHERE user_id = ?1 AND objective_id = ?2",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![user_id, objective_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    TopicProgress {
                        mastery_level: row.get(1)?,
                        completed: row.get(2)?,
                        last_studied: row.get(3)?,
                    },
                ))
            })
            .map_err(db_err)?;
        for row in rows {
            let (topic, progress) = row.map_err(db_err)?;
            objective.topic_progress.insert(topic, progress);
        }

        let mut stmt = conn
            .prepare(
                "SELECT quiz_id, topic, questions, time_limit
                 FROM quizzes WHERE user_id = ?1 AND objective_id = ?2",
            )
            .map_err(db_err)?;
        let quiz_rows: Vec<(String, String, String, Option<String>)> = stmt
            .query_map(params![user_id, objective_id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .map_err(db_err)?
            .collect::<rusqlite::Result<_>>()
            .map_err(db_err)?;

        for (quiz_id, topic, questions, time_limit) in quiz_rows {
            let mut quiz = AssessmentRecord {
                topic,
                questions: serde_json::from_str(&questions)?,
                time_limit,
                results: None,
            };

            let result_row: Option<(String, Option<f64>, String, Option<String>)> = conn
                .query_row(
                    "SELECT answers, score, feedback, recorded_at
                     FROM quiz_results WHERE quiz_id = ?1",
                    params![quiz_id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                )
                .optional()
                .map_err(db_err)?;
            if let Some((answers, score, feedback, recorded_at)) = result_row {
                let feedback: Feedback = serde_json::from_str(&feedback)?;
                quiz.results = Some(terakoya_core::assessment::AssessmentAttempt {
                    answers: serde_json::from_str::<HashMap<usize, String>>(&answers)?,
                    score,
                    strengths: feedback.strengths,
                    weaknesses: feedback.weaknesses,
                    recorded_at,
                });
            }

            objective.quizzes.insert(quiz_id, quiz);
        }

        Ok(objective)
    }
}

#[async_trait]
impl ProgressRepository for SqliteProgressRepository {
    async fn save(&self, user_id: &str, record: &UserRecord) -> Result<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction().map_err(db_err)?;

        tx.execute(
            "INSERT OR IGNORE INTO users (user_id, created_at) VALUES (?1, ?2)",
            params![user_id, chrono::Utc::now().to_rfc3339()],
        )
        .map_err(db_err)?;

        for (objective_id, objective) in &record.learning_objectives {
            Self::save_objective(&tx, user_id, objective_id, objective)?;
        }

        tx.commit().map_err(db_err)?;
        tracing::debug!(
            "Saved {} objective(s) for user {}",
            record.learning_objectives.len(),
            user_id
        );
        Ok(())
    }

    async fn load(&self, user_id: &str) -> Result<UserRecord> {
        let conn = self.conn.lock().await;
        let mut record = UserRecord::default();

        let objective_rows: Vec<(String, ObjectiveRecord)> = {
            let mut stmt = conn
                .prepare(
                    "SELECT objective_id, title, created_at, completed_at
                     FROM learning_objectives WHERE user_id = ?1",
                )
                .map_err(db_err)?;
            let rows = stmt
                .query_map(params![user_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        ObjectiveRecord {
                            title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                            created_at: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                            completed_at: row.get(3)?,
                            ..Default::default()
                        },
                    ))
                })
                .map_err(db_err)?;
            rows.collect::<rusqlite::Result<_>>().map_err(db_err)?
        };

        for (objective_id, objective) in objective_rows {
            let objective = Self::load_objective(&conn, user_id, &objective_id, objective)?;
            record.learning_objectives.insert(objective_id, objective);
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terakoya_core::assessment::{
        AssessmentAttempt, AssessmentQuestion, Difficulty,
    };
    use terakoya_core::objective::StudyPlan;

    fn full_record() -> UserRecord {
        let mut record = UserRecord::default();
        let mut objective = ObjectiveRecord {
            title: "Learn Rust".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            completed_at: None,
            study_plan: Some(StoredPlan::from_plan(&StudyPlan::default_plan())),
            ..Default::default()
        };
        objective.topic_progress.insert(
            "Introduction".to_string(),
            TopicProgress {
                mastery_level: 0.75,
                completed: true,
                last_studied: Some("2024-01-02T00:00:00Z".to_string()),
            },
        );
        objective.quizzes.insert(
            "alice_Introduction_q1".to_string(),
            AssessmentRecord {
                topic: "Introduction".to_string(),
                questions: vec![AssessmentQuestion {
                    text: "What is ownership?".to_string(),
                    correct_answer: "A".to_string(),
                    explanation: "Ownership governs resource lifetime".to_string(),
                    difficulty: Difficulty::Easy,
                    options: Some(vec!["A".to_string(), "B".to_string()]),
                }],
                time_limit: Some("10 minutes".to_string()),
                results: Some(AssessmentAttempt {
                    answers: HashMap::from([(0usize, "A".to_string())]),
                    score: Some(0.75),
                    strengths: vec!["terminology".to_string()],
                    weaknesses: vec!["borrowing".to_string()],
                    recorded_at: Some("2024-01-02T00:00:00Z".to_string()),
                }),
            },
        );
        record
            .learning_objectives
            .insert("obj-1".to_string(), objective);
        record
    }

    #[tokio::test]
    async fn load_unknown_user_returns_empty_record() {
        let repository = SqliteProgressRepository::open_in_memory().unwrap();
        let record = repository.load("nobody").await.unwrap();
        assert!(record.is_empty());
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let repository = SqliteProgressRepository::open_in_memory().unwrap();
        let record = full_record();

        repository.save("alice", &record).await.unwrap();
        let loaded = repository.load("alice").await.unwrap();

        let objective = &loaded.learning_objectives["obj-1"];
        assert_eq!(objective.title, "Learn Rust");
        let plan = objective.study_plan.clone().unwrap().into_plan().unwrap();
        assert_eq!(plan, StudyPlan::default_plan());
        assert_eq!(
            objective.topic_progress["Introduction"].mastery_level,
            0.75
        );

        let quiz = &objective.quizzes["alice_Introduction_q1"];
        assert_eq!(quiz.questions.len(), 1);
        let results = quiz.results.as_ref().unwrap();
        assert_eq!(results.answers[&0], "A");
        assert_eq!(results.score, Some(0.75));
        assert_eq!(results.strengths, ["terminology"]);
        assert_eq!(results.weaknesses, ["borrowing"]);
    }

    #[tokio::test]
    async fn repeated_saves_replace_instead_of_duplicating() {
        let repository = SqliteProgressRepository::open_in_memory().unwrap();
        let mut record = full_record();

        repository.save("alice", &record).await.unwrap();

        // Same logical entities, updated values
        record.learning_objectives.get_mut("obj-1").unwrap().title =
            "Learn Rust Deeply".to_string();
        record
            .learning_objectives
            .get_mut("obj-1")
            .unwrap()
            .topic_progress
            .get_mut("Introduction")
            .unwrap()
            .mastery_level = 0.9;
        repository.save("alice", &record).await.unwrap();

        let loaded = repository.load("alice").await.unwrap();
        assert_eq!(loaded.learning_objectives.len(), 1);
        let objective = &loaded.learning_objectives["obj-1"];
        assert_eq!(objective.title, "Learn Rust Deeply");
        assert_eq!(objective.topic_progress.len(), 1);
        assert_eq!(objective.topic_progress["Introduction"].mastery_level, 0.9);
        assert_eq!(objective.quizzes.len(), 1);
    }

    #[tokio::test]
    async fn two_objectives_survive_and_most_recent_wins() {
        let repository = SqliteProgressRepository::open_in_memory().unwrap();

        let mut record = UserRecord::default();
        record.learning_objectives.insert(
            "obj-old".to_string(),
            ObjectiveRecord {
                title: "Old".to_string(),
                created_at: "2024-01-01T00:00:00Z".to_string(),
                ..Default::default()
            },
        );
        record.learning_objectives.insert(
            "obj-new".to_string(),
            ObjectiveRecord {
                title: "New".to_string(),
                created_at: "2024-06-01T00:00:00Z".to_string(),
                ..Default::default()
            },
        );

        repository.save("alice", &record).await.unwrap();
        let loaded = repository.load("alice").await.unwrap();

        assert_eq!(loaded.learning_objectives.len(), 2);
        let (id, _) = loaded.most_recent_objective().unwrap();
        assert_eq!(id, "obj-new");
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let repository = SqliteProgressRepository::open_in_memory().unwrap();
        repository.save("alice", &full_record()).await.unwrap();

        let bob = repository.load("bob").await.unwrap();
        assert!(bob.is_empty());
    }

    #[tokio::test]
    async fn objective_without_plan_loads_as_planless() {
        let repository = SqliteProgressRepository::open_in_memory().unwrap();
        let mut record = UserRecord::default();
        record.learning_objectives.insert(
            "obj-1".to_string(),
            ObjectiveRecord {
                title: "No plan yet".to_string(),
                created_at: "2024-01-01T00:00:00Z".to_string(),
                ..Default::default()
            },
        );

        repository.save("alice", &record).await.unwrap();
        let loaded = repository.load("alice").await.unwrap();
        assert!(loaded.learning_objectives["obj-1"].study_plan.is_none());
    }

    #[tokio::test]
    async fn database_file_and_parent_dirs_are_created() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("progress.db");
        let repository = SqliteProgressRepository::new(&db_path).unwrap();

        repository.save("alice", &full_record()).await.unwrap();
        assert!(db_path.exists());

        // Reopen and read back
        drop(repository);
        let reopened = SqliteProgressRepository::new(&db_path).unwrap();
        let loaded = reopened.load("alice").await.unwrap();
        assert_eq!(loaded.learning_objectives.len(), 1);
    }
}
