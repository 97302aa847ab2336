use crate::error::Result;
use crate::models::{
    Bug, BugUpdate, NewBug, NewQuestion, NewQuiz, NewQuizQuestion, NewTask, Question,
    QuestionUpdate, Quiz, QuizQuestion, QuizQuestionUpdate, QuizSummary, QuizUpdate, Task,
    TaskUpdate, User,
};
use rusqlite::types::ToSql;
use rusqlite::{Connection, OptionalExtension, Params, Row, params_from_iter};
use std::path::Path;
use tracing::{debug, info};

pub const USER_TABLE: &str = "user";
pub const TASK_TABLE: &str = "task";
pub const BUG_TABLE: &str = "bug";
pub const QUIZ_TABLE: &str = "quiz";
pub const QUESTION_TABLE: &str = "question";
pub const QUIZ_QUESTION_TABLE: &str = "quiz_question";

const USER_COLUMNS: &str = "id, username, password, email";
const TASK_COLUMNS: &str = "id, user_id, name, description, due_date, priority, status";
const BUG_COLUMNS: &str = "id, user_id, description, steps_to_reproduce, expected_outcome, \
                           actual_outcome, severity, status";
const QUIZ_COLUMNS: &str = "id, user_id, score, date_taken";
const QUESTION_COLUMNS: &str =
    "id, question_text, option_a, option_b, option_c, option_d, correct_option";
const QUIZ_QUESTION_COLUMNS: &str = "id, quiz_id, question_id, selected_option";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS user (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    email TEXT UNIQUE
);

CREATE TABLE IF NOT EXISTS task (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES user(id) ON DELETE RESTRICT,
    name TEXT NOT NULL,
    description TEXT,
    due_date TEXT,
    priority TEXT NOT NULL DEFAULT 'Medium' CHECK (priority IN ('Low', 'Medium', 'High')),
    status TEXT NOT NULL DEFAULT 'To-Do' CHECK (status IN ('To-Do', 'In Progress', 'Done'))
);

CREATE TABLE IF NOT EXISTS bug (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES user(id) ON DELETE RESTRICT,
    description TEXT NOT NULL,
    steps_to_reproduce TEXT NOT NULL,
    expected_outcome TEXT NOT NULL,
    actual_outcome TEXT NOT NULL,
    severity TEXT NOT NULL DEFAULT 'Medium' CHECK (severity IN ('Low', 'Medium', 'High')),
    status TEXT NOT NULL DEFAULT 'Open'
        CHECK (status IN ('Open', 'In Progress', 'Resolved', 'Closed'))
);

CREATE TABLE IF NOT EXISTS quiz (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES user(id) ON DELETE RESTRICT,
    score INTEGER NOT NULL,
    date_taken TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS question (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    question_text TEXT NOT NULL,
    option_a TEXT NOT NULL,
    option_b TEXT NOT NULL,
    option_c TEXT NOT NULL,
    option_d TEXT NOT NULL,
    correct_option TEXT NOT NULL CHECK (correct_option IN ('A', 'B', 'C', 'D'))
);

CREATE TABLE IF NOT EXISTS quiz_question (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    quiz_id INTEGER NOT NULL REFERENCES quiz(id) ON DELETE RESTRICT,
    question_id INTEGER NOT NULL REFERENCES question(id) ON DELETE RESTRICT,
    selected_option TEXT CHECK (selected_option IN ('A', 'B', 'C', 'D'))
);

CREATE INDEX IF NOT EXISTS idx_task_user_id ON task(user_id);
CREATE INDEX IF NOT EXISTS idx_bug_user_id ON bug(user_id);
CREATE INDEX IF NOT EXISTS idx_quiz_user_id ON quiz(user_id);
CREATE INDEX IF NOT EXISTS idx_quiz_question_quiz_id ON quiz_question(quiz_id);
CREATE INDEX IF NOT EXISTS idx_quiz_question_question_id ON quiz_question(question_id);
";

/// Pending column assignments for a partial update
#[derive(Default)]
struct Changes {
    columns: Vec<&'static str>,
    values: Vec<Box<dyn ToSql>>,
}

impl Changes {
    /// Queues `column = value` when the patch carries a value.
    fn set<T: ToSql + 'static>(&mut self, column: &'static str, value: Option<T>) -> &mut Self {
        if let Some(v) = value {
            self.columns.push(column);
            self.values.push(Box::new(v));
        }
        self
    }

    fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database connection
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        // journal_mode reports the resulting mode as a row
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;

        Ok(Database { conn })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Database { conn })
    }

    /// Create tables and indexes. Safe to call on an existing database.
    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        info!("record store schema ready");
        Ok(())
    }

    /// Check if database is initialized
    pub fn is_initialized(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'quiz_question'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // ==================== Shared Helpers ====================

    pub fn exists(&self, table: &str, id: i64) -> Result<bool> {
        let found = self
            .conn
            .query_row(&format!("SELECT 1 FROM {table} WHERE id = ?1"), [id], |_| {
                Ok(())
            })
            .optional()?;
        Ok(found.is_some())
    }

    /// Number of rows in `table` whose `column` equals `id`.
    pub fn count_referencing(&self, table: &str, column: &str, id: i64) -> Result<i64> {
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {table} WHERE {column} = ?1"),
            [id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete a row by id. Returns false when no row matched.
    pub fn delete(&self, table: &str, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute(&format!("DELETE FROM {table} WHERE id = ?1"), [id])?;
        debug!(table, id, deleted = rows, "delete");
        Ok(rows > 0)
    }

    fn apply(&self, table: &str, id: i64, changes: Changes) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let assignments = changes
            .columns
            .iter()
            .map(|c| format!("{c} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE {table} SET {assignments} WHERE id = ?");

        let mut values = changes.values;
        values.push(Box::new(id));
        self.conn.execute(&sql, params_from_iter(values.iter()))?;
        debug!(table, id, columns = ?changes.columns, "update");
        Ok(())
    }

    fn query_one<T, P: Params>(
        &self,
        sql: &str,
        params: P,
        map: fn(&Row) -> rusqlite::Result<T>,
    ) -> Result<Option<T>> {
        self.conn
            .query_row(sql, params, map)
            .optional()
            .map_err(|e| e.into())
    }

    fn query_all<T, P: Params>(
        &self,
        sql: &str,
        params: P,
        map: fn(&Row) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, map)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| e.into())
    }

    fn insert<P: Params>(&self, table: &str, sql: &str, params: P) -> Result<i64> {
        self.conn.execute(sql, params)?;
        let id = self.conn.last_insert_rowid();
        debug!(table, id, "insert");
        Ok(id)
    }

    // ==================== User Operations ====================

    pub fn insert_user(&self, username: &str, password: &str, email: Option<&str>) -> Result<i64> {
        self.insert(
            USER_TABLE,
            "INSERT INTO user (username, password, email) VALUES (?1, ?2, ?3)",
            (username, password, email),
        )
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.query_one(
            &format!("SELECT {USER_COLUMNS} FROM user WHERE id = ?1"),
            [id],
            user_from_row,
        )
    }

    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.query_one(
            &format!("SELECT {USER_COLUMNS} FROM user WHERE username = ?1"),
            [username],
            user_from_row,
        )
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.query_all(
            &format!("SELECT {USER_COLUMNS} FROM user ORDER BY id"),
            [],
            user_from_row,
        )
    }

    /// `password` must already be hashed.
    pub fn update_user(
        &self,
        id: i64,
        username: Option<String>,
        password: Option<String>,
        email: Option<Option<String>>,
    ) -> Result<()> {
        let mut changes = Changes::default();
        changes
            .set("username", username)
            .set("password", password)
            .set("email", email);
        self.apply(USER_TABLE, id, changes)
    }

    // ==================== Task Operations ====================

    pub fn insert_task(&self, task: &NewTask) -> Result<i64> {
        self.insert(
            TASK_TABLE,
            "INSERT INTO task (user_id, name, description, due_date, priority, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                task.user_id,
                &task.name,
                &task.description,
                &task.due_date,
                task.priority.unwrap_or_default(),
                task.status.unwrap_or_default(),
            ),
        )
    }

    pub fn get_task(&self, id: i64) -> Result<Option<Task>> {
        self.query_one(
            &format!("SELECT {TASK_COLUMNS} FROM task WHERE id = ?1"),
            [id],
            task_from_row,
        )
    }

    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        self.query_all(
            &format!("SELECT {TASK_COLUMNS} FROM task ORDER BY id"),
            [],
            task_from_row,
        )
    }

    pub fn tasks_for_user(&self, user_id: i64) -> Result<Vec<Task>> {
        self.query_all(
            &format!("SELECT {TASK_COLUMNS} FROM task WHERE user_id = ?1 ORDER BY id"),
            [user_id],
            task_from_row,
        )
    }

    pub fn update_task(&self, id: i64, update: TaskUpdate) -> Result<()> {
        let mut changes = Changes::default();
        changes
            .set("user_id", update.user_id)
            .set("name", update.name)
            .set("description", update.description)
            .set("due_date", update.due_date)
            .set("priority", update.priority)
            .set("status", update.status);
        self.apply(TASK_TABLE, id, changes)
    }

    // ==================== Bug Operations ====================

    pub fn insert_bug(&self, bug: &NewBug) -> Result<i64> {
        self.insert(
            BUG_TABLE,
            "INSERT INTO bug (user_id, description, steps_to_reproduce, expected_outcome,
                              actual_outcome, severity, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            (
                bug.user_id,
                &bug.description,
                &bug.steps_to_reproduce,
                &bug.expected_outcome,
                &bug.actual_outcome,
                bug.severity.unwrap_or_default(),
                bug.status.unwrap_or_default(),
            ),
        )
    }

    pub fn get_bug(&self, id: i64) -> Result<Option<Bug>> {
        self.query_one(
            &format!("SELECT {BUG_COLUMNS} FROM bug WHERE id = ?1"),
            [id],
            bug_from_row,
        )
    }

    pub fn list_bugs(&self) -> Result<Vec<Bug>> {
        self.query_all(
            &format!("SELECT {BUG_COLUMNS} FROM bug ORDER BY id"),
            [],
            bug_from_row,
        )
    }

    pub fn bugs_for_user(&self, user_id: i64) -> Result<Vec<Bug>> {
        self.query_all(
            &format!("SELECT {BUG_COLUMNS} FROM bug WHERE user_id = ?1 ORDER BY id"),
            [user_id],
            bug_from_row,
        )
    }

    pub fn update_bug(&self, id: i64, update: BugUpdate) -> Result<()> {
        let mut changes = Changes::default();
        changes
            .set("user_id", update.user_id)
            .set("description", update.description)
            .set("steps_to_reproduce", update.steps_to_reproduce)
            .set("expected_outcome", update.expected_outcome)
            .set("actual_outcome", update.actual_outcome)
            .set("severity", update.severity)
            .set("status", update.status);
        self.apply(BUG_TABLE, id, changes)
    }

    // ==================== Quiz Operations ====================

    pub fn insert_quiz(&self, quiz: &NewQuiz) -> Result<i64> {
        self.insert(
            QUIZ_TABLE,
            "INSERT INTO quiz (user_id, score, date_taken) VALUES (?1, ?2, ?3)",
            (quiz.user_id, quiz.score, quiz.date_taken),
        )
    }

    pub fn get_quiz(&self, id: i64) -> Result<Option<Quiz>> {
        self.query_one(
            &format!("SELECT {QUIZ_COLUMNS} FROM quiz WHERE id = ?1"),
            [id],
            quiz_from_row,
        )
    }

    pub fn list_quizzes(&self) -> Result<Vec<Quiz>> {
        self.query_all(
            &format!("SELECT {QUIZ_COLUMNS} FROM quiz ORDER BY id"),
            [],
            quiz_from_row,
        )
    }

    pub fn quizzes_for_user(&self, user_id: i64) -> Result<Vec<Quiz>> {
        self.query_all(
            &format!("SELECT {QUIZ_COLUMNS} FROM quiz WHERE user_id = ?1 ORDER BY id"),
            [user_id],
            quiz_from_row,
        )
    }

    pub fn update_quiz(&self, id: i64, update: QuizUpdate) -> Result<()> {
        let mut changes = Changes::default();
        changes
            .set("user_id", update.user_id)
            .set("score", update.score)
            .set("date_taken", update.date_taken);
        self.apply(QUIZ_TABLE, id, changes)
    }

    pub fn quiz_summary(&self, quiz_id: i64) -> Result<QuizSummary> {
        let summary = self.conn.query_row(
            "SELECT COUNT(*),
                    COUNT(qq.selected_option),
                    COALESCE(SUM(CASE WHEN qq.selected_option = q.correct_option THEN 1 ELSE 0 END), 0)
             FROM quiz_question qq
             JOIN question q ON q.id = qq.question_id
             WHERE qq.quiz_id = ?1",
            [quiz_id],
            |row| {
                Ok(QuizSummary {
                    quiz_id,
                    questions: row.get(0)?,
                    answered: row.get(1)?,
                    correct: row.get(2)?,
                })
            },
        )?;
        Ok(summary)
    }

    // ==================== Question Operations ====================

    pub fn insert_question(&self, question: &NewQuestion) -> Result<i64> {
        self.insert(
            QUESTION_TABLE,
            "INSERT INTO question (question_text, option_a, option_b, option_c, option_d,
                                   correct_option)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                &question.question_text,
                &question.option_a,
                &question.option_b,
                &question.option_c,
                &question.option_d,
                question.correct_option,
            ),
        )
    }

    pub fn get_question(&self, id: i64) -> Result<Option<Question>> {
        self.query_one(
            &format!("SELECT {QUESTION_COLUMNS} FROM question WHERE id = ?1"),
            [id],
            question_from_row,
        )
    }

    pub fn list_questions(&self) -> Result<Vec<Question>> {
        self.query_all(
            &format!("SELECT {QUESTION_COLUMNS} FROM question ORDER BY id"),
            [],
            question_from_row,
        )
    }

    pub fn update_question(&self, id: i64, update: QuestionUpdate) -> Result<()> {
        let mut changes = Changes::default();
        changes
            .set("question_text", update.question_text)
            .set("option_a", update.option_a)
            .set("option_b", update.option_b)
            .set("option_c", update.option_c)
            .set("option_d", update.option_d)
            .set("correct_option", update.correct_option);
        self.apply(QUESTION_TABLE, id, changes)
    }

    // ==================== QuizQuestion Operations ====================

    pub fn insert_quiz_question(&self, link: &NewQuizQuestion) -> Result<i64> {
        self.insert(
            QUIZ_QUESTION_TABLE,
            "INSERT INTO quiz_question (quiz_id, question_id, selected_option)
             VALUES (?1, ?2, ?3)",
            (link.quiz_id, link.question_id, link.selected_option),
        )
    }

    pub fn get_quiz_question(&self, id: i64) -> Result<Option<QuizQuestion>> {
        self.query_one(
            &format!("SELECT {QUIZ_QUESTION_COLUMNS} FROM quiz_question WHERE id = ?1"),
            [id],
            quiz_question_from_row,
        )
    }

    pub fn list_quiz_questions(&self) -> Result<Vec<QuizQuestion>> {
        self.query_all(
            &format!("SELECT {QUIZ_QUESTION_COLUMNS} FROM quiz_question ORDER BY id"),
            [],
            quiz_question_from_row,
        )
    }

    pub fn quiz_questions_for_quiz(&self, quiz_id: i64) -> Result<Vec<QuizQuestion>> {
        self.query_all(
            &format!(
                "SELECT {QUIZ_QUESTION_COLUMNS} FROM quiz_question WHERE quiz_id = ?1 ORDER BY id"
            ),
            [quiz_id],
            quiz_question_from_row,
        )
    }

    pub fn quiz_questions_for_question(&self, question_id: i64) -> Result<Vec<QuizQuestion>> {
        self.query_all(
            &format!(
                "SELECT {QUIZ_QUESTION_COLUMNS} FROM quiz_question WHERE question_id = ?1 ORDER BY id"
            ),
            [question_id],
            quiz_question_from_row,
        )
    }

    pub fn update_quiz_question(&self, id: i64, update: QuizQuestionUpdate) -> Result<()> {
        let mut changes = Changes::default();
        changes
            .set("quiz_id", update.quiz_id)
            .set("question_id", update.question_id)
            .set("selected_option", update.selected_option);
        self.apply(QUIZ_QUESTION_TABLE, id, changes)
    }
}

// ==================== Row Parsers ====================

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        email: row.get(3)?,
    })
}

fn task_from_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        due_date: row.get(4)?,
        priority: row.get(5)?,
        status: row.get(6)?,
    })
}

fn bug_from_row(row: &Row) -> rusqlite::Result<Bug> {
    Ok(Bug {
        id: row.get(0)?,
        user_id: row.get(1)?,
        description: row.get(2)?,
        steps_to_reproduce: row.get(3)?,
        expected_outcome: row.get(4)?,
        actual_outcome: row.get(5)?,
        severity: row.get(6)?,
        status: row.get(7)?,
    })
}

fn quiz_from_row(row: &Row) -> rusqlite::Result<Quiz> {
    Ok(Quiz {
        id: row.get(0)?,
        user_id: row.get(1)?,
        score: row.get(2)?,
        date_taken: row.get(3)?,
    })
}

fn question_from_row(row: &Row) -> rusqlite::Result<Question> {
    Ok(Question {
        id: row.get(0)?,
        question_text: row.get(1)?,
        option_a: row.get(2)?,
        option_b: row.get(3)?,
        option_c: row.get(4)?,
        option_d: row.get(5)?,
        correct_option: row.get(6)?,
    })
}

fn quiz_question_from_row(row: &Row) -> rusqlite::Result<QuizQuestion> {
    Ok(QuizQuestion {
        id: row.get(0)?,
        quiz_id: row.get(1)?,
        question_id: row.get(2)?,
        selected_option: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, TaskStatus};

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        db
    }

    #[test]
    fn test_init_is_idempotent() {
        let db = setup();
        assert!(db.is_initialized().unwrap());
        db.init().unwrap();
        assert!(db.is_initialized().unwrap());
    }

    #[test]
    fn test_schema_defaults_apply_to_raw_insert() {
        let db = setup();
        let user_id = db.insert_user("alice", "hash", None).unwrap();
        db.conn
            .execute(
                "INSERT INTO task (user_id, name) VALUES (?1, 'raw')",
                [user_id],
            )
            .unwrap();

        let task = db.get_task(db.conn.last_insert_rowid()).unwrap().unwrap();
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.status, TaskStatus::ToDo);
    }

    #[test]
    fn test_check_constraint_rejects_unknown_status() {
        let db = setup();
        let user_id = db.insert_user("alice", "hash", None).unwrap();
        let result = db.conn.execute(
            "INSERT INTO task (user_id, name, status) VALUES (?1, 'x', 'Someday')",
            [user_id],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_foreign_key_enforced_by_schema() {
        let db = setup();
        let err = db
            .insert_task(&NewTask {
                user_id: 42,
                name: "orphan".to_string(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, crate::error::StoreError::ForeignKey));
    }

    #[test]
    fn test_partial_update_touches_only_given_columns() {
        let db = setup();
        let user_id = db.insert_user("alice", "hash", Some("a@x.com")).unwrap();
        let task_id = db
            .insert_task(&NewTask {
                user_id,
                name: "Write report".to_string(),
                description: Some("draft".to_string()),
                ..Default::default()
            })
            .unwrap();

        db.update_task(
            task_id,
            TaskUpdate {
                status: Some(TaskStatus::Done),
                description: Some(None),
                ..Default::default()
            },
        )
        .unwrap();

        let task = db.get_task(task_id).unwrap().unwrap();
        assert_eq!(task.name, "Write report");
        assert_eq!(task.description, None);
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.priority, Priority::Medium);
    }

    #[test]
    fn test_delete_reports_missing_row() {
        let db = setup();
        assert!(!db.delete(USER_TABLE, 7).unwrap());
        let id = db.insert_user("bob", "hash", None).unwrap();
        assert!(db.delete(USER_TABLE, id).unwrap());
        assert!(db.get_user(id).unwrap().is_none());
    }
}
