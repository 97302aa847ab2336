use crate::config::Config;
use crate::db::{
    BUG_TABLE, Database, QUESTION_TABLE, QUIZ_QUESTION_TABLE, QUIZ_TABLE, TASK_TABLE, USER_TABLE,
};
use crate::error::{Result, StoreError};
use crate::models::{
    Bug, BugUpdate, NewBug, NewQuestion, NewQuiz, NewQuizQuestion, NewTask, NewUser, Question,
    QuestionUpdate, Quiz, QuizQuestion, QuizQuestionUpdate, QuizSummary, QuizUpdate, Task,
    TaskUpdate, User, UserUpdate,
};
use crate::password::PasswordHashing;
use std::path::Path;
use tracing::{debug, info};

/// Entity and table of every child relation, keyed by parent table.
/// Delete refuses while any of these still point at the row.
const CHILDREN: &[(&str, &[(&str, &str)])] = &[
    (
        USER_TABLE,
        &[
            (TASK_TABLE, "user_id"),
            (BUG_TABLE, "user_id"),
            (QUIZ_TABLE, "user_id"),
        ],
    ),
    (QUIZ_TABLE, &[(QUIZ_QUESTION_TABLE, "quiz_id")]),
    (QUESTION_TABLE, &[(QUIZ_QUESTION_TABLE, "question_id")]),
];

/// Record store over the six entity tables
pub struct RecordStore {
    db: Database,
    passwords: PasswordHashing,
}

impl RecordStore {
    /// Open (and create if needed) the database file at `path`
    pub fn open<P: AsRef<Path>>(path: P, passwords: PasswordHashing) -> Result<Self> {
        let db = Database::open(path)?;
        Ok(RecordStore { db, passwords })
    }

    /// Open a throwaway in-memory store
    pub fn open_in_memory(passwords: PasswordHashing) -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(RecordStore { db, passwords })
    }

    /// Open the database named by `config`, with its hashing parameters
    pub fn from_config(config: &Config) -> Result<Self> {
        let passwords = PasswordHashing::from_config(config)?;
        Self::open(&config.database_path, passwords)
    }

    pub fn init(&self) -> Result<()> {
        self.db.init()
    }

    pub fn is_initialized(&self) -> Result<bool> {
        self.db.is_initialized()
    }

    // ==================== Integrity Checks ====================

    fn require_parent(&self, entity: &'static str, table: &str, id: i64) -> Result<()> {
        if self.db.exists(table, id)? {
            Ok(())
        } else {
            Err(StoreError::MissingParent { entity, id })
        }
    }

    fn require(&self, entity: &'static str, table: &str, id: i64) -> Result<()> {
        if self.db.exists(table, id)? {
            Ok(())
        } else {
            Err(StoreError::NotFound { entity, id })
        }
    }

    /// Deletes `id` from `table` unless a child row still references it.
    fn delete_restricted(&self, entity: &'static str, table: &str, id: i64) -> Result<()> {
        self.require(entity, table, id)?;

        let children = CHILDREN
            .iter()
            .find(|(parent, _)| *parent == table)
            .map(|(_, children)| *children)
            .unwrap_or(&[]);
        for (child_table, column) in children {
            let count = self.db.count_referencing(child_table, column, id)?;
            if count > 0 {
                debug!(table, id, child_table, count, "delete refused");
                return Err(StoreError::HasDependents { entity, id });
            }
        }

        self.db.delete(table, id)?;
        info!(table, id, "deleted");
        Ok(())
    }

    // ==================== User Operations ====================

    pub fn create_user(&self, user: NewUser) -> Result<User> {
        let hash = self.passwords.hash(&user.password)?;
        let id = self
            .db
            .insert_user(&user.username, &hash, user.email.as_deref())?;
        info!(id, username = %user.username, "created user");
        self.get_user(id)
    }

    pub fn get_user(&self, id: i64) -> Result<User> {
        self.db
            .get_user(id)?
            .ok_or(StoreError::NotFound { entity: "User", id })
    }

    pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.db.find_user_by_username(username)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.db.list_users()
    }

    /// Apply a partial update. A new password is hashed before storage.
    pub fn update_user(&self, id: i64, update: UserUpdate) -> Result<User> {
        self.require("User", USER_TABLE, id)?;
        let password = update
            .password
            .map(|p| self.passwords.hash(&p))
            .transpose()?;
        self.db
            .update_user(id, update.username, password, update.email)?;
        self.get_user(id)
    }

    pub fn delete_user(&self, id: i64) -> Result<()> {
        self.delete_restricted("User", USER_TABLE, id)
    }

    /// Check a plaintext candidate against the user's stored hash
    pub fn verify_password(&self, user_id: i64, candidate: &str) -> Result<bool> {
        let user = self.get_user(user_id)?;
        self.passwords.verify(&user.password, candidate)
    }

    // ==================== Task Operations ====================

    pub fn create_task(&self, task: NewTask) -> Result<Task> {
        self.require_parent("User", USER_TABLE, task.user_id)?;
        let id = self.db.insert_task(&task)?;
        info!(id, user_id = task.user_id, "created task");
        self.get_task(id)
    }

    pub fn get_task(&self, id: i64) -> Result<Task> {
        self.db
            .get_task(id)?
            .ok_or(StoreError::NotFound { entity: "Task", id })
    }

    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        self.db.list_tasks()
    }

    pub fn tasks_for_user(&self, user_id: i64) -> Result<Vec<Task>> {
        self.require("User", USER_TABLE, user_id)?;
        self.db.tasks_for_user(user_id)
    }

    pub fn update_task(&self, id: i64, update: TaskUpdate) -> Result<Task> {
        self.require("Task", TASK_TABLE, id)?;
        if let Some(user_id) = update.user_id {
            self.require_parent("User", USER_TABLE, user_id)?;
        }
        self.db.update_task(id, update)?;
        self.get_task(id)
    }

    pub fn delete_task(&self, id: i64) -> Result<()> {
        self.delete_restricted("Task", TASK_TABLE, id)
    }

    // ==================== Bug Operations ====================

    pub fn create_bug(&self, bug: NewBug) -> Result<Bug> {
        self.require_parent("User", USER_TABLE, bug.user_id)?;
        let id = self.db.insert_bug(&bug)?;
        info!(id, user_id = bug.user_id, "created bug");
        self.get_bug(id)
    }

    pub fn get_bug(&self, id: i64) -> Result<Bug> {
        self.db
            .get_bug(id)?
            .ok_or(StoreError::NotFound { entity: "Bug", id })
    }

    pub fn list_bugs(&self) -> Result<Vec<Bug>> {
        self.db.list_bugs()
    }

    pub fn bugs_for_user(&self, user_id: i64) -> Result<Vec<Bug>> {
        self.require("User", USER_TABLE, user_id)?;
        self.db.bugs_for_user(user_id)
    }

    pub fn update_bug(&self, id: i64, update: BugUpdate) -> Result<Bug> {
        self.require("Bug", BUG_TABLE, id)?;
        if let Some(user_id) = update.user_id {
            self.require_parent("User", USER_TABLE, user_id)?;
        }
        self.db.update_bug(id, update)?;
        self.get_bug(id)
    }

    pub fn delete_bug(&self, id: i64) -> Result<()> {
        self.delete_restricted("Bug", BUG_TABLE, id)
    }

    // ==================== Quiz Operations ====================

    pub fn create_quiz(&self, quiz: NewQuiz) -> Result<Quiz> {
        self.require_parent("User", USER_TABLE, quiz.user_id)?;
        let id = self.db.insert_quiz(&quiz)?;
        info!(id, user_id = quiz.user_id, score = quiz.score, "created quiz");
        self.get_quiz(id)
    }

    pub fn get_quiz(&self, id: i64) -> Result<Quiz> {
        self.db
            .get_quiz(id)?
            .ok_or(StoreError::NotFound { entity: "Quiz", id })
    }

    pub fn list_quizzes(&self) -> Result<Vec<Quiz>> {
        self.db.list_quizzes()
    }

    pub fn quizzes_for_user(&self, user_id: i64) -> Result<Vec<Quiz>> {
        self.require("User", USER_TABLE, user_id)?;
        self.db.quizzes_for_user(user_id)
    }

    pub fn update_quiz(&self, id: i64, update: QuizUpdate) -> Result<Quiz> {
        self.require("Quiz", QUIZ_TABLE, id)?;
        if let Some(user_id) = update.user_id {
            self.require_parent("User", USER_TABLE, user_id)?;
        }
        self.db.update_quiz(id, update)?;
        self.get_quiz(id)
    }

    pub fn delete_quiz(&self, id: i64) -> Result<()> {
        self.delete_restricted("Quiz", QUIZ_TABLE, id)
    }

    /// Count the quiz's questions, how many were answered, and how many
    /// answers match the question's correct option.
    pub fn quiz_summary(&self, quiz_id: i64) -> Result<QuizSummary> {
        self.require("Quiz", QUIZ_TABLE, quiz_id)?;
        self.db.quiz_summary(quiz_id)
    }

    // ==================== Question Operations ====================

    pub fn create_question(&self, question: NewQuestion) -> Result<Question> {
        let id = self.db.insert_question(&question)?;
        info!(id, "created question");
        self.get_question(id)
    }

    pub fn get_question(&self, id: i64) -> Result<Question> {
        self.db
            .get_question(id)?
            .ok_or(StoreError::NotFound {
                entity: "Question",
                id,
            })
    }

    pub fn list_questions(&self) -> Result<Vec<Question>> {
        self.db.list_questions()
    }

    pub fn update_question(&self, id: i64, update: QuestionUpdate) -> Result<Question> {
        self.require("Question", QUESTION_TABLE, id)?;
        self.db.update_question(id, update)?;
        self.get_question(id)
    }

    pub fn delete_question(&self, id: i64) -> Result<()> {
        self.delete_restricted("Question", QUESTION_TABLE, id)
    }

    // ==================== QuizQuestion Operations ====================

    pub fn create_quiz_question(&self, link: NewQuizQuestion) -> Result<QuizQuestion> {
        self.require_parent("Quiz", QUIZ_TABLE, link.quiz_id)?;
        self.require_parent("Question", QUESTION_TABLE, link.question_id)?;
        let id = self.db.insert_quiz_question(&link)?;
        info!(
            id,
            quiz_id = link.quiz_id,
            question_id = link.question_id,
            "linked question to quiz"
        );
        self.get_quiz_question(id)
    }

    pub fn get_quiz_question(&self, id: i64) -> Result<QuizQuestion> {
        self.db
            .get_quiz_question(id)?
            .ok_or(StoreError::NotFound {
                entity: "QuizQuestion",
                id,
            })
    }

    pub fn list_quiz_questions(&self) -> Result<Vec<QuizQuestion>> {
        self.db.list_quiz_questions()
    }

    pub fn quiz_questions_for_quiz(&self, quiz_id: i64) -> Result<Vec<QuizQuestion>> {
        self.require("Quiz", QUIZ_TABLE, quiz_id)?;
        self.db.quiz_questions_for_quiz(quiz_id)
    }

    pub fn quiz_questions_for_question(&self, question_id: i64) -> Result<Vec<QuizQuestion>> {
        self.require("Question", QUESTION_TABLE, question_id)?;
        self.db.quiz_questions_for_question(question_id)
    }

    pub fn update_quiz_question(
        &self,
        id: i64,
        update: QuizQuestionUpdate,
    ) -> Result<QuizQuestion> {
        self.require("QuizQuestion", QUIZ_QUESTION_TABLE, id)?;
        if let Some(quiz_id) = update.quiz_id {
            self.require_parent("Quiz", QUIZ_TABLE, quiz_id)?;
        }
        if let Some(question_id) = update.question_id {
            self.require_parent("Question", QUESTION_TABLE, question_id)?;
        }
        self.db.update_quiz_question(id, update)?;
        self.get_quiz_question(id)
    }

    pub fn delete_quiz_question(&self, id: i64) -> Result<()> {
        self.delete_restricted("QuizQuestion", QUIZ_QUESTION_TABLE, id)
    }
}
