use crate::models::{AnswerOption, BugStatus, Priority, Severity, TaskStatus};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "studydesk")]
#[command(about = "Tasks, bug reports and quizzes in one SQLite file")]
#[command(version)]
pub struct Cli {
    /// Database file (overrides config and STUDYDESK_DATABASE_PATH)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Print records as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database tables
    Init,

    /// Manage users
    #[command(subcommand)]
    User(UserCommand),

    /// Manage tasks
    #[command(subcommand)]
    Task(TaskCommand),

    /// Manage bug reports
    #[command(subcommand)]
    Bug(BugCommand),

    /// Manage quizzes
    #[command(subcommand)]
    Quiz(QuizCommand),

    /// Manage the question bank
    #[command(subcommand)]
    Question(QuestionCommand),

    /// Manage questions placed in a quiz and the answers given
    #[command(subcommand)]
    Answer(AnswerCommand),
}

#[derive(Subcommand)]
pub enum UserCommand {
    /// Add a user
    Add {
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// Show a user and what they own
    Show { id: i64 },
    /// List users
    List,
    /// Edit a user
    Edit {
        id: i64,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long, conflicts_with = "no_email")]
        email: Option<String>,
        /// Clear the email
        #[arg(long)]
        no_email: bool,
    },
    /// Delete a user with no remaining tasks, bugs or quizzes
    Rm { id: i64 },
    /// Check a password against the stored hash
    CheckPassword { id: i64, password: String },
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Add a task
    Add {
        /// Owning user ID
        #[arg(long)]
        user: i64,
        name: String,
        #[arg(long)]
        desc: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
        /// Low, Medium or High (default Medium)
        #[arg(long)]
        priority: Option<Priority>,
        /// To-Do, In Progress or Done (default To-Do)
        #[arg(long)]
        status: Option<TaskStatus>,
    },
    /// Show a task
    Show { id: i64 },
    /// List tasks
    List {
        /// Only tasks owned by this user
        #[arg(long)]
        user: Option<i64>,
    },
    /// Edit a task
    Edit {
        id: i64,
        #[arg(long)]
        user: Option<i64>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, conflicts_with = "no_desc")]
        desc: Option<String>,
        /// Clear the description
        #[arg(long)]
        no_desc: bool,
        #[arg(long, conflicts_with = "no_due")]
        due: Option<NaiveDate>,
        /// Clear the due date
        #[arg(long)]
        no_due: bool,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        status: Option<TaskStatus>,
    },
    /// Delete a task
    Rm { id: i64 },
}

#[derive(Subcommand)]
pub enum BugCommand {
    /// File a bug report
    Add {
        /// Reporting user ID
        #[arg(long)]
        user: i64,
        description: String,
        #[arg(long)]
        steps: String,
        #[arg(long)]
        expected: String,
        #[arg(long)]
        actual: String,
        /// Low, Medium or High (default Medium)
        #[arg(long)]
        severity: Option<Severity>,
        /// Open, In Progress, Resolved or Closed (default Open)
        #[arg(long)]
        status: Option<BugStatus>,
    },
    /// Show a bug report
    Show { id: i64 },
    /// List bug reports
    List {
        /// Only bugs filed by this user
        #[arg(long)]
        user: Option<i64>,
    },
    /// Edit a bug report
    Edit {
        id: i64,
        #[arg(long)]
        user: Option<i64>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        steps: Option<String>,
        #[arg(long)]
        expected: Option<String>,
        #[arg(long)]
        actual: Option<String>,
        #[arg(long)]
        severity: Option<Severity>,
        #[arg(long)]
        status: Option<BugStatus>,
    },
    /// Delete a bug report
    Rm { id: i64 },
}

#[derive(Subcommand)]
pub enum QuizCommand {
    /// Record a quiz
    Add {
        /// User who took the quiz
        #[arg(long)]
        user: i64,
        #[arg(long)]
        score: i64,
        /// Date taken (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
    },
    /// Show a quiz with its questions
    Show { id: i64 },
    /// List quizzes
    List {
        /// Only quizzes taken by this user
        #[arg(long)]
        user: Option<i64>,
    },
    /// Edit a quiz
    Edit {
        id: i64,
        #[arg(long)]
        user: Option<i64>,
        #[arg(long)]
        score: Option<i64>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Delete a quiz with no linked questions
    Rm { id: i64 },
    /// Count answered and correct questions
    Summary { id: i64 },
}

#[derive(Subcommand)]
pub enum QuestionCommand {
    /// Add a question
    Add {
        text: String,
        #[arg(long)]
        option_a: String,
        #[arg(long)]
        option_b: String,
        #[arg(long)]
        option_c: String,
        #[arg(long)]
        option_d: String,
        /// A, B, C or D
        #[arg(long)]
        correct: AnswerOption,
    },
    /// Show a question
    Show { id: i64 },
    /// List questions
    List,
    /// Edit a question
    Edit {
        id: i64,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        option_a: Option<String>,
        #[arg(long)]
        option_b: Option<String>,
        #[arg(long)]
        option_c: Option<String>,
        #[arg(long)]
        option_d: Option<String>,
        #[arg(long)]
        correct: Option<AnswerOption>,
    },
    /// Delete a question used by no quiz
    Rm { id: i64 },
}

#[derive(Subcommand)]
pub enum AnswerCommand {
    /// Put a question into a quiz, optionally with the chosen answer
    Add {
        #[arg(long)]
        quiz: i64,
        #[arg(long)]
        question: i64,
        /// A, B, C or D
        #[arg(long)]
        selected: Option<AnswerOption>,
    },
    /// Show one quiz question
    Show { id: i64 },
    /// List quiz questions
    List {
        #[arg(long, conflicts_with = "question")]
        quiz: Option<i64>,
        #[arg(long)]
        question: Option<i64>,
    },
    /// Change or clear the chosen answer
    Edit {
        id: i64,
        #[arg(long, conflicts_with = "clear")]
        selected: Option<AnswerOption>,
        /// Mark the question unanswered
        #[arg(long)]
        clear: bool,
    },
    /// Remove a question from its quiz
    Rm { id: i64 },
}
