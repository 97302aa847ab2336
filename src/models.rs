use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declares a closed set of values stored as text.
///
/// The stored form is the display string. Parsing is lenient about case and
/// separators so `"to-do"`, `"TODO"` and `"To-Do"` all name the same value.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Every value, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            /// Comma-separated list of accepted values, for messages.
            pub fn choices() -> String {
                Self::ALL
                    .iter()
                    .map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl TryFrom<&str> for $name {
            type Error = String;

            fn try_from(s: &str) -> Result<Self, Self::Error> {
                let wanted = normalize(s);
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| normalize(v.as_str()) == wanted)
                    .ok_or_else(|| {
                        format!("Invalid {}: {s} (expected one of {})", $field, Self::choices())
                    })
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::try_from(s)
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let s = value.as_str()?;
                Self::try_from(s).map_err(|e| FromSqlError::Other(e.into()))
            }
        }
    };
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

text_enum! {
    /// How urgent a task is
    Priority, "priority" {
        Low => "Low",
        Medium => "Medium",
        High => "High",
    }
}

text_enum! {
    /// How badly a bug hurts
    Severity, "severity" {
        Low => "Low",
        Medium => "Medium",
        High => "High",
    }
}

text_enum! {
    /// Progress of a task. Any value may follow any other.
    TaskStatus, "task status" {
        ToDo => "To-Do",
        InProgress => "In Progress",
        Done => "Done",
    }
}

text_enum! {
    /// Triage state of a bug report
    BugStatus, "bug status" {
        Open => "Open",
        InProgress => "In Progress",
        Resolved => "Resolved",
        Closed => "Closed",
    }
}

text_enum! {
    /// One of the four answer slots of a question
    AnswerOption, "option" {
        A => "A",
        B => "B",
        C => "C",
        D => "D",
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Medium
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::ToDo
    }
}

impl Default for BugStatus {
    fn default() -> Self {
        BugStatus::Open
    }
}

// ==================== User ====================

/// An account owning tasks, bugs and quizzes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Argon2 PHC string, never the plaintext
    #[serde(skip_serializing, default)]
    pub password: String,
    pub email: Option<String>,
}

/// New user input. `password` is plaintext and gets hashed on insert.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<Option<String>>,
}

// ==================== Task ====================

/// A to-do item belonging to a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub status: TaskStatus,
}

/// New task input. Omitted priority and status take their defaults.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub user_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub user_id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub due_date: Option<Option<NaiveDate>>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
}

// ==================== Bug ====================

/// A bug report filed by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bug {
    pub id: i64,
    pub user_id: i64,
    pub description: String,
    pub steps_to_reproduce: String,
    pub expected_outcome: String,
    pub actual_outcome: String,
    pub severity: Severity,
    pub status: BugStatus,
}

/// New bug input. Omitted severity and status take their defaults.
#[derive(Debug, Clone, Default)]
pub struct NewBug {
    pub user_id: i64,
    pub description: String,
    pub steps_to_reproduce: String,
    pub expected_outcome: String,
    pub actual_outcome: String,
    pub severity: Option<Severity>,
    pub status: Option<BugStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct BugUpdate {
    pub user_id: Option<i64>,
    pub description: Option<String>,
    pub steps_to_reproduce: Option<String>,
    pub expected_outcome: Option<String>,
    pub actual_outcome: Option<String>,
    pub severity: Option<Severity>,
    pub status: Option<BugStatus>,
}

// ==================== Quiz ====================

/// One sitting of a quiz by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub user_id: i64,
    pub score: i64,
    pub date_taken: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct NewQuiz {
    pub user_id: i64,
    pub score: i64,
    pub date_taken: NaiveDate,
}

#[derive(Debug, Clone, Default)]
pub struct QuizUpdate {
    pub user_id: Option<i64>,
    pub score: Option<i64>,
    pub date_taken: Option<NaiveDate>,
}

/// Answer tally for a quiz
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizSummary {
    pub quiz_id: i64,
    pub questions: i64,
    pub answered: i64,
    pub correct: i64,
}

// ==================== Question ====================

/// A multiple-choice question, shared across quizzes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_option: AnswerOption,
}

impl Question {
    /// Text of the given answer slot
    pub fn option(&self, option: AnswerOption) -> &str {
        match option {
            AnswerOption::A => &self.option_a,
            AnswerOption::B => &self.option_b,
            AnswerOption::C => &self.option_c,
            AnswerOption::D => &self.option_d,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_option: AnswerOption,
}

#[derive(Debug, Clone, Default)]
pub struct QuestionUpdate {
    pub question_text: Option<String>,
    pub option_a: Option<String>,
    pub option_b: Option<String>,
    pub option_c: Option<String>,
    pub option_d: Option<String>,
    pub correct_option: Option<AnswerOption>,
}

// ==================== QuizQuestion ====================

/// Links a question into a quiz, with the answer the user picked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: i64,
    pub quiz_id: i64,
    pub question_id: i64,
    pub selected_option: Option<AnswerOption>,
}

#[derive(Debug, Clone)]
pub struct NewQuizQuestion {
    pub quiz_id: i64,
    pub question_id: i64,
    pub selected_option: Option<AnswerOption>,
}

#[derive(Debug, Clone, Default)]
pub struct QuizQuestionUpdate {
    pub quiz_id: Option<i64>,
    pub question_id: Option<i64>,
    pub selected_option: Option<Option<AnswerOption>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(Priority::default(), Priority::Medium);
        assert_eq!(Severity::default(), Severity::Medium);
        assert_eq!(TaskStatus::default().as_str(), "To-Do");
        assert_eq!(BugStatus::default().as_str(), "Open");
    }

    #[test]
    fn test_lenient_parse() {
        assert_eq!(TaskStatus::try_from("to-do").unwrap(), TaskStatus::ToDo);
        assert_eq!(TaskStatus::try_from("TODO").unwrap(), TaskStatus::ToDo);
        assert_eq!(
            "in_progress".parse::<BugStatus>().unwrap(),
            BugStatus::InProgress
        );
        assert_eq!("b".parse::<AnswerOption>().unwrap(), AnswerOption::B);
    }

    #[test]
    fn test_rejects_unknown_value() {
        let err = Priority::try_from("Urgent").unwrap_err();
        assert!(err.contains("priority"));
        assert!(err.contains("Low, Medium, High"));
        assert!("E".parse::<AnswerOption>().is_err());
    }

    #[test]
    fn test_serde_uses_display_text() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
        let parsed: TaskStatus = serde_json::from_str("\"To-Do\"").unwrap();
        assert_eq!(parsed, TaskStatus::ToDo);
    }

    #[test]
    fn test_question_option_lookup() {
        let q = Question {
            id: 1,
            question_text: "2+2?".to_string(),
            option_a: "3".to_string(),
            option_b: "4".to_string(),
            option_c: "5".to_string(),
            option_d: "6".to_string(),
            correct_option: AnswerOption::B,
        };
        assert_eq!(q.option(q.correct_option), "4");
        assert_eq!(q.option(AnswerOption::D), "6");
    }

    #[test]
    fn test_user_password_not_serialized() {
        let user = User {
            id: 1,
            username: "alice".to_string(),
            password: "$argon2id$secret".to_string(),
            email: None,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["username"], "alice");
    }
}
