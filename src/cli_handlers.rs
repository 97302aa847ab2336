use crate::cli::{
    AnswerCommand, BugCommand, Commands, QuestionCommand, QuizCommand, TaskCommand, UserCommand,
};
use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::models::{
    AnswerOption, Bug, BugUpdate, NewBug, NewQuestion, NewQuiz, NewQuizQuestion, NewTask,
    NewUser, Question, QuestionUpdate, Quiz, QuizQuestion, QuizQuestionUpdate, QuizUpdate, Task,
    TaskUpdate, User, UserUpdate,
};
use crate::store::RecordStore;
use serde::Serialize;
use serde_json::json;
use std::fs;

/// Run one parsed command against the database named by `config`
pub fn dispatch(config: &Config, command: Commands, json: bool) -> Result<()> {
    let out = Output { json };
    match command {
        Commands::Init => handle_init(config),
        Commands::User(cmd) => handle_user(&open_initialized(config)?, &out, cmd),
        Commands::Task(cmd) => handle_task(&open_initialized(config)?, &out, cmd),
        Commands::Bug(cmd) => handle_bug(&open_initialized(config)?, &out, cmd),
        Commands::Quiz(cmd) => handle_quiz(&open_initialized(config)?, &out, cmd),
        Commands::Question(cmd) => handle_question(&open_initialized(config)?, &out, cmd),
        Commands::Answer(cmd) => handle_answer(&open_initialized(config)?, &out, cmd),
    }
}

/// Open the store, refusing files that were never initialized
fn open_initialized(config: &Config) -> Result<RecordStore> {
    if !config.database_path.exists() {
        return Err(StoreError::NotInitialized);
    }
    let store = RecordStore::from_config(config)?;
    if !store.is_initialized()? {
        return Err(StoreError::NotInitialized);
    }
    Ok(store)
}

/// Chooses between human-readable lines and JSON
struct Output {
    json: bool,
}

impl Output {
    /// Print `value` as JSON, or run `human` to print it for people.
    fn emit<T: Serialize + ?Sized>(&self, value: &T, human: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human(value);
        }
        Ok(())
    }

    fn deleted(&self, entity: &str, id: i64) -> Result<()> {
        self.emit(&json!({ "deleted": entity, "id": id }), |_| {
            println!("Deleted {entity} #{id}");
        })
    }
}

/// Handle the init command
pub fn handle_init(config: &Config) -> Result<()> {
    let db_path = &config.database_path;
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let store = RecordStore::from_config(config)?;
    store.init()?;

    println!("Initialized record store");
    println!("  - Database: {}", db_path.display());

    Ok(())
}

// ==================== Users ====================

fn handle_user(store: &RecordStore, out: &Output, cmd: UserCommand) -> Result<()> {
    match cmd {
        UserCommand::Add {
            username,
            password,
            email,
        } => {
            let user = store.create_user(NewUser {
                username,
                password,
                email,
            })?;
            out.emit(&user, |u| println!("Created user #{}: {}", u.id, u.username))
        }
        UserCommand::Show { id } => {
            let user = store.get_user(id)?;
            let tasks = store.tasks_for_user(id)?;
            let bugs = store.bugs_for_user(id)?;
            let quizzes = store.quizzes_for_user(id)?;
            let detail = json!({
                "user": user,
                "tasks": tasks,
                "bugs": bugs,
                "quizzes": quizzes,
            });
            out.emit(&detail, |_| {
                println!("[#{}] {}", user.id, user.username);
                println!("Email:    {}", user.email.as_deref().unwrap_or("(none)"));
                println!("Tasks:    {}", tasks.len());
                for task in &tasks {
                    println!("  {}", task_line(task));
                }
                println!("Bugs:     {}", bugs.len());
                for bug in &bugs {
                    println!("  {}", bug_line(bug));
                }
                println!("Quizzes:  {}", quizzes.len());
                for quiz in &quizzes {
                    println!("  {}", quiz_line(quiz));
                }
            })
        }
        UserCommand::List => {
            let users = store.list_users()?;
            out.emit(&users, |users| {
                if users.is_empty() {
                    println!("No users found.");
                }
                for user in users {
                    println!("{}", user_line(user));
                }
            })
        }
        UserCommand::Edit {
            id,
            username,
            password,
            email,
            no_email,
        } => {
            let email = if no_email { Some(None) } else { email.map(Some) };
            let user = store.update_user(
                id,
                UserUpdate {
                    username,
                    password,
                    email,
                },
            )?;
            out.emit(&user, |u| println!("Updated user #{}: {}", u.id, u.username))
        }
        UserCommand::Rm { id } => {
            store.delete_user(id)?;
            out.deleted("user", id)
        }
        UserCommand::CheckPassword { id, password } => {
            let matches = store.verify_password(id, &password)?;
            out.emit(&json!({ "id": id, "matches": matches }), |_| {
                if matches {
                    println!("Password matches for user #{id}");
                } else {
                    println!("Password does not match for user #{id}");
                }
            })
        }
    }
}

fn user_line(user: &User) -> String {
    match user.email {
        Some(ref email) => format!("[#{}] {} <{email}>", user.id, user.username),
        None => format!("[#{}] {}", user.id, user.username),
    }
}

// ==================== Tasks ====================

fn handle_task(store: &RecordStore, out: &Output, cmd: TaskCommand) -> Result<()> {
    match cmd {
        TaskCommand::Add {
            user,
            name,
            desc,
            due,
            priority,
            status,
        } => {
            let task = store.create_task(NewTask {
                user_id: user,
                name,
                description: desc,
                due_date: due,
                priority,
                status,
            })?;
            out.emit(&task, |t| {
                println!("Created task #{}: {}", t.id, t.name);
                println!("  Priority: {}  Status: {}", t.priority, t.status);
            })
        }
        TaskCommand::Show { id } => {
            let task = store.get_task(id)?;
            out.emit(&task, |t| {
                println!("[#{}] {}", t.id, t.name);
                println!("User:         #{}", t.user_id);
                println!("Priority:     {}", t.priority);
                println!("Status:       {}", t.status);
                match t.due_date {
                    Some(due) => println!("Due:          {}", due.format("%Y-%m-%d")),
                    None => println!("Due:          (none)"),
                }
                if let Some(ref desc) = t.description {
                    println!("Description:  {desc}");
                }
            })
        }
        TaskCommand::List { user } => {
            let tasks = match user {
                Some(user_id) => store.tasks_for_user(user_id)?,
                None => store.list_tasks()?,
            };
            out.emit(&tasks, |tasks| {
                if tasks.is_empty() {
                    println!("No tasks found.");
                }
                for task in tasks {
                    println!("{}", task_line(task));
                }
            })
        }
        TaskCommand::Edit {
            id,
            user,
            name,
            desc,
            no_desc,
            due,
            no_due,
            priority,
            status,
        } => {
            let task = store.update_task(
                id,
                TaskUpdate {
                    user_id: user,
                    name,
                    description: if no_desc { Some(None) } else { desc.map(Some) },
                    due_date: if no_due { Some(None) } else { due.map(Some) },
                    priority,
                    status,
                },
            )?;
            out.emit(&task, |t| println!("Updated task #{}: {}", t.id, t.name))
        }
        TaskCommand::Rm { id } => {
            store.delete_task(id)?;
            out.deleted("task", id)
        }
    }
}

fn task_line(task: &Task) -> String {
    let due = task
        .due_date
        .map(|d| format!(" due {}", d.format("%Y-%m-%d")))
        .unwrap_or_default();
    format!(
        "[#{}] {} ({}, {}){due}",
        task.id, task.name, task.priority, task.status
    )
}

// ==================== Bugs ====================

fn handle_bug(store: &RecordStore, out: &Output, cmd: BugCommand) -> Result<()> {
    match cmd {
        BugCommand::Add {
            user,
            description,
            steps,
            expected,
            actual,
            severity,
            status,
        } => {
            let bug = store.create_bug(NewBug {
                user_id: user,
                description,
                steps_to_reproduce: steps,
                expected_outcome: expected,
                actual_outcome: actual,
                severity,
                status,
            })?;
            out.emit(&bug, |b| {
                println!("Filed bug #{}: {}", b.id, b.description);
                println!("  Severity: {}  Status: {}", b.severity, b.status);
            })
        }
        BugCommand::Show { id } => {
            let bug = store.get_bug(id)?;
            out.emit(&bug, |b| {
                println!("[#{}] {}", b.id, b.description);
                println!("User:      #{}", b.user_id);
                println!("Severity:  {}", b.severity);
                println!("Status:    {}", b.status);
                println!("Steps:     {}", b.steps_to_reproduce);
                println!("Expected:  {}", b.expected_outcome);
                println!("Actual:    {}", b.actual_outcome);
            })
        }
        BugCommand::List { user } => {
            let bugs = match user {
                Some(user_id) => store.bugs_for_user(user_id)?,
                None => store.list_bugs()?,
            };
            out.emit(&bugs, |bugs| {
                if bugs.is_empty() {
                    println!("No bugs found.");
                }
                for bug in bugs {
                    println!("{}", bug_line(bug));
                }
            })
        }
        BugCommand::Edit {
            id,
            user,
            description,
            steps,
            expected,
            actual,
            severity,
            status,
        } => {
            let bug = store.update_bug(
                id,
                BugUpdate {
                    user_id: user,
                    description,
                    steps_to_reproduce: steps,
                    expected_outcome: expected,
                    actual_outcome: actual,
                    severity,
                    status,
                },
            )?;
            out.emit(&bug, |b| println!("Updated bug #{}: {}", b.id, b.status))
        }
        BugCommand::Rm { id } => {
            store.delete_bug(id)?;
            out.deleted("bug", id)
        }
    }
}

fn bug_line(bug: &Bug) -> String {
    format!(
        "[#{}] {} ({}, {})",
        bug.id, bug.description, bug.severity, bug.status
    )
}

// ==================== Quizzes ====================

fn handle_quiz(store: &RecordStore, out: &Output, cmd: QuizCommand) -> Result<()> {
    match cmd {
        QuizCommand::Add { user, score, date } => {
            let quiz = store.create_quiz(NewQuiz {
                user_id: user,
                score,
                date_taken: date,
            })?;
            out.emit(&quiz, |q| {
                println!("Recorded quiz #{}: score {} on {}", q.id, q.score, q.date_taken)
            })
        }
        QuizCommand::Show { id } => {
            let quiz = store.get_quiz(id)?;
            let links = store.quiz_questions_for_quiz(id)?;
            let questions = links
                .iter()
                .map(|link| store.get_question(link.question_id))
                .collect::<Result<Vec<_>>>()?;
            let entries: Vec<_> = links
                .iter()
                .zip(&questions)
                .map(|(link, question)| json!({ "link": link, "question": question }))
                .collect();
            let detail = json!({ "quiz": quiz, "questions": entries });
            out.emit(&detail, |_| {
                println!("{}", quiz_line(&quiz));
                if links.is_empty() {
                    println!("Questions: (none)");
                }
                for (link, question) in links.iter().zip(&questions) {
                    println!("  {}", answer_line(link, question));
                }
            })
        }
        QuizCommand::List { user } => {
            let quizzes = match user {
                Some(user_id) => store.quizzes_for_user(user_id)?,
                None => store.list_quizzes()?,
            };
            out.emit(&quizzes, |quizzes| {
                if quizzes.is_empty() {
                    println!("No quizzes found.");
                }
                for quiz in quizzes {
                    println!("{}", quiz_line(quiz));
                }
            })
        }
        QuizCommand::Edit {
            id,
            user,
            score,
            date,
        } => {
            let quiz = store.update_quiz(
                id,
                QuizUpdate {
                    user_id: user,
                    score,
                    date_taken: date,
                },
            )?;
            out.emit(&quiz, |q| println!("Updated {}", quiz_line(q)))
        }
        QuizCommand::Rm { id } => {
            store.delete_quiz(id)?;
            out.deleted("quiz", id)
        }
        QuizCommand::Summary { id } => {
            let summary = store.quiz_summary(id)?;
            out.emit(&summary, |s| {
                println!(
                    "Quiz #{}: {} questions, {} answered, {} correct",
                    s.quiz_id, s.questions, s.answered, s.correct
                )
            })
        }
    }
}

fn quiz_line(quiz: &Quiz) -> String {
    format!(
        "[#{}] user #{} scored {} on {}",
        quiz.id, quiz.user_id, quiz.score, quiz.date_taken
    )
}

// ==================== Questions ====================

fn handle_question(store: &RecordStore, out: &Output, cmd: QuestionCommand) -> Result<()> {
    match cmd {
        QuestionCommand::Add {
            text,
            option_a,
            option_b,
            option_c,
            option_d,
            correct,
        } => {
            let question = store.create_question(NewQuestion {
                question_text: text,
                option_a,
                option_b,
                option_c,
                option_d,
                correct_option: correct,
            })?;
            out.emit(&question, |q| {
                println!("Created question #{}: {}", q.id, q.question_text)
            })
        }
        QuestionCommand::Show { id } => {
            let question = store.get_question(id)?;
            out.emit(&question, |q| {
                println!("[#{}] {}", q.id, q.question_text);
                for option in AnswerOption::ALL {
                    let marker = if *option == q.correct_option { "*" } else { " " };
                    println!(" {marker}{option}) {}", q.option(*option));
                }
            })
        }
        QuestionCommand::List => {
            let questions = store.list_questions()?;
            out.emit(&questions, |questions| {
                if questions.is_empty() {
                    println!("No questions found.");
                }
                for q in questions {
                    println!("[#{}] {} (answer {})", q.id, q.question_text, q.correct_option);
                }
            })
        }
        QuestionCommand::Edit {
            id,
            text,
            option_a,
            option_b,
            option_c,
            option_d,
            correct,
        } => {
            let question = store.update_question(
                id,
                QuestionUpdate {
                    question_text: text,
                    option_a,
                    option_b,
                    option_c,
                    option_d,
                    correct_option: correct,
                },
            )?;
            out.emit(&question, |q| {
                println!("Updated question #{}: {}", q.id, q.question_text)
            })
        }
        QuestionCommand::Rm { id } => {
            store.delete_question(id)?;
            out.deleted("question", id)
        }
    }
}

// ==================== Quiz Questions ====================

fn handle_answer(store: &RecordStore, out: &Output, cmd: AnswerCommand) -> Result<()> {
    match cmd {
        AnswerCommand::Add {
            quiz,
            question,
            selected,
        } => {
            let link = store.create_quiz_question(NewQuizQuestion {
                quiz_id: quiz,
                question_id: question,
                selected_option: selected,
            })?;
            out.emit(&link, |l| {
                println!(
                    "Added question #{} to quiz #{} as #{}",
                    l.question_id, l.quiz_id, l.id
                )
            })
        }
        AnswerCommand::Show { id } => {
            let link = store.get_quiz_question(id)?;
            let question = store.get_question(link.question_id)?;
            out.emit(&link, |l| println!("{}", answer_line(l, &question)))
        }
        AnswerCommand::List { quiz, question } => {
            let links = match (quiz, question) {
                (Some(quiz_id), _) => store.quiz_questions_for_quiz(quiz_id)?,
                (None, Some(question_id)) => store.quiz_questions_for_question(question_id)?,
                (None, None) => store.list_quiz_questions()?,
            };
            out.emit(&links, |links| {
                if links.is_empty() {
                    println!("No quiz questions found.");
                }
                for l in links {
                    let selected = l
                        .selected_option
                        .map(|o| o.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "[#{}] quiz #{} question #{} selected {selected}",
                        l.id, l.quiz_id, l.question_id
                    );
                }
            })
        }
        AnswerCommand::Edit {
            id,
            selected,
            clear,
        } => {
            let selected_option = if clear { Some(None) } else { selected.map(Some) };
            let link = store.update_quiz_question(
                id,
                QuizQuestionUpdate {
                    selected_option,
                    ..Default::default()
                },
            )?;
            out.emit(&link, |l| match l.selected_option {
                Some(option) => println!("Answer #{} set to {option}", l.id),
                None => println!("Answer #{} cleared", l.id),
            })
        }
        AnswerCommand::Rm { id } => {
            store.delete_quiz_question(id)?;
            out.deleted("quiz question", id)
        }
    }
}

fn answer_line(link: &QuizQuestion, question: &Question) -> String {
    let verdict = match link.selected_option {
        Some(option) if option == question.correct_option => format!("{option} ✓"),
        Some(option) => format!("{option} ✗ (answer {})", question.correct_option),
        None => "unanswered".to_string(),
    };
    format!("[#{}] {} {verdict}", link.id, question.question_text)
}
