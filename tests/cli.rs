use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn studydesk(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("studydesk").unwrap();
    cmd.current_dir(temp_dir)
        .env("STUDYDESK_PASSWORD_MEMORY_KIB", "8")
        .env("STUDYDESK_PASSWORD_ITERATIONS", "1")
        .env_remove("STUDYDESK_DATABASE_PATH")
        .env_remove("RUST_LOG");
    cmd
}

fn init(temp_dir: &TempDir) {
    studydesk(temp_dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized record store"));
}

#[test]
fn test_requires_init() {
    let temp_dir = TempDir::new().unwrap();
    studydesk(&temp_dir)
        .args(["user", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn test_full_workflow() {
    let temp_dir = TempDir::new().unwrap();
    init(&temp_dir);
    assert!(temp_dir.path().join("studydesk.db").exists());

    studydesk(&temp_dir)
        .args(["user", "add", "alice", "--password", "x", "--email", "a@x.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created user #1: alice"));

    studydesk(&temp_dir)
        .args(["task", "add", "--user", "1", "Write report"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created task #1: Write report"))
        .stdout(predicate::str::contains("Priority: Medium  Status: To-Do"));

    studydesk(&temp_dir)
        .args(["quiz", "add", "--user", "1", "--score", "80", "--date", "2024-01-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded quiz #1: score 80 on 2024-01-01"));

    studydesk(&temp_dir)
        .args([
            "question",
            "add",
            "2+2?",
            "--option-a",
            "3",
            "--option-b",
            "4",
            "--option-c",
            "5",
            "--option-d",
            "6",
            "--correct",
            "B",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created question #1: 2+2?"));

    studydesk(&temp_dir)
        .args(["answer", "add", "--quiz", "1", "--question", "1", "--selected", "B"])
        .assert()
        .success();

    studydesk(&temp_dir)
        .args(["quiz", "summary", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 questions, 1 answered, 1 correct"));

    studydesk(&temp_dir)
        .args(["user", "show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Write report (Medium, To-Do)"))
        .stdout(predicate::str::contains("scored 80"));
}

#[test]
fn test_duplicate_username_fails() {
    let temp_dir = TempDir::new().unwrap();
    init(&temp_dir);

    studydesk(&temp_dir)
        .args(["user", "add", "alice", "--password", "x"])
        .assert()
        .success();
    studydesk(&temp_dir)
        .args(["user", "add", "alice", "--password", "y"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("user.username must be unique"));
}

#[test]
fn test_task_for_missing_user_fails() {
    let temp_dir = TempDir::new().unwrap();
    init(&temp_dir);

    studydesk(&temp_dir)
        .args(["task", "add", "--user", "9", "orphan"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("User #9 does not exist"));
}

#[test]
fn test_delete_user_with_tasks_is_refused() {
    let temp_dir = TempDir::new().unwrap();
    init(&temp_dir);

    studydesk(&temp_dir)
        .args(["user", "add", "alice", "--password", "x"])
        .assert()
        .success();
    studydesk(&temp_dir)
        .args(["task", "add", "--user", "1", "t"])
        .assert()
        .success();

    studydesk(&temp_dir)
        .args(["user", "rm", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("still has dependent records"));

    studydesk(&temp_dir)
        .args(["task", "rm", "1"])
        .assert()
        .success();
    studydesk(&temp_dir)
        .args(["user", "rm", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted user #1"));
}

#[test]
fn test_invalid_priority_rejected_by_parser() {
    let temp_dir = TempDir::new().unwrap();
    init(&temp_dir);

    studydesk(&temp_dir)
        .args(["task", "add", "--user", "1", "t", "--priority", "Urgent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid priority"));
}

#[test]
fn test_json_output() {
    let temp_dir = TempDir::new().unwrap();
    init(&temp_dir);

    studydesk(&temp_dir)
        .args(["user", "add", "alice", "--password", "x"])
        .assert()
        .success();

    let output = studydesk(&temp_dir)
        .args([
            "--json", "bug", "add", "--user", "1", "Crash", "--steps", "Save", "--expected",
            "Saved", "--actual", "Crashed",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let bug: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(bug["severity"], "Medium");
    assert_eq!(bug["status"], "Open");
    assert_eq!(bug["user_id"], 1);
}

#[test]
fn test_password_check() {
    let temp_dir = TempDir::new().unwrap();
    init(&temp_dir);

    studydesk(&temp_dir)
        .args(["user", "add", "alice", "--password", "secret"])
        .assert()
        .success();

    studydesk(&temp_dir)
        .args(["user", "check-password", "1", "secret"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Password matches"));
    studydesk(&temp_dir)
        .args(["user", "check-password", "1", "wrong"])
        .assert()
        .success()
        .stdout(predicate::str::contains("does not match"));
}

#[test]
fn test_db_flag_overrides_default_path() {
    let temp_dir = TempDir::new().unwrap();

    studydesk(&temp_dir)
        .args(["--db", "data/custom.db", "init"])
        .assert()
        .success();
    assert!(temp_dir.path().join("data/custom.db").exists());
    assert!(!temp_dir.path().join("studydesk.db").exists());

    studydesk(&temp_dir)
        .args(["--db", "data/custom.db", "user", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No users found."));
}

#[test]
fn test_quiz_add_requires_date() {
    let temp_dir = TempDir::new().unwrap();
    init(&temp_dir);

    studydesk(&temp_dir)
        .args(["user", "add", "alice", "--password", "x"])
        .assert()
        .success();

    studydesk(&temp_dir)
        .args(["quiz", "add", "--user", "1", "--score", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--date"));

    studydesk(&temp_dir)
        .args(["quiz", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No quizzes found."));
}

#[test]
fn test_quiz_show_json_includes_questions() {
    let temp_dir = TempDir::new().unwrap();
    init(&temp_dir);

    studydesk(&temp_dir)
        .args(["user", "add", "alice", "--password", "x"])
        .assert()
        .success();
    studydesk(&temp_dir)
        .args(["quiz", "add", "--user", "1", "--score", "80", "--date", "2024-01-01"])
        .assert()
        .success();
    studydesk(&temp_dir)
        .args([
            "question",
            "add",
            "2+2?",
            "--option-a",
            "3",
            "--option-b",
            "4",
            "--option-c",
            "5",
            "--option-d",
            "6",
            "--correct",
            "B",
        ])
        .assert()
        .success();
    studydesk(&temp_dir)
        .args(["answer", "add", "--quiz", "1", "--question", "1", "--selected", "C"])
        .assert()
        .success();

    let output = studydesk(&temp_dir)
        .args(["--json", "quiz", "show", "1"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let detail: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(detail["quiz"]["score"], 80);
    let entries = detail["questions"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["link"]["selected_option"], "C");
    assert_eq!(entries[0]["question"]["question_text"], "2+2?");
    assert_eq!(entries[0]["question"]["correct_option"], "B");
}
