//! Command implementations.
//!
//! [`run`] is the composition root: it loads the backend configuration,
//! builds the [`Client`] once and dispatches the parsed command. The riddle
//! commands are written against any [`Backend`] and any output writer.

use chrono::Utc;
use podupu_core::{
    delete_riddle, insert_riddle, list_riddles, update_riddle, Backend, BackendConfig, Client,
    ExportFormat, NewRiddle, Riddle, RiddleFilter, RiddleId, RiddlePatch, Session,
};
use std::io::Write;
use std::path::Path;

use crate::args::{edit_patch, Cli, Command, Credentials};
use crate::errors::{CliError, CliResult};
use crate::session::SessionStore;

/// Longest question shown in a list before it is cut with `...`.
pub const QUESTION_DISPLAY_CHARS: usize = 80;

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let config = BackendConfig::from_env()?;
    let client = Client::new(&config)?;
    let store = SessionStore::default();
    let mut out = std::io::stdout().lock();
    run_command(cli.command, &client, &store, &mut out)
}

/// Run a parsed command against `client`, writing user-facing output to `out`.
pub fn run_command<W: Write>(
    command: Command,
    client: &Client,
    store: &SessionStore,
    out: &mut W,
) -> CliResult<()> {
    match command {
        Command::Add {
            question,
            answer,
            category,
            difficulty,
        } => {
            let session = require_session(store, "add riddles")?;
            let riddle = NewRiddle::new(&question, &answer, category, difficulty)?;
            add(&client.with_session(&session), &riddle, out)
        }
        Command::List {
            filter,
            show_answers,
        } => list(client, &filter.to_filter(), show_answers, out),
        Command::Edit {
            id,
            question,
            answer,
            category,
            difficulty,
        } => {
            let session = require_session(store, "edit riddles")?;
            let patch = edit_patch(question.as_deref(), answer.as_deref(), category, difficulty);
            edit(&client.with_session(&session), &RiddleId::new(id), &patch, out)
        }
        Command::Delete { id } => {
            let session = require_session(store, "delete riddles")?;
            delete(&client.with_session(&session), &RiddleId::new(id), out)
        }
        Command::Export {
            format,
            out: path,
            filter,
        } => {
            let path = path.unwrap_or_else(|| format.file_name().into());
            export(client, &filter.to_filter(), format, &path, out)
        }
        Command::Login(credentials) => login(client, store, &credentials, out),
        Command::Signup(credentials) => signup(client, store, &credentials, out),
        Command::Logout => logout(client, store, out),
        Command::Whoami => whoami(client, store, out),
    }
}

/// Returns the saved session, or the error shown when a write needs one.
pub fn require_session(store: &SessionStore, action: &str) -> CliResult<Session> {
    let session = store
        .load()
        .ok_or_else(|| CliError::NotSignedIn(action.to_string()))?;
    if session.is_expired_at(Utc::now().timestamp()) {
        return Err(CliError::SessionExpired);
    }
    Ok(session)
}

pub fn add<B: Backend + ?Sized, W: Write>(
    backend: &B,
    riddle: &NewRiddle,
    out: &mut W,
) -> CliResult<()> {
    let saved = insert_riddle(backend, riddle)?;
    writeln!(out, "Riddle saved. ({})", saved.id)?;
    Ok(())
}

pub fn list<B: Backend + ?Sized, W: Write>(
    backend: &B,
    filter: &RiddleFilter,
    show_answers: bool,
    out: &mut W,
) -> CliResult<()> {
    let riddles = list_riddles(backend, filter)?;
    if riddles.is_empty() {
        writeln!(out, "No riddles found.")?;
        return Ok(());
    }
    for riddle in &riddles {
        write_riddle(out, riddle, show_answers)?;
    }
    Ok(())
}

pub fn edit<B: Backend + ?Sized, W: Write>(
    backend: &B,
    id: &RiddleId,
    patch: &RiddlePatch,
    out: &mut W,
) -> CliResult<()> {
    let outcome = update_riddle(backend, id, patch)?;
    if outcome.count == 0 {
        writeln!(out, "Nothing changed.")?;
    } else {
        writeln!(out, "Updated.")?;
    }
    Ok(())
}

pub fn delete<B: Backend + ?Sized, W: Write>(
    backend: &B,
    id: &RiddleId,
    out: &mut W,
) -> CliResult<()> {
    if delete_riddle(backend, id)? == 0 {
        writeln!(out, "Nothing changed.")?;
    } else {
        writeln!(out, "Deleted.")?;
    }
    Ok(())
}

pub fn export<B: Backend + ?Sized, W: Write>(
    backend: &B,
    filter: &RiddleFilter,
    format: ExportFormat,
    path: &Path,
    out: &mut W,
) -> CliResult<()> {
    let riddles = list_riddles(backend, filter)?;
    podupu_core::write_export(path, format, &riddles)?;
    writeln!(
        out,
        "Wrote {} riddles to {} ({})",
        riddles.len(),
        path.display(),
        format.mime_type()
    )?;
    Ok(())
}

fn login<W: Write>(
    client: &Client,
    store: &SessionStore,
    credentials: &Credentials,
    out: &mut W,
) -> CliResult<()> {
    let session = client
        .auth()
        .sign_in_with_password(&credentials.email, &credentials.password)?;
    store.save(&session)?;
    writeln!(out, "Logged in as {}", display_user(&session))?;
    Ok(())
}

fn signup<W: Write>(
    client: &Client,
    store: &SessionStore,
    credentials: &Credentials,
    out: &mut W,
) -> CliResult<()> {
    let outcome = client
        .auth()
        .sign_up(&credentials.email, &credentials.password)?;
    match outcome.session {
        Some(session) => {
            store.save(&session)?;
            writeln!(out, "Signed up and logged in as {}", display_user(&session))?;
        }
        None => writeln!(out, "Signup successful. Check your email to confirm, then log in.")?,
    }
    Ok(())
}

fn logout<W: Write>(client: &Client, store: &SessionStore, out: &mut W) -> CliResult<()> {
    let Some(session) = store.load() else {
        writeln!(out, "Not logged in.")?;
        return Ok(());
    };
    // The local session is forgotten even when the server call fails.
    let revoked = client.auth().sign_out(&session);
    store.clear()?;
    revoked?;
    writeln!(out, "Logged out.")?;
    Ok(())
}

fn whoami<W: Write>(client: &Client, store: &SessionStore, out: &mut W) -> CliResult<()> {
    let Some(session) = store.load() else {
        writeln!(out, "Not logged in.")?;
        return Ok(());
    };
    let user = client.auth().current_user(&session)?;
    writeln!(out, "{}", user.email.as_deref().unwrap_or(&user.id))?;
    Ok(())
}

fn display_user(session: &Session) -> &str {
    session.user.email.as_deref().unwrap_or(&session.user.id)
}

fn write_riddle<W: Write>(out: &mut W, riddle: &Riddle, show_answer: bool) -> std::io::Result<()> {
    writeln!(
        out,
        "{} | {} • {}",
        truncate_question(&riddle.question),
        riddle.category,
        riddle.difficulty
    )?;
    if show_answer {
        writeln!(out, "  Answer: {}", riddle.answer)?;
    }
    writeln!(
        out,
        "  {} · added {}",
        riddle.id,
        riddle.created_at.format("%Y-%m-%d %H:%M")
    )
}

/// Cuts `question` to [`QUESTION_DISPLAY_CHARS`] characters, marking the cut with `...`.
pub fn truncate_question(question: &str) -> String {
    if question.chars().count() > QUESTION_DISPLAY_CHARS {
        let head: String = question.chars().take(QUESTION_DISPLAY_CHARS).collect();
        format!("{head}...")
    } else {
        question.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podupu_core::{Category, Difficulty, SqliteBackend, User};
    use tempfile::TempDir;

    fn seeded() -> SqliteBackend {
        let backend = SqliteBackend::open_in_memory().unwrap();
        for (q, a, c) in [
            ("ఏనుగు ఎంత పెద్దది?", "చాలా పెద్దది", Category::Funny),
            ("తోక ఉన్న పిట్ట?", "సూది దారం", Category::Traditional),
        ] {
            insert_riddle(&backend, &NewRiddle::new(q, a, c, Difficulty::Easy).unwrap()).unwrap();
        }
        backend
    }

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_truncate_question() {
        assert_eq!(truncate_question("short"), "short");

        let long = "ప".repeat(81);
        let cut = truncate_question(&long);
        assert_eq!(cut.chars().count(), 83);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate_question(&"x".repeat(80)), "x".repeat(80));
    }

    #[test]
    fn test_list_prints_newest_first() {
        let backend = seeded();
        let mut buf = Vec::new();
        list(&backend, &RiddleFilter::default(), true, &mut buf).unwrap();
        let text = output(buf);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "తోక ఉన్న పిట్ట? | traditional • easy");
        assert_eq!(lines[1], "  Answer: సూది దారం");
        assert!(text.contains("ఏనుగు ఎంత పెద్దది? | funny • easy"));
    }

    #[test]
    fn test_list_hides_answers_by_default() {
        let backend = seeded();
        let mut buf = Vec::new();
        list(&backend, &RiddleFilter::default(), false, &mut buf).unwrap();
        assert!(!output(buf).contains("Answer:"));
    }

    #[test]
    fn test_list_empty_message() {
        let backend = seeded();
        let mut buf = Vec::new();
        list(&backend, &RiddleFilter::default().search("zebra"), false, &mut buf).unwrap();
        assert_eq!(output(buf), "No riddles found.\n");
    }

    #[test]
    fn test_edit_and_delete_report_counts() {
        let backend = seeded();
        let target = list_riddles(&backend, &RiddleFilter::default()).unwrap()[0].id.clone();

        let mut buf = Vec::new();
        edit(&backend, &target, &RiddlePatch::new().category(Category::Modern), &mut buf).unwrap();
        delete(&backend, &target, &mut buf).unwrap();
        delete(&backend, &target, &mut buf).unwrap();
        edit(&backend, &target, &RiddlePatch::new().category(Category::Funny), &mut buf).unwrap();

        assert_eq!(output(buf), "Updated.\nDeleted.\nNothing changed.\nNothing changed.\n");
    }

    #[test]
    fn test_edit_with_no_fields_is_rejected() {
        let backend = seeded();
        let mut buf = Vec::new();
        let result = edit(&backend, &RiddleId::from("1"), &RiddlePatch::new(), &mut buf);
        match result {
            Err(e) => assert_eq!(e.user_message(), "Nothing to update"),
            Ok(()) => panic!("empty patch accepted"),
        }
    }

    #[test]
    fn test_export_writes_file() {
        let backend = seeded();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(ExportFormat::Json.file_name());

        let mut buf = Vec::new();
        export(&backend, &RiddleFilter::default(), ExportFormat::Json, &path, &mut buf).unwrap();

        let riddles: Vec<Riddle> = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(riddles.len(), 2);
        assert!(output(buf).starts_with("Wrote 2 riddles to "));
    }

    #[test]
    fn test_require_session() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::at(dir.path().join("session.json"));
        assert!(matches!(
            require_session(&store, "add riddles"),
            Err(CliError::NotSignedIn(_))
        ));

        let mut session = Session {
            access_token: "jwt".to_string(),
            token_type: "bearer".to_string(),
            expires_in: None,
            expires_at: Some(1),
            refresh_token: None,
            user: User {
                id: "u-1".to_string(),
                email: None,
            },
        };
        store.save(&session).unwrap();
        assert!(matches!(
            require_session(&store, "add riddles"),
            Err(CliError::SessionExpired)
        ));

        session.expires_at = None;
        store.save(&session).unwrap();
        assert_eq!(require_session(&store, "add riddles").unwrap(), session);
    }
}
