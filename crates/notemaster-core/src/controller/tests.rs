use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use tokio::sync::oneshot;

use super::*;
use crate::api::ApiResult;
use crate::auth::{Credentials, MemoryTokenStore, Registration, Token};
use crate::models::{Note, NoteDraft, NoteId, RegisteredUser, SortKey, User};

const VALID_TOKEN: &str = "valid-token";
const PASSWORD: &str = "correct horse";

#[derive(Clone, Copy, Debug)]
enum Failure {
    Unauthorized,
    Status(u16),
}

impl Failure {
    fn to_error(self) -> ApiError {
        match self {
            Self::Unauthorized => ApiError::Unauthorized("Could not validate credentials".into()),
            Self::Status(status) => ApiError::Status {
                status,
                message: format!("Server error {status}"),
            },
        }
    }
}

#[derive(Default)]
struct Server {
    notes: Vec<Note>,
    next_id: i64,
    list_queries: Vec<NoteQuery>,
    profile_calls: usize,
    login_calls: usize,
    register_calls: usize,
    write_calls: usize,
    list_gates: VecDeque<oneshot::Receiver<()>>,
    fail_profile: Option<Failure>,
    fail_list: Option<Failure>,
    fail_write: Option<Failure>,
}

/// In-process stand-in for the REST service. List responses can be held
/// behind gates to force a chosen completion order.
#[derive(Default)]
struct FakeNoteService {
    server: Mutex<Server>,
}

impl FakeNoteService {
    fn with_notes(notes: Vec<Note>) -> Self {
        let next_id = notes.iter().map(|note| note.id.get()).max().unwrap_or(0) + 1;
        Self {
            server: Mutex::new(Server {
                notes,
                next_id,
                ..Server::default()
            }),
        }
    }

    fn server(&self) -> MutexGuard<'_, Server> {
        self.server.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hold the next list response until the returned sender fires.
    fn gate_next_list(&self) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        self.server().list_gates.push_back(gate);
        release
    }

    fn list_count(&self) -> usize {
        self.server().list_queries.len()
    }

    fn check_token(token: &Token) -> ApiResult<()> {
        if token.expose() == VALID_TOKEN {
            Ok(())
        } else {
            Err(Failure::Unauthorized.to_error())
        }
    }

    fn begin_write(&self, token: &Token) -> ApiResult<MutexGuard<'_, Server>> {
        let mut server = self.server();
        server.write_calls += 1;
        if let Some(failure) = server.fail_write {
            return Err(failure.to_error());
        }
        Self::check_token(token)?;
        Ok(server)
    }
}

fn ada() -> User {
    User {
        id: 7,
        username: "ada".to_string(),
        email: "ada@example.com".to_string(),
    }
}

impl NoteService for FakeNoteService {
    async fn register(&self, registration: &Registration) -> ApiResult<RegisteredUser> {
        self.server().register_calls += 1;
        Ok(RegisteredUser {
            id: 7,
            username: registration.username.clone(),
            email: registration.email.clone(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        })
    }

    async fn login(&self, credentials: &Credentials) -> ApiResult<Token> {
        self.server().login_calls += 1;
        if credentials.password == PASSWORD {
            Ok(Token::new(VALID_TOKEN))
        } else {
            Err(ApiError::Unauthorized(
                "Incorrect username or password".to_string(),
            ))
        }
    }

    async fn profile(&self, token: &Token) -> ApiResult<User> {
        let failure = {
            let mut server = self.server();
            server.profile_calls += 1;
            server.fail_profile
        };
        if let Some(failure) = failure {
            return Err(failure.to_error());
        }
        Self::check_token(token)?;
        Ok(ada())
    }

    async fn list_notes(&self, token: &Token, query: &NoteQuery) -> ApiResult<Vec<Note>> {
        let gate = {
            let mut server = self.server();
            server.list_queries.push(query.clone());
            server.list_gates.pop_front()
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let server = self.server();
        if let Some(failure) = server.fail_list {
            return Err(failure.to_error());
        }
        Self::check_token(token)?;
        let needle = query.search_term.to_lowercase();
        let mut notes: Vec<Note> = server
            .notes
            .iter()
            .filter(|note| {
                needle.is_empty()
                    || note.title.to_lowercase().contains(&needle)
                    || note.content.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        match query.sort_key {
            SortKey::Newest => notes.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortKey::Oldest => notes.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            SortKey::TitleAsc => notes.sort_by(|a, b| a.title.cmp(&b.title)),
            SortKey::TitleDesc => notes.sort_by(|a, b| b.title.cmp(&a.title)),
        }
        if let Some(limit) = query.limit {
            notes.truncate(limit as usize);
        }
        Ok(notes)
    }

    async fn create_note(&self, token: &Token, draft: &NoteDraft) -> ApiResult<Note> {
        let mut server = self.begin_write(token)?;
        let id = server.next_id;
        server.next_id += 1;
        let note = note_on_day(id, &draft.title, id);
        let note = Note {
            content: draft.content.clone(),
            ..note
        };
        server.notes.push(note.clone());
        Ok(note)
    }

    async fn update_note(&self, token: &Token, id: NoteId, draft: &NoteDraft) -> ApiResult<Note> {
        let mut server = self.begin_write(token)?;
        let Some(note) = server.notes.iter_mut().find(|note| note.id == id) else {
            return Err(ApiError::Status {
                status: 404,
                message: "Note not found".to_string(),
            });
        };
        note.title.clone_from(&draft.title);
        note.content.clone_from(&draft.content);
        note.updated_at += Duration::hours(1);
        Ok(note.clone())
    }

    async fn delete_note(&self, token: &Token, id: NoteId) -> ApiResult<Option<Note>> {
        let mut server = self.begin_write(token)?;
        let index = server.notes.iter().position(|note| note.id == id);
        Ok(index.map(|index| server.notes.remove(index)))
    }
}

fn note_on_day(id: i64, title: &str, day: i64) -> Note {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap() + Duration::days(day);
    Note {
        id: NoteId::new(id),
        title: title.to_string(),
        content: String::new(),
        created_at: at,
        updated_at: at,
    }
}

fn ids(snapshot: &ControllerSnapshot) -> Vec<i64> {
    snapshot.notes.iter().map(|note| note.id.get()).collect()
}

type Controller = NotesController<FakeNoteService>;

fn controller_with(notes: Vec<Note>, token: Option<&str>) -> (Controller, MemoryTokenStore) {
    let store = token.map_or_else(MemoryTokenStore::default, |raw| {
        MemoryTokenStore::with_token(Token::new(raw))
    });
    let controller = NotesController::new(FakeNoteService::with_notes(notes), store.clone());
    (controller, store)
}

async fn signed_in(notes: Vec<Note>) -> (Controller, MemoryTokenStore) {
    let (controller, store) = controller_with(notes, Some(VALID_TOKEN));
    assert_eq!(controller.bootstrap().await, Some(ada()));
    (controller, store)
}

/// Poll a future once; true if it already completed.
async fn poll_once<F: Future + Unpin>(future: &mut F) -> bool {
    tokio::select! {
        biased;
        _ = future => true,
        () = std::future::ready(()) => false,
    }
}

#[tokio::test(flavor = "current_thread")]
async fn bootstrap_without_token_makes_no_calls() {
    let (controller, _store) = controller_with(vec![note_on_day(1, "a", 1)], None);

    assert_eq!(controller.bootstrap().await, None);

    let server = controller.service().server();
    assert_eq!(server.profile_calls, 0);
    assert!(server.list_queries.is_empty());
    drop(server);
    assert_eq!(controller.session_phase(), SessionPhase::SignedOut);
    assert_eq!(controller.snapshot(), ControllerSnapshot::default());
}

#[tokio::test(flavor = "current_thread")]
async fn bootstrap_with_valid_token_loads_notes_and_selects_first() {
    let notes = vec![note_on_day(1, "older", 1), note_on_day(2, "newer", 2)];
    let (controller, _store) = signed_in(notes).await;

    let snapshot = controller.snapshot();
    assert!(snapshot.is_authenticated());
    assert_eq!(ids(&snapshot), vec![2, 1]);
    assert_eq!(snapshot.selected_id, Some(NoteId::new(2)));
    assert!(!snapshot.loading);
    assert_eq!(snapshot.error, None);
    assert_eq!(controller.service().list_count(), 1);
    assert_eq!(controller.session_phase(), SessionPhase::Active);
}

#[tokio::test(flavor = "current_thread")]
async fn bootstrap_rejection_is_silent_and_forgets_token() {
    let (controller, store) = controller_with(vec![note_on_day(1, "a", 1)], Some("expired"));

    assert_eq!(controller.bootstrap().await, None);

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.user, None);
    assert!(snapshot.notes.is_empty());
    assert_eq!(snapshot.error, None);
    assert_eq!(store.current(), None);
    assert_eq!(controller.service().list_count(), 0);
    assert_eq!(controller.session_phase(), SessionPhase::SignedOut);
}

#[tokio::test(flavor = "current_thread")]
async fn bootstrap_server_failure_also_discards_token() {
    let (controller, store) = controller_with(Vec::new(), Some(VALID_TOKEN));
    controller.service().server().fail_profile = Some(Failure::Status(500));

    assert_eq!(controller.bootstrap().await, None);
    assert_eq!(store.current(), None);
    assert_eq!(controller.snapshot().error, None);
}

#[tokio::test(flavor = "current_thread")]
async fn bootstrap_fails_when_first_fetch_rejects_token() {
    let (controller, store) = controller_with(vec![note_on_day(1, "a", 1)], Some(VALID_TOKEN));
    controller.service().server().fail_list = Some(Failure::Unauthorized);

    assert_eq!(controller.bootstrap().await, None);

    assert_eq!(controller.snapshot().user, None);
    assert_eq!(controller.session_phase(), SessionPhase::SignedOut);
    assert_eq!(store.current(), None);
}

#[tokio::test(flavor = "current_thread")]
async fn login_fails_when_first_fetch_rejects_token() {
    let (controller, store) = controller_with(vec![note_on_day(1, "a", 1)], None);
    controller.service().server().fail_list = Some(Failure::Unauthorized);

    let error = controller
        .login(&Credentials::new("ada", PASSWORD))
        .await
        .unwrap_err();

    assert!(matches!(error, ControllerError::AuthFailed(_)));
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.user, None);
    assert!(snapshot.notes.is_empty());
    assert_eq!(store.current(), None);
}

#[tokio::test(flavor = "current_thread")]
async fn login_persists_token_and_fetches_notes() {
    let (controller, store) = controller_with(vec![note_on_day(1, "a", 1)], None);

    let user = controller
        .login(&Credentials::new("ada", PASSWORD))
        .await
        .unwrap();

    assert_eq!(user, ada());
    assert_eq!(store.current(), Some(Token::new(VALID_TOKEN)));
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.user, Some(ada()));
    assert_eq!(ids(&snapshot), vec![1]);
    assert_eq!(snapshot.selected_id, Some(NoteId::new(1)));
}

#[tokio::test(flavor = "current_thread")]
async fn failed_login_is_reported_to_caller_only() {
    let (controller, store) = controller_with(Vec::new(), None);

    let error = controller
        .login(&Credentials::new("ada", "wrong password"))
        .await
        .unwrap_err();

    assert!(matches!(error, ControllerError::AuthFailed(message) if message.contains("Incorrect")));
    assert_eq!(store.current(), None);
    assert_eq!(controller.snapshot().error, None);
    assert_eq!(controller.snapshot().user, None);
}

#[tokio::test(flavor = "current_thread")]
async fn invalid_credentials_never_reach_the_service() {
    let (controller, _store) = controller_with(Vec::new(), None);

    let error = controller
        .login(&Credentials::new("", PASSWORD))
        .await
        .unwrap_err();

    assert!(matches!(error, ControllerError::AuthFailed(_)));
    assert_eq!(controller.service().server().login_calls, 0);
}

#[tokio::test(flavor = "current_thread")]
async fn register_logs_in_with_the_same_credentials() {
    let (controller, store) = controller_with(Vec::new(), None);

    let user = controller
        .register(&Registration::new("ada", "ada@example.com", PASSWORD))
        .await
        .unwrap();

    assert_eq!(user.username, "ada");
    let server = controller.service().server();
    assert_eq!(server.register_calls, 1);
    assert_eq!(server.login_calls, 1);
    drop(server);
    assert_eq!(store.current(), Some(Token::new(VALID_TOKEN)));
}

#[tokio::test(flavor = "current_thread")]
async fn register_rejects_short_password_locally() {
    let (controller, _store) = controller_with(Vec::new(), None);

    let error = controller
        .register(&Registration::new("ada", "ada@example.com", "short"))
        .await
        .unwrap_err();

    assert!(matches!(error, ControllerError::AuthFailed(_)));
    assert_eq!(controller.service().server().register_calls, 0);
}

#[tokio::test(flavor = "current_thread")]
async fn each_query_change_issues_one_fetch_with_new_values() {
    let notes = vec![
        note_on_day(1, "Groceries", 1),
        note_on_day(2, "Shopping list", 2),
        note_on_day(3, "shopping receipts", 3),
    ];
    let (controller, _store) = signed_in(notes).await;

    controller.set_search_term("shopping").await.unwrap();
    controller.set_sort_key(SortKey::TitleAsc).await.unwrap();

    let server = controller.service().server();
    assert_eq!(server.list_queries.len(), 3);
    assert_eq!(server.list_queries[1].search_term, "shopping");
    assert_eq!(server.list_queries[1].sort_key, SortKey::Newest);
    assert_eq!(server.list_queries[2].search_term, "shopping");
    assert_eq!(server.list_queries[2].sort_key, SortKey::TitleAsc);
    drop(server);
    assert_eq!(ids(&controller.snapshot()), vec![2, 3]);
}

#[tokio::test(flavor = "current_thread")]
async fn setting_an_unchanged_term_still_refetches() {
    let (controller, _store) = signed_in(vec![note_on_day(1, "a", 1)]).await;

    controller.set_search_term("").await.unwrap();

    assert_eq!(controller.service().list_count(), 2);
}

#[tokio::test(flavor = "current_thread")]
async fn stale_fetch_response_never_overwrites_newer_one() {
    let notes = vec![note_on_day(1, "alpha", 1), note_on_day(2, "beta", 2)];
    let (controller, _store) = signed_in(notes).await;
    let release_first = controller.service().gate_next_list();
    let release_second = controller.service().gate_next_list();

    let first = controller.set_search_term("alpha");
    tokio::pin!(first);
    assert!(!poll_once(&mut first).await);
    let second = controller.set_search_term("beta");
    tokio::pin!(second);
    assert!(!poll_once(&mut second).await);
    assert!(controller.snapshot().loading);

    release_second.send(()).unwrap();
    assert_eq!(second.await, Ok(FetchOutcome::Applied));
    assert_eq!(ids(&controller.snapshot()), vec![2]);

    release_first.send(()).unwrap();
    assert_eq!(first.await, Ok(FetchOutcome::Superseded));

    let snapshot = controller.snapshot();
    assert_eq!(ids(&snapshot), vec![2]);
    assert_eq!(snapshot.selected_id, Some(NoteId::new(2)));
    assert_eq!(snapshot.query.search_term, "beta");
    assert!(!snapshot.loading);
}

#[tokio::test(flavor = "current_thread")]
async fn stale_completion_does_not_end_loading_of_newer_fetch() {
    let (controller, _store) = signed_in(vec![note_on_day(1, "alpha", 1)]).await;
    let release_first = controller.service().gate_next_list();
    let release_second = controller.service().gate_next_list();

    let first = controller.set_search_term("alpha");
    tokio::pin!(first);
    assert!(!poll_once(&mut first).await);
    let second = controller.set_search_term("al");
    tokio::pin!(second);
    assert!(!poll_once(&mut second).await);

    release_first.send(()).unwrap();
    assert_eq!(first.await, Ok(FetchOutcome::Superseded));
    assert!(controller.snapshot().loading);

    release_second.send(()).unwrap();
    assert_eq!(second.await, Ok(FetchOutcome::Applied));
    assert!(!controller.snapshot().loading);
}

#[tokio::test(flavor = "current_thread")]
async fn empty_search_result_clears_selection_and_toggles_loading() {
    let (controller, _store) = signed_in(vec![note_on_day(1, "Groceries", 1)]).await;
    assert_eq!(controller.snapshot().selected_id, Some(NoteId::new(1)));
    let mut updates = controller.subscribe();
    updates.borrow_and_update();
    let release = controller.service().gate_next_list();

    let fetch = controller.set_search_term("shopping");
    tokio::pin!(fetch);
    assert!(!poll_once(&mut fetch).await);
    assert!(updates.has_changed().unwrap());
    assert!(updates.borrow_and_update().loading);

    release.send(()).unwrap();
    assert_eq!(fetch.await, Ok(FetchOutcome::Applied));

    let latest = updates.borrow_and_update().clone();
    assert!(!latest.loading);
    assert!(latest.notes.is_empty());
    assert_eq!(latest.selected_id, None);
    assert_eq!(latest.error, None);
    assert_eq!(latest, controller.snapshot());
}

#[tokio::test(flavor = "current_thread")]
async fn fetch_failure_keeps_list_and_next_success_clears_error() {
    let (controller, _store) = signed_in(vec![note_on_day(1, "a", 1)]).await;
    controller.service().server().fail_list = Some(Failure::Status(503));

    let error = controller.refresh().await.unwrap_err();

    assert_eq!(error, ControllerError::FetchFailed("Server error 503".to_string()));
    let snapshot = controller.snapshot();
    assert_eq!(ids(&snapshot), vec![1]);
    assert_eq!(snapshot.error.as_deref(), Some("Server error 503"));
    assert!(!snapshot.loading);

    controller.service().server().fail_list = None;
    assert_eq!(controller.refresh().await, Ok(FetchOutcome::Applied));
    assert_eq!(controller.snapshot().error, None);
}

#[tokio::test(flavor = "current_thread")]
async fn rejected_token_during_fetch_demotes_session_silently() {
    let (controller, store) = signed_in(vec![note_on_day(1, "a", 1)]).await;
    controller.service().server().fail_list = Some(Failure::Unauthorized);

    assert_eq!(controller.refresh().await, Err(ControllerError::AuthRejected));

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.user, None);
    assert!(snapshot.notes.is_empty());
    assert_eq!(snapshot.selected_id, None);
    assert_eq!(snapshot.error, None);
    assert_eq!(store.current(), None);
}

#[tokio::test(flavor = "current_thread")]
async fn refresh_while_signed_out_makes_no_call() {
    let (controller, _store) = controller_with(vec![note_on_day(1, "a", 1)], None);

    assert_eq!(controller.refresh().await, Ok(FetchOutcome::SignedOut));
    assert_eq!(controller.service().list_count(), 0);
}

#[tokio::test(flavor = "current_thread")]
async fn select_ignores_ids_outside_the_list() {
    let notes = vec![note_on_day(1, "a", 1), note_on_day(2, "b", 2)];
    let (controller, _store) = signed_in(notes).await;

    assert!(controller.select(NoteId::new(1)));
    assert!(!controller.select(NoteId::new(99)));
    assert_eq!(controller.snapshot().selected_id, Some(NoteId::new(1)));
}

#[tokio::test(flavor = "current_thread")]
async fn refetch_keeps_selection_that_is_still_listed() {
    let notes = vec![note_on_day(1, "apple", 1), note_on_day(2, "banana", 2)];
    let (controller, _store) = signed_in(notes).await;
    controller.select(NoteId::new(1));

    controller.set_sort_key(SortKey::TitleDesc).await.unwrap();

    let snapshot = controller.snapshot();
    assert_eq!(ids(&snapshot), vec![2, 1]);
    assert_eq!(snapshot.selected_id, Some(NoteId::new(1)));
}

#[tokio::test(flavor = "current_thread")]
async fn deleting_each_note_walks_selection_down_to_none() {
    let notes = vec![note_on_day(1, "A", 1), note_on_day(2, "B", 2)];
    let (controller, _store) = signed_in(notes).await;
    assert_eq!(ids(&controller.snapshot()), vec![2, 1]);
    assert_eq!(controller.snapshot().selected_id, Some(NoteId::new(2)));

    let deleted = controller
        .delete_selected(DeleteConfirmation::confirmed())
        .await
        .unwrap();
    assert_eq!(deleted, Some(NoteId::new(2)));
    let snapshot = controller.snapshot();
    assert_eq!(ids(&snapshot), vec![1]);
    assert_eq!(snapshot.selected_id, Some(NoteId::new(1)));

    let deleted = controller
        .delete_selected(DeleteConfirmation::confirmed())
        .await
        .unwrap();
    assert_eq!(deleted, Some(NoteId::new(1)));
    let snapshot = controller.snapshot();
    assert!(snapshot.notes.is_empty());
    assert_eq!(snapshot.selected_id, None);

    // Delete prunes locally rather than refetching.
    assert_eq!(controller.service().list_count(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn delete_without_selection_is_a_no_op() {
    let (controller, _store) = signed_in(Vec::new()).await;

    let deleted = controller
        .delete_selected(DeleteConfirmation::confirmed())
        .await
        .unwrap();

    assert_eq!(deleted, None);
    assert_eq!(controller.service().server().write_calls, 0);
}

#[tokio::test(flavor = "current_thread")]
async fn failed_delete_keeps_note_and_reports_error() {
    let (controller, _store) = signed_in(vec![note_on_day(1, "a", 1)]).await;
    controller.service().server().fail_write = Some(Failure::Status(500));

    let error = controller
        .delete_selected(DeleteConfirmation::confirmed())
        .await
        .unwrap_err();

    assert_eq!(error, ControllerError::WriteFailed("Server error 500".to_string()));
    let snapshot = controller.snapshot();
    assert_eq!(ids(&snapshot), vec![1]);
    assert_eq!(snapshot.selected_id, Some(NoteId::new(1)));
    assert_eq!(snapshot.error.as_deref(), Some("Server error 500"));
}

#[tokio::test(flavor = "current_thread")]
async fn rejected_token_during_delete_signs_out() {
    let (controller, store) = signed_in(vec![note_on_day(1, "a", 1)]).await;
    controller.service().server().fail_write = Some(Failure::Unauthorized);

    let error = controller
        .delete_selected(DeleteConfirmation::confirmed())
        .await
        .unwrap_err();

    assert_eq!(error, ControllerError::AuthRejected);
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.user, None);
    assert!(snapshot.notes.is_empty());
    assert_eq!(snapshot.selected_id, None);
    assert_eq!(snapshot.error, None);
    assert_eq!(store.current(), None);
}

#[tokio::test(flavor = "current_thread")]
async fn delete_while_signed_out_is_refused() {
    let (controller, _store) = controller_with(Vec::new(), None);

    let error = controller
        .delete_selected(DeleteConfirmation::confirmed())
        .await
        .unwrap_err();

    assert_eq!(error, ControllerError::NotAuthenticated);
}

#[tokio::test(flavor = "current_thread")]
async fn creating_a_note_refetches_and_selects_it() {
    let (controller, _store) = signed_in(vec![note_on_day(1, "first", 1)]).await;
    controller.select(NoteId::new(1));

    let created = controller
        .save(None, &NoteDraft::new("  second  ", "body"))
        .await
        .unwrap();

    assert_eq!(created.title, "second");
    let snapshot = controller.snapshot();
    assert!(snapshot.notes.iter().any(|note| note.id == created.id));
    assert_eq!(snapshot.selected_id, Some(created.id));
    assert!(!snapshot.saving);
    assert_eq!(snapshot.error, None);
    assert_eq!(controller.service().list_count(), 2);
}

#[tokio::test(flavor = "current_thread")]
async fn saving_refetches_with_the_current_query() {
    let notes = vec![note_on_day(1, "work plan", 1), note_on_day(2, "holiday", 2)];
    let (controller, _store) = signed_in(notes).await;
    controller.set_search_term("work").await.unwrap();

    let existing = controller.snapshot().selected_note().cloned().unwrap();
    let draft = NoteDraft {
        content: "updated".to_string(),
        ..NoteDraft::from_note(&existing)
    };
    let updated = controller.save(Some(&existing), &draft).await.unwrap();

    assert_eq!(updated.id, NoteId::new(1));
    let server = controller.service().server();
    let last = server.list_queries.last().unwrap();
    assert_eq!(last.search_term, "work");
    drop(server);
    let snapshot = controller.snapshot();
    assert_eq!(ids(&snapshot), vec![1]);
    assert_eq!(snapshot.selected_note().map(|note| note.content.as_str()), Some("updated"));
}

#[tokio::test(flavor = "current_thread")]
async fn created_note_hidden_by_search_is_not_selected() {
    let (controller, _store) = signed_in(vec![note_on_day(1, "work", 1)]).await;
    controller.set_search_term("work").await.unwrap();

    let created = controller
        .save(None, &NoteDraft::new("holiday", ""))
        .await
        .unwrap();

    let snapshot = controller.snapshot();
    assert!(!snapshot.notes.iter().any(|note| note.id == created.id));
    assert_eq!(snapshot.selected_id, Some(NoteId::new(1)));
}

#[tokio::test(flavor = "current_thread")]
async fn empty_title_is_rejected_without_a_remote_call() {
    let (controller, _store) = signed_in(vec![note_on_day(1, "a", 1)]).await;

    let error = controller
        .save(None, &NoteDraft::new("   ", "body"))
        .await
        .unwrap_err();

    assert_eq!(error, ControllerError::ValidationFailed(crate::models::DraftError::EmptyTitle));
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.error.as_deref(), Some("Title is required"));
    assert_eq!(ids(&snapshot), vec![1]);
    assert!(!snapshot.saving);
    assert_eq!(controller.service().server().write_calls, 0);
    assert_eq!(controller.service().list_count(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn failed_save_resets_saving_and_skips_refetch() {
    let (controller, _store) = signed_in(vec![note_on_day(1, "a", 1)]).await;
    controller.service().server().fail_write = Some(Failure::Status(500));

    let error = controller
        .save(None, &NoteDraft::new("new", ""))
        .await
        .unwrap_err();

    assert_eq!(error, ControllerError::WriteFailed("Server error 500".to_string()));
    let snapshot = controller.snapshot();
    assert!(!snapshot.saving);
    assert_eq!(snapshot.error.as_deref(), Some("Server error 500"));
    assert_eq!(ids(&snapshot), vec![1]);
    assert_eq!(controller.service().list_count(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn saving_flag_is_set_while_write_is_in_flight() {
    let (controller, _store) = signed_in(Vec::new()).await;
    let release = controller.service().gate_next_list();
    let draft = NoteDraft::new("new", "");

    let save = controller.save(None, &draft);
    tokio::pin!(save);
    assert!(!poll_once(&mut save).await);
    assert!(controller.snapshot().saving);

    release.send(()).unwrap();
    save.await.unwrap();
    assert!(!controller.snapshot().saving);
}

#[tokio::test(flavor = "current_thread")]
async fn overlapping_saves_keep_saving_set_until_both_finish() {
    let (controller, _store) = signed_in(Vec::new()).await;
    let release_first = controller.service().gate_next_list();
    let release_second = controller.service().gate_next_list();
    let first_draft = NoteDraft::new("first", "");
    let second_draft = NoteDraft::new("second", "");

    let first = controller.save(None, &first_draft);
    tokio::pin!(first);
    assert!(!poll_once(&mut first).await);
    let second = controller.save(None, &second_draft);
    tokio::pin!(second);
    assert!(!poll_once(&mut second).await);

    release_first.send(()).unwrap();
    first.await.unwrap();
    assert!(controller.snapshot().saving);

    release_second.send(()).unwrap();
    let written = second.await.unwrap();
    let snapshot = controller.snapshot();
    assert!(!snapshot.saving);
    assert_eq!(ids(&snapshot), vec![2, 1]);
    assert_eq!(snapshot.selected_id, Some(written.id));
}

#[tokio::test(flavor = "current_thread")]
async fn failed_refetch_after_save_reports_fetch_error() {
    let (controller, _store) = signed_in(vec![note_on_day(1, "a", 1)]).await;
    let release = controller.service().gate_next_list();
    let draft = NoteDraft::new("new", "");

    let save = controller.save(None, &draft);
    tokio::pin!(save);
    assert!(!poll_once(&mut save).await);
    controller.service().server().fail_list = Some(Failure::Status(503));
    release.send(()).unwrap();

    let error = save.await.unwrap_err();

    assert_eq!(error, ControllerError::FetchFailed("Server error 503".to_string()));
    let snapshot = controller.snapshot();
    assert!(!snapshot.saving);
    assert!(!snapshot.loading);
    assert_eq!(snapshot.error.as_deref(), Some("Server error 503"));
    assert_eq!(ids(&snapshot), vec![1]);
    assert_eq!(controller.service().server().write_calls, 1);
}

#[tokio::test(flavor = "current_thread")]
async fn created_note_is_not_selected_when_its_refetch_is_superseded() {
    let (controller, _store) = signed_in(vec![note_on_day(1, "work", 1)]).await;
    let release_save_fetch = controller.service().gate_next_list();
    let release_search_fetch = controller.service().gate_next_list();
    let draft = NoteDraft::new("work two", "");

    let save = controller.save(None, &draft);
    tokio::pin!(save);
    assert!(!poll_once(&mut save).await);
    let search = controller.set_search_term("work");
    tokio::pin!(search);
    assert!(!poll_once(&mut search).await);

    release_save_fetch.send(()).unwrap();
    let created = save.await.unwrap();
    let snapshot = controller.snapshot();
    assert_eq!(ids(&snapshot), vec![1]);
    assert_eq!(snapshot.selected_id, Some(NoteId::new(1)));

    release_search_fetch.send(()).unwrap();
    assert_eq!(search.await, Ok(FetchOutcome::Applied));
    let snapshot = controller.snapshot();
    assert_eq!(ids(&snapshot), vec![created.id.get(), 1]);
    assert_eq!(snapshot.selected_id, Some(NoteId::new(1)));
}

#[tokio::test(flavor = "current_thread")]
async fn rejected_token_during_save_signs_out() {
    let (controller, store) = signed_in(vec![note_on_day(1, "a", 1)]).await;
    controller.service().server().fail_write = Some(Failure::Unauthorized);

    let error = controller
        .save(None, &NoteDraft::new("new", ""))
        .await
        .unwrap_err();

    assert_eq!(error, ControllerError::AuthRejected);
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.user, None);
    assert!(!snapshot.saving);
    assert_eq!(store.current(), None);
}

#[tokio::test(flavor = "current_thread")]
async fn logout_clears_everything_without_remote_calls() {
    let (controller, store) = signed_in(vec![note_on_day(1, "a", 1)]).await;
    let calls_before = controller.service().list_count();

    controller.logout();

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.user, None);
    assert!(snapshot.notes.is_empty());
    assert_eq!(snapshot.selected_id, None);
    assert_eq!(store.current(), None);
    assert_eq!(controller.service().list_count(), calls_before);
    assert_eq!(controller.session_phase(), SessionPhase::SignedOut);
}

#[tokio::test(flavor = "current_thread")]
async fn fetch_resolving_after_logout_is_discarded() {
    let (controller, _store) = signed_in(vec![note_on_day(1, "a", 1)]).await;
    let release = controller.service().gate_next_list();

    let fetch = controller.refresh();
    tokio::pin!(fetch);
    assert!(!poll_once(&mut fetch).await);
    controller.logout();
    release.send(()).unwrap();

    assert_eq!(fetch.await, Ok(FetchOutcome::Superseded));
    let snapshot = controller.snapshot();
    assert!(snapshot.notes.is_empty());
    assert!(!snapshot.loading);
}

#[tokio::test(flavor = "current_thread")]
async fn dismiss_error_clears_the_slot() {
    let (controller, _store) = signed_in(Vec::new()).await;
    let _ = controller.save(None, &NoteDraft::new("", "")).await;
    assert!(controller.snapshot().error.is_some());

    controller.dismiss_error();

    assert_eq!(controller.snapshot().error, None);
}
