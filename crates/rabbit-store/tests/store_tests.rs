//! End-to-end behaviour of the record store against a temporary root.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use rabbit_store::{Store, StoreConfig, StoreError};
use rabbit_types::models::{
    ConversationMessage, EmailKind, EmailLogEntry, JournalEntry, MoodEntry, Role, User, UserUpdate,
};
use rabbit_types::{ChatId, DEFAULT_CHAT_ID, Username};
use tempfile::{TempDir, tempdir};

fn open_store() -> (TempDir, Store) {
    let dir = tempdir().unwrap();
    let store = Store::open(StoreConfig::new(root(&dir))).unwrap();
    (dir, store)
}

fn root(dir: &TempDir) -> PathBuf {
    dir.path().join("storage")
}

fn name(raw: &str) -> Username {
    Username::parse(raw).unwrap()
}

fn chat(raw: &str) -> ChatId {
    ChatId::parse(raw).unwrap()
}

fn user(username: &str, email: &str) -> User {
    User {
        username: name(username),
        email: email.to_string(),
        password: "$argon2id$stub".to_string(),
        name: username.to_string(),
        email_verified: true,
        created_at: "2024-01-01T00:00:00.000Z".to_string(),
    }
}

fn message(
    id: &str,
    chat_id: &str,
    role: Role,
    content: &str,
    timestamp: &str,
) -> ConversationMessage {
    ConversationMessage {
        id: id.to_string(),
        chat_id: chat(chat_id),
        role,
        content: content.to_string(),
        timestamp: timestamp.to_string(),
    }
}

#[test]
fn create_and_lookup_user() {
    let (dir, store) = open_store();
    let created = store.create_user(user("alice", "Alice@Example.COM")).unwrap();
    assert_eq!(created.email, "alice@example.com");

    let by_name = store.get_user_by_username(&name("alice")).unwrap().unwrap();
    assert_eq!(by_name, created);
    let by_email = store.get_user_by_email("ALICE@example.com").unwrap().unwrap();
    assert_eq!(by_email.username, name("alice"));
    assert!(store.get_user_by_username(&name("bob")).unwrap().is_none());

    assert!(root(&dir).join("alice").is_dir());
    let raw = fs::read_to_string(root(&dir).join("users.csv")).unwrap();
    assert!(raw.starts_with("username,email,password,name,emailVerified,createdAt\n"));
}

#[test]
fn duplicate_username_is_rejected() {
    let (_dir, store) = open_store();
    store.create_user(user("alice", "alice@example.com")).unwrap();
    match store.create_user(user("alice", "other@example.com")) {
        Err(StoreError::DuplicateKey { field, .. }) => assert_eq!(field, "username"),
        other => panic!("expected duplicate username, got {other:?}"),
    }
}

#[test]
fn duplicate_email_is_rejected_in_any_case() {
    let (_dir, store) = open_store();
    store.create_user(user("alice", "alice@example.com")).unwrap();
    match store.create_user(user("bob", "ALICE@Example.com")) {
        Err(StoreError::DuplicateKey { field, .. }) => assert_eq!(field, "email"),
        other => panic!("expected duplicate email, got {other:?}"),
    }
    assert_eq!(store.get_users().unwrap().len(), 1);
}

#[test]
fn update_user_merges_fields() {
    let (_dir, store) = open_store();
    store.create_user(user("alice", "alice@example.com")).unwrap();
    store.create_user(user("bob", "bob@example.com")).unwrap();

    let updated = store
        .update_user(
            &name("alice"),
            UserUpdate { password: Some("new-hash".into()), ..Default::default() },
        )
        .unwrap();
    assert_eq!(updated.password, "new-hash");
    assert_eq!(updated.email, "alice@example.com");

    let reread = store.get_user_by_username(&name("alice")).unwrap().unwrap();
    assert_eq!(reread, updated);
    let users = store.get_users().unwrap();
    assert_eq!(users[0].username, name("alice"));
    assert_eq!(users[1].username, name("bob"));
}

#[test]
fn update_missing_user_is_not_found() {
    let (_dir, store) = open_store();
    let err = store.update_user(&name("ghost"), UserUpdate::default()).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[test]
fn update_user_email_stays_unique() {
    let (_dir, store) = open_store();
    store.create_user(user("alice", "alice@example.com")).unwrap();
    store.create_user(user("bob", "bob@example.com")).unwrap();
    let err = store
        .update_user(
            &name("bob"),
            UserUpdate { email: Some("Alice@example.com".into()), ..Default::default() },
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateKey { field: "email", .. }));
}

#[test]
fn conversations_filter_by_chat() {
    let (_dir, store) = open_store();
    let alice = name("alice");
    store
        .add_conversation(&alice, &message("1", "a", Role::User, "hello", "2024-01-01T00:00:00Z"))
        .unwrap();
    store
        .add_conversation(&alice, &message("2", "b", Role::User, "other", "2024-01-01T00:01:00Z"))
        .unwrap();
    store
        .add_conversation(
            &alice,
            &message("3", "a", Role::Assistant, "hi!", "2024-01-01T00:02:00Z"),
        )
        .unwrap();

    let all = store.get_conversations(&alice, None).unwrap();
    assert_eq!(all.len(), 3);
    let ids: Vec<_> = store
        .get_conversations(&alice, Some(&chat("a")))
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(ids, vec!["1", "3"]);
}

#[test]
fn message_content_with_delimiters_survives() {
    let (_dir, store) = open_store();
    let alice = name("alice");
    let content = "first line, with comma\nsecond \"quoted\" line\\n literal";
    store
        .add_conversation(&alice, &message("1", "a", Role::User, content, "2024-01-01T00:00:00Z"))
        .unwrap();
    let stored = store.get_conversations(&alice, None).unwrap();
    assert_eq!(stored[0].content, content);
}

#[test]
fn legacy_rows_without_chat_id_use_default_thread() {
    let (_dir, store) = open_store();
    let alice = name("alice");
    let dir = store.ensure_user_directory(&alice).unwrap();
    fs::write(
        dir.join("conversations.csv"),
        concat!(
            "id,role,content,timestamp\n",
            "1,user,old question,2023-05-01T10:00:00.000Z\n",
            "2,assistant,old answer,2023-05-01T10:00:01.000Z",
        ),
    )
    .unwrap();

    let default = chat(DEFAULT_CHAT_ID);
    let messages = store.get_conversations(&alice, Some(&default)).unwrap();
    assert_eq!(messages.len(), 2);

    let list = store.get_chat_list(&alice).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].chat_id, default);
    assert_eq!(list[0].title, "old question");

    // Appending upgrades the file to the current header.
    store
        .add_conversation(&alice, &message("3", "fresh", Role::User, "new", "2024-01-01T00:00:00Z"))
        .unwrap();
    let raw = fs::read_to_string(dir.join("conversations.csv")).unwrap();
    assert!(raw.starts_with("id,chatId,role,content,timestamp\n"));
    assert_eq!(store.get_conversations(&alice, Some(&default)).unwrap().len(), 2);
    assert_eq!(store.get_conversations(&alice, None).unwrap().len(), 3);
}

#[test]
fn deleted_chat_marker_is_idempotent() {
    let (_dir, store) = open_store();
    let alice = name("alice");
    assert!(store.add_deleted_chat(&alice, &chat("a")).unwrap());
    assert!(!store.add_deleted_chat(&alice, &chat("a")).unwrap());
    let markers = store.get_deleted_chats(&alice).unwrap();
    assert_eq!(markers.len(), 1);
    assert!(!markers[0].deleted_at.is_empty());
    assert!(store.is_chat_deleted(&alice, &chat("a")).unwrap());
    assert!(!store.is_chat_deleted(&alice, &chat("b")).unwrap());
}

#[test]
fn soft_deleted_chat_is_hidden_but_kept() {
    let (_dir, store) = open_store();
    let alice = name("alice");
    store
        .add_conversation(&alice, &message("1", "a", Role::User, "keep", "2024-01-01T00:00:00Z"))
        .unwrap();
    store
        .add_conversation(&alice, &message("2", "b", Role::User, "drop", "2024-01-02T00:00:00Z"))
        .unwrap();
    store.add_deleted_chat(&alice, &chat("b")).unwrap();

    let list = store.get_chat_list(&alice).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].chat_id, chat("a"));
    assert_eq!(store.get_conversations(&alice, Some(&chat("b"))).unwrap().len(), 1);
}

#[test]
fn chat_list_is_newest_first_with_untimed_last() {
    let (_dir, store) = open_store();
    let alice = name("alice");
    let rows = [
        message("1", "untimed", Role::User, "no time", ""),
        message("2", "t1", Role::User, "first", "2024-01-01T00:00:00.000Z"),
        message("3", "t3", Role::User, "third", "2024-03-01T00:00:00.000Z"),
        message("4", "t2", Role::User, "second", "2024-02-01T00:00:00.000Z"),
    ];
    for row in &rows {
        store.add_conversation(&alice, row).unwrap();
    }

    let order: Vec<_> = store
        .get_chat_list(&alice)
        .unwrap()
        .into_iter()
        .map(|s| s.chat_id.to_string())
        .collect();
    assert_eq!(order, vec!["t3", "t2", "t1", "untimed"]);
}

#[test]
fn chat_summary_fields() {
    let (_dir, store) = open_store();
    let alice = name("alice");
    let long = "x".repeat(80);
    store
        .add_conversation(
            &alice,
            &message("1", "a", Role::Assistant, "welcome", "2024-01-01T00:00:00Z"),
        )
        .unwrap();
    store
        .add_conversation(&alice, &message("2", "a", Role::User, &long, "2024-01-01T00:00:01Z"))
        .unwrap();
    store
        .add_conversation(&alice, &message("3", "a", Role::Assistant, "ok", "2024-01-01T00:00:02Z"))
        .unwrap();
    store
        .add_conversation(
            &alice,
            &message("4", "b", Role::Assistant, "only bot", "2024-01-01T00:00:03Z"),
        )
        .unwrap();

    let list = store.get_chat_list(&alice).unwrap();
    let b = &list[0];
    assert_eq!(b.chat_id, chat("b"));
    assert_eq!(b.title, "New Chat");
    assert_eq!(b.message_count, 1);

    let a = &list[1];
    assert_eq!(a.title.chars().count(), 50);
    assert_eq!(a.last_message, "2024-01-01T00:00:02Z");
    assert_eq!(a.message_count, 3);
}

#[test]
fn mood_entry_end_to_end() {
    let (dir, store) = open_store();
    let alice = name("alice");
    let moods = root(&dir).join("alice").join("moods.csv");

    assert!(store.get_mood_entries(&alice).unwrap().is_empty());
    assert!(!moods.exists());

    let entry = MoodEntry {
        id: "1".into(),
        mood: "4".into(),
        note: "ok".into(),
        timestamp: "2024-01-01T00:00:00Z".into(),
    };
    store.add_mood_entry(&alice, &entry).unwrap();

    assert_eq!(store.get_mood_entries(&alice).unwrap(), vec![entry]);
    let raw = fs::read_to_string(&moods).unwrap();
    assert_eq!(raw, "id,mood,note,timestamp\n1,4,ok,2024-01-01T00:00:00Z\n");
}

#[test]
fn journal_entries_keep_insertion_order() {
    let (_dir, store) = open_store();
    let alice = name("alice");
    for i in 0..3 {
        let entry = JournalEntry {
            id: i.to_string(),
            content: format!("day {i}, thoughts"),
            timestamp: format!("2024-01-0{}T00:00:00Z", i + 1),
        };
        store.add_journal_entry(&alice, &entry).unwrap();
    }
    let ids: Vec<_> = store
        .get_journal_entries(&alice)
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec!["0", "1", "2"]);
}

#[test]
fn users_do_not_see_each_other() {
    let (_dir, store) = open_store();
    let entry =
        JournalEntry { id: "1".into(), content: "private".into(), timestamp: String::new() };
    store.add_journal_entry(&name("alice"), &entry).unwrap();
    assert!(store.get_journal_entries(&name("bob")).unwrap().is_empty());
}

#[test]
fn history_counts() {
    let (_dir, store) = open_store();
    let alice = name("alice");
    store
        .add_conversation(&alice, &message("1", "a", Role::User, "hi", "2024-01-01T00:00:00Z"))
        .unwrap();
    let mood = MoodEntry {
        id: "1".into(),
        mood: "3".into(),
        note: String::new(),
        timestamp: String::new(),
    };
    store.add_mood_entry(&alice, &mood).unwrap();
    let history = store.user_history(&alice).unwrap();
    assert_eq!(history.conversations, 1);
    assert_eq!(history.mood_entries, 1);
    assert_eq!(history.journal_entries, 0);
}

#[test]
fn email_log_appends_globally() {
    let (dir, store) = open_store();
    assert!(store.get_emails().unwrap().is_empty());
    let entry = EmailLogEntry {
        id: "1".into(),
        to: "alice@example.com".into(),
        subject: "Verify your email, please".into(),
        kind: EmailKind::Verification,
        otp: "123456".into(),
        sent_at: "2024-01-01T00:00:00.000Z".into(),
        username: Some(name("alice")),
    };
    store.add_email(&entry).unwrap();
    assert_eq!(store.get_emails().unwrap(), vec![entry]);
    assert!(root(&dir).join("emails.csv").is_file());
}

#[test]
fn replace_conversations_rewrites_table() {
    let (_dir, store) = open_store();
    let alice = name("alice");
    store
        .add_conversation(&alice, &message("1", "a", Role::User, "one", "2024-01-01T00:00:00Z"))
        .unwrap();
    let replacement = vec![message("9", "z", Role::User, "only", "2024-01-01T00:00:00Z")];
    store.replace_conversations(&alice, &replacement).unwrap();
    assert_eq!(store.get_conversations(&alice, None).unwrap(), replacement);
}

#[test]
fn malformed_table_surfaces_decode_error() {
    let (_dir, store) = open_store();
    let alice = name("alice");
    let dir = store.ensure_user_directory(&alice).unwrap();
    fs::write(dir.join("journals.csv"), "id,content,timestamp\n1,\"unterminated,t\n").unwrap();
    assert!(matches!(
        store.get_journal_entries(&alice),
        Err(StoreError::Decode { line: 2, .. })
    ));
}

#[test]
fn concurrent_appends_are_not_lost() {
    let (_dir, store) = open_store();
    let store = Arc::new(store);
    let alice = name("alice");

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = Arc::clone(&store);
            let alice = alice.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    let msg = message(
                        &format!("{t}-{i}"),
                        "race",
                        Role::User,
                        "concurrent, message",
                        "2024-01-01T00:00:00Z",
                    );
                    store.add_conversation(&alice, &msg).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.get_conversations(&alice, None).unwrap().len(), 200);
}

#[test]
fn dot_named_user_cannot_shadow_temp_files() {
    let (_dir, store) = open_store();
    store.create_user(user("alice", "alice@example.com")).unwrap();
    assert!(Username::parse(".users.csv.tmp").is_err());

    let update = UserUpdate { name: Some("Alice A.".into()), ..Default::default() };
    assert_eq!(store.update_user(&name("alice"), update).unwrap().name, "Alice A.");
}

#[test]
fn user_named_after_global_table_is_refused() {
    let (_dir, store) = open_store();
    store.create_user(user("alice", "alice@example.com")).unwrap();

    let err = store.create_user(user("users.csv", "mallory@example.com")).unwrap_err();
    assert!(matches!(err, StoreError::ReservedName(_)));
    assert!(store.get_user_by_username(&name("users.csv")).unwrap().is_none());
    assert!(matches!(
        store.get_mood_entries(&name("emails.csv")),
        Err(StoreError::ReservedName(_))
    ));

    let update = UserUpdate { name: Some("Still Alice".into()), ..Default::default() };
    assert!(store.update_user(&name("alice"), update).is_ok());
}

#[test]
fn failed_directory_creation_stores_no_user() {
    let (dir, store) = open_store();
    fs::write(root(&dir).join("bob"), "not a directory").unwrap();

    let err = store.create_user(user("bob", "bob@example.com")).unwrap_err();
    assert!(matches!(err, StoreError::Io { .. }));
    assert!(store.get_user_by_username(&name("bob")).unwrap().is_none());

    fs::remove_file(root(&dir).join("bob")).unwrap();
    store.create_user(user("bob", "bob@example.com")).unwrap();
    assert!(root(&dir).join("bob").is_dir());
}
