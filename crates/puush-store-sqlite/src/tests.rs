//! Integration tests for `SqliteStore` against an in-memory database.

use std::{collections::HashSet, sync::Arc};

use puush_core::{
  allocator::ALPHABET,
  file::{FileId, Filename},
  registry::FileRegistry,
  session::SessionKey,
};
use rand::{SeedableRng as _, rngs::StdRng};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn name(s: &str) -> Filename { Filename::parse(s).unwrap() }

fn is_session_not_found(e: &Error) -> bool {
  matches!(e, Error::Core(puush_core::Error::SessionNotFound(_)))
}

fn is_file_not_found(e: &Error) -> bool {
  matches!(e, Error::Core(puush_core::Error::FileNotFound(_)))
}

// ─── Sessions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn created_session_exists() {
  let s = store().await;
  let session = s.create_session().await.unwrap();
  assert!(s.session_exists(session.key).await.unwrap());
}

#[tokio::test]
async fn unknown_session_does_not_exist() {
  let s = store().await;
  assert!(!s.session_exists(SessionKey::generate()).await.unwrap());
}

#[tokio::test]
async fn sessions_get_distinct_keys() {
  let s = store().await;
  let a = s.create_session().await.unwrap();
  let b = s.create_session().await.unwrap();
  assert_ne!(a.key, b.key);
}

// ─── Registration and lookup ─────────────────────────────────────────────────

#[tokio::test]
async fn upload_lookup_list_delete_scenario() {
  let s = store().await;
  let session = s.create_session().await.unwrap().key;

  let id = s.register_file(session, name("cat.png")).await.unwrap();
  assert_eq!(id.len(), 3);

  let found = s.lookup_file(id.clone(), None).await.unwrap();
  assert_eq!(found.as_deref(), Some("cat.png"));

  let listed = s.list_files(session).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].id, id);
  assert_eq!(listed[0].filename, "cat.png");
  assert_eq!(listed[0].session, session);

  let removed = s.delete_file(session, id.clone()).await.unwrap();
  assert_eq!(removed, "cat.png");

  assert!(s.lookup_file(id, None).await.unwrap().is_none());
  assert!(s.list_files(session).await.unwrap().is_empty());
}

#[tokio::test]
async fn register_with_unknown_session_fails() {
  let s = store().await;
  let err = s
    .register_file(SessionKey::generate(), name("x.txt"))
    .await
    .unwrap_err();
  assert!(is_session_not_found(&err), "{err:?}");
}

#[tokio::test]
async fn lookup_missing_id_is_absent_not_error() {
  let s = store().await;
  let id = FileId::parse("zzz").unwrap();
  assert!(s.lookup_file(id, None).await.unwrap().is_none());
}

#[tokio::test]
async fn lookup_with_session_enforces_ownership() {
  let s = store().await;
  let owner = s.create_session().await.unwrap().key;
  let other = s.create_session().await.unwrap().key;

  let id = s.register_file(owner, name("report.pdf")).await.unwrap();

  assert!(s.lookup_file(id.clone(), Some(other)).await.unwrap().is_none());
  assert_eq!(
    s.lookup_file(id.clone(), Some(owner)).await.unwrap().as_deref(),
    Some("report.pdf")
  );
  assert_eq!(
    s.lookup_file(id, None).await.unwrap().as_deref(),
    Some("report.pdf")
  );
}

#[tokio::test]
async fn list_files_keeps_insertion_order_and_scope() {
  let s = store().await;
  let a = s.create_session().await.unwrap().key;
  let b = s.create_session().await.unwrap().key;

  let first  = s.register_file(a, name("one.txt")).await.unwrap();
  s.register_file(b, name("elsewhere.txt")).await.unwrap();
  let second = s.register_file(a, name("two.txt")).await.unwrap();
  let third  = s.register_file(a, name("three.txt")).await.unwrap();

  let ids: Vec<_> = s.list_files(a).await.unwrap().into_iter().map(|f| f.id).collect();
  assert_eq!(ids, vec![first, second, third]);
}

#[tokio::test]
async fn list_files_for_session_without_files_is_empty() {
  let s = store().await;
  let session = s.create_session().await.unwrap().key;
  assert!(s.list_files(session).await.unwrap().is_empty());
}

#[tokio::test]
async fn same_seed_allocates_same_first_id() {
  let a = store().await.with_rng(StdRng::seed_from_u64(5));
  let b = store().await.with_rng(StdRng::seed_from_u64(5));
  let sa = a.create_session().await.unwrap().key;
  let sb = b.create_session().await.unwrap().key;

  let id_a = a.register_file(sa, name("a.txt")).await.unwrap();
  let id_b = b.register_file(sb, name("b.txt")).await.unwrap();
  assert_eq!(id_a, id_b);
}

// ─── Deletion ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_by_non_owner_is_not_found_and_keeps_row() {
  let s = store().await;
  let owner = s.create_session().await.unwrap().key;
  let other = s.create_session().await.unwrap().key;
  let id = s.register_file(owner, name("keep.me")).await.unwrap();

  let err = s.delete_file(other, id.clone()).await.unwrap_err();
  assert!(is_file_not_found(&err), "{err:?}");
  assert!(s.lookup_file(id, None).await.unwrap().is_some());
}

#[tokio::test]
async fn delete_twice_second_is_not_found() {
  let s = store().await;
  let session = s.create_session().await.unwrap().key;
  let id = s.register_file(session, name("once.txt")).await.unwrap();

  s.delete_file(session, id.clone()).await.unwrap();
  let err = s.delete_file(session, id).await.unwrap_err();
  assert!(is_file_not_found(&err), "{err:?}");
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_get_distinct_ids() {
  const N: usize = 200;
  let s = Arc::new(store().await);
  let session = s.create_session().await.unwrap().key;

  let handles: Vec<_> = (0..N)
    .map(|i| {
      let s = Arc::clone(&s);
      tokio::spawn(async move {
        s.register_file(session, name(&format!("file-{i}.bin"))).await
      })
    })
    .collect();

  let mut ids = HashSet::new();
  for h in handles {
    ids.insert(h.await.unwrap().unwrap());
  }
  assert_eq!(ids.len(), N);
  assert_eq!(s.list_files(session).await.unwrap().len(), N);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_deletes_yield_one_success() {
  let s = Arc::new(store().await);
  let session = s.create_session().await.unwrap().key;
  let id = s.register_file(session, name("race.txt")).await.unwrap();

  let a = tokio::spawn({
    let (s, id) = (Arc::clone(&s), id.clone());
    async move { s.delete_file(session, id).await }
  });
  let b = tokio::spawn({
    let (s, id) = (Arc::clone(&s), id.clone());
    async move { s.delete_file(session, id).await }
  });

  let results = [a.await.unwrap(), b.await.unwrap()];
  let ok = results.iter().filter(|r| r.is_ok()).count();
  let not_found = results
    .iter()
    .filter(|r| r.as_ref().is_err_and(is_file_not_found))
    .count();
  assert_eq!((ok, not_found), (1, 1));
}

// ─── Allocator growth ────────────────────────────────────────────────────────

#[tokio::test]
async fn full_three_char_space_grows_to_four() {
  let s = store().await;
  let session = s.create_session().await.unwrap().key;
  let key = session.to_string();

  s.conn()
    .call(move |conn| {
      let tx = conn.transaction()?;
      {
        let mut insert = tx.prepare(
          "INSERT INTO files (id, session, filename, since)
           VALUES (?1, ?2, 'filler', '2024-01-01T00:00:00+00:00')",
        )?;
        for &a in ALPHABET {
          for &b in ALPHABET {
            for &c in ALPHABET {
              let id = [a, b, c];
              let id = std::str::from_utf8(&id).unwrap();
              insert.execute(rusqlite::params![id, key])?;
            }
          }
        }
      }
      tx.commit()?;
      Ok(())
    })
    .await
    .unwrap();

  let id = s.register_file(session, name("overflow.txt")).await.unwrap();
  assert!(id.len() >= 4, "{id}");
  assert_eq!(s.lookup_file(id, None).await.unwrap().as_deref(), Some("overflow.txt"));
}

// ─── Cascade ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn deleting_session_cascades_to_files() {
  let s = store().await;
  let doomed = s.create_session().await.unwrap().key;
  let kept   = s.create_session().await.unwrap().key;

  let a = s.register_file(doomed, name("a.txt")).await.unwrap();
  let b = s.register_file(doomed, name("b.txt")).await.unwrap();
  let c = s.register_file(kept, name("c.txt")).await.unwrap();

  let removed = s.delete_session(doomed).await.unwrap();
  let removed_ids: Vec<_> = removed.into_iter().map(|f| f.id).collect();
  assert_eq!(removed_ids, vec![a.clone(), b.clone()]);

  assert!(!s.session_exists(doomed).await.unwrap());
  assert!(s.list_files(doomed).await.unwrap().is_empty());
  assert!(s.lookup_file(a, None).await.unwrap().is_none());
  assert!(s.lookup_file(b, None).await.unwrap().is_none());
  assert!(s.lookup_file(c, None).await.unwrap().is_some());

  let err = s.register_file(doomed, name("late.txt")).await.unwrap_err();
  assert!(is_session_not_found(&err), "{err:?}");
}

#[tokio::test]
async fn deleting_unknown_session_is_not_found() {
  let s = store().await;
  let err = s.delete_session(SessionKey::generate()).await.unwrap_err();
  assert!(is_session_not_found(&err), "{err:?}");
}

// ─── Error mapping ───────────────────────────────────────────────────────────

#[tokio::test]
async fn store_errors_convert_to_core_errors() {
  let s = store().await;
  let err = s
    .register_file(SessionKey::generate(), name("x.txt"))
    .await
    .unwrap_err();
  let core: puush_core::Error = err.into();
  assert!(core.is_not_found());

  let db: puush_core::Error = Error::DateParse("bad".into()).into();
  assert!(matches!(db, puush_core::Error::StorageUnavailable(_)));
}
