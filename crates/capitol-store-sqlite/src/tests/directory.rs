use capitol_core::{
  directory::{CommitteeAssignment, Politician, SecurityInfo},
  store::DirectoryStore,
  trade::Chamber,
};

use super::store;
use crate::SqliteStore;

async fn seeded() -> SqliteStore {
  let s = store().await;
  for (id, name) in [("P000197", "Nancy Pelosi"), ("T000250", "John Thune")] {
    s.upsert_politician(Politician {
      politician_id: id.into(),
      full_name:     name.into(),
      party:         None,
      state:         None,
      chamber:       Some(Chamber::House),
    })
    .await
    .unwrap();
  }
  s
}

#[tokio::test]
async fn resolves_exact_normalised_names() {
  let s = seeded().await;
  let p = s.resolve_politician("Hon. Nancy Pelosi".into()).await.unwrap().unwrap();
  assert_eq!(p.politician_id, "P000197");
  let p = s.resolve_politician("Pelosi, Nancy".into()).await.unwrap().unwrap();
  assert_eq!(p.politician_id, "P000197");
}

#[tokio::test]
async fn resolves_through_aliases() {
  let s = seeded().await;
  s.add_alias("Speaker Emerita".into(), "P000197".into()).await.unwrap();
  let p = s.resolve_politician("speaker emerita".into()).await.unwrap().unwrap();
  assert_eq!(p.politician_id, "P000197");
}

#[tokio::test]
async fn falls_back_to_fuzzy_and_gives_up_on_strangers() {
  let s = seeded().await;
  let p = s.resolve_politician("Thune".into()).await.unwrap().unwrap();
  assert_eq!(p.politician_id, "T000250");
  assert!(s.resolve_politician("Zzyzx Qwerty".into()).await.unwrap().is_none());
  assert!(s.resolve_politician("  ".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn assignments_are_replaced_wholesale_in_order() {
  let s = seeded().await;
  let committee = |name: &str| CommitteeAssignment {
    committee_name: name.into(),
    title:          None,
    rank:           Some(2),
    jurisdiction:   format!("{name} matters"),
    target_sectors: vec!["Energy".into()],
  };

  s.replace_assignments("P000197".into(), vec![committee("Energy"), committee("Finance")])
    .await
    .unwrap();
  s.replace_assignments("P000197".into(), vec![committee("Armed Services")]).await.unwrap();

  let got = s.committee_assignments("P000197".into()).await.unwrap();
  assert_eq!(got, vec![committee("Armed Services")]);
  assert!(s.committee_assignments("T000250".into()).await.unwrap().is_empty());
}

#[tokio::test]
async fn securities_are_keyed_by_upper_case_ticker() {
  let s = store().await;
  s.upsert_security(SecurityInfo {
    ticker:       "lmt".into(),
    company_name: "Lockheed Martin".into(),
    sector:       "Defense".into(),
  })
  .await
  .unwrap();

  let info = s.security("LMT".into()).await.unwrap().unwrap();
  assert_eq!(info.company_name, "Lockheed Martin");
  assert!(s.security("XYZ".into()).await.unwrap().is_none());
}
