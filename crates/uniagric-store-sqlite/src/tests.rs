//! Integration tests for `SqliteStore` against an in-memory database.

use std::{
  sync::{Arc, Mutex},
  time::Duration,
};

use chrono::Utc;
use uniagric_core::{
  accounts::Accounts,
  farm::{FarmDetails, FarmStatus},
  identity::{
    AuthError, CodeSender, Credentials, Delivery, FederatedProfile,
    IdentityProvider,
  },
  investment::{DistributionStatus, InvestmentStatus},
  portfolio::{FarmAllocation, Portfolio, PortfolioStatus},
  registration::{
    FarmProfile, FarmerDocument, FarmerRegistration, FinancialInfo,
    PersonalInfo, RegistrationStatus,
  },
  risk::RiskAssessment,
  session::{Session, SessionState},
  store::{DomainError, MarketStore},
  user::{UserCheck, UserType},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn accounts(store: &SqliteStore) -> Accounts<SqliteStore, SqliteStore> {
  let shared = Arc::new(store.clone());
  Accounts::new(shared.clone(), shared)
}

fn details(name: &str) -> FarmDetails {
  FarmDetails {
    farm_name:         name.into(),
    location:          "Benue".into(),
    size:              8.0,
    investment_needed: 3_000.0,
    risk_category:     "Low".into(),
    description:       "Yam and cassava".into(),
    crop_type:         "Tuber".into(),
    expected_yield:    20.0,
    return_rate:       9.5,
  }
}

fn google(subject: &str, email: &str) -> FederatedProfile {
  FederatedProfile {
    provider:       "google.com".into(),
    subject:        subject.into(),
    email:          Some(email.into()),
    email_verified: true,
    display_name:   Some("Grace Okafor".into()),
  }
}

fn password(email: &str, password: &str) -> Credentials {
  Credentials::Password { email: email.into(), password: password.into() }
}

/// Captures issued codes instead of sending them.
#[derive(Default)]
struct CapturedCodes(Mutex<Vec<(Delivery, String, String)>>);

impl CapturedCodes {
  fn last(&self) -> (Delivery, String, String) {
    self.0.lock().unwrap().pop().expect("a code was sent")
  }
}

impl CodeSender for CapturedCodes {
  fn send_code(
    &self,
    delivery: Delivery,
    destination: &str,
    code: &str,
  ) -> Result<(), AuthError> {
    self
      .0
      .lock()
      .unwrap()
      .push((delivery, destination.to_owned(), code.to_owned()));
    Ok(())
  }
}

// ─── Farm listings ───────────────────────────────────────────────────────────

#[tokio::test]
async fn create_farm_sets_available_and_timestamp() {
  let s = store().await;
  let farmer = Uuid::new_v4();
  let before = Utc::now();

  let listing = s.create_farm(farmer, details("North Plot")).await.unwrap();
  assert_eq!(listing.status, FarmStatus::Available);
  assert_eq!(listing.farmer_id, farmer);
  assert!(listing.created_at >= before);

  let fetched = s.get_farm(listing.id).await.unwrap().unwrap();
  assert_eq!(fetched, listing);
}

#[tokio::test]
async fn create_farm_rejects_invalid_details() {
  let s = store().await;
  let mut d = details("Bad");
  d.size = -1.0;
  let err = s.create_farm(Uuid::new_v4(), d).await.unwrap_err();
  assert!(matches!(err.domain(), Some(uniagric_core::Error::Invalid(_))));
}

#[tokio::test]
async fn watch_receives_new_listings_newest_first() {
  let s = store().await;
  let mut rx = s.watch_available_farms().await.unwrap();
  assert!(rx.borrow_and_update().is_empty());

  let first = s.create_farm(Uuid::new_v4(), details("First")).await.unwrap();
  rx.changed().await.unwrap();
  assert_eq!(rx.borrow_and_update().len(), 1);

  let second = s.create_farm(Uuid::new_v4(), details("Second")).await.unwrap();
  rx.changed().await.unwrap();
  let ids: Vec<Uuid> = rx.borrow_and_update().iter().map(|f| f.id).collect();
  assert_eq!(ids, vec![second.id, first.id]);
}

#[tokio::test]
async fn every_subscriber_sees_invested_listing_disappear() {
  let s = store().await;
  let listing = s.create_farm(Uuid::new_v4(), details("Only")).await.unwrap();

  let mut a = s.watch_available_farms().await.unwrap();
  let mut b = s.watch_available_farms().await.unwrap();
  assert_eq!(a.borrow_and_update().len(), 1);
  assert_eq!(b.borrow_and_update().len(), 1);

  s.invest(listing.id, Uuid::new_v4(), 500.0).await.unwrap();

  a.changed().await.unwrap();
  b.changed().await.unwrap();
  assert!(a.borrow().is_empty());
  assert!(b.borrow().is_empty());
}

#[tokio::test]
async fn concurrent_creates_leave_the_full_snapshot_published() {
  let s = store().await;
  let rx = s.watch_available_farms().await.unwrap();

  let mut tasks = tokio::task::JoinSet::new();
  for i in 0..16 {
    let s = s.clone();
    tasks.spawn(async move {
      s.create_farm(Uuid::new_v4(), details(&format!("Plot {i}"))).await
    });
  }
  while let Some(created) = tasks.join_next().await {
    created.unwrap().unwrap();
  }

  assert_eq!(rx.borrow().len(), 16);
}

#[tokio::test]
async fn list_farms_by_farmer_includes_invested() {
  let s = store().await;
  let farmer = Uuid::new_v4();
  let a = s.create_farm(farmer, details("A")).await.unwrap();
  s.create_farm(farmer, details("B")).await.unwrap();
  s.create_farm(Uuid::new_v4(), details("Other")).await.unwrap();
  s.invest(a.id, Uuid::new_v4(), 100.0).await.unwrap();

  let mine = s.list_farms_by_farmer(farmer).await.unwrap();
  assert_eq!(mine.len(), 2);
  assert!(mine.iter().any(|f| f.status == FarmStatus::Invested));
}

// ─── Investments ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn invest_writes_listing_investment_and_distribution() {
  let s = store().await;
  let investor = Uuid::new_v4();
  let listing = s.create_farm(Uuid::new_v4(), details("Plot")).await.unwrap();

  let receipt = s.invest(listing.id, investor, 1_250.0).await.unwrap();

  let farm = s.get_farm(listing.id).await.unwrap().unwrap();
  assert_eq!(farm.status, FarmStatus::Invested);
  assert_eq!(farm.investor_id, Some(investor));
  assert!(farm.invested_at.is_some());

  let investments = s.investments_for(investor).await.unwrap();
  assert_eq!(investments.len(), 1);
  let inv = &investments[0];
  assert_eq!(inv, &receipt.investment);
  assert_eq!(inv.status, InvestmentStatus::Active);
  assert_eq!(inv.returns, 0.0);
  assert_eq!(inv.farm_id, listing.id);
  assert_eq!(inv.amount, 1_250.0);

  let distributions = s.distributions_for(investor).await.unwrap();
  assert_eq!(distributions.len(), 1);
  let dist = &distributions[0];
  assert_eq!(dist.status, DistributionStatus::Pending);
  assert_eq!(dist.amount, 0.0);
  assert_eq!(dist.farm_id, listing.id);
  assert_eq!(dist.investor_id, investor);
  assert_eq!(dist.investment_id, inv.id);
  assert_eq!(dist.date, inv.date);
}

#[tokio::test]
async fn second_investment_is_rejected() {
  let s = store().await;
  let listing = s.create_farm(Uuid::new_v4(), details("Plot")).await.unwrap();
  let first = Uuid::new_v4();
  let second = Uuid::new_v4();

  s.invest(listing.id, first, 100.0).await.unwrap();
  let err = s.invest(listing.id, second, 100.0).await.unwrap_err();
  assert!(matches!(
    err.domain(),
    Some(uniagric_core::Error::FarmNotAvailable(id)) if *id == listing.id
  ));

  assert!(s.investments_for(second).await.unwrap().is_empty());
  assert!(s.distributions_for(second).await.unwrap().is_empty());
  let farm = s.get_farm(listing.id).await.unwrap().unwrap();
  assert_eq!(farm.investor_id, Some(first));
}

#[tokio::test]
async fn invest_in_unknown_farm_is_not_found() {
  let s = store().await;
  let missing = Uuid::new_v4();
  let err = s.invest(missing, Uuid::new_v4(), 100.0).await.unwrap_err();
  assert!(matches!(
    err.domain(),
    Some(uniagric_core::Error::FarmNotFound(id)) if *id == missing
  ));
}

#[tokio::test]
async fn invest_rejects_non_positive_amounts() {
  let s = store().await;
  let listing = s.create_farm(Uuid::new_v4(), details("Plot")).await.unwrap();
  for amount in [0.0, -5.0, f64::INFINITY] {
    let err = s.invest(listing.id, Uuid::new_v4(), amount).await.unwrap_err();
    assert!(matches!(err.domain(), Some(uniagric_core::Error::InvalidAmount(_))));
  }
  let farm = s.get_farm(listing.id).await.unwrap().unwrap();
  assert!(farm.is_available());
}

#[tokio::test]
async fn failed_distribution_insert_rolls_back_the_listing() {
  let s = store().await;
  let investor = Uuid::new_v4();
  let listing = s.create_farm(Uuid::new_v4(), details("Plot")).await.unwrap();

  s.execute_batch(
    "CREATE TRIGGER fail_distribution BEFORE INSERT ON profit_distributions
     BEGIN SELECT RAISE(ABORT, 'distribution insert failed'); END;",
  )
  .await
  .unwrap();

  let err = s.invest(listing.id, investor, 100.0).await.unwrap_err();
  assert!(err.domain().is_none(), "expected a database error, got {err}");

  let farm = s.get_farm(listing.id).await.unwrap().unwrap();
  assert_eq!(farm.status, FarmStatus::Available);
  assert_eq!(farm.investor_id, None);
  assert!(s.investments_for(investor).await.unwrap().is_empty());
}

#[tokio::test]
async fn investments_are_newest_first() {
  let s = store().await;
  let investor = Uuid::new_v4();
  let a = s.create_farm(Uuid::new_v4(), details("A")).await.unwrap();
  let b = s.create_farm(Uuid::new_v4(), details("B")).await.unwrap();

  s.invest(a.id, investor, 10.0).await.unwrap();
  tokio::time::sleep(Duration::from_millis(2)).await;
  s.invest(b.id, investor, 20.0).await.unwrap();

  let farms: Vec<Uuid> = s
    .investments_for(investor)
    .await
    .unwrap()
    .into_iter()
    .map(|i| i.farm_id)
    .collect();
  assert_eq!(farms, vec![b.id, a.id]);
}

// ─── Portfolios ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_portfolio_is_none() {
  let s = store().await;
  assert!(s.get_portfolio(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn portfolio_keeps_allocation_order() {
  let s = store().await;
  let now = Utc::now();
  let portfolio = Portfolio {
    id:               Uuid::new_v4(),
    title:            "Northern Grains".into(),
    status:           PortfolioStatus::Active,
    total_investment: 10_000.0,
    current_value:    10_800.0,
    return_rate:      8.0,
    farms:            vec![
      FarmAllocation { id: Uuid::new_v4(), name: "Sorghum".into(), allocation: 60.0, status: "active".into() },
      FarmAllocation { id: Uuid::new_v4(), name: "Millet".into(), allocation: 40.0, status: "active".into() },
    ],
    created_at:       now,
    updated_at:       now,
  };
  s.put_portfolio(portfolio.clone()).await.unwrap();

  let fetched = s.get_portfolio(portfolio.id).await.unwrap().unwrap();
  assert_eq!(fetched, portfolio);
}

// ─── Farmer registrations ────────────────────────────────────────────────────

fn registration() -> FarmerRegistration {
  FarmerRegistration {
    personal_info:  PersonalInfo {
      full_name: "Tunde Ade".into(),
      email:     "tunde@example.com".into(),
      phone:     "+2348000000000".into(),
      id_type:   "passport".into(),
      id_number: "A1234567".into(),
    },
    farm_details:   FarmProfile {
      farm_name:        "Ade Poultry".into(),
      farm_type:        "livestock".into(),
      ownership_type:   "leased".into(),
      farm_location:    "Ogun".into(),
      land_size:        2.0,
      years_operation:  3,
      main_crops:       String::new(),
      farm_description: String::new(),
    },
    financial_info: FinancialInfo {
      funding_required:    4_000.0,
      funding_purpose:     "feed".into(),
      monthly_returns:     450.0,
      repayment_time:      "9 months".into(),
      funding_description: "Layer feed for two cycles".into(),
    },
  }
}

fn low_risk() -> RiskAssessment {
  RiskAssessment {
    risk_level:        "Low".into(),
    risk_score:        0.25,
    assessment_reason: Some("steady returns".into()),
  }
}

#[tokio::test]
async fn registration_is_stored_pending() {
  let s = store().await;
  let record = s.register_farmer(registration(), low_risk()).await.unwrap();
  assert_eq!(record.status, RegistrationStatus::Pending);
  assert_eq!(record.risk, low_risk());
  assert!(record.documents.is_empty());

  let fetched = s.get_farmer(record.id).await.unwrap().unwrap();
  assert_eq!(fetched, record);
  assert_eq!(s.list_farmers().await.unwrap().len(), 1);
}

#[tokio::test]
async fn fallback_risk_is_stored_with_its_reason() {
  let s = store().await;
  let record = s
    .register_farmer(
      registration(),
      RiskAssessment::fallback("Default assessment due to error: offline"),
    )
    .await
    .unwrap();

  let fetched = s.get_farmer(record.id).await.unwrap().unwrap();
  assert_eq!(fetched.risk.risk_level, "Medium");
  assert_eq!(fetched.risk.risk_score, 0.5);
  assert_eq!(
    fetched.risk.assessment_reason.as_deref(),
    Some("Default assessment due to error: offline")
  );
}

#[tokio::test]
async fn incomplete_registration_is_rejected() {
  let s = store().await;
  let mut r = registration();
  r.personal_info.id_number.clear();
  let err = s.register_farmer(r, low_risk()).await.unwrap_err();
  assert!(err.to_string().contains("personal_info.id_number"), "{err}");
  assert!(s.list_farmers().await.unwrap().is_empty());
}

fn document(name: &str) -> FarmerDocument {
  FarmerDocument {
    filename:     name.into(),
    url:          format!("/farmer-documents/{name}"),
    content_type: Some("application/pdf".into()),
    upload_date:  Utc::now(),
  }
}

#[tokio::test]
async fn documents_are_appended_in_upload_order() {
  let s = store().await;
  let record = s.register_farmer(registration(), low_risk()).await.unwrap();

  s.add_farmer_document(record.id, document("deed.pdf")).await.unwrap();
  let updated = s
    .add_farmer_document(record.id, document("id-card.pdf"))
    .await
    .unwrap();

  let names: Vec<_> = updated.documents.iter().map(|d| d.filename.as_str()).collect();
  assert_eq!(names, ["deed.pdf", "id-card.pdf"]);
  assert_eq!(s.get_farmer(record.id).await.unwrap().unwrap(), updated);
}

#[tokio::test]
async fn document_for_unknown_registration_is_not_found() {
  let s = store().await;
  let err = s
    .add_farmer_document(Uuid::new_v4(), document("deed.pdf"))
    .await
    .unwrap_err();
  assert!(matches!(err.domain(), Some(uniagric_core::Error::FarmerNotFound(_))));
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sign_up_then_check_reports_correct_type() {
  let s = store().await;
  let acc = accounts(&s);

  let user = acc
    .sign_up("ife@example.com", "secret1", "Ife", UserType::Farmer)
    .await
    .unwrap();

  let check = acc.check_user(user.uid, Some(UserType::Farmer)).await.unwrap();
  assert_eq!(
    check,
    UserCheck { exists: true, correct_type: true, current_type: Some(UserType::Farmer) }
  );

  let wrong = acc.check_user(user.uid, Some(UserType::Investor)).await.unwrap();
  assert!(wrong.exists && !wrong.correct_type);

  let nobody = acc.check_user(Uuid::new_v4(), None).await.unwrap();
  assert!(!nobody.exists);
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
  let s = store().await;
  let acc = accounts(&s);
  acc.sign_up("dup@example.com", "secret1", "A", UserType::Investor).await.unwrap();

  let err = acc
    .sign_up("DUP@example.com", "secret2", "B", UserType::Farmer)
    .await
    .unwrap_err();
  assert!(matches!(err, AuthError::EmailAlreadyInUse));
}

#[tokio::test]
async fn malformed_email_and_weak_password() {
  let s = store().await;
  let acc = accounts(&s);
  assert!(matches!(
    acc.sign_up("not-an-email", "secret1", "A", UserType::Farmer).await,
    Err(AuthError::InvalidEmail)
  ));
  assert!(matches!(
    acc.sign_up("a@example.com", "123", "A", UserType::Farmer).await,
    Err(AuthError::WeakPassword)
  ));
}

#[tokio::test]
async fn password_sign_in_outcomes() {
  let s = store().await;
  let acc = accounts(&s);
  let user = acc
    .sign_up("kemi@example.com", "secret1", "Kemi", UserType::Investor)
    .await
    .unwrap();

  let identity = acc.sign_in("kemi@example.com", "secret1").await.unwrap();
  assert_eq!(identity.uid, user.uid);

  assert!(matches!(
    acc.sign_in("kemi@example.com", "wrong-pass").await,
    Err(AuthError::WrongPassword)
  ));
  assert!(matches!(
    acc.sign_in("nobody@example.com", "secret1").await,
    Err(AuthError::UserNotFound)
  ));
}

#[tokio::test]
async fn federated_new_user_defaults_to_investor() {
  let s = store().await;
  let acc = accounts(&s);

  let outcome = acc
    .sign_in_federated(&google("g-1", "grace@example.com"), None)
    .await
    .unwrap();
  assert!(outcome.created);
  assert_eq!(outcome.user.user_type, UserType::Investor);

  let stored = s.get_user(outcome.identity.uid).await.unwrap().unwrap();
  assert_eq!(stored.user_type, UserType::Investor);
  assert_eq!(stored.name.as_deref(), Some("Grace Okafor"));
}

#[tokio::test]
async fn federated_new_user_uses_requested_type() {
  let s = store().await;
  let acc = accounts(&s);
  let outcome = acc
    .sign_in_federated(&google("g-2", "farmer@example.com"), Some(UserType::Farmer))
    .await
    .unwrap();
  assert_eq!(outcome.user.user_type, UserType::Farmer);
}

#[tokio::test]
async fn federated_sign_in_does_not_reclassify_existing_user() {
  let s = store().await;
  let acc = accounts(&s);
  let profile = google("g-3", "steady@example.com");

  let first = acc.sign_in_federated(&profile, None).await.unwrap();
  let again = acc
    .sign_in_federated(&profile, Some(UserType::Farmer))
    .await
    .unwrap();

  assert!(!again.created);
  assert_eq!(again.identity.uid, first.identity.uid);
  assert_eq!(again.type_mismatch, Some(UserType::Farmer));
  let stored = s.get_user(first.identity.uid).await.unwrap().unwrap();
  assert_eq!(stored.user_type, UserType::Investor);

  acc
    .reclassify(
      first.identity.uid,
      UserType::Farmer,
      &Credentials::Federated(profile.clone()),
    )
    .await
    .unwrap();
  let stored = s.get_user(first.identity.uid).await.unwrap().unwrap();
  assert_eq!(stored.user_type, UserType::Farmer);
}

#[tokio::test]
async fn federated_sign_in_links_existing_email_account() {
  let s = store().await;
  let acc = accounts(&s);
  let user = acc
    .sign_up("linked@example.com", "secret1", "Linked", UserType::Farmer)
    .await
    .unwrap();

  let outcome = acc
    .sign_in_federated(&google("g-4", "linked@example.com"), None)
    .await
    .unwrap();
  assert_eq!(outcome.identity.uid, user.uid);
  assert!(!outcome.created);
  assert_eq!(outcome.user.user_type, UserType::Farmer);
}

#[tokio::test]
async fn federated_sign_in_does_not_link_unverified_email() {
  let s = store().await;
  let acc = accounts(&s);
  let user = acc
    .sign_up("owned@example.com", "secret1", "Owner", UserType::Farmer)
    .await
    .unwrap();

  let mut profile = google("g-5", "owned@example.com");
  profile.email_verified = false;
  assert!(matches!(
    acc.sign_in_federated(&profile, None).await,
    Err(AuthError::AccountExistsWithDifferentCredential)
  ));
  assert!(s.find_federated(&profile).await.unwrap().is_none());

  // The password account is untouched.
  let identity = acc.sign_in("owned@example.com", "secret1").await.unwrap();
  assert_eq!(identity.uid, user.uid);
}

#[tokio::test]
async fn unverified_email_still_creates_a_fresh_account() {
  let s = store().await;
  let acc = accounts(&s);
  let mut profile = google("g-6", "fresh@example.com");
  profile.email_verified = false;

  let outcome = acc.sign_in_federated(&profile, None).await.unwrap();
  assert!(outcome.created);
  let found = s.find_federated(&profile).await.unwrap().unwrap();
  assert_eq!(found.uid, outcome.identity.uid);
}

#[tokio::test]
async fn reclassify_with_password_credentials() {
  let s = store().await;
  let acc = accounts(&s);
  let user = acc
    .sign_up("mover@example.com", "secret1", "Mover", UserType::Investor)
    .await
    .unwrap();

  assert!(matches!(
    acc
      .reclassify(user.uid, UserType::Farmer, &password("mover@example.com", "wrong-pass"))
      .await,
    Err(AuthError::WrongPassword)
  ));
  assert_eq!(acc.user_type(user.uid).await.unwrap(), Some(UserType::Investor));

  acc
    .reclassify(user.uid, UserType::Farmer, &password("mover@example.com", "secret1"))
    .await
    .unwrap();
  assert_eq!(acc.user_type(user.uid).await.unwrap(), Some(UserType::Farmer));
}

#[tokio::test]
async fn reclassify_rejects_another_users_credentials() {
  let s = store().await;
  let acc = accounts(&s);
  let victim = acc
    .sign_up("victim@example.com", "secret1", "V", UserType::Investor)
    .await
    .unwrap();
  acc
    .sign_up("other@example.com", "secret2", "O", UserType::Investor)
    .await
    .unwrap();

  assert!(matches!(
    acc
      .reclassify(victim.uid, UserType::Farmer, &password("other@example.com", "secret2"))
      .await,
    Err(AuthError::UserMismatch)
  ));
  assert!(matches!(
    acc
      .reclassify(
        victim.uid,
        UserType::Farmer,
        &Credentials::Federated(google("g-none", "x@example.com")),
      )
      .await,
    Err(AuthError::UserMismatch)
  ));
  assert_eq!(acc.user_type(victim.uid).await.unwrap(), Some(UserType::Investor));
}

#[tokio::test]
async fn password_reset_round_trip() {
  let codes = Arc::new(CapturedCodes::default());
  let s = store().await.with_code_sender(codes.clone());
  let acc = accounts(&s);
  let user = acc
    .sign_up("forgot@example.com", "secret1", "F", UserType::Farmer)
    .await
    .unwrap();

  acc.request_password_reset("forgot@example.com").await.unwrap();
  let (delivery, to, token) = codes.last();
  assert_eq!(delivery, Delivery::Email);
  assert_eq!(to, "forgot@example.com");

  assert!(matches!(
    acc.confirm_password_reset("not-a-token", "newpass1").await,
    Err(AuthError::InvalidActionCode)
  ));

  let identity = acc.confirm_password_reset(&token, "newpass1").await.unwrap();
  assert_eq!(identity.uid, user.uid);
  assert!(matches!(
    acc.sign_in("forgot@example.com", "secret1").await,
    Err(AuthError::WrongPassword)
  ));
  acc.sign_in("forgot@example.com", "newpass1").await.unwrap();

  // Single use.
  assert!(matches!(
    acc.confirm_password_reset(&token, "another1").await,
    Err(AuthError::InvalidActionCode)
  ));
}

#[tokio::test]
async fn password_reset_for_unknown_email() {
  let codes = Arc::new(CapturedCodes::default());
  let s = store().await.with_code_sender(codes.clone());
  assert!(matches!(
    s.request_password_reset("ghost@example.com").await,
    Err(AuthError::UserNotFound)
  ));
  assert!(codes.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn phone_sign_in_round_trip() {
  let codes = Arc::new(CapturedCodes::default());
  let s = store().await.with_code_sender(codes.clone());

  let confirmation = s.start_phone_sign_in("+2348011112222").await.unwrap();
  let (delivery, phone, code) = codes.last();
  assert_eq!(delivery, Delivery::Sms);
  assert_eq!(phone, "+2348011112222");
  assert_eq!(code.len(), 6);

  assert!(matches!(
    s.confirm_phone_sign_in(confirmation.verification_id, "not-it").await,
    Err(AuthError::InvalidVerificationCode)
  ));

  let identity = s
    .confirm_phone_sign_in(confirmation.verification_id, &code)
    .await
    .unwrap();
  assert_eq!(identity.phone_number.as_deref(), Some("+2348011112222"));

  // Single use.
  assert!(matches!(
    s.confirm_phone_sign_in(confirmation.verification_id, &code).await,
    Err(AuthError::InvalidVerificationCode)
  ));

  // Same number maps to the same identity.
  let again = s.start_phone_sign_in("+2348011112222").await.unwrap();
  let (_, _, code) = codes.last();
  let same = s.confirm_phone_sign_in(again.verification_id, &code).await.unwrap();
  assert_eq!(same.uid, identity.uid);
}

#[tokio::test]
async fn phone_sign_in_rejects_bad_numbers() {
  let s = store().await;
  assert!(matches!(
    s.start_phone_sign_in("0801").await,
    Err(AuthError::InvalidPhoneNumber)
  ));
}

// ─── Session ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn session_starts_anonymous_without_restored_identity() {
  let s = store().await;
  let session = Session::start(accounts(&s), None);
  assert_eq!(session.settled().await, SessionState::Anonymous);
}

#[tokio::test]
async fn session_tracks_sign_in_and_sign_out() {
  let s = store().await;
  let acc = accounts(&s);
  let user = acc
    .sign_up("sess@example.com", "secret1", "Sess", UserType::Farmer)
    .await
    .unwrap();

  let session = Session::start(acc, None);
  let mut rx = session.subscribe();
  rx.wait_for(|st| *st == SessionState::Anonymous).await.unwrap();

  let identity = session.sign_in("sess@example.com", "secret1").await.unwrap();
  let state = rx
    .wait_for(|st| matches!(st, SessionState::Authenticated { .. }))
    .await
    .unwrap()
    .clone();
  assert_eq!(state.identity().map(|i| i.uid), Some(user.uid));
  assert_eq!(state.user_type(), Some(UserType::Farmer));
  assert_eq!(identity.uid, user.uid);

  session.sign_out();
  rx.wait_for(|st| *st == SessionState::Anonymous).await.unwrap();
  assert_eq!(session.current().identity(), None);

  // Sign-out leaves the user document alone.
  assert!(s.get_user(user.uid).await.unwrap().is_some());
}

#[tokio::test]
async fn session_restores_identity_without_user_document() {
  let s = store().await;
  let identity = s
    .create_account("bare@example.com", "secret1", None)
    .await
    .unwrap();

  let session = Session::start(accounts(&s), Some(identity.clone()));
  let state = session.settled().await;
  assert_eq!(
    state,
    SessionState::Authenticated { identity, user_type: None }
  );
}

#[tokio::test]
async fn failed_sign_in_does_not_change_session() {
  let s = store().await;
  let session = Session::start(accounts(&s), None);
  session.settled().await;

  assert!(session.sign_in("ghost@example.com", "secret1").await.is_err());
  assert_eq!(session.current(), SessionState::Anonymous);
}
