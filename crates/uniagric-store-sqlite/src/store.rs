//! [`SqliteStore`]: the SQLite implementation of [`MarketStore`].

use std::{path::Path, sync::Arc};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tokio::sync::watch;
use uuid::Uuid;

use uniagric_core::{
  farm::{FarmDetails, FarmListing, FarmStatus},
  identity::CodeSender,
  investment::{
    DistributionStatus, Investment, InvestmentReceipt, InvestmentStatus,
    ProfitDistribution,
  },
  portfolio::Portfolio,
  registration::{FarmerDocument, FarmerRecord, FarmerRegistration, RegistrationStatus},
  risk::RiskAssessment,
  store::MarketStore,
  user::{User, UserType},
};

use crate::{
  encode::{
    FARM_COLUMNS, FARMER_COLUMNS, RawDistribution, RawFarm, RawFarmer,
    RawInvestment, RawUser, encode_dt, encode_registration_status, encode_uuid,
  },
  identity::LogCodeSender,
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// The marketplace store backed by a single SQLite file.
///
/// Cloning is cheap: the connection and the listings channel are shared.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn:  tokio_rusqlite::Connection,
  farms:            Arc<watch::Sender<Vec<FarmListing>>>,
  pub(crate) codes: Arc<dyn CodeSender>,
}

/// Outcome of the guarded listing update inside [`SqliteStore::invest`].
enum Claim {
  Claimed,
  Missing,
  Taken,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store: useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;

    let (farms, _) = watch::channel(Vec::new());
    let store = Self {
      conn,
      farms: Arc::new(farms),
      codes: Arc::new(LogCodeSender),
    };
    store.publish_farms().await?;
    Ok(store)
  }

  /// Replace the phone verification code delivery channel.
  pub fn with_code_sender(mut self, sender: Arc<dyn CodeSender>) -> Self {
    self.codes = sender;
    self
  }

  /// Publish after a committed write. The write stands even if the
  /// snapshot cannot be refreshed; subscribers catch up on the next publish.
  async fn republish(&self) {
    if let Err(e) = self.publish_farms().await {
      tracing::warn!(error = %e, "failed to refresh farm listings snapshot");
    }
  }

  /// Re-query the available listings and push the snapshot to subscribers.
  ///
  /// The query and the send both run on the connection thread, so snapshots
  /// are published in commit order.
  async fn publish_farms(&self) -> Result<()> {
    let farms = self.farms.clone();

    let published: Result<usize> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {FARM_COLUMNS} FROM farm_listings
           WHERE status = 'available'
           ORDER BY created_at DESC, rowid DESC"
        ))?;
        let raws = stmt
          .query_map([], RawFarm::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let available = match raws
          .into_iter()
          .map(RawFarm::into_listing)
          .collect::<Result<Vec<_>>>()
        {
          Ok(available) => available,
          Err(e) => return Ok(Err(e)),
        };
        let count = available.len();
        farms.send_replace(available);
        Ok(Ok(count))
      })
      .await?;

    tracing::debug!(count = published?, "published farm listings");
    Ok(())
  }

  #[cfg(test)]
  pub(crate) async fn execute_batch(&self, sql: &'static str) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── MarketStore impl ────────────────────────────────────────────────────────

impl MarketStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn put_user(&self, user: User) -> Result<()> {
    let uid_str   = encode_uuid(user.uid);
    let at_str    = encode_dt(user.created_at);
    let type_str  = user.user_type.to_string();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (uid, name, email, user_type, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (uid) DO UPDATE SET
             name = excluded.name,
             email = excluded.email,
             user_type = excluded.user_type,
             created_at = excluded.created_at",
          rusqlite::params![uid_str, user.name, user.email, type_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_user(&self, uid: Uuid) -> Result<Option<User>> {
    let uid_str = encode_uuid(uid);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT uid, name, email, user_type, created_at FROM users WHERE uid = ?1",
            rusqlite::params![uid_str],
            |row| {
              Ok(RawUser {
                uid:        row.get(0)?,
                name:       row.get(1)?,
                email:      row.get(2)?,
                user_type:  row.get(3)?,
                created_at: row.get(4)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn set_user_type(&self, uid: Uuid, user_type: UserType) -> Result<bool> {
    let uid_str  = encode_uuid(uid);
    let type_str = user_type.to_string();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET user_type = ?2 WHERE uid = ?1",
          rusqlite::params![uid_str, type_str],
        )?)
      })
      .await?;
    Ok(changed == 1)
  }

  // ── Farm listings ─────────────────────────────────────────────────────────

  async fn watch_available_farms(&self) -> Result<watch::Receiver<Vec<FarmListing>>> {
    Ok(self.farms.subscribe())
  }

  async fn create_farm(&self, farmer_id: Uuid, details: FarmDetails) -> Result<FarmListing> {
    details.validate()?;

    let listing = FarmListing {
      id: Uuid::new_v4(),
      farmer_id,
      details,
      status: FarmStatus::Available,
      created_at: Utc::now(),
      investor_id: None,
      invested_at: None,
    };

    let id_str     = encode_uuid(listing.id);
    let farmer_str = encode_uuid(farmer_id);
    let at_str     = encode_dt(listing.created_at);
    let d          = listing.details.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO farm_listings (
             id, farmer_id, farm_name, location, size, investment_needed,
             risk_category, description, crop_type, expected_yield,
             return_rate, status, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 'available', ?12)",
          rusqlite::params![
            id_str,
            farmer_str,
            d.farm_name,
            d.location,
            d.size,
            d.investment_needed,
            d.risk_category,
            d.description,
            d.crop_type,
            d.expected_yield,
            d.return_rate,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    tracing::info!(farm_id = %listing.id, %farmer_id, "farm listing created");
    self.republish().await;
    Ok(listing)
  }

  async fn get_farm(&self, id: Uuid) -> Result<Option<FarmListing>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawFarm> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {FARM_COLUMNS} FROM farm_listings WHERE id = ?1"),
            rusqlite::params![id_str],
            RawFarm::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawFarm::into_listing).transpose()
  }

  async fn list_farms_by_farmer(&self, farmer_id: Uuid) -> Result<Vec<FarmListing>> {
    let farmer_str = encode_uuid(farmer_id);

    let raws: Vec<RawFarm> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {FARM_COLUMNS} FROM farm_listings
           WHERE farmer_id = ?1
           ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![farmer_str], RawFarm::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFarm::into_listing).collect()
  }

  // ── Investments ───────────────────────────────────────────────────────────

  async fn invest(
    &self,
    farm_id:     Uuid,
    investor_id: Uuid,
    amount:      f64,
  ) -> Result<InvestmentReceipt> {
    if !amount.is_finite() || amount <= 0.0 {
      return Err(uniagric_core::Error::InvalidAmount(amount).into());
    }

    let now = Utc::now();
    let investment = Investment {
      id: Uuid::new_v4(),
      farm_id,
      investor_id,
      amount,
      date: now,
      status: InvestmentStatus::Active,
      returns: 0.0,
    };
    let distribution = ProfitDistribution {
      id: Uuid::new_v4(),
      investment_id: investment.id,
      farm_id,
      investor_id,
      amount: 0.0,
      date: now,
      status: DistributionStatus::Pending,
    };

    let farm_str         = encode_uuid(farm_id);
    let investor_str     = encode_uuid(investor_id);
    let investment_str   = encode_uuid(investment.id);
    let distribution_str = encode_uuid(distribution.id);
    let at_str           = encode_dt(now);
    let inv_status       = investment.status.to_string();
    let dist_status      = distribution.status.to_string();

    // Listing update, investment and distribution commit together or not at
    // all; dropping the transaction rolls back.
    let claim = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let status: Option<String> = tx
          .query_row(
            "SELECT status FROM farm_listings WHERE id = ?1",
            rusqlite::params![farm_str],
            |r| r.get(0),
          )
          .optional()?;
        match status.as_deref() {
          None => return Ok(Claim::Missing),
          Some("available") => {}
          Some(_) => return Ok(Claim::Taken),
        }

        let updated = tx.execute(
          "UPDATE farm_listings
           SET status = 'invested', investor_id = ?2, invested_at = ?3
           WHERE id = ?1 AND status = 'available'",
          rusqlite::params![farm_str, investor_str, at_str],
        )?;
        if updated != 1 {
          return Ok(Claim::Taken);
        }

        tx.execute(
          "INSERT INTO investments (id, farm_id, investor_id, amount, date, status, returns)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
          rusqlite::params![investment_str, farm_str, investor_str, amount, at_str, inv_status],
        )?;

        tx.execute(
          "INSERT INTO profit_distributions
             (id, investment_id, farm_id, investor_id, amount, date, status)
           VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6)",
          rusqlite::params![
            distribution_str,
            investment_str,
            farm_str,
            investor_str,
            at_str,
            dist_status,
          ],
        )?;

        tx.commit()?;
        Ok(Claim::Claimed)
      })
      .await?;

    match claim {
      Claim::Missing => Err(uniagric_core::Error::FarmNotFound(farm_id).into()),
      Claim::Taken => Err(uniagric_core::Error::FarmNotAvailable(farm_id).into()),
      Claim::Claimed => {
        tracing::info!(
          %farm_id,
          %investor_id,
          investment_id = %investment.id,
          amount,
          "investment recorded"
        );
        self.republish().await;
        Ok(InvestmentReceipt { investment, distribution })
      }
    }
  }

  async fn investments_for(&self, investor_id: Uuid) -> Result<Vec<Investment>> {
    let investor_str = encode_uuid(investor_id);

    let raws: Vec<RawInvestment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, farm_id, investor_id, amount, date, status, returns
           FROM investments
           WHERE investor_id = ?1
           ORDER BY date DESC, rowid DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![investor_str], |row| {
            Ok(RawInvestment {
              id:          row.get(0)?,
              farm_id:     row.get(1)?,
              investor_id: row.get(2)?,
              amount:      row.get(3)?,
              date:        row.get(4)?,
              status:      row.get(5)?,
              returns:     row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawInvestment::into_investment).collect()
  }

  async fn distributions_for(&self, investor_id: Uuid) -> Result<Vec<ProfitDistribution>> {
    let investor_str = encode_uuid(investor_id);

    let raws: Vec<RawDistribution> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, investment_id, farm_id, investor_id, amount, date, status
           FROM profit_distributions
           WHERE investor_id = ?1
           ORDER BY date DESC, rowid DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![investor_str], |row| {
            Ok(RawDistribution {
              id:            row.get(0)?,
              investment_id: row.get(1)?,
              farm_id:       row.get(2)?,
              investor_id:   row.get(3)?,
              amount:        row.get(4)?,
              date:          row.get(5)?,
              status:        row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDistribution::into_distribution).collect()
  }

  // ── Portfolios ────────────────────────────────────────────────────────────

  async fn get_portfolio(&self, id: Uuid) -> Result<Option<Portfolio>> {
    let id_str = encode_uuid(id);

    let json: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT doc_json FROM portfolios WHERE id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?)
      })
      .await?;

    Ok(json.map(|j| serde_json::from_str(&j)).transpose()?)
  }

  async fn put_portfolio(&self, portfolio: Portfolio) -> Result<()> {
    let id_str  = encode_uuid(portfolio.id);
    let at_str  = encode_dt(portfolio.updated_at);
    let doc_str = serde_json::to_string(&portfolio)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO portfolios (id, doc_json, updated_at) VALUES (?1, ?2, ?3)
           ON CONFLICT (id) DO UPDATE SET
             doc_json = excluded.doc_json,
             updated_at = excluded.updated_at",
          rusqlite::params![id_str, doc_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Farmer registrations ──────────────────────────────────────────────────

  async fn register_farmer(
    &self,
    registration: FarmerRegistration,
    risk: RiskAssessment,
  ) -> Result<FarmerRecord> {
    let missing = registration.missing_fields();
    if !missing.is_empty() {
      return Err(
        uniagric_core::Error::Invalid(format!(
          "missing required fields: {}",
          missing.join(", ")
        ))
        .into(),
      );
    }

    let now = Utc::now();
    let record = FarmerRecord {
      id: Uuid::new_v4(),
      registration,
      status: RegistrationStatus::Pending,
      risk,
      assessment_date: now,
      documents: Vec::new(),
      created_at: now,
    };

    let id_str     = encode_uuid(record.id);
    let json_str   = serde_json::to_string(&record.registration)?;
    let status_str = encode_registration_status(record.status);
    let level_str  = record.risk.risk_level.clone();
    let score      = record.risk.risk_score;
    let reason     = record.risk.assessment_reason.clone();
    let at_str     = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO farmer_registrations (
             id, registration_json, status, risk_level, risk_score,
             assessment_reason, assessment_date, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
          rusqlite::params![id_str, json_str, status_str, level_str, score, reason, at_str],
        )?;
        Ok(())
      })
      .await?;

    tracing::info!(
      farmer_id = %record.id,
      risk_level = %record.risk.risk_level,
      risk_score = record.risk.risk_score,
      "farmer registration submitted"
    );
    Ok(record)
  }

  async fn add_farmer_document(
    &self,
    farmer_id: Uuid,
    document: FarmerDocument,
  ) -> Result<FarmerRecord> {
    let id_str = encode_uuid(farmer_id);

    let raw: Option<RawFarmer> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let select =
          format!("SELECT {FARMER_COLUMNS} FROM farmer_registrations WHERE id = ?1");

        let Some(current) = tx
          .query_row(&select, rusqlite::params![id_str], RawFarmer::from_row)
          .optional()?
        else {
          return Ok(None);
        };

        let mut documents: Vec<serde_json::Value> =
          serde_json::from_str(&current.documents_json)
            .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
        documents.push(
          serde_json::to_value(&document)
            .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?,
        );
        let documents_json = serde_json::Value::Array(documents).to_string();

        tx.execute(
          "UPDATE farmer_registrations SET documents_json = ?2 WHERE id = ?1",
          rusqlite::params![id_str, documents_json],
        )?;
        let updated =
          tx.query_row(&select, rusqlite::params![id_str], RawFarmer::from_row)?;
        tx.commit()?;
        Ok(Some(updated))
      })
      .await?;

    let record = raw
      .ok_or(uniagric_core::Error::FarmerNotFound(farmer_id))?
      .into_record()?;
    tracing::info!(%farmer_id, documents = record.documents.len(), "farmer document added");
    Ok(record)
  }

  async fn list_farmers(&self) -> Result<Vec<FarmerRecord>> {
    let raws: Vec<RawFarmer> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {FARMER_COLUMNS} FROM farmer_registrations
           ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map([], RawFarmer::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFarmer::into_record).collect()
  }

  async fn get_farmer(&self, id: Uuid) -> Result<Option<FarmerRecord>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawFarmer> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {FARMER_COLUMNS} FROM farmer_registrations WHERE id = ?1"),
            rusqlite::params![id_str],
            RawFarmer::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawFarmer::into_record).transpose()
  }
}
