use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use shared::{
    domain::{fold_for_search, BloodGroup, Donor, DonorId, DonorPatch, Gender, NewDonor, PredicateSet},
    protocol::{DonorChange, SubscriptionId},
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

const DONOR_COLUMNS: &str = "id, name, email, phone, blood_group, gender, age, location, address, \
     last_donation_date, medical_conditions, emergency_contact, is_available, created_at, updated_at";

/// Next value of the per-table modification counter. Rows are listed by it,
/// newest first, so ties between equal wall-clock timestamps cannot reorder results.
const NEXT_REVISION: &str = "(SELECT IFNULL(MAX(revision), 0) + 1 FROM donors)";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
    listeners: ChangeListeners,
}

/// Receiving half of a change subscription registered with [`Storage::subscribe_changes`].
#[derive(Debug)]
pub struct ChangeListener {
    pub id: SubscriptionId,
    pub receiver: mpsc::UnboundedReceiver<DonorChange>,
}

#[derive(Clone, Default)]
struct ChangeListeners {
    inner: Arc<Mutex<ListenerTable>>,
}

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    senders: HashMap<SubscriptionId, mpsc::UnboundedSender<DonorChange>>,
}

impl ChangeListeners {
    fn table(&self) -> MutexGuard<'_, ListenerTable> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self) -> ChangeListener {
        let (tx, receiver) = mpsc::unbounded_channel();
        let mut table = self.table();
        table.next_id += 1;
        let id = SubscriptionId(table.next_id);
        table.senders.insert(id, tx);
        ChangeListener { id, receiver }
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        self.table().senders.remove(&id).is_some()
    }

    fn len(&self) -> usize {
        self.table().senders.len()
    }

    fn publish(&self, change: DonorChange) {
        let mut table = self.table();
        table.senders.retain(|id, tx| {
            let delivered = tx.send(change.clone()).is_ok();
            if !delivered {
                debug!(subscription_id = id.0, "storage: dropping closed change listener");
            }
            delivered
        });
    }
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Every connection to `sqlite::memory:` opens its own database.
        let max_connections = if is_memory_url(database_url) { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open sqlite database '{database_url}'"))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run donor directory migrations")?;
        info!(database_url, "storage: donor directory ready");
        Ok(Self {
            pool,
            listeners: ChangeListeners::default(),
        })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn register_donor(&self, donor: &NewDonor) -> Result<Donor> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO donors (
                name, email, phone, blood_group, gender, age, location, address,
                last_donation_date, medical_conditions, emergency_contact,
                name_folded, location_folded, address_folded,
                is_available, revision, created_at, updated_at
             )
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, {NEXT_REVISION}, ?, ?)
             RETURNING {DONOR_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&donor.name)
            .bind(&donor.email)
            .bind(&donor.phone)
            .bind(donor.blood_group.as_str())
            .bind(donor.gender.as_str())
            .bind(i64::from(donor.age))
            .bind(&donor.location)
            .bind(donor.address.as_deref())
            .bind(donor.last_donation_date)
            .bind(donor.medical_conditions.as_deref())
            .bind(&donor.emergency_contact)
            .bind(fold_for_search(&donor.name))
            .bind(fold_for_search(&donor.location))
            .bind(donor.address.as_deref().map(fold_for_search).unwrap_or_default())
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .context("failed to register donor")?;
        let stored = donor_from_row(&row)?;

        info!(
            donor_id = stored.id.0,
            blood_group = %stored.blood_group,
            "storage: registered donor"
        );
        self.listeners.publish(DonorChange::Inserted(stored.clone()));
        Ok(stored)
    }

    pub async fn update_donor(&self, donor_id: DonorId, patch: &DonorPatch) -> Result<Option<Donor>> {
        let sql = format!(
            "UPDATE donors SET
                phone = COALESCE(?1, phone),
                location = COALESCE(?2, location),
                location_folded = COALESCE(?8, location_folded),
                address = COALESCE(?3, address),
                address_folded = COALESCE(?9, address_folded),
                last_donation_date = COALESCE(?4, last_donation_date),
                is_available = COALESCE(?5, is_available),
                revision = {NEXT_REVISION},
                updated_at = ?6
             WHERE id = ?7
             RETURNING {DONOR_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(patch.phone.as_deref())
            .bind(patch.location.as_deref())
            .bind(patch.address.as_deref())
            .bind(patch.last_donation_date)
            .bind(patch.is_available)
            .bind(Utc::now())
            .bind(donor_id.0)
            .bind(patch.location.as_deref().map(fold_for_search))
            .bind(patch.address.as_deref().map(fold_for_search))
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to update donor {}", donor_id.0))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let stored = donor_from_row(&row)?;
        info!(
            donor_id = stored.id.0,
            is_available = stored.is_available,
            "storage: updated donor"
        );
        self.listeners.publish(DonorChange::Updated(stored.clone()));
        Ok(Some(stored))
    }

    pub async fn get_donor(&self, donor_id: DonorId) -> Result<Option<Donor>> {
        let sql = format!("SELECT {DONOR_COLUMNS} FROM donors WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(donor_id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(donor_from_row).transpose()
    }

    /// Every donor regardless of availability, most recently modified first.
    pub async fn list_donors(&self) -> Result<Vec<Donor>> {
        let sql = format!("SELECT {DONOR_COLUMNS} FROM donors ORDER BY revision DESC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(donor_from_row).collect()
    }

    /// Available donors matching `predicates`, most recently modified first.
    ///
    /// Free text is matched as a literal substring of name, location or
    /// address after [`fold_for_search`] on both sides; `%`, `_` and `\` in the
    /// input are escaped.
    pub async fn find_available_donors(&self, predicates: &PredicateSet) -> Result<Vec<Donor>> {
        let sql = format!(
            r"SELECT {DONOR_COLUMNS}
             FROM donors
             WHERE is_available = 1
               AND (?1 IS NULL OR blood_group = ?1)
               AND (
                    ?2 IS NULL
                    OR name_folded LIKE ?2 ESCAPE '\'
                    OR location_folded LIKE ?2 ESCAPE '\'
                    OR address_folded LIKE ?2 ESCAPE '\'
               )
             ORDER BY revision DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(predicates.category().map(BloodGroup::as_str))
            .bind(predicates.free_text().map(|text| like_pattern(&fold_for_search(text))))
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("donor query failed for {predicates}"))?;
        debug!(rows = rows.len(), %predicates, "storage: donor query resolved");
        rows.iter().map(donor_from_row).collect()
    }

    pub fn subscribe_changes(&self) -> ChangeListener {
        let listener = self.listeners.register();
        debug!(subscription_id = listener.id.0, "storage: change listener registered");
        listener
    }

    /// Returns `false` when the listener was already removed.
    pub fn unsubscribe_changes(&self, id: SubscriptionId) -> bool {
        let removed = self.listeners.remove(id);
        debug!(subscription_id = id.0, removed, "storage: change listener released");
        removed
    }

    pub fn change_listener_count(&self) -> usize {
        self.listeners.len()
    }
}

fn donor_from_row(row: &SqliteRow) -> Result<Donor> {
    let blood_group: String = row.try_get("blood_group")?;
    let gender: String = row.try_get("gender")?;
    let age: i64 = row.try_get("age")?;
    Ok(Donor {
        id: DonorId(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        blood_group: BloodGroup::from_str(&blood_group)?,
        gender: Gender::from_str(&gender)?,
        age: u8::try_from(age).map_err(|_| anyhow!("stored donor age {age} is out of range"))?,
        location: row.try_get("location")?,
        address: row.try_get("address")?,
        last_donation_date: row.try_get::<Option<NaiveDate>, _>("last_donation_date")?,
        medical_conditions: row.try_get("medical_conditions")?,
        emergency_contact: row.try_get("emergency_contact")?,
        is_available: row.try_get("is_available")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_memory_url(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
