use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "membership_tier", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MembershipTier {
    Basic,
    Premium,
    Vip,
}

impl MembershipTier {
    /// Default annual price for the tier, applied when no explicit price is
    /// supplied at creation time.
    pub fn annual_price(self) -> Decimal {
        match self {
            MembershipTier::Basic => Decimal::new(300_00, 2),
            MembershipTier::Premium => Decimal::new(500_00, 2),
            MembershipTier::Vip => Decimal::new(800_00, 2),
        }
    }

    /// Board storage is a premium service; basic memberships only get a locker.
    pub fn allows_board_storage(self) -> bool {
        !matches!(self, MembershipTier::Basic)
    }
}

/// Status buckets used by the staff listing filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    /// Active and not yet past its expiry date.
    Valid,
    /// Past its expiry date, whether or not it is still flagged active.
    Expired,
    /// Deactivated by staff.
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Membership {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub tier: MembershipTier,
    pub membership_number: String,
    pub signed_up_on: NaiveDate,
    pub expires_on: NaiveDate,
    pub locker_number: Option<i32>,
    pub board_slot_number: Option<i32>,
    pub annual_price: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fully resolved row ready for insertion. Auto-numbering and price defaults
/// are applied by the enrollment service before this is built.
#[derive(Debug, Clone)]
pub struct NewMembership {
    pub customer_id: Uuid,
    pub tier: MembershipTier,
    pub membership_number: String,
    pub signed_up_on: NaiveDate,
    pub expires_on: NaiveDate,
    pub locker_number: Option<i32>,
    pub board_slot_number: Option<i32>,
    pub annual_price: Decimal,
}

/// Staff edit payload. Optional services and price are replaced outright so
/// a locker or board slot can be released again.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMembershipData {
    pub tier: MembershipTier,
    pub membership_number: String,
    pub signed_up_on: NaiveDate,
    pub expires_on: NaiveDate,
    pub locker_number: Option<i32>,
    pub board_slot_number: Option<i32>,
    pub annual_price: Decimal,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MembershipFilter {
    pub search: Option<String>,
    pub tier: Option<MembershipTier>,
    pub status: Option<MembershipStatus>,
}

impl Membership {
    /// "Currently valid" = not past expiry and still flagged active.
    pub fn is_valid_on(&self, today: NaiveDate) -> bool {
        self.expires_on >= today && self.is_active
    }

    /// Days left before expiry; 0 once the membership is no longer valid.
    pub fn days_until_expiry(&self, today: NaiveDate) -> i64 {
        if !self.is_valid_on(today) {
            return 0;
        }
        (self.expires_on - today).num_days()
    }

    /// Renewal always extends from the current expiry date, not from today.
    pub fn renewed_expiry(expires_on: NaiveDate) -> NaiveDate {
        expires_on + Duration::days(365)
    }

    pub async fn insert(
        conn: &mut PgConnection,
        data: NewMembership,
    ) -> Result<Self, sqlx::Error> {
        let membership = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO memberships (
                customer_id, tier, membership_number, signed_up_on, expires_on,
                locker_number, board_slot_number, annual_price
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(data.customer_id)
        .bind(data.tier)
        .bind(&data.membership_number)
        .bind(data.signed_up_on)
        .bind(data.expires_on)
        .bind(data.locker_number)
        .bind(data.board_slot_number)
        .bind(data.annual_price)
        .fetch_one(&mut *conn)
        .await?;

        Ok(membership)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM memberships WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    pub async fn find_by_customer_id(
        pool: &PgPool,
        customer_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM memberships WHERE customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Lists memberships matching the staff filters: free text over the
    /// membership number and the owner's name or email, plus tier and
    /// status buckets.
    pub async fn list(pool: &PgPool, filter: &MembershipFilter) -> Result<Vec<Self>, sqlx::Error> {
        let mut sql = String::from(
            "SELECT m.* FROM memberships m JOIN customers c ON c.id = m.customer_id",
        );
        let mut clauses: Vec<String> = Vec::new();
        let mut bind_count = 0;

        if filter.search.is_some() {
            bind_count += 1;
            clauses.push(format!(
                "(m.membership_number ILIKE ${n} OR c.first_name ILIKE ${n} \
                 OR c.last_name ILIKE ${n} OR c.email ILIKE ${n})",
                n = bind_count
            ));
        }
        if filter.tier.is_some() {
            bind_count += 1;
            clauses.push(format!("m.tier = ${bind_count}"));
        }
        match filter.status {
            Some(MembershipStatus::Valid) => {
                clauses.push("m.is_active = TRUE AND m.expires_on >= CURRENT_DATE".to_string());
            }
            Some(MembershipStatus::Expired) => {
                clauses.push("m.expires_on < CURRENT_DATE".to_string());
            }
            Some(MembershipStatus::Inactive) => {
                clauses.push("m.is_active = FALSE".to_string());
            }
            None => {}
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY m.membership_number");

        let mut query = sqlx::query_as::<_, Self>(&sql);
        if let Some(search) = &filter.search {
            query = query.bind(format!("%{}%", search));
        }
        if let Some(tier) = filter.tier {
            query = query.bind(tier);
        }

        query.fetch_all(pool).await
    }

    /// Replaces the editable fields of a membership.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: &UpdateMembershipData,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, Self>(
            r#"
            UPDATE memberships
            SET
                tier = $2,
                membership_number = $3,
                signed_up_on = $4,
                expires_on = $5,
                locker_number = $6,
                board_slot_number = $7,
                annual_price = $8,
                is_active = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.tier)
        .bind(&data.membership_number)
        .bind(data.signed_up_on)
        .bind(data.expires_on)
        .bind(data.locker_number)
        .bind(data.board_slot_number)
        .bind(data.annual_price)
        .bind(data.is_active)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Extends the expiry date by one year from its current value and
    /// reactivates the membership, whatever its prior state.
    pub async fn renew(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let current = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM memberships WHERE id = $1 FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            return Ok(None);
        };

        let renewed = sqlx::query_as::<_, Self>(
            r#"
            UPDATE memberships
            SET expires_on = $2, is_active = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(Self::renewed_expiry(current.expires_on))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(renewed))
    }

    /// Soft delete
    pub async fn deactivate(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE memberships
            SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Highest membership number currently on file, locked so concurrent
    /// auto-assignments are serialized. The unique constraint covers the
    /// first-row race on an empty table.
    pub async fn latest_number(conn: &mut PgConnection) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT membership_number FROM memberships
            ORDER BY membership_number DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .fetch_optional(&mut *conn)
        .await
    }

    pub async fn number_in_use(
        conn: &mut PgConnection,
        number: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM memberships
                WHERE membership_number = $1 AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(number)
        .bind(exclude)
        .fetch_one(&mut *conn)
        .await
    }

    pub async fn locker_in_use(
        conn: &mut PgConnection,
        locker_number: i32,
        exclude: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM memberships
                WHERE locker_number = $1 AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(locker_number)
        .bind(exclude)
        .fetch_one(&mut *conn)
        .await
    }

    pub async fn board_slot_in_use(
        conn: &mut PgConnection,
        board_slot_number: i32,
        exclude: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM memberships
                WHERE board_slot_number = $1 AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(board_slot_number)
        .bind(exclude)
        .fetch_one(&mut *conn)
        .await
    }

    // Dashboard aggregates

    pub async fn count_active(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM memberships WHERE is_active = TRUE
            "#,
        )
        .fetch_one(pool)
        .await
    }

    pub async fn count_valid(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM memberships
            WHERE is_active = TRUE AND expires_on >= CURRENT_DATE
            "#,
        )
        .fetch_one(pool)
        .await
    }

    pub async fn count_expired(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM memberships
            WHERE is_active = TRUE AND expires_on < CURRENT_DATE
            "#,
        )
        .fetch_one(pool)
        .await
    }

    pub async fn count_active_by_tier(
        pool: &PgPool,
    ) -> Result<Vec<(MembershipTier, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (MembershipTier, i64)>(
            r#"
            SELECT tier, COUNT(*) FROM memberships
            WHERE is_active = TRUE
            GROUP BY tier
            "#,
        )
        .fetch_all(pool)
        .await
    }

    /// Active memberships expiring within the next `days` days, soonest first.
    pub async fn expiring_within(
        pool: &PgPool,
        days: i32,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM memberships
            WHERE is_active = TRUE
              AND expires_on >= CURRENT_DATE
              AND expires_on <= CURRENT_DATE + $1
            ORDER BY expires_on
            LIMIT $2
            "#,
        )
        .bind(days)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn membership(expires_on: NaiveDate, is_active: bool) -> Membership {
        Membership {
            id: Uuid::nil(),
            customer_id: Uuid::nil(),
            tier: MembershipTier::Basic,
            membership_number: "0001".to_string(),
            signed_up_on: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            expires_on,
            locker_number: None,
            board_slot_number: None,
            annual_price: MembershipTier::Basic.annual_price(),
            is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_tier_prices() {
        assert_eq!(MembershipTier::Basic.annual_price(), Decimal::new(300_00, 2));
        assert_eq!(
            MembershipTier::Premium.annual_price(),
            Decimal::new(500_00, 2)
        );
        assert_eq!(MembershipTier::Vip.annual_price(), Decimal::new(800_00, 2));
    }

    #[test]
    fn test_board_storage_by_tier() {
        assert!(!MembershipTier::Basic.allows_board_storage());
        assert!(MembershipTier::Premium.allows_board_storage());
        assert!(MembershipTier::Vip.allows_board_storage());
    }

    #[test]
    fn test_valid_until_expiry_day_inclusive() {
        let m = membership(date(2024, 6, 15), true);
        assert!(m.is_valid_on(date(2024, 6, 15)));
        assert!(m.is_valid_on(date(2024, 6, 14)));
        assert!(!m.is_valid_on(date(2024, 6, 16)));
    }

    #[test]
    fn test_inactive_membership_is_never_valid() {
        let m = membership(date(2099, 1, 1), false);
        assert!(!m.is_valid_on(date(2024, 6, 15)));
    }

    #[test]
    fn test_days_until_expiry() {
        let m = membership(date(2024, 6, 15), true);
        assert_eq!(m.days_until_expiry(date(2024, 6, 5)), 10);
        assert_eq!(m.days_until_expiry(date(2024, 6, 15)), 0);
    }

    #[test]
    fn test_days_until_expiry_zero_when_not_valid() {
        let expired = membership(date(2024, 1, 1), true);
        assert_eq!(expired.days_until_expiry(date(2024, 6, 15)), 0);

        let inactive = membership(date(2099, 1, 1), false);
        assert_eq!(inactive.days_until_expiry(date(2024, 6, 15)), 0);
    }

    #[test]
    fn test_renewed_expiry_is_365_days_out() {
        assert_eq!(
            Membership::renewed_expiry(date(2024, 1, 1)),
            date(2024, 12, 31)
        );
        assert_eq!(
            Membership::renewed_expiry(date(2023, 3, 10)),
            date(2024, 3, 9)
        );
    }
}
