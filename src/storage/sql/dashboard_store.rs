//! Unified SQL DashboardStore implementation.
//!
//! Statements are built once with sea-query; a macro generates the
//! executing implementation for each SQL backend, since row decoding and
//! pool types are backend specific.

use std::marker::PhantomData;

use sea_query::{Cond, Expr, NullOrdering, Order, Query, SelectStatement};

use super::SqlDatabase;
use crate::model::rows::format_timestamp;
use crate::model::{DriveDataPatch, DriveId, KamEmail, NewConversionEntry, NewConversionRow, ResId};
use crate::storage::schema::{
    ConversionTracking, DriveData as DriveDataTable, Drives, Restaurants,
};

/// SQL-based implementation of DashboardStore.
///
/// This generic implementation works with any SQL database that implements
/// the `SqlDatabase` trait (PostgreSQL, SQLite).
pub struct SqlDashboardStore<DB: SqlDatabase> {
    pool: DB::Pool,
    _marker: PhantomData<DB>,
}

impl<DB: SqlDatabase> SqlDashboardStore<DB> {
    /// Create a new SQL dashboard store with the given pool.
    pub fn new(pool: DB::Pool) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &DB::Pool {
        &self.pool
    }
}

const RESTAURANT_COLUMNS: [Restaurants; 12] = [
    Restaurants::ResId,
    Restaurants::ResName,
    Restaurants::KamName,
    Restaurants::KamEmail,
    Restaurants::TlEmail,
    Restaurants::Cuisine,
    Restaurants::Locality,
    Restaurants::ConcatField,
    Restaurants::AccountType,
    Restaurants::SeptOv,
    Restaurants::CreatedAt,
    Restaurants::UpdatedAt,
];

const DRIVE_COLUMNS: [Drives; 8] = [
    Drives::Id,
    Drives::DriveName,
    Drives::DriveType,
    Drives::City,
    Drives::StartDate,
    Drives::EndDate,
    Drives::Status,
    Drives::CreatedAt,
];

const DRIVE_DATA_COLUMNS: [DriveDataTable; 19] = [
    DriveDataTable::Id,
    DriveDataTable::ResId,
    DriveDataTable::DriveId,
    DriveDataTable::Um,
    DriveDataTable::Mm,
    DriveDataTable::La,
    DriveDataTable::LaBaseCodeSuggested,
    DriveDataTable::LaStep1,
    DriveDataTable::LaStep2,
    DriveDataTable::LaStep3,
    DriveDataTable::MmBaseCodeSuggested,
    DriveDataTable::UmBaseCodeSuggested,
    DriveDataTable::LaActivePromos,
    DriveDataTable::MmActivePromos,
    DriveDataTable::UmActivePromos,
    DriveDataTable::Approached,
    DriveDataTable::ConvertedStepper,
    DriveDataTable::PriorityScore,
    DriveDataTable::LastUpdated,
];

const CONVERSION_COLUMNS: [ConversionTracking; 8] = [
    ConversionTracking::Id,
    ConversionTracking::ResId,
    ConversionTracking::DriveId,
    ConversionTracking::KamEmail,
    ConversionTracking::ActionType,
    ConversionTracking::ActionDate,
    ConversionTracking::Notes,
    ConversionTracking::CreatedAt,
];

/// Restaurants visible to `viewer`, optionally narrowed to one id.
fn restaurants_query(viewer: &KamEmail, res_id: Option<&ResId>) -> SelectStatement {
    let mut cond = Cond::all().add(
        Cond::any()
            .add(Expr::col(Restaurants::KamEmail).eq(viewer.as_str()))
            .add(Expr::col(Restaurants::TlEmail).eq(viewer.as_str())),
    );
    if let Some(res_id) = res_id {
        cond = cond.add(Expr::col(Restaurants::ResId).eq(res_id.as_str()));
    }

    Query::select()
        .columns(RESTAURANT_COLUMNS)
        .from(Restaurants::Table)
        .cond_where(cond)
        .order_by(Restaurants::ResName, Order::Asc)
        .order_by(Restaurants::ResId, Order::Asc)
        .to_owned()
}

fn drive_data_query(res_ids: Vec<String>) -> SelectStatement {
    Query::select()
        .columns(DRIVE_DATA_COLUMNS)
        .from(DriveDataTable::Table)
        .and_where(Expr::col(DriveDataTable::ResId).is_in(res_ids))
        .order_by(DriveDataTable::Id, Order::Asc)
        .to_owned()
}

fn drives_by_id_query(ids: Vec<i64>) -> SelectStatement {
    Query::select()
        .columns(DRIVE_COLUMNS)
        .from(Drives::Table)
        .and_where(Expr::col(Drives::Id).is_in(ids))
        .to_owned()
}

fn active_drives_query() -> SelectStatement {
    Query::select()
        .columns(DRIVE_COLUMNS)
        .from(Drives::Table)
        .and_where(Expr::col(Drives::Status).eq(crate::model::ACTIVE_DRIVE_STATUS))
        .order_by_with_nulls(Drives::StartDate, Order::Desc, NullOrdering::Last)
        .order_by(Drives::Id, Order::Desc)
        .to_owned()
}

fn drive_query(drive_id: DriveId) -> SelectStatement {
    Query::select()
        .columns(DRIVE_COLUMNS)
        .from(Drives::Table)
        .and_where(Expr::col(Drives::Id).eq(drive_id.get()))
        .to_owned()
}

fn conversions_query(res_id: &ResId) -> SelectStatement {
    Query::select()
        .columns(CONVERSION_COLUMNS)
        .from(ConversionTracking::Table)
        .and_where(Expr::col(ConversionTracking::ResId).eq(res_id.as_str()))
        .order_by(ConversionTracking::Id, Order::Asc)
        .to_owned()
}

fn update_drive_data_query(
    res_id: &ResId,
    drive_id: DriveId,
    patch: &DriveDataPatch,
) -> sea_query::UpdateStatement {
    let mut stmt = Query::update();
    stmt.table(DriveDataTable::Table)
        .value(
            DriveDataTable::LastUpdated,
            format_timestamp(patch.last_updated),
        )
        .and_where(Expr::col(DriveDataTable::ResId).eq(res_id.as_str()))
        .and_where(Expr::col(DriveDataTable::DriveId).eq(drive_id.get()));
    if let Some(approached) = patch.approached {
        stmt.value(DriveDataTable::Approached, approached);
    }
    if let Some(converted) = patch.converted_stepper {
        stmt.value(DriveDataTable::ConvertedStepper, converted);
    }
    stmt
}

fn insert_conversion_query(entry: &NewConversionEntry) -> sea_query::InsertStatement {
    let row = NewConversionRow::from(entry);
    Query::insert()
        .into_table(ConversionTracking::Table)
        .columns([
            ConversionTracking::ResId,
            ConversionTracking::DriveId,
            ConversionTracking::KamEmail,
            ConversionTracking::ActionType,
            ConversionTracking::ActionDate,
            ConversionTracking::Notes,
        ])
        .values_panic([
            row.res_id.into(),
            row.drive_id.into(),
            row.kam_email.into(),
            row.action_type.into(),
            row.action_date.into(),
            row.notes.into(),
        ])
        .returning_all()
        .to_owned()
}

/// Macro to implement DashboardStore for a specific SQL backend.
macro_rules! impl_dashboard_store {
    ($db_type:ty, $row_type:ty, $feature:literal) => {
        #[cfg(feature = $feature)]
        impl SqlDashboardStore<$db_type> {
            /// Create the dashboard tables if they do not exist.
            pub async fn init(&self) -> crate::storage::Result<()> {
                sqlx::raw_sql(<$db_type as SqlDatabase>::CREATE_TABLES)
                    .execute(&self.pool)
                    .await?;
                Ok(())
            }

            fn decode_restaurant(
                row: &$row_type,
            ) -> crate::storage::Result<crate::model::RestaurantRow> {
                use sqlx::Row;

                Ok(crate::model::RestaurantRow {
                    res_id: row.try_get("res_id")?,
                    res_name: row.try_get("res_name")?,
                    kam_name: row.try_get("kam_name")?,
                    kam_email: row.try_get("kam_email")?,
                    tl_email: row.try_get("tl_email")?,
                    cuisine: row.try_get("cuisine")?,
                    locality: row.try_get("locality")?,
                    concat_field: row.try_get("concat_field")?,
                    account_type: row.try_get("account_type")?,
                    sept_ov: row.try_get("sept_ov")?,
                    created_at: row.try_get("created_at")?,
                    updated_at: row.try_get("updated_at")?,
                    drive_data: Vec::new(),
                })
            }

            fn decode_drive(row: &$row_type) -> crate::storage::Result<crate::model::DriveRow> {
                use sqlx::Row;

                Ok(crate::model::DriveRow {
                    id: row.try_get("id")?,
                    drive_name: row.try_get("drive_name")?,
                    drive_type: row.try_get("drive_type")?,
                    city: row.try_get("city")?,
                    start_date: row.try_get("start_date")?,
                    end_date: row.try_get("end_date")?,
                    status: row.try_get("status")?,
                    created_at: row.try_get("created_at")?,
                })
            }

            fn decode_drive_data(
                row: &$row_type,
            ) -> crate::storage::Result<crate::model::DriveDataRow> {
                use sqlx::Row;

                Ok(crate::model::DriveDataRow {
                    id: row.try_get("id")?,
                    res_id: row.try_get("res_id")?,
                    drive_id: row.try_get("drive_id")?,
                    um: row.try_get("um")?,
                    mm: row.try_get("mm")?,
                    la: row.try_get("la")?,
                    la_base_code_suggested: row.try_get("la_base_code_suggested")?,
                    la_step1: row.try_get("la_step1")?,
                    la_step2: row.try_get("la_step2")?,
                    la_step3: row.try_get("la_step3")?,
                    mm_base_code_suggested: row.try_get("mm_base_code_suggested")?,
                    um_base_code_suggested: row.try_get("um_base_code_suggested")?,
                    la_active_promos: row.try_get("la_active_promos")?,
                    mm_active_promos: row.try_get("mm_active_promos")?,
                    um_active_promos: row.try_get("um_active_promos")?,
                    approached: row.try_get("approached")?,
                    converted_stepper: row.try_get("converted_stepper")?,
                    priority_score: row.try_get("priority_score")?,
                    last_updated: row.try_get("last_updated")?,
                    drives: None,
                })
            }

            fn decode_conversion(
                row: &$row_type,
            ) -> crate::storage::Result<crate::model::ConversionRow> {
                use sqlx::Row;

                Ok(crate::model::ConversionRow {
                    id: row.try_get("id")?,
                    res_id: row.try_get("res_id")?,
                    drive_id: row.try_get("drive_id")?,
                    kam_email: row.try_get("kam_email")?,
                    action_type: row.try_get("action_type")?,
                    action_date: row.try_get("action_date")?,
                    notes: row.try_get("notes")?,
                    created_at: row.try_get("created_at")?,
                })
            }

            /// Read the fact rows and drives for `restaurants` and attach them.
            async fn attach_nested(
                &self,
                restaurants: &mut [crate::model::RestaurantRow],
            ) -> crate::storage::Result<()> {
                if restaurants.is_empty() {
                    return Ok(());
                }

                let res_ids = restaurants.iter().map(|r| r.res_id.clone()).collect();
                let sql = <$db_type>::build_select(drive_data_query(res_ids));
                let drive_data = sqlx::query(&sql)
                    .fetch_all(&self.pool)
                    .await?
                    .iter()
                    .map(Self::decode_drive_data)
                    .collect::<crate::storage::Result<Vec<_>>>()?;

                let mut drive_ids: Vec<i64> =
                    drive_data.iter().filter_map(|d| d.drive_id).collect();
                drive_ids.sort_unstable();
                drive_ids.dedup();

                let drives = if drive_ids.is_empty() {
                    Vec::new()
                } else {
                    let sql = <$db_type>::build_select(drives_by_id_query(drive_ids));
                    sqlx::query(&sql)
                        .fetch_all(&self.pool)
                        .await?
                        .iter()
                        .map(Self::decode_drive)
                        .collect::<crate::storage::Result<Vec<_>>>()?
                };

                crate::model::rows::attach_drive_data(restaurants, drive_data, &drives);
                Ok(())
            }
        }

        #[cfg(feature = $feature)]
        #[async_trait::async_trait]
        impl crate::storage::DashboardStore for SqlDashboardStore<$db_type> {
            async fn list_restaurants(
                &self,
                viewer: &KamEmail,
            ) -> crate::storage::Result<Vec<crate::model::RestaurantWithDrives>> {
                let sql = <$db_type>::build_select(restaurants_query(viewer, None));
                let mut restaurants = sqlx::query(&sql)
                    .fetch_all(&self.pool)
                    .await?
                    .iter()
                    .map(Self::decode_restaurant)
                    .collect::<crate::storage::Result<Vec<_>>>()?;

                self.attach_nested(&mut restaurants).await?;

                let assembled = restaurants
                    .iter()
                    .map(crate::model::RestaurantWithDrives::assemble)
                    .collect::<Result<Vec<_>, _>>()?;
                tracing::debug!(viewer = %viewer, count = assembled.len(), "Listed restaurants");
                Ok(assembled)
            }

            async fn get_restaurant(
                &self,
                viewer: &KamEmail,
                res_id: &ResId,
            ) -> crate::storage::Result<crate::model::RestaurantWithDrives> {
                let sql = <$db_type>::build_select(restaurants_query(viewer, Some(res_id)));
                let row = sqlx::query(&sql).fetch_optional(&self.pool).await?;

                let Some(row) = row else {
                    return Err(crate::storage::StorageError::NotFound {
                        table: crate::storage::tables::RESTAURANTS,
                        key: res_id.to_string(),
                    });
                };

                let mut restaurants = vec![Self::decode_restaurant(&row)?];
                self.attach_nested(&mut restaurants).await?;
                Ok(crate::model::RestaurantWithDrives::assemble(&restaurants[0])?)
            }

            async fn list_active_drives(
                &self,
            ) -> crate::storage::Result<Vec<crate::model::Drive>> {
                let sql = <$db_type>::build_select(active_drives_query());
                let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

                let mut drives = Vec::with_capacity(rows.len());
                for row in &rows {
                    let drive = Self::decode_drive(row)?;
                    drives.push(crate::model::Drive::try_from(&drive)?);
                }
                Ok(drives)
            }

            async fn get_drive(
                &self,
                drive_id: DriveId,
            ) -> crate::storage::Result<crate::model::Drive> {
                let sql = <$db_type>::build_select(drive_query(drive_id));
                let row = sqlx::query(&sql).fetch_optional(&self.pool).await?;

                match row {
                    Some(row) => Ok(crate::model::Drive::try_from(&Self::decode_drive(&row)?)?),
                    None => Err(crate::storage::StorageError::NotFound {
                        table: crate::storage::tables::DRIVES,
                        key: drive_id.to_string(),
                    }),
                }
            }

            async fn update_drive_data(
                &self,
                res_id: &ResId,
                drive_id: DriveId,
                patch: &DriveDataPatch,
            ) -> crate::storage::Result<u64> {
                let sql = <$db_type>::build_update(update_drive_data_query(res_id, drive_id, patch));
                let result = sqlx::query(&sql).execute(&self.pool).await?;
                Ok(result.rows_affected())
            }

            async fn insert_conversion(
                &self,
                entry: &NewConversionEntry,
            ) -> crate::storage::Result<crate::model::ConversionTrackingEntry> {
                let sql = <$db_type>::build_insert(insert_conversion_query(entry));
                let row = sqlx::query(&sql).fetch_one(&self.pool).await?;
                let stored = Self::decode_conversion(&row)?;
                Ok(crate::model::ConversionTrackingEntry::try_from(&stored)?)
            }

            async fn list_conversions(
                &self,
                res_id: &ResId,
            ) -> crate::storage::Result<Vec<crate::model::ConversionTrackingEntry>> {
                let sql = <$db_type>::build_select(conversions_query(res_id));
                let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

                let mut entries = Vec::with_capacity(rows.len());
                for row in &rows {
                    let stored = Self::decode_conversion(row)?;
                    entries.push(crate::model::ConversionTrackingEntry::try_from(&stored)?);
                }
                Ok(entries)
            }
        }

        #[cfg(all(feature = $feature, any(test, feature = "test-utils")))]
        #[async_trait::async_trait]
        impl crate::test_utils::FixtureLoader for SqlDashboardStore<$db_type> {
            async fn load_fixture(
                &self,
                fixture: &crate::test_utils::Fixture,
            ) -> crate::storage::Result<()> {
                for r in &fixture.restaurants {
                    let stmt = Query::insert()
                        .into_table(Restaurants::Table)
                        .columns(RESTAURANT_COLUMNS)
                        .values_panic([
                            r.res_id.clone().into(),
                            r.res_name.clone().into(),
                            r.kam_name.clone().into(),
                            r.kam_email.clone().into(),
                            r.tl_email.clone().into(),
                            r.cuisine.clone().into(),
                            r.locality.clone().into(),
                            r.concat_field.clone().into(),
                            r.account_type.clone().into(),
                            r.sept_ov.into(),
                            r.created_at.clone().into(),
                            r.updated_at.clone().into(),
                        ])
                        .to_owned();
                    sqlx::query(&<$db_type>::build_insert(stmt))
                        .execute(&self.pool)
                        .await?;
                }

                for d in &fixture.drives {
                    let stmt = Query::insert()
                        .into_table(Drives::Table)
                        .columns(DRIVE_COLUMNS)
                        .values_panic([
                            d.id.into(),
                            d.drive_name.clone().into(),
                            d.drive_type.clone().into(),
                            d.city.clone().into(),
                            d.start_date.clone().into(),
                            d.end_date.clone().into(),
                            d.status.clone().into(),
                            d.created_at.clone().into(),
                        ])
                        .to_owned();
                    sqlx::query(&<$db_type>::build_insert(stmt))
                        .execute(&self.pool)
                        .await?;
                }

                for dd in &fixture.drive_data {
                    let stmt = Query::insert()
                        .into_table(DriveDataTable::Table)
                        .columns(DRIVE_DATA_COLUMNS)
                        .values_panic([
                            dd.id.into(),
                            dd.res_id.clone().into(),
                            dd.drive_id.into(),
                            dd.um.into(),
                            dd.mm.into(),
                            dd.la.into(),
                            dd.la_base_code_suggested.clone().into(),
                            dd.la_step1.clone().into(),
                            dd.la_step2.clone().into(),
                            dd.la_step3.clone().into(),
                            dd.mm_base_code_suggested.clone().into(),
                            dd.um_base_code_suggested.clone().into(),
                            dd.la_active_promos.clone().into(),
                            dd.mm_active_promos.clone().into(),
                            dd.um_active_promos.clone().into(),
                            dd.approached.into(),
                            dd.converted_stepper.into(),
                            dd.priority_score.into(),
                            dd.last_updated.clone().into(),
                        ])
                        .to_owned();
                    sqlx::query(&<$db_type>::build_insert(stmt))
                        .execute(&self.pool)
                        .await?;
                }

                Ok(())
            }
        }
    };
}

impl_dashboard_store!(super::sqlite::Sqlite, sqlx::sqlite::SqliteRow, "sqlite");
impl_dashboard_store!(super::postgres::Postgres, sqlx::postgres::PgRow, "postgres");
