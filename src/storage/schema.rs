//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.

use sea_query::Iden;

/// Restaurants table schema.
#[derive(Iden, Clone, Copy)]
pub enum Restaurants {
    Table,
    #[iden = "res_id"]
    ResId,
    #[iden = "res_name"]
    ResName,
    #[iden = "kam_name"]
    KamName,
    #[iden = "kam_email"]
    KamEmail,
    #[iden = "tl_email"]
    TlEmail,
    #[iden = "cuisine"]
    Cuisine,
    #[iden = "locality"]
    Locality,
    #[iden = "concat_field"]
    ConcatField,
    #[iden = "account_type"]
    AccountType,
    #[iden = "sept_ov"]
    SeptOv,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "updated_at"]
    UpdatedAt,
}

/// Drives table schema.
#[derive(Iden, Clone, Copy)]
pub enum Drives {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "drive_name"]
    DriveName,
    #[iden = "drive_type"]
    DriveType,
    #[iden = "city"]
    City,
    #[iden = "start_date"]
    StartDate,
    #[iden = "end_date"]
    EndDate,
    #[iden = "status"]
    Status,
    #[iden = "created_at"]
    CreatedAt,
}

/// Drive data (fact) table schema.
#[derive(Iden, Clone, Copy)]
pub enum DriveData {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "res_id"]
    ResId,
    #[iden = "drive_id"]
    DriveId,
    #[iden = "um"]
    Um,
    #[iden = "mm"]
    Mm,
    #[iden = "la"]
    La,
    #[iden = "la_base_code_suggested"]
    LaBaseCodeSuggested,
    #[iden = "la_step1"]
    LaStep1,
    #[iden = "la_step2"]
    LaStep2,
    #[iden = "la_step3"]
    LaStep3,
    #[iden = "mm_base_code_suggested"]
    MmBaseCodeSuggested,
    #[iden = "um_base_code_suggested"]
    UmBaseCodeSuggested,
    #[iden = "la_active_promos"]
    LaActivePromos,
    #[iden = "mm_active_promos"]
    MmActivePromos,
    #[iden = "um_active_promos"]
    UmActivePromos,
    #[iden = "approached"]
    Approached,
    #[iden = "converted_stepper"]
    ConvertedStepper,
    #[iden = "priority_score"]
    PriorityScore,
    #[iden = "last_updated"]
    LastUpdated,
}

/// Conversion tracking (audit log) table schema.
#[derive(Iden, Clone, Copy)]
pub enum ConversionTracking {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "res_id"]
    ResId,
    #[iden = "drive_id"]
    DriveId,
    #[iden = "kam_email"]
    KamEmail,
    #[iden = "action_type"]
    ActionType,
    #[iden = "action_date"]
    ActionDate,
    #[iden = "notes"]
    Notes,
    #[iden = "created_at"]
    CreatedAt,
}

/// SQL for creating the dashboard tables in SQLite.
pub const CREATE_TABLES_SQLITE: &str = r#"
CREATE TABLE IF NOT EXISTS restaurants (
    res_id TEXT PRIMARY KEY NOT NULL,
    res_name TEXT NOT NULL,
    kam_name TEXT,
    kam_email TEXT,
    tl_email TEXT,
    cuisine TEXT,
    locality TEXT,
    concat_field TEXT,
    account_type TEXT,
    sept_ov REAL,
    created_at TEXT,
    updated_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_restaurants_kam_email ON restaurants(kam_email);
CREATE INDEX IF NOT EXISTS idx_restaurants_tl_email ON restaurants(tl_email);

CREATE TABLE IF NOT EXISTS drives (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    drive_name TEXT NOT NULL,
    drive_type TEXT,
    city TEXT,
    start_date TEXT,
    end_date TEXT,
    status TEXT,
    created_at TEXT
);

CREATE TABLE IF NOT EXISTS drive_data (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    res_id TEXT REFERENCES restaurants(res_id),
    drive_id INTEGER REFERENCES drives(id),
    um REAL,
    mm REAL,
    la REAL,
    la_base_code_suggested TEXT,
    la_step1 TEXT,
    la_step2 TEXT,
    la_step3 TEXT,
    mm_base_code_suggested TEXT,
    um_base_code_suggested TEXT,
    la_active_promos TEXT,
    mm_active_promos TEXT,
    um_active_promos TEXT,
    approached INTEGER DEFAULT 0,
    converted_stepper INTEGER DEFAULT 0,
    priority_score REAL,
    last_updated TEXT
);

CREATE INDEX IF NOT EXISTS idx_drive_data_res_drive ON drive_data(res_id, drive_id);

CREATE TABLE IF NOT EXISTS conversion_tracking (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    res_id TEXT REFERENCES restaurants(res_id),
    drive_id INTEGER REFERENCES drives(id),
    kam_email TEXT NOT NULL,
    action_type TEXT NOT NULL,
    action_date TEXT,
    notes TEXT,
    created_at TEXT DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_conversion_tracking_res ON conversion_tracking(res_id);
"#;

/// SQL for creating the dashboard tables in PostgreSQL.
///
/// Dates and timestamps are kept as text so both SQL backends decode the
/// same row shapes.
pub const CREATE_TABLES_POSTGRES: &str = r#"
CREATE TABLE IF NOT EXISTS restaurants (
    res_id TEXT PRIMARY KEY,
    res_name TEXT NOT NULL,
    kam_name TEXT,
    kam_email TEXT,
    tl_email TEXT,
    cuisine TEXT,
    locality TEXT,
    concat_field TEXT,
    account_type TEXT,
    sept_ov DOUBLE PRECISION,
    created_at TEXT,
    updated_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_restaurants_kam_email ON restaurants(kam_email);
CREATE INDEX IF NOT EXISTS idx_restaurants_tl_email ON restaurants(tl_email);

CREATE TABLE IF NOT EXISTS drives (
    id BIGSERIAL PRIMARY KEY,
    drive_name TEXT NOT NULL,
    drive_type TEXT,
    city TEXT,
    start_date TEXT,
    end_date TEXT,
    status TEXT,
    created_at TEXT
);

CREATE TABLE IF NOT EXISTS drive_data (
    id BIGSERIAL PRIMARY KEY,
    res_id TEXT REFERENCES restaurants(res_id),
    drive_id BIGINT REFERENCES drives(id),
    um DOUBLE PRECISION,
    mm DOUBLE PRECISION,
    la DOUBLE PRECISION,
    la_base_code_suggested TEXT,
    la_step1 TEXT,
    la_step2 TEXT,
    la_step3 TEXT,
    mm_base_code_suggested TEXT,
    um_base_code_suggested TEXT,
    la_active_promos TEXT,
    mm_active_promos TEXT,
    um_active_promos TEXT,
    approached BOOLEAN DEFAULT FALSE,
    converted_stepper BOOLEAN DEFAULT FALSE,
    priority_score DOUBLE PRECISION,
    last_updated TEXT
);

CREATE INDEX IF NOT EXISTS idx_drive_data_res_drive ON drive_data(res_id, drive_id);

CREATE TABLE IF NOT EXISTS conversion_tracking (
    id BIGSERIAL PRIMARY KEY,
    res_id TEXT REFERENCES restaurants(res_id),
    drive_id BIGINT REFERENCES drives(id),
    kam_email TEXT NOT NULL,
    action_type TEXT NOT NULL,
    action_date TEXT,
    notes TEXT,
    created_at TEXT DEFAULT to_char(now() AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS.MS"Z"')
);

CREATE INDEX IF NOT EXISTS idx_conversion_tracking_res ON conversion_tracking(res_id);
"#;
