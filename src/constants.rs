/// Column and table name constants to ensure consistency across the codebase

// User data pipeline tables
pub const RAW_USER_TABLE: &str = "RAW_USER_DATA";
pub const FINAL_USER_TABLE: &str = "FINAL_USER_DATA";

// Canonical user data columns (upper-cased at extraction)
pub const USER_JOIN_KEY: &str = "USER_ID";
pub const DOB_COLUMN: &str = "DOB";
pub const GENDER_COLUMN: &str = "GENDER";
pub const AGE_COLUMN: &str = "AGE";
pub const LOAD_TIMESTAMP_COLUMN: &str = "LOAD_TIMESTAMP";

// Claim columns as they appear in payer sources (upper-casing is the final
// transform step for that pipeline, so these stay lower-case here)
pub const MEMBER_ID_COLUMN: &str = "member_id";
pub const CLAIM_ID_COLUMN: &str = "claim_id";
pub const CLAIM_AMOUNT_COLUMN: &str = "claim_amount";
pub const SERVICE_DATE_COLUMN: &str = "service_date";
pub const PAYER_NAME_COLUMN: &str = "payer_name";

/// Columns a payer batch must carry before any warehouse I/O is attempted
pub const REQUIRED_CLAIM_COLUMNS: [&str; 5] = [
    MEMBER_ID_COLUMN,
    CLAIM_ID_COLUMN,
    CLAIM_AMOUNT_COLUMN,
    SERVICE_DATE_COLUMN,
    PAYER_NAME_COLUMN,
];

// Payer destination tables
pub const ANTHEM_TABLE: &str = "ANTHEM_TABLE";
pub const CIGNA_TABLE: &str = "CIGNA_TABLE";
pub const MANUAL_TABLE: &str = "GENERIC_CLAIMS";

/// Multiplier applied to claim amounts for the Anthem adjustment rule
pub const ANTHEM_ADJUSTMENT: f64 = 1.02;

/// Raw-layer dates are stored as display strings in this format; any stage
/// doing date arithmetic re-parses with the same format
pub const DISPLAY_DATE_FORMAT: &str = "%d-%m-%Y";

/// Input formats tried in order when reparsing a source date
pub const INPUT_DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%m-%Y", "%m/%d/%Y", "%Y/%m/%d"];

/// Datetime formats tried after the plain date formats fail
pub const INPUT_DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
];

/// Records survive the final-layer filter only with age strictly above this
pub const ADULT_AGE_THRESHOLD: i64 = 18;

/// Rows per insert chunk on the warehouse write path
pub const WRITE_CHUNK_SIZE: usize = 500;
