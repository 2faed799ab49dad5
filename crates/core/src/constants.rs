//! Constants used throughout the console core crate.
//!
//! Keys, defaults and user-facing messages live here so the console routes, the CLI and the
//! tests agree on the exact wording.

/// Storage key under which the current session identity is persisted.
pub const SESSION_STORAGE_KEY: &str = "user";

/// Default directory for client-side state when `HRC_STATE_DIR` is not set.
pub const DEFAULT_STATE_DIR: &str = ".hrc";

/// Filename of the persisted key/value store inside the state directory.
pub const SESSION_FILENAME: &str = "session.json";

/// Default address the local console binds to.
pub const DEFAULT_CONSOLE_ADDR: &str = "127.0.0.1:4200";

/// Host every remote service listens on unless overridden.
pub const DEFAULT_SERVICE_HOST: &str = "127.0.0.1";

/// Port of the first remote service (Accounts); the others follow in catalogue order.
pub const FIRST_SERVICE_PORT: u16 = 8001;

/// Default per-probe timeout for health checks, in milliseconds.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5_000;

/// Message substituted for the assessment text when the request fails.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred while processing your request.";

/// Shown by the ranking step when every relevance rating is zero.
pub const ZERO_RATINGS_MESSAGE: &str =
    "Please enter values greater than 0 for at least one rating.";

/// Shown when the accounts service rejects the credentials.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials";

/// Shown when a login succeeds for an account that is neither doctor nor admin.
pub const INVALID_ROLE_MESSAGE: &str = "Invalid role";

/// Lowest and highest relevance rating accepted by the ranking step.
pub const MIN_RATING: u8 = 0;
pub const MAX_RATING: u8 = 5;

/// Number of positional fields in an account row.
pub const ACCOUNT_ROW_LEN: usize = 5;

/// Number of positional fields in a doctor row.
pub const DOCTOR_ROW_LEN: usize = 12;

/// Number of positional fields in a widgets row.
pub const WIDGETS_ROW_LEN: usize = 11;
