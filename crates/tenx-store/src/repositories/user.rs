//! User repository over the `users` table.

use rusqlite::{Connection, OptionalExtension, params};
use tenx_core::UserId;

use crate::errors::Result;
use crate::row_types::UserRecord;

const COLUMNS: &str = "user_id, email, phone_number, otp, otp_expiry, is_verified, is_active,
     login_methods, user_type, created_at, last_login_at";

/// How a user is reached: the column a login identifier is matched against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Contact<'a> {
    /// Matched against `email`.
    Email(&'a str),
    /// Matched against `phone_number`.
    Phone(&'a str),
}

impl Contact<'_> {
    fn column(self) -> &'static str {
        match self {
            Self::Email(_) => "email",
            Self::Phone(_) => "phone_number",
        }
    }

    fn value(self) -> String {
        match self {
            Self::Email(v) | Self::Phone(v) => v.to_owned(),
        }
    }

    /// Login method name recorded on the user.
    pub fn login_method(self) -> &'static str {
        match self {
            Self::Email(_) => "email",
            Self::Phone(_) => "phone",
        }
    }
}

/// User repository.
pub struct UserRepo;

impl UserRepo {
    /// Look up a user by email or phone number.
    pub fn find_by_identifier(conn: &Connection, contact: Contact<'_>) -> Result<Option<UserRecord>> {
        let raw = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM users WHERE {} = ?1", contact.column()),
                params![contact.value()],
                RawUser::from_row,
            )
            .optional()?;
        raw.map(RawUser::decode).transpose()
    }

    /// Fetch a user by ID.
    pub fn get(conn: &Connection, user_id: &UserId) -> Result<Option<UserRecord>> {
        let raw = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM users WHERE user_id = ?1"),
                params![user_id.as_str()],
                RawUser::from_row,
            )
            .optional()?;
        raw.map(RawUser::decode).transpose()
    }

    /// Create an active, unverified user for an identifier.
    pub fn create_for_identifier(conn: &Connection, contact: Contact<'_>) -> Result<UserRecord> {
        let (email, phone_number) = match contact {
            Contact::Email(v) => (Some(v.to_owned()), None),
            Contact::Phone(v) => (None, Some(v.to_owned())),
        };
        let user = UserRecord {
            user_id: UserId::new(),
            email,
            phone_number,
            otp: None,
            otp_expiry: None,
            is_verified: false,
            is_active: true,
            login_methods: vec![contact.login_method().to_owned()],
            user_type: "user".into(),
            created_at: chrono::Utc::now().to_rfc3339(),
            last_login_at: None,
        };
        let _ = conn.execute(
            "INSERT INTO users (user_id, email, phone_number, is_verified, is_active,
                 login_methods, user_type, created_at)
             VALUES (?1, ?2, ?3, 0, 1, ?4, ?5, ?6)",
            params![
                user.user_id.as_str(),
                user.email,
                user.phone_number,
                serde_json::to_string(&user.login_methods)?,
                user.user_type,
                user.created_at,
            ],
        )?;
        Ok(user)
    }

    /// Find the user for an identifier, creating it on first contact.
    /// Returns the user and whether it was created.
    pub fn find_or_create(conn: &Connection, contact: Contact<'_>) -> Result<(UserRecord, bool)> {
        if let Some(user) = Self::find_by_identifier(conn, contact)? {
            return Ok((user, false));
        }
        Ok((Self::create_for_identifier(conn, contact)?, true))
    }

    /// Store a pending OTP and its expiry (RFC 3339).
    pub fn set_otp(conn: &Connection, user_id: &UserId, otp: &str, expiry: &str) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE users SET otp = ?1, otp_expiry = ?2 WHERE user_id = ?3",
            params![otp, expiry, user_id.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Consume the pending OTP after a successful login.
    pub fn clear_otp_and_mark_verified(conn: &Connection, user_id: &UserId) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE users
             SET otp = NULL, otp_expiry = NULL, is_verified = 1, last_login_at = ?1
             WHERE user_id = ?2",
            params![chrono::Utc::now().to_rfc3339(), user_id.as_str()],
        )?;
        Ok(changed > 0)
    }
}

struct RawUser {
    user_id: String,
    email: Option<String>,
    phone_number: Option<String>,
    otp: Option<String>,
    otp_expiry: Option<String>,
    is_verified: bool,
    is_active: bool,
    login_methods: String,
    user_type: String,
    created_at: String,
    last_login_at: Option<String>,
}

impl RawUser {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            email: row.get(1)?,
            phone_number: row.get(2)?,
            otp: row.get(3)?,
            otp_expiry: row.get(4)?,
            is_verified: row.get(5)?,
            is_active: row.get(6)?,
            login_methods: row.get(7)?,
            user_type: row.get(8)?,
            created_at: row.get(9)?,
            last_login_at: row.get(10)?,
        })
    }

    fn decode(self) -> Result<UserRecord> {
        Ok(UserRecord {
            user_id: self.user_id.into(),
            email: self.email,
            phone_number: self.phone_number,
            otp: self.otp,
            otp_expiry: self.otp_expiry,
            is_verified: self.is_verified,
            is_active: self.is_active,
            login_methods: serde_json::from_str(&self.login_methods)?,
            user_type: self.user_type,
            created_at: self.created_at,
            last_login_at: self.last_login_at,
        })
    }
}
