//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. Use these types
//! for all sensitive values like database/SMTP passwords, the BBB shared
//! secret, and Redis connection URLs (which may embed credentials).
//!
//! # Compile-Time Safety
//!
//! The key insight is that `SecretBox<T>` and `SecretString` implement `Debug`
//! with redaction, so any code that derives `Debug` on a struct containing secrets
//! will automatically get safe logging behavior. This makes it **impossible** to
//! accidentally log secrets via `{:?}` or tracing.
//!
//! # Memory Safety
//!
//! Secrets are automatically zeroized when dropped, preventing sensitive
//! data from lingering in memory after use.
//!
//! # Example
//!
//! ```rust
//! use common::secret::SecretString;
//! use secrecy::ExposeSecret;
//!
//! #[derive(Debug)]
//! struct ServerRecord {
//!     id: String,
//!     bbb_secret: SecretString, // Safe: Debug shows "[REDACTED]"
//! }
//!
//! let server = ServerRecord {
//!     id: "s1".to_string(),
//!     bbb_secret: SecretString::from("hunter2"),
//! };
//!
//! // This is safe - bbb_secret is redacted
//! println!("{:?}", server);
//!
//! // To access the actual value, you must explicitly call expose_secret()
//! let secret: &str = server.bbb_secret.expose_secret();
//! ```
//!
//! # Usage guidelines
//!
//! Use `SecretString` for:
//! - The BBB shared secret (`BBB_SECRET`)
//! - Tenant-DB and SMTP passwords
//! - Redis/Postgres connection URLs (may carry embedded credentials)
//!
//! # Serde integration
//!
//! With the `serde` feature enabled (on by the workspace `secrecy` dependency),
//! secrets can be deserialized straight out of a server/meeting record:
//!
//! ```rust
//! use serde::Deserialize;
//! use common::secret::SecretString;
//!
//! #[derive(Debug, Deserialize)]
//! struct ServerRecord {
//!     id: String,
//!     #[serde(rename = "BBB_SECRET")]
//!     bbb_secret: SecretString,
//! }
//!
//! let json = r#"{"id": "s1", "BBB_SECRET": "shared-secret"}"#;
//! let server: ServerRecord = serde_json::from_str(json).unwrap();
//! println!("{:?}", server); // bbb_secret is redacted
//! ```

pub use secrecy::{ExposeSecret, SecretBox, SecretString};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn debug_is_redacted() {
        let secret = SecretString::from("hunter2");
        let debug_str = format!("{secret:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("hunter2"));
    }

    #[test]
    fn expose_secret_returns_inner_value() {
        let secret = SecretString::from("password123");
        assert_eq!(secret.expose_secret(), "password123");
    }

    #[test]
    fn struct_with_secret_is_safe() {
        #[allow(dead_code)]
        #[derive(Debug)]
        struct ServerCredentials {
            id: String,
            bbb_secret: SecretString,
        }

        let creds = ServerCredentials {
            id: "s1".to_string(),
            bbb_secret: SecretString::from("super-secret"),
        };

        let debug_str = format!("{creds:?}");

        assert!(debug_str.contains("s1"));
        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("super-secret"));
    }

    #[test]
    fn deserialize_from_server_record() {
        #[allow(dead_code)]
        #[derive(Debug, Deserialize)]
        struct ServerRecord {
            id: String,
            #[serde(rename = "BBB_SECRET")]
            bbb_secret: SecretString,
        }

        let json = r#"{"id": "s1", "BBB_SECRET": "shared-secret"}"#;
        let server: ServerRecord = serde_json::from_str(json).expect("deserialize");

        assert_eq!(server.bbb_secret.expose_secret(), "shared-secret");

        let debug = format!("{server:?}");
        assert!(!debug.contains("shared-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn clone_works() {
        let secret = SecretString::from("cloneable");
        let cloned = secret.clone();
        assert_eq!(cloned.expose_secret(), "cloneable");
    }
}
