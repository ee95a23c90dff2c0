//! Host-side referential id computation.
//!
//! Produces the same RFC 4122 version-5 UUID that the `dms.uuidv5` database
//! function computes inside the referential-identity triggers, so a caller
//! can resolve a reference without a round trip.
//!
//! The name hashed under [`REFERENTIAL_ID_NAMESPACE`] is
//! `{ProjectName}{ResourceName}` followed by `$` + path + `=` + value for each
//! identity element, elements joined by `#`:
//!
//! ```rust
//! use edfi_dms_ddl::identity::{referential_id, referential_id_name, IdentityElement};
//!
//! let elements = [IdentityElement::new("$.schoolId", "255901")];
//! assert_eq!(
//!     referential_id_name("Ed-Fi", "School", &elements),
//!     "Ed-FiSchool$$.schoolId=255901"
//! );
//! assert_eq!(referential_id("Ed-Fi", "School", &elements).get_version_num(), 5);
//! ```

use uuid::Uuid;

/// Namespace string embedded in generated trigger SQL.
pub const REFERENTIAL_ID_NAMESPACE_STR: &str = "edf1edf1-3df1-3df1-3df1-3df1edf1edf1";

/// UUIDv5 namespace for referential ids.
pub const REFERENTIAL_ID_NAMESPACE: Uuid = Uuid::from_u128(0xedf1edf1_3df1_3df1_3df1_3df1edf1edf1);

/// One identity path and its rendered value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityElement {
    pub identity_json_path: String,
    pub value: String,
}

impl IdentityElement {
    pub fn new(identity_json_path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            identity_json_path: identity_json_path.into(),
            value: value.into(),
        }
    }
}

/// The UUIDv5 name string for a resource identity.
pub fn referential_id_name(
    project_name: &str,
    resource_name: &str,
    elements: &[IdentityElement],
) -> String {
    let identity = elements
        .iter()
        .map(|e| format!("${}={}", e.identity_json_path, e.value))
        .collect::<Vec<_>>()
        .join("#");
    format!("{}{}{}", project_name, resource_name, identity)
}

/// Referential id of a resource identity.
pub fn referential_id(project_name: &str, resource_name: &str, elements: &[IdentityElement]) -> Uuid {
    let name = referential_id_name(project_name, resource_name, elements);
    Uuid::new_v5(&REFERENTIAL_ID_NAMESPACE, name.as_bytes())
}
