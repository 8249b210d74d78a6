use crate::prelude::*;

/// A mirror of the identity provider's user row. Identity itself lives with
/// the auth collaborator; this service only keeps what it reads back: the
/// id, the display name, the active flag, and the role.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, new)]
pub struct User {
    #[new(default)]
    pub id: Record<User>,
    pub full_name: Option<String>,
    #[new(value = "true")]
    pub is_active: bool,
    pub role: Role,
}

define_table!("users" : User = id);
define_model!(User);

define_relation! {
    User > list_active() > Vec<User>
        where "SELECT * FROM users WHERE is_active = true ORDER BY full_name"
}

define_relation! {
    User > get(id: &Record<User>) > Option<User>
        where "SELECT * FROM users WHERE id = $id LIMIT 1"
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Driver,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}
