use strum_macros::{Display, EnumString, FromRepr};

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Display, EnumString, FromRepr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[repr(u8)]
pub enum Role {
    Admin = 1,
    #[default]
    Agent = 2,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        Role::from_repr(id)
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn ids_and_names() {
        assert_eq!(Role::from_id(1), Some(Role::Admin));
        assert_eq!(Role::from_id(9), None);
        assert_eq!(Role::from_str("Admin").unwrap(), Role::Admin);
        assert_eq!(Role::Agent.to_string(), "agent");
        assert_eq!(Role::default().id(), 2);
    }
}
