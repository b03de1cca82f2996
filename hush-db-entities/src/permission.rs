/// Permission tier a principal holds, ordered low to high (§2 / GLOSSARY).
///
/// `Ord` follows declaration order, so `user.permission() >= Permission::Admin`
/// is the whole privilege check ADMIN sub-operations need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i16)]
pub enum Permission {
    User = 0,
    Admin = 1,
    Owner = 2,
}

impl Permission {
    pub fn as_i16(self) -> i16 {
        self as i16
    }
}

#[derive(thiserror::Error, Debug)]
#[error("unknown permission tier {0}")]
pub struct UnknownPermission(pub i16);

impl TryFrom<i16> for Permission {
    type Error = UnknownPermission;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Permission::User),
            1 => Ok(Permission::Admin),
            2 => Ok(Permission::Owner),
            other => Err(UnknownPermission(other)),
        }
    }
}

impl From<Permission> for i16 {
    fn from(value: Permission) -> Self {
        value.as_i16()
    }
}
