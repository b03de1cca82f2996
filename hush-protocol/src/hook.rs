/// Hook identifier carried in the Info byte of HOOK/SUB/UNSUB packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HookId {
    All = 0x00,
    NewLogin = 0x01,
    NewLogout = 0x02,
    DuplicateSession = 0x03,
    PermissionsChange = 0x04,
}

impl HookId {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Every concrete hook id except the `all` alias.
    pub const CONCRETE: [HookId; 4] = [
        HookId::NewLogin,
        HookId::NewLogout,
        HookId::DuplicateSession,
        HookId::PermissionsChange,
    ];
}

impl TryFrom<u8> for HookId {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use HookId::*;
        Ok(match value {
            0x00 => All,
            0x01 => NewLogin,
            0x02 => NewLogout,
            0x03 => DuplicateSession,
            0x04 => PermissionsChange,
            _ => return Err(()),
        })
    }
}
