use crate::error::CodecError;

/// Wire opcode carried in the header's 8-bit Action field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Action {
    Ok = 0x01,
    Err = 0x02,
    Reg = 0x03,
    Verif = 0x04,
    Req = 0x05,
    Usrs = 0x06,
    Reciv = 0x07,
    Login = 0x08,
    Msg = 0x09,
    Discn = 0x0A,
    Dereg = 0x0B,
    Shtdwn = 0x0C,
    Admin = 0x0D,
    Keep = 0x0E,
    Hello = 0x0F,
    Hook = 0x10,
    Sub = 0x11,
    Unsub = 0x12,
    Logout = 0x13,
}

impl Action {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Required argument count, or `None` for ADMIN whose tail is variable.
    pub fn required_args(self) -> Option<u8> {
        use Action::*;
        Some(match self {
            Ok => 0,
            Err => 0,
            Reg => 2,
            Verif => 2,
            Req => 1,
            Usrs => 1,
            Reciv => 3,
            Login => 1,
            Msg => 3,
            Discn => 0,
            Dereg => 0,
            Shtdwn => 1,
            Admin => return None,
            Keep => 0,
            Hello => 1,
            Hook => 2,
            Sub => 1,
            Unsub => 1,
            Logout => 0,
        })
    }
}

impl TryFrom<u8> for Action {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use Action::*;
        Ok(match value {
            0x01 => Ok,
            0x02 => Err,
            0x03 => Reg,
            0x04 => Verif,
            0x05 => Req,
            0x06 => Usrs,
            0x07 => Reciv,
            0x08 => Login,
            0x09 => Msg,
            0x0A => Discn,
            0x0B => Dereg,
            0x0C => Shtdwn,
            0x0D => Admin,
            0x0E => Keep,
            0x0F => Hello,
            0x10 => Hook,
            0x11 => Sub,
            0x12 => Unsub,
            0x13 => Logout,
            other => return Err(CodecError::Invalid(other)),
        })
    }
}
