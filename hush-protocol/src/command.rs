use crate::packet::Packet;

/// A packet that has been read off a connection and is ready for dispatch.
///
/// `connection` identifies the TCP connection the packet arrived on (not
/// necessarily a logged-in session); the hub resolves that to a session via
/// its own state before acting on privileged commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub connection: u64,
    pub packet: Packet,
    pub over_tls: bool,
}

impl Command {
    pub fn new(connection: u64, packet: Packet, over_tls: bool) -> Self {
        Self {
            connection,
            packet,
            over_tls,
        }
    }

    pub fn id(&self) -> u16 {
        self.packet.id
    }
}

/// Orders commands by id ascending, the order the waitlist drains replies in.
impl PartialOrd for Command {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Command {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.packet.id.cmp(&other.packet.id)
    }
}
