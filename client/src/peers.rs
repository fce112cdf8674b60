use empirica_shared::PeerChange;

/// Peers currently connected, in connection order
#[derive(Default)]
pub struct PeerRegistry {
    connected: Vec<PeerChange>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the peer was already connected
    pub fn connect(&mut self, peer: PeerChange) -> bool {
        if self.is_connected(&peer.id) {
            return false;
        }
        self.connected.push(peer);
        true
    }

    /// Returns the peer if it was connected
    pub fn disconnect(&mut self, id: &str) -> Option<PeerChange> {
        let position = self.connected.iter().position(|peer| peer.id == id)?;
        Some(self.connected.remove(position))
    }

    pub fn is_connected(&self, id: &str) -> bool {
        self.connected.iter().any(|peer| peer.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerChange> {
        self.connected.iter()
    }

    pub fn len(&self) -> usize {
        self.connected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connected.is_empty()
    }
}
