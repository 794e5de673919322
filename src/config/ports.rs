//! Sequential local port allocation.
//!
//! Ports are handed out in input order, only to services without an explicit
//! `local_port`. The counter advances once per retained service, explicit or
//! not, so auto-assigned ports never collide with each other. An explicit port
//! can still equal a counter value reached later; [`PortAllocator::collisions`]
//! reports those.

/// Running port counter threaded through one normalization pass.
#[derive(Debug, Clone)]
pub struct PortAllocator {
    next: u32,
    assigned: Vec<u16>,
    explicit: Vec<u16>,
}

impl PortAllocator {
    pub fn new(start: u16) -> Self {
        Self {
            next: u32::from(start),
            assigned: Vec::new(),
            explicit: Vec::new(),
        }
    }

    /// Resolve the port for one retained service and advance the counter.
    ///
    /// Returns `None` only when a port must be assigned and the counter has
    /// run past `u16::MAX`.
    pub fn resolve(&mut self, explicit: Option<u16>) -> Option<u16> {
        let port = match explicit {
            Some(port) => {
                self.explicit.push(port);
                port
            }
            None => {
                let port = u16::try_from(self.next).ok()?;
                self.assigned.push(port);
                port
            }
        };
        self.next += 1;
        Some(port)
    }

    /// Ports handed out by the counter, in allocation order.
    pub fn assigned(&self) -> &[u16] {
        &self.assigned
    }

    /// Explicit ports that equal an auto-assigned one.
    pub fn collisions(&self) -> Vec<u16> {
        let mut hits: Vec<u16> = self
            .explicit
            .iter()
            .copied()
            .filter(|port| self.assigned.contains(port))
            .collect();
        hits.sort_unstable();
        hits.dedup();
        hits
    }
}
