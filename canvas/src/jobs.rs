//! Generation tickets for results that arrive asynchronously.
//!
//! Image decoding and design submission complete on the host's schedule. Each
//! such job gets a [`JobTicket`] from a [`JobGate`]; a result is applied only
//! if its ticket is still the gate's current one. Starting a newer job or
//! cancelling makes every older ticket stale.

#[cfg(test)]
#[path = "jobs_test.rs"]
mod jobs_test;

/// Handle for one asynchronous job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobTicket(u64);

impl JobTicket {
    /// Numeric form handed to the host.
    #[must_use]
    pub fn id(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn from_id(id: u64) -> Self {
        Self(id)
    }
}

/// Issues tickets and tracks which one is current.
#[derive(Debug, Clone, Default)]
pub struct JobGate {
    generation: u64,
    current: Option<u64>,
}

impl JobGate {
    /// Start a job, superseding any outstanding one.
    pub fn begin(&mut self) -> JobTicket {
        self.generation += 1;
        self.current = Some(self.generation);
        JobTicket(self.generation)
    }

    /// Start a job only if none is in flight.
    pub fn begin_exclusive(&mut self) -> Option<JobTicket> {
        if self.in_flight() {
            return None;
        }
        Some(self.begin())
    }

    #[must_use]
    pub fn in_flight(&self) -> bool {
        self.current.is_some()
    }

    #[must_use]
    pub fn is_current(&self, ticket: JobTicket) -> bool {
        self.current == Some(ticket.0)
    }

    /// Mark `ticket` done. Returns `false` for a stale ticket, which leaves
    /// the gate untouched.
    pub fn finish(&mut self, ticket: JobTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.current = None;
        true
    }

    /// Invalidate the outstanding ticket, if any. Returns whether one was
    /// in flight.
    pub fn cancel(&mut self) -> bool {
        self.current.take().is_some()
    }
}
