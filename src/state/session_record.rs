use super::session_state::SessionState;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

const MAX_ARCHIVED_STATES: usize = 40;

/// The current session state plus a bounded history of archived states,
/// kept so messages encrypted under a superseded session still decrypt.
#[derive(Serialize, Deserialize, Clone)]
pub struct SessionRecord {
    session_state: SessionState,
    previous_states: VecDeque<SessionState>,
}

impl SessionRecord {
    pub fn new() -> Self {
        Self {
            session_state: SessionState::new(),
            previous_states: VecDeque::new(),
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.session_state.is_fresh() && self.previous_states.is_empty()
    }

    pub fn session_state(&self) -> &SessionState {
        &self.session_state
    }

    pub fn session_state_mut(&mut self) -> &mut SessionState {
        &mut self.session_state
    }

    /// Moves the current state to the archive and starts a fresh one.
    pub fn archive_current_state(&mut self) {
        let old_state = std::mem::replace(&mut self.session_state, SessionState::new());
        if self.previous_states.len() >= MAX_ARCHIVED_STATES {
            self.previous_states.pop_back();
        }
        self.previous_states.push_front(old_state);
    }

    pub fn previous_states(&self) -> &VecDeque<SessionState> {
        &self.previous_states
    }

    pub fn previous_states_mut(&mut self) -> &mut VecDeque<SessionState> {
        &mut self.previous_states
    }

    /// Makes the archived state at `index` current again, demoting the
    /// state it replaces to the front of the archive.
    pub fn promote_state(&mut self, index: usize) {
        if let Some(promoted) = self.previous_states.remove(index) {
            let old_current = std::mem::replace(&mut self.session_state, promoted);
            if self.previous_states.len() >= MAX_ARCHIVED_STATES {
                self.previous_states.pop_back();
            }
            self.previous_states.push_front(old_current);
        }
    }
}

impl Default for SessionRecord {
    fn default() -> Self {
        Self::new()
    }
}
