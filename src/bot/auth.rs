//! Administrator gate applied to every inbound update.

use std::collections::HashSet;

pub const MSG_NOT_ADMIN: &str = "Duude, You are not my administrator ! :)";

/// Fixed set of user ids allowed to talk to the bot
#[derive(Debug, Clone, Default)]
pub struct AdminGate {
    administrators: HashSet<i64>,
}

impl AdminGate {
    pub fn new(administrators: impl IntoIterator<Item = i64>) -> Self {
        Self {
            administrators: administrators.into_iter().collect(),
        }
    }

    /// An empty set admits nobody.
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.administrators.contains(&user_id)
    }

    pub fn len(&self) -> usize {
        self.administrators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.administrators.is_empty()
    }
}
