use dashmap::DashMap;
use uuid::Uuid;

/// Live socket count per user, so presence is only cleared when the last
/// socket of a user goes away.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    counts: DashMap<Uuid, usize>,
}

impl ConnectionRegistry {
    /// Register a socket. Returns the user's socket count afterwards.
    pub fn connect(&self, user_id: Uuid) -> usize {
        let mut count = self.counts.entry(user_id).or_insert(0);
        *count += 1;
        *count
    }

    /// Drop a socket. Returns true when it was the user's last one.
    pub fn disconnect(&self, user_id: Uuid) -> bool {
        let remaining = match self.counts.get_mut(&user_id) {
            Some(mut count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => return true,
        };
        if remaining == 0 {
            self.counts.remove_if(&user_id, |_, count| *count == 0);
        }
        remaining == 0
    }

    pub fn online_users(&self) -> usize {
        self.counts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_socket_clears_user() {
        let registry = ConnectionRegistry::default();
        let user = Uuid::now_v7();

        assert_eq!(registry.connect(user), 1);
        assert_eq!(registry.connect(user), 2);
        assert!(!registry.disconnect(user));
        assert_eq!(registry.online_users(), 1);
        assert!(registry.disconnect(user));
        assert_eq!(registry.online_users(), 0);
    }

    #[test]
    fn unknown_disconnect_counts_as_last() {
        let registry = ConnectionRegistry::default();
        assert!(registry.disconnect(Uuid::now_v7()));
    }

    #[test]
    fn users_are_tracked_independently() {
        let registry = ConnectionRegistry::default();
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        registry.connect(a);
        registry.connect(b);
        assert!(registry.disconnect(a));
        assert_eq!(registry.online_users(), 1);
    }
}
