//! DiscoveryIndex unit tests

#[cfg(test)]
mod tests {
    use waystones::{DiscoveryIndex, VoidAnchor, WorldPos};

    // -----------------------------------------------------------------------
    // Discovery transitions
    // -----------------------------------------------------------------------

    #[test]
    fn discover_reports_transition_only_once() {
        let index = DiscoveryIndex::new();

        assert!(index.discover("alice", "h1"));
        // Repeated discovery is a no-op; one-time side effects key off this.
        assert!(!index.discover("alice", "h1"));
        assert!(index.contains("alice", "h1"));
        assert!(!index.contains("bob", "h1"));
    }

    #[test]
    fn discovered_lists_are_per_player_and_sorted() {
        let index = DiscoveryIndex::new();
        index.discover("alice", "b");
        index.discover("alice", "a");
        index.discover("bob", "c");

        assert_eq!(index.discovered("alice"), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(index.discovered("bob"), vec!["c".to_string()]);
        assert!(index.discovered("carol").is_empty());
    }

    // -----------------------------------------------------------------------
    // Forget
    // -----------------------------------------------------------------------

    #[test]
    fn forget_all_sweeps_every_player() {
        let index = DiscoveryIndex::new();
        index.discover("alice", "h1");
        index.discover("bob", "h1");
        index.discover("bob", "h2");

        assert_eq!(index.forget_all("h1"), 2);
        assert!(!index.contains("alice", "h1"));
        assert!(!index.contains("bob", "h1"));
        assert!(index.contains("bob", "h2"));

        // Second sweep finds nothing; eventual consistency is fine.
        assert_eq!(index.forget_all("h1"), 0);
    }

    #[test]
    fn forget_single_player() {
        let index = DiscoveryIndex::new();
        index.discover("alice", "h1");

        assert!(index.forget("alice", "h1"));
        assert!(!index.forget("alice", "h1"));
        assert!(!index.contains("alice", "h1"));
    }

    // -----------------------------------------------------------------------
    // Void anchors
    // -----------------------------------------------------------------------

    #[test]
    fn void_anchors_are_player_private() {
        let index = DiscoveryIndex::new();
        let anchor = VoidAnchor {
            id: "anchor-1".into(),
            name: "Hearth".into(),
            position: WorldPos::new("overworld", 5, 70, 5),
        };
        index.bind_void_anchor("alice", anchor.clone());

        assert_eq!(index.void_anchor("alice", "anchor-1"), Some(anchor));
        // Another player cannot resolve it.
        assert_eq!(index.void_anchor("bob", "anchor-1"), None);

        assert!(index.unbind_void_anchor("alice", "anchor-1"));
        assert_eq!(index.void_anchor("alice", "anchor-1"), None);
    }

    #[test]
    fn stats_track_players_and_anchors() {
        let index = DiscoveryIndex::new();
        index.discover("alice", "h1");
        index.bind_void_anchor(
            "bob",
            VoidAnchor {
                id: "a".into(),
                name: "Camp".into(),
                position: WorldPos::new("nether", 0, 32, 0),
            },
        );

        assert_eq!(index.tracked_players(), 2);
        assert_eq!(index.anchor_count(), 1);
    }
}
