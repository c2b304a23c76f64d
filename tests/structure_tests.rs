//! StructureManager unit tests

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use waystones::structure::WAYSTONE_ITEM;
    use waystones::{
        ActorContext, ItemStack, PersistenceHandle, PlacementContext, SimWorld, StructureError,
        StructureManager, StructurePhase, WaystoneEvent, WaystoneRegistry, WaystonesConfig,
        WorldPos,
    };

    fn make_manager() -> (StructureManager, Arc<WaystoneRegistry>, Arc<SimWorld>) {
        let registry = Arc::new(WaystoneRegistry::new(PersistenceHandle::disabled()));
        let adapter = Arc::new(SimWorld::new());
        let manager =
            StructureManager::new(registry.clone(), adapter.clone(), WaystonesConfig::default());
        (manager, registry, adapter)
    }

    fn lower() -> WorldPos {
        WorldPos::new("overworld", 10, 64, -4)
    }

    // -----------------------------------------------------------------------
    // Placement
    // -----------------------------------------------------------------------

    #[test]
    fn place_completes_structure_and_registers_record() {
        let (manager, registry, _) = make_manager();

        let hash = manager.on_place(lower(), PlacementContext::default()).unwrap();

        assert_eq!(manager.phase(&hash), StructurePhase::Complete);
        assert_eq!(manager.waystone_at(&lower()), Some(hash.clone()));
        // The upper half resolves to the same structure, not its own.
        assert_eq!(manager.waystone_at(&lower().up()), Some(hash.clone()));

        let record = registry.get(&hash).unwrap();
        assert_eq!(record.position, lower());
        assert_eq!(record.owner, None);
    }

    #[test]
    fn place_on_occupied_cells_is_obstructed() {
        let (manager, _, _) = make_manager();
        manager.on_place(lower(), PlacementContext::default()).unwrap();

        assert!(matches!(
            manager.on_place(lower(), PlacementContext::default()),
            Err(StructureError::Obstructed(_))
        ));
        // A placement whose upper half would collide is rejected too.
        assert!(matches!(
            manager.on_place(lower().down(), PlacementContext::default()),
            Err(StructureError::Obstructed(_))
        ));
    }

    #[test]
    fn worldgen_flag_is_carried() {
        let (manager, registry, _) = make_manager();
        let ctx = PlacementContext {
            world_generated: true,
            ..Default::default()
        };
        let hash = manager.on_place(lower(), ctx).unwrap();
        assert!(registry.get(&hash).unwrap().is_world_generated);
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    #[test]
    fn breaking_lower_half_removes_record() {
        let (manager, registry, adapter) = make_manager();
        let hash = manager.on_place(lower(), PlacementContext::default()).unwrap();

        let outcome = manager.on_break(&lower(), None);
        assert_eq!(outcome.hash.as_deref(), Some(hash.as_str()));

        assert_eq!(registry.get(&hash), None);
        assert_eq!(manager.phase(&hash), StructurePhase::Removed);
        assert_eq!(manager.waystone_at(&lower()), None);
        assert_eq!(manager.waystone_at(&lower().up()), None);
        // Both cells were forced clear in the same operation.
        let cleared = adapter.cleared_blocks();
        assert!(cleared.contains(&lower()));
        assert!(cleared.contains(&lower().up()));
    }

    #[test]
    fn breaking_upper_half_removes_the_same_structure() {
        let (manager, registry, _) = make_manager();
        let hash = manager.on_place(lower(), PlacementContext::default()).unwrap();

        let outcome = manager.on_break(&lower().up(), None);
        assert_eq!(outcome.hash.as_deref(), Some(hash.as_str()));
        assert_eq!(registry.get(&hash), None);
    }

    #[test]
    fn racing_removal_paths_are_idempotent() {
        let (manager, _, _) = make_manager();
        manager.on_place(lower(), PlacementContext::default()).unwrap();

        // Break event and state-replacement event both fire in one tick.
        let first = manager.on_break(&lower(), None);
        let second = manager.on_state_replaced(&lower().up(), false);

        assert!(first.hash.is_some());
        assert!(second.hash.is_none());
        assert!(second.ejected.is_empty());
    }

    #[test]
    fn replacement_by_waystone_half_is_a_mirror_noop() {
        let (manager, registry, _) = make_manager();
        let hash = manager.on_place(lower(), PlacementContext::default()).unwrap();

        let outcome = manager.on_state_replaced(&lower().up(), true);
        assert!(outcome.hash.is_none());
        assert!(registry.get(&hash).is_some());
    }

    #[test]
    fn teardown_ejects_stored_inventory_at_structure_top() {
        let (manager, registry, adapter) = make_manager();
        let hash = manager.on_place(lower(), PlacementContext::default()).unwrap();
        registry.update(&hash, |r| {
            r.stored_inventory.push(ItemStack::new("token", 3));
        });

        let outcome = manager.on_state_replaced(&lower(), false);
        assert_eq!(outcome.ejected, vec![ItemStack::new("token", 3)]);
        assert!(adapter
            .scattered_at(&lower().up())
            .contains(&ItemStack::new("token", 3)));

        let events = outcome.events();
        assert!(events
            .iter()
            .any(|e| matches!(e, WaystoneEvent::StructureRemoved { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, WaystoneEvent::InventoryEjected { .. })));
    }

    // -----------------------------------------------------------------------
    // Harvest drops
    // -----------------------------------------------------------------------

    #[test]
    fn sneak_break_preserves_record_in_the_drop() {
        let (manager, _, _) = make_manager();
        let hash = manager.on_place(lower(), PlacementContext::default()).unwrap();

        let mut actor = ActorContext::new("alice");
        actor.sneaking = true;
        let outcome = manager.on_break(&lower(), Some(&actor));

        let harvest = outcome.harvest.unwrap();
        assert_eq!(harvest.item, ItemStack::new(WAYSTONE_ITEM, 1));
        assert_eq!(harvest.preserved.unwrap().hash, hash);
    }

    #[test]
    fn plain_break_drops_item_without_data() {
        let (manager, _, _) = make_manager();
        manager.on_place(lower(), PlacementContext::default()).unwrap();

        let actor = ActorContext::new("alice");
        let outcome = manager.on_break(&lower(), Some(&actor));
        let harvest = outcome.harvest.unwrap();
        assert!(harvest.preserved.is_none());
    }

    #[test]
    fn creative_break_yields_no_drop() {
        let (manager, _, _) = make_manager();
        manager.on_place(lower(), PlacementContext::default()).unwrap();

        let mut actor = ActorContext::new("alice");
        actor.creative = true;
        let outcome = manager.on_break(&lower(), Some(&actor));
        assert!(outcome.harvest.is_none());
    }

    #[test]
    fn mossy_structure_drops_growth_item() {
        let (manager, _, adapter) = make_manager();
        manager.on_place(lower(), PlacementContext::default()).unwrap();
        assert!(manager.set_moss(&lower(), true));

        let actor = ActorContext::new("alice");
        manager.on_break(&lower(), Some(&actor));
        assert!(adapter
            .scattered_at(&lower().up())
            .contains(&ItemStack::new("vine", 1)));
    }

    // -----------------------------------------------------------------------
    // Identity across re-placement
    // -----------------------------------------------------------------------

    #[test]
    fn replacing_at_same_position_never_resurrects_the_old_hash() {
        let (manager, registry, _) = make_manager();
        let first = manager.on_place(lower(), PlacementContext::default()).unwrap();
        manager.on_break(&lower(), None);

        let second = manager.on_place(lower(), PlacementContext::default()).unwrap();
        assert_ne!(first, second);
        assert_eq!(registry.get(&first), None);
        assert!(registry.get(&second).is_some());
    }

    #[test]
    fn carried_blob_restores_identity_at_a_new_position() {
        let (manager, registry, _) = make_manager();
        let hash = manager.on_place(lower(), PlacementContext::default()).unwrap();
        registry.update(&hash, |r| r.owner = Some("alice".into()));

        let mut actor = ActorContext::new("alice");
        actor.sneaking = true;
        let blob = manager
            .on_break(&lower(), Some(&actor))
            .harvest
            .unwrap()
            .preserved
            .unwrap();

        let new_pos = WorldPos::new("overworld", 100, 70, 100);
        let ctx = PlacementContext {
            placer: Some(ActorContext::new("alice")),
            carried_blob: Some(blob),
            ..Default::default()
        };
        let restored = manager.on_place(new_pos.clone(), ctx).unwrap();

        assert_eq!(restored, hash);
        let record = registry.get(&hash).unwrap();
        assert_eq!(record.owner.as_deref(), Some("alice"));
        assert_eq!(record.position, new_pos);
    }

    #[test]
    fn carried_blob_without_player_context_mints_fresh() {
        let (manager, registry, _) = make_manager();
        let hash = manager.on_place(lower(), PlacementContext::default()).unwrap();
        let blob = registry.get(&hash).unwrap().to_blob();
        manager.on_break(&lower(), None);

        // Mechanism/worldgen placements never restore carried data.
        let ctx = PlacementContext {
            carried_blob: Some(blob),
            ..Default::default()
        };
        let fresh = manager.on_place(lower(), ctx).unwrap();
        assert_ne!(fresh, hash);
    }

    // -----------------------------------------------------------------------
    // Cosmetic mirroring
    // -----------------------------------------------------------------------

    #[test]
    fn moss_flag_is_shared_by_both_halves() {
        let (manager, registry, _) = make_manager();
        let hash = manager.on_place(lower(), PlacementContext::default()).unwrap();

        assert!(manager.set_moss(&lower(), true));
        // Same flag seen from the upper half; setting it again is a no-op.
        assert!(!manager.set_moss(&lower().up(), true));
        assert!(registry.get(&hash).unwrap().has_moss_overlay);

        assert!(manager.set_moss(&lower().up(), false));
        assert!(!registry.get(&hash).unwrap().has_moss_overlay);
    }

    #[test]
    fn waterlogging_mirrors_across_halves() {
        let (manager, _, _) = make_manager();
        let hash = manager.on_place(lower(), PlacementContext::default()).unwrap();

        assert!(manager.set_waterlogged(&lower().up(), true));
        assert!(manager.is_waterlogged(&hash));
    }

    // -----------------------------------------------------------------------
    // Reconciliation
    // -----------------------------------------------------------------------

    #[test]
    fn reconcile_drops_index_entries_without_records() {
        let (manager, registry, _) = make_manager();
        let hash = manager.on_place(lower(), PlacementContext::default()).unwrap();

        // Simulate drift: the record vanished outside the manager.
        registry.remove(&hash);
        assert!(manager.waystone_at(&lower()).is_some());

        assert!(manager.reconcile() > 0);
        assert_eq!(manager.waystone_at(&lower()), None);
        assert_eq!(manager.reconcile(), 0);
    }
}
