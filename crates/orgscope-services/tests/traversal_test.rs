mod helpers;

use helpers::{abc_tree, assign_member, create_unit, seed_user, setup_engine};
use orgscope_core::models::UnitType;
use orgscope_core::OrgError;
use uuid::Uuid;

#[tokio::test]
async fn test_end_to_end_scenario() {
    let engine = setup_engine();
    let (a, b, c) = abc_tree(&engine).await;

    let ancestors = engine.traversal.ancestors(c.id).await.unwrap();
    assert_eq!(
        ancestors.iter().map(|u| u.id).collect::<Vec<_>>(),
        vec![b.id, a.id]
    );

    let descendants = engine.traversal.descendants(a.id).await.unwrap();
    let tagged: Vec<(Uuid, i32)> = descendants.iter().map(|d| (d.unit.id, d.level)).collect();
    assert_eq!(tagged, vec![(b.id, 1), (c.id, 2)]);

    let path = engine.traversal.path(c.id).await.unwrap();
    assert_eq!(
        path.iter().map(|u| u.id).collect::<Vec<_>>(),
        vec![a.id, b.id, c.id]
    );

    let err = engine.hierarchy.move_unit(a.id, Some(c.id)).await.unwrap_err();
    assert!(matches!(err, OrgError::Cycle { .. }));
}

#[tokio::test]
async fn test_path_and_ancestors_round_trip() {
    let engine = setup_engine();
    // Full six-level chain, one unit of each type
    let l1 = create_unit(&engine, "L1", UnitType::Direccion, None).await;
    let l2 = create_unit(&engine, "L2", UnitType::Coordinacion, Some(l1.id)).await;
    let l3 = create_unit(&engine, "L3", UnitType::Departamento, Some(l2.id)).await;
    let l4 = create_unit(&engine, "L4", UnitType::Unidad, Some(l3.id)).await;
    let l5 = create_unit(&engine, "L5", UnitType::Seccion, Some(l4.id)).await;
    let l6 = create_unit(&engine, "L6", UnitType::Oficina, Some(l5.id)).await;

    for unit in [&l1, &l2, &l3, &l4, &l5, &l6] {
        let ancestors = engine.traversal.ancestors(unit.id).await.unwrap();
        let path = engine.traversal.path(unit.id).await.unwrap();

        // path == reverse(ancestors) + [unit]
        let mut expected: Vec<Uuid> = ancestors.iter().map(|u| u.id).rev().collect();
        expected.push(unit.id);
        assert_eq!(path.iter().map(|u| u.id).collect::<Vec<_>>(), expected);
    }

    let ancestors = engine.traversal.ancestors(l6.id).await.unwrap();
    assert_eq!(
        ancestors.iter().map(|u| u.id).collect::<Vec<_>>(),
        vec![l5.id, l4.id, l3.id, l2.id, l1.id]
    );
}

#[tokio::test]
async fn test_descendants_ordering_and_levels() {
    let engine = setup_engine();
    let root = create_unit(&engine, "DIR", UnitType::Direccion, None).await;
    // Two branches with codes chosen to exercise (level, code) ordering
    let cb = create_unit(&engine, "COO-B", UnitType::Coordinacion, Some(root.id)).await;
    let ca = create_unit(&engine, "COO-A", UnitType::Coordinacion, Some(root.id)).await;
    let dep_b = create_unit(&engine, "DEP-B", UnitType::Departamento, Some(cb.id)).await;
    let dep_a = create_unit(&engine, "DEP-A", UnitType::Departamento, Some(ca.id)).await;

    let descendants = engine.traversal.descendants(root.id).await.unwrap();
    let tagged: Vec<(Uuid, i32)> = descendants.iter().map(|d| (d.unit.id, d.level)).collect();
    assert_eq!(
        tagged,
        vec![(ca.id, 1), (cb.id, 1), (dep_a.id, 2), (dep_b.id, 2)]
    );

    // Levels are monotonically non-decreasing
    for pair in descendants.windows(2) {
        assert!(pair[0].level <= pair[1].level);
    }

    // Leaves yield empty lists, not errors
    assert!(engine.traversal.descendants(dep_a.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_unit_fails_not_found() {
    let engine = setup_engine();
    let id = Uuid::new_v4();
    assert!(matches!(
        engine.traversal.ancestors(id).await.unwrap_err(),
        OrgError::NotFound(_)
    ));
    assert!(matches!(
        engine.traversal.descendants(id).await.unwrap_err(),
        OrgError::NotFound(_)
    ));
    assert!(matches!(
        engine.traversal.path(id).await.unwrap_err(),
        OrgError::NotFound(_)
    ));
    assert!(matches!(
        engine.traversal.hierarchy_stats(id).await.unwrap_err(),
        OrgError::NotFound(_)
    ));
}

#[tokio::test]
async fn test_hierarchy_stats() {
    let engine = setup_engine();
    let (a, b, c) = abc_tree(&engine).await;
    create_unit(&engine, "COO-02", UnitType::Coordinacion, Some(a.id)).await;

    // Memberships on the root itself and on a deep descendant both count
    let user_a = seed_user(&engine);
    let user_c = seed_user(&engine);
    assign_member(&engine, a.id, user_a).await;
    assign_member(&engine, c.id, user_c).await;

    let stats = engine.traversal.hierarchy_stats(a.id).await.unwrap();
    assert_eq!(stats.total_descendants, 3);
    assert_eq!(stats.direct_children_count, 2);
    assert_eq!(stats.total_memberships_in_subtree, 2);

    // max_depth equals the maximum level over descendants(a)
    let descendants = engine.traversal.descendants(a.id).await.unwrap();
    let max_level = descendants.iter().map(|d| d.level).max().unwrap();
    assert_eq!(stats.max_depth, max_level);
    assert_eq!(stats.max_depth, 2);

    assert_eq!(
        stats.counts_by_type.get(&orgscope_core::models::UnitType::Coordinacion),
        Some(&2)
    );
    assert_eq!(
        stats.counts_by_type.get(&orgscope_core::models::UnitType::Departamento),
        Some(&1)
    );

    // Childless unit: zeroed stats
    let stats = engine.traversal.hierarchy_stats(c.id).await.unwrap();
    assert_eq!(stats.total_descendants, 0);
    assert_eq!(stats.max_depth, 0);
    assert_eq!(stats.direct_children_count, 0);
    assert_eq!(stats.total_memberships_in_subtree, 1);
    assert!(stats.counts_by_type.is_empty());
    let _ = b;
}
