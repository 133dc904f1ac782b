mod helpers;

use helpers::{abc_tree, assign_member, create_unit, seed_user, setup_engine};
use orgscope_core::models::{
    CreateUnitRequest, GrantRequest, Page, PermissionAction, UnitFilter, UnitType,
    UpdateUnitRequest,
};
use orgscope_core::OrgError;
use orgscope_db::GrantStore;
use uuid::Uuid;

#[tokio::test]
async fn test_create_enforces_type_ordering() {
    let engine = setup_engine();
    let root = create_unit(&engine, "DIR-01", UnitType::Direccion, None).await;
    let unidad = create_unit(&engine, "UNI-01", UnitType::Unidad, Some(root.id)).await;

    // DEPARTAMENTO under UNIDAD: child rank not strictly greater
    let err = engine
        .hierarchy
        .create_unit(CreateUnitRequest {
            code: "DEP-01".to_string(),
            name: "Departamento".to_string(),
            unit_type: UnitType::Departamento,
            parent_id: Some(unidad.id),
            max_staff: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::InvalidHierarchy(_)));

    // ...but under COORDINACION it succeeds
    let coord = create_unit(&engine, "COO-01", UnitType::Coordinacion, Some(root.id)).await;
    let dep = engine
        .hierarchy
        .create_unit(CreateUnitRequest {
            code: "DEP-01".to_string(),
            name: "Departamento".to_string(),
            unit_type: UnitType::Departamento,
            parent_id: Some(coord.id),
            max_staff: None,
        })
        .await
        .unwrap();
    assert_eq!(dep.parent_id, Some(coord.id));
    assert!(dep.is_active);
}

#[tokio::test]
async fn test_create_rejects_duplicate_code_and_missing_parent() {
    let engine = setup_engine();
    create_unit(&engine, "DIR-01", UnitType::Direccion, None).await;

    let err = engine
        .hierarchy
        .create_unit(CreateUnitRequest {
            code: "DIR-01".to_string(),
            name: "Dup".to_string(),
            unit_type: UnitType::Direccion,
            parent_id: None,
            max_staff: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::DuplicateCode(code) if code == "DIR-01"));

    let err = engine
        .hierarchy
        .create_unit(CreateUnitRequest {
            code: "COO-01".to_string(),
            name: "Orphan".to_string(),
            unit_type: UnitType::Coordinacion,
            parent_id: Some(Uuid::new_v4()),
            max_staff: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::NotFound(_)));
}

#[tokio::test]
async fn test_create_rejects_invalid_input() {
    let engine = setup_engine();
    let err = engine
        .hierarchy
        .create_unit(CreateUnitRequest {
            code: String::new(),
            name: "No code".to_string(),
            unit_type: UnitType::Direccion,
            parent_id: None,
            max_staff: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::InvalidInput(_)));
}

#[tokio::test]
async fn test_update_checks_code_uniqueness() {
    let engine = setup_engine();
    let (a, b, _c) = abc_tree(&engine).await;

    let err = engine
        .hierarchy
        .update_unit(
            b.id,
            UpdateUnitRequest {
                code: Some(a.code.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::DuplicateCode(_)));

    // Re-submitting its own code is not a collision
    let updated = engine
        .hierarchy
        .update_unit(
            b.id,
            UpdateUnitRequest {
                code: Some(b.code.clone()),
                name: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Renamed");
}

#[tokio::test]
async fn test_move_rejects_cycles() {
    let engine = setup_engine();
    let (a, _b, c) = abc_tree(&engine).await;

    // Under its own descendant
    let err = engine.hierarchy.move_unit(a.id, Some(c.id)).await.unwrap_err();
    assert!(matches!(err, OrgError::Cycle { .. }));

    // Under itself
    let err = engine.hierarchy.move_unit(a.id, Some(a.id)).await.unwrap_err();
    assert!(matches!(err, OrgError::Cycle { .. }));
}

#[tokio::test]
async fn test_move_to_unrelated_coarser_unit_succeeds() {
    let engine = setup_engine();
    let (_a, _b, c) = abc_tree(&engine).await;
    let other_root = create_unit(&engine, "DIR-02", UnitType::Direccion, None).await;
    let other_coord =
        create_unit(&engine, "COO-02", UnitType::Coordinacion, Some(other_root.id)).await;

    let moved = engine
        .hierarchy
        .move_unit(c.id, Some(other_coord.id))
        .await
        .unwrap();
    assert_eq!(moved.parent_id, Some(other_coord.id));

    // Same rank is still rejected
    let other_dep =
        create_unit(&engine, "DEP-02", UnitType::Departamento, Some(other_coord.id)).await;
    let err = engine
        .hierarchy
        .move_unit(c.id, Some(other_dep.id))
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::InvalidHierarchy(_)));
}

#[tokio::test]
async fn test_move_to_root_skips_checks() {
    let engine = setup_engine();
    let (_a, _b, c) = abc_tree(&engine).await;

    let moved = engine.hierarchy.move_unit(c.id, None).await.unwrap();
    assert_eq!(moved.parent_id, None);
    assert!(engine.traversal.ancestors(c.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_guards_children_and_memberships() {
    let engine = setup_engine();
    let (a, b, c) = abc_tree(&engine).await;

    let err = engine.hierarchy.delete_unit(a.id).await.unwrap_err();
    assert!(matches!(err, OrgError::Conflict(_)));

    let user = seed_user(&engine);
    assign_member(&engine, c.id, user).await;
    let err = engine.hierarchy.delete_unit(c.id).await.unwrap_err();
    assert!(matches!(err, OrgError::Conflict(_)));

    // Clear the membership, then delete bottom-up
    engine.memberships.remove(c.id, user).await.unwrap();
    engine.hierarchy.delete_unit(c.id).await.unwrap();
    engine.hierarchy.delete_unit(b.id).await.unwrap();
    engine.hierarchy.delete_unit(a.id).await.unwrap();

    let err = engine.hierarchy.get_unit(a.id).await.unwrap_err();
    assert!(matches!(err, OrgError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_removes_unit_grants() {
    let engine = setup_engine();
    let unit = create_unit(&engine, "DIR-01", UnitType::Direccion, None).await;
    engine
        .memberships
        .grant(
            unit.id,
            GrantRequest {
                module: "fleet".to_string(),
                action: PermissionAction::Read,
                resource: None,
            },
        )
        .await
        .unwrap();

    // Granted but empty: the delete goes through and takes the grant with it
    engine.hierarchy.delete_unit(unit.id).await.unwrap();

    let leftover = GrantStore::list_for_unit(&engine.store, unit.id).await.unwrap();
    assert!(leftover.is_empty());
}

#[tokio::test]
async fn test_list_units_filters_and_paginates() {
    let engine = setup_engine();
    let (a, _b, _c) = abc_tree(&engine).await;
    create_unit(&engine, "COO-09", UnitType::Coordinacion, Some(a.id)).await;

    let (roots, total) = engine
        .hierarchy
        .list_units(
            &UnitFilter {
                parent_id: Some(None),
                ..Default::default()
            },
            Page::default(),
        )
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(roots[0].id, a.id);

    let (coords, total) = engine
        .hierarchy
        .list_units(
            &UnitFilter {
                unit_type: Some(UnitType::Coordinacion),
                ..Default::default()
            },
            Page::default(),
        )
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert_eq!(coords.len(), 2);

    let (page, total) = engine
        .hierarchy
        .list_units(&UnitFilter::default(), Page { limit: 2, offset: 2 })
        .await
        .unwrap();
    assert_eq!(total, 4);
    assert_eq!(page.len(), 2);
}

#[tokio::test]
async fn test_set_active_round_trip() {
    let engine = setup_engine();
    let (a, _b, _c) = abc_tree(&engine).await;

    let disabled = engine.hierarchy.set_active(a.id, false).await.unwrap();
    assert!(!disabled.is_active);
    let enabled = engine.hierarchy.set_active(a.id, true).await.unwrap();
    assert!(enabled.is_active);
}
