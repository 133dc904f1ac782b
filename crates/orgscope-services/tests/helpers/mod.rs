use std::sync::Arc;

use uuid::Uuid;

use orgscope_core::models::{
    AssignmentRequest, CreateUnitRequest, MembershipRole, OrgUnit, UnitType, User,
};
use orgscope_db::db::memory::MemoryOrgStore;
use orgscope_db::{GrantStore, MembershipStore, UnitStore, UserStore};
use orgscope_services::{
    mutation_lock, HierarchyService, MembershipService, TraversalService,
};

/// Engine wired over the in-memory backend.
pub struct TestEngine {
    pub store: MemoryOrgStore,
    pub hierarchy: HierarchyService,
    pub traversal: TraversalService,
    pub memberships: MembershipService,
}

pub fn setup_engine() -> TestEngine {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .try_init()
        .ok();

    let store = MemoryOrgStore::new();
    let units: Arc<dyn UnitStore> = Arc::new(store.clone());
    let membership_store: Arc<dyn MembershipStore> = Arc::new(store.clone());
    let grants: Arc<dyn GrantStore> = Arc::new(store.clone());
    let users: Arc<dyn UserStore> = Arc::new(store.clone());
    let lock = mutation_lock();

    TestEngine {
        hierarchy: HierarchyService::new(units.clone(), membership_store.clone(), lock.clone()),
        traversal: TraversalService::new(units.clone(), membership_store.clone()),
        memberships: MembershipService::new(units, users, membership_store, grants, lock),
        store,
    }
}

/// Create a unit through the mutation service (so all invariants apply).
pub async fn create_unit(
    engine: &TestEngine,
    code: &str,
    unit_type: UnitType,
    parent_id: Option<Uuid>,
) -> OrgUnit {
    engine
        .hierarchy
        .create_unit(CreateUnitRequest {
            code: code.to_string(),
            name: format!("Unit {}", code),
            unit_type,
            parent_id,
            max_staff: None,
        })
        .await
        .unwrap_or_else(|e| panic!("failed to create unit {}: {}", code, e))
}

/// Seed an active user into the directory and return its id.
pub fn seed_user(engine: &TestEngine) -> Uuid {
    seed_user_with_active(engine, true)
}

pub fn seed_user_with_active(engine: &TestEngine, is_active: bool) -> Uuid {
    let id = Uuid::new_v4();
    engine.store.add_user(User {
        id,
        email: format!("{}@municipio.test", id),
        name: None,
        is_active,
    });
    id
}

/// Assign a user as a plain MEMBER of the unit.
pub async fn assign_member(engine: &TestEngine, unit_id: Uuid, user_id: Uuid) {
    engine
        .memberships
        .assign(
            unit_id,
            AssignmentRequest {
                user_id,
                role: MembershipRole::Member,
                is_primary: false,
            },
        )
        .await
        .unwrap_or_else(|e| panic!("failed to assign user: {}", e));
}

/// Build the standard three-level fixture: A (DIRECCION) <- B (COORDINACION)
/// <- C (DEPARTAMENTO). Returns (a, b, c).
pub async fn abc_tree(engine: &TestEngine) -> (OrgUnit, OrgUnit, OrgUnit) {
    let a = create_unit(engine, "A", UnitType::Direccion, None).await;
    let b = create_unit(engine, "B", UnitType::Coordinacion, Some(a.id)).await;
    let c = create_unit(engine, "C", UnitType::Departamento, Some(b.id)).await;
    (a, b, c)
}
