//! Hierarchy typing rules
//!
//! The pure half of the hierarchy validator: the fixed six-rank type
//! ordering. The stateful half (cycle detection) needs the store and lives
//! behind the `is_descendant` store query.

use crate::error::OrgError;
use crate::models::UnitType;

/// A unit can only be the child of a strictly coarser type. Equal rank is
/// rejected too (a DEPARTAMENTO cannot hang under another DEPARTAMENTO).
pub fn validate_type_order(child: UnitType, parent: UnitType) -> Result<(), OrgError> {
    if child.rank() > parent.rank() {
        Ok(())
    } else {
        Err(OrgError::InvalidHierarchy(format!(
            "A {} cannot be a child of a {}",
            child.as_str(),
            parent.as_str()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finer_under_coarser_is_accepted() {
        assert!(validate_type_order(UnitType::Coordinacion, UnitType::Direccion).is_ok());
        assert!(validate_type_order(UnitType::Departamento, UnitType::Coordinacion).is_ok());
        assert!(validate_type_order(UnitType::Oficina, UnitType::Direccion).is_ok());
    }

    #[test]
    fn test_equal_rank_is_rejected() {
        let err = validate_type_order(UnitType::Departamento, UnitType::Departamento).unwrap_err();
        assert!(matches!(err, OrgError::InvalidHierarchy(_)));
    }

    #[test]
    fn test_coarser_under_finer_is_rejected() {
        let err = validate_type_order(UnitType::Departamento, UnitType::Unidad).unwrap_err();
        assert!(matches!(err, OrgError::InvalidHierarchy(_)));
        let err = validate_type_order(UnitType::Direccion, UnitType::Oficina).unwrap_err();
        assert!(err.to_string().contains("DIRECCION"));
    }
}
