//! Device lifecycle state machine.
//!
//! Every workstation event (inspection, repair completion, paint collection,
//! QC, dispatch) asks this module for the device's next status. Nothing here
//! touches the database; services load the rows, call in, and persist the
//! answer.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::entities::{DeviceStatus, OutwardType, QcResult};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("cannot {action} while device is {current}")]
    InvalidTransition {
        action: String,
        current: DeviceStatus,
    },
    #[error("cannot submit QC: repair required but not completed")]
    RepairIncomplete,
    #[error("cannot submit QC: paint required but not completed")]
    PaintIncomplete,
}

/// A spare part line requested by an inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SpareRequirement {
    pub part_code: String,
    pub quantity: i32,
}

/// What an inspection found, reduced to the facts that drive routing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InspectionOutcome {
    pub has_issues: bool,
    pub spares_needed: bool,
    pub spares_pending: bool,
    pub paint_needed: bool,
}

impl InspectionOutcome {
    pub fn repair_required(&self) -> bool {
        self.has_issues || self.spares_needed
    }
}

/// Repair/paint flags carried on the device row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceWorkState {
    pub status: DeviceStatus,
    pub repair_required: bool,
    pub repair_completed: bool,
    pub paint_required: bool,
    pub paint_completed: bool,
}

pub fn next_status_after_inspection(outcome: &InspectionOutcome) -> DeviceStatus {
    if outcome.repair_required() {
        if outcome.spares_pending {
            DeviceStatus::WaitingForSpares
        } else {
            DeviceStatus::ReadyForRepair
        }
    } else if outcome.paint_needed {
        DeviceStatus::InPaintShop
    } else {
        DeviceStatus::AwaitingQc
    }
}

pub fn next_status_after_repair(paint_required: bool, paint_completed: bool) -> DeviceStatus {
    if paint_required && !paint_completed {
        DeviceStatus::InPaintShop
    } else {
        DeviceStatus::AwaitingQc
    }
}

pub fn next_status_after_paint(repair_required: bool, repair_completed: bool) -> DeviceStatus {
    if repair_required && !repair_completed {
        DeviceStatus::UnderRepair
    } else {
        DeviceStatus::AwaitingQc
    }
}

pub fn next_status_after_qc(result: QcResult) -> DeviceStatus {
    match result {
        QcResult::Passed => DeviceStatus::ReadyForStock,
        QcResult::FailedRework => DeviceStatus::ReadyForRepair,
        QcResult::FailedScrap => DeviceStatus::Scrapped,
    }
}

pub fn status_after_outward(outward_type: OutwardType) -> DeviceStatus {
    match outward_type {
        OutwardType::Sales => DeviceStatus::StockOutSold,
        OutwardType::Rental => DeviceStatus::StockOutRental,
    }
}

/// Guard used by every workstation before acting on a device.
pub fn ensure_status(
    current: DeviceStatus,
    allowed: &[DeviceStatus],
    action: &str,
) -> Result<(), WorkflowError> {
    if allowed.contains(&current) {
        Ok(())
    } else {
        Err(WorkflowError::InvalidTransition {
            action: action.to_string(),
            current,
        })
    }
}

pub fn ensure_qc_allowed(state: &DeviceWorkState) -> Result<(), WorkflowError> {
    ensure_status(state.status, &[DeviceStatus::AwaitingQc], "submit QC")?;
    if state.repair_required && !state.repair_completed {
        return Err(WorkflowError::RepairIncomplete);
    }
    if state.paint_required && !state.paint_completed {
        return Err(WorkflowError::PaintIncomplete);
    }
    Ok(())
}

/// Statuses from which a device may be inspected.
pub const INSPECTABLE: &[DeviceStatus] = &[DeviceStatus::Received, DeviceStatus::PendingInspection];

/// Quantity requested per part code, duplicate lines summed. `None` when a
/// total does not fit in an `i32`.
pub fn total_by_part(required: &[SpareRequirement]) -> Option<BTreeMap<&str, i32>> {
    let mut totals: BTreeMap<&str, i32> = BTreeMap::new();
    for line in required {
        let total = totals.entry(line.part_code.as_str()).or_default();
        *total = total.checked_add(line.quantity)?;
    }
    Some(totals)
}

/// Stock is short for at least one line. `stock` maps part code to
/// current stock; unknown parts count as zero, and a total too large to
/// count is always short.
pub fn spares_pending(required: &[SpareRequirement], stock: &HashMap<String, i32>) -> bool {
    match total_by_part(required) {
        Some(totals) => totals
            .into_iter()
            .any(|(code, qty)| stock.get(code).copied().unwrap_or(0) < qty),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn outcome(issues: bool, spares: bool, pending: bool, paint: bool) -> InspectionOutcome {
        InspectionOutcome {
            has_issues: issues,
            spares_needed: spares,
            spares_pending: pending,
            paint_needed: paint,
        }
    }

    #[rstest]
    #[case(outcome(true, true, true, false), DeviceStatus::WaitingForSpares)]
    #[case(outcome(false, true, true, true), DeviceStatus::WaitingForSpares)]
    #[case(outcome(true, true, false, false), DeviceStatus::ReadyForRepair)]
    #[case(outcome(true, false, false, true), DeviceStatus::ReadyForRepair)]
    #[case(outcome(false, false, false, true), DeviceStatus::InPaintShop)]
    #[case(outcome(false, false, false, false), DeviceStatus::AwaitingQc)]
    fn inspection_routing(#[case] outcome: InspectionOutcome, #[case] expected: DeviceStatus) {
        assert_eq!(next_status_after_inspection(&outcome), expected);
    }

    #[rstest]
    #[case(true, false, DeviceStatus::InPaintShop)]
    #[case(true, true, DeviceStatus::AwaitingQc)]
    #[case(false, false, DeviceStatus::AwaitingQc)]
    fn repair_routing(
        #[case] paint_required: bool,
        #[case] paint_completed: bool,
        #[case] expected: DeviceStatus,
    ) {
        assert_eq!(
            next_status_after_repair(paint_required, paint_completed),
            expected
        );
    }

    #[rstest]
    #[case(true, false, DeviceStatus::UnderRepair)]
    #[case(true, true, DeviceStatus::AwaitingQc)]
    #[case(false, false, DeviceStatus::AwaitingQc)]
    fn paint_routing(
        #[case] repair_required: bool,
        #[case] repair_completed: bool,
        #[case] expected: DeviceStatus,
    ) {
        assert_eq!(
            next_status_after_paint(repair_required, repair_completed),
            expected
        );
    }

    #[rstest]
    #[case(QcResult::Passed, DeviceStatus::ReadyForStock)]
    #[case(QcResult::FailedRework, DeviceStatus::ReadyForRepair)]
    #[case(QcResult::FailedScrap, DeviceStatus::Scrapped)]
    fn qc_routing(#[case] result: QcResult, #[case] expected: DeviceStatus) {
        assert_eq!(next_status_after_qc(result), expected);
    }

    #[test]
    fn outward_routing() {
        assert_eq!(
            status_after_outward(OutwardType::Sales),
            DeviceStatus::StockOutSold
        );
        assert_eq!(
            status_after_outward(OutwardType::Rental),
            DeviceStatus::StockOutRental
        );
    }

    #[test]
    fn qc_requires_awaiting_qc_status() {
        let state = DeviceWorkState {
            status: DeviceStatus::UnderRepair,
            ..Default::default()
        };
        assert_eq!(
            ensure_qc_allowed(&state),
            Err(WorkflowError::InvalidTransition {
                action: "submit QC".into(),
                current: DeviceStatus::UnderRepair,
            })
        );
    }

    #[test]
    fn qc_requires_completed_repair_and_paint() {
        let mut state = DeviceWorkState {
            status: DeviceStatus::AwaitingQc,
            repair_required: true,
            paint_required: true,
            ..Default::default()
        };
        assert_eq!(
            ensure_qc_allowed(&state),
            Err(WorkflowError::RepairIncomplete)
        );

        state.repair_completed = true;
        assert_eq!(ensure_qc_allowed(&state), Err(WorkflowError::PaintIncomplete));

        state.paint_completed = true;
        assert_eq!(ensure_qc_allowed(&state), Ok(()));
    }

    #[test]
    fn ensure_status_reports_action_and_current() {
        let err = ensure_status(DeviceStatus::Scrapped, INSPECTABLE, "inspect").unwrap_err();
        assert_eq!(err.to_string(), "cannot inspect while device is SCRAPPED");
        assert!(ensure_status(DeviceStatus::Received, INSPECTABLE, "inspect").is_ok());
    }

    #[test]
    fn spares_pending_sums_duplicate_lines() {
        let stock = HashMap::from([("BAT-01".to_string(), 3), ("KB-US".to_string(), 1)]);
        let line = |code: &str, quantity| SpareRequirement {
            part_code: code.into(),
            quantity,
        };

        assert!(!spares_pending(&[line("BAT-01", 2), line("KB-US", 1)], &stock));
        assert!(spares_pending(&[line("BAT-01", 2), line("BAT-01", 2)], &stock));
        assert!(spares_pending(&[line("SSD-512", 1)], &stock));
        assert!(!spares_pending(&[], &stock));
    }

    #[test]
    fn oversized_totals_count_as_pending() {
        let stock = HashMap::from([("BAT-01".to_string(), i32::MAX)]);
        let line = |quantity| SpareRequirement {
            part_code: "BAT-01".into(),
            quantity,
        };
        let lines = [line(i32::MAX), line(i32::MAX)];

        assert!(total_by_part(&lines).is_none());
        assert!(spares_pending(&lines, &stock));
        assert_eq!(total_by_part(&[line(2), line(3)]).unwrap()["BAT-01"], 5);
    }
}
