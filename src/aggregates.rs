//! Derived figures computed from the in-memory collections on demand.

use chrono::NaiveDate;
use serde::Serialize;

use crate::database::models::{Case, Expense, Fee, FeeStatus, Installment, InstallmentStatus, Money, Task};

/// Fee status implied by its installments: all paid, none paid, or some
pub fn fee_status_from_installments(installments: &[Installment]) -> FeeStatus {
    let paid = installments.iter().filter(|i| i.status == InstallmentStatus::Pago).count();
    if paid == 0 {
        FeeStatus::Pendente
    } else if paid == installments.len() {
        FeeStatus::Pago
    } else {
        FeeStatus::ParcialmentePago
    }
}

/// Status of a fee; installment plans derive it, plain fees keep their own
pub fn derive_fee_status(fee: &Fee) -> FeeStatus {
    if fee.installments.is_empty() {
        fee.status
    } else {
        fee_status_from_installments(&fee.installments)
    }
}

pub fn fee_paid_amount(fee: &Fee) -> Money {
    if fee.installments.is_empty() {
        match fee.status {
            FeeStatus::Pago => fee.amount,
            _ => Money::ZERO,
        }
    } else {
        fee.installments
            .iter()
            .filter(|i| i.status == InstallmentStatus::Pago)
            .map(|i| i.amount)
            .sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialTotals {
    pub fees_total: Money,
    pub fees_paid: Money,
    pub fees_pending: Money,
    pub expenses_total: Money,
    pub fee_count: usize,
    pub expense_count: usize,
}

impl FinancialTotals {
    pub fn from_entries<'a>(
        fees: impl IntoIterator<Item = &'a Fee>,
        expenses: impl IntoIterator<Item = &'a Expense>,
    ) -> Self {
        let mut totals = FinancialTotals::default();
        for fee in fees {
            let paid = fee_paid_amount(fee);
            totals.fees_total = totals.fees_total + fee.amount;
            totals.fees_paid = totals.fees_paid + paid;
            totals.fees_pending = totals.fees_pending + (fee.amount - paid);
            totals.fee_count += 1;
        }
        for expense in expenses {
            totals.expenses_total = totals.expenses_total + expense.amount;
            totals.expense_count += 1;
        }
        totals
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrgentTask {
    pub case_id: String,
    pub client_id: String,
    pub task: Task,
    /// Negative when overdue
    pub days_remaining: i64,
}

/// Incomplete tasks due within `threshold_days` of `today`, overdue ones
/// included, earliest first
pub fn urgent_tasks(cases: &[Case], today: NaiveDate, threshold_days: u32) -> Vec<UrgentTask> {
    let mut urgent: Vec<UrgentTask> = cases
        .iter()
        .flat_map(|case| {
            case.tasks.iter().filter(|t| !t.completed).filter_map(move |task| {
                let days_remaining = (task.due_date - today).num_days();
                (days_remaining <= i64::from(threshold_days)).then(|| UrgentTask {
                    case_id: case.id.clone(),
                    client_id: case.client_id.clone(),
                    task: task.clone(),
                    days_remaining,
                })
            })
        })
        .collect();
    urgent.sort_by_key(|u| (u.task.due_date, u.case_id.clone()));
    urgent
}
