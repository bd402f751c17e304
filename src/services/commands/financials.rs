use chrono::{Months, Utc};
use serde_json::{Map, Value};

use crate::aggregates::derive_fee_status;
use crate::database::models::{
    merge_patch, new_id, Expense, Fee, Financials, Installment, InstallmentStatus, ScopeData,
};
use crate::database::repository::ScopeSession;
use crate::types::Scope;

use super::{build_entity, find_mut, remove_by_id, CommandEffects, CommandError, Payload};

const IMMUTABLE: &[&str] = &["id"];
const INSTALLMENT_COUNT: &str = "installmentCount";
const MAX_INSTALLMENTS: u32 = 360;

pub(super) async fn apply(
    session: &mut ScopeSession<'_>,
    action: &str,
    payload: &Payload,
) -> Result<CommandEffects, CommandError> {
    match action {
        "addFee" => {
            let mut fields = payload.fields("fee", &["id"]);
            for required in ["caseId", "amount", "dueDate"] {
                if fields.get(required).map_or(true, Value::is_null) {
                    return Err(CommandError::missing(required));
                }
            }
            let installment_count = take_installment_count(&mut fields)?;
            let mut fee: Fee = build_entity(fields, None)?;
            if let Some(count) = installment_count {
                if fee.is_installment_plan() && fee.installments.is_empty() {
                    fee.installments = generate_installments(&fee, count);
                }
            }
            sync_fee_status(&mut fee);
            edit(session, |financials| {
                financials.fees.push(fee);
                Ok(())
            })
            .await
        }
        "updateFee" => {
            let id = payload.require_str("id")?;
            let changes = payload.fields("updates", &["id"]);
            edit(session, |financials| {
                let fee = find_mut(&mut financials.fees, &id)?;
                *fee = merge_patch(&*fee, &changes, IMMUTABLE)?;
                sync_fee_status(fee);
                Ok(())
            })
            .await
        }
        "deleteFee" => {
            let id = payload.require_str("id")?;
            edit(session, |financials| remove_by_id(&mut financials.fees, &id).map(|_| ())).await
        }
        "addExpense" => {
            let fields = payload.fields("expense", &["id"]);
            for required in ["caseId", "amount", "date"] {
                if fields.get(required).map_or(true, Value::is_null) {
                    return Err(CommandError::missing(required));
                }
            }
            let expense: Expense = build_entity(fields, None)?;
            edit(session, |financials| {
                financials.expenses.push(expense);
                Ok(())
            })
            .await
        }
        "updateExpense" => {
            let id = payload.require_str("id")?;
            let changes = payload.fields("updates", &["id"]);
            edit(session, |financials| {
                let expense = find_mut(&mut financials.expenses, &id)?;
                *expense = merge_patch(&*expense, &changes, IMMUTABLE)?;
                Ok(())
            })
            .await
        }
        "deleteExpense" => {
            let id = payload.require_str("id")?;
            edit(session, |financials| remove_by_id(&mut financials.expenses, &id).map(|_| ())).await
        }
        "updateInstallmentStatus" => {
            let fee_id = payload.require_str("feeId")?;
            let installment_id = payload.require_str("installmentId")?;
            let status: InstallmentStatus = payload.require("status")?;
            let paid_date = match payload.get("paidDate") {
                Some(Value::Null) | None => None,
                Some(value) => Some(serde_json::from_value(value.clone())?),
            };
            edit(session, |financials| {
                let fee = find_mut(&mut financials.fees, &fee_id)?;
                let installment = find_mut(&mut fee.installments, &installment_id)?;
                installment.status = status;
                installment.paid_date = match status {
                    InstallmentStatus::Pago => Some(paid_date.unwrap_or_else(|| Utc::now().date_naive())),
                    InstallmentStatus::Pendente => None,
                };
                sync_fee_status(fee);
                Ok(())
            })
            .await
        }
        "removeByCaseIds" => {
            let case_ids: Vec<String> = payload.require("caseIds")?;
            edit(session, |financials| {
                financials.remove_by_case_ids(&case_ids);
                Ok(())
            })
            .await
        }
        "reset" => {
            session.stage(ScopeData::default_for(Scope::Financials));
            Ok(CommandEffects::none())
        }
        other => Err(CommandError::unknown_action(Scope::Financials, other)),
    }
}

async fn edit<F>(session: &mut ScopeSession<'_>, change: F) -> Result<CommandEffects, CommandError>
where
    F: FnOnce(&mut Financials) -> Result<(), CommandError>,
{
    let mut financials = session.financials().await?;
    change(&mut financials)?;
    session.stage(ScopeData::Financials(financials));
    Ok(CommandEffects::none())
}

/// `installmentCount` drives generation only and is never stored
fn take_installment_count(fields: &mut Map<String, Value>) -> Result<Option<u32>, CommandError> {
    let count = match fields.remove(INSTALLMENT_COUNT) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(_) => None,
    };
    match count {
        Some(n) if n >= 1 && n <= u64::from(MAX_INSTALLMENTS) => Ok(Some(n as u32)),
        _ => Err(CommandError::Validation(format!("{} inválido", INSTALLMENT_COUNT))),
    }
}

/// Monthly installments starting at the fee due date; cents left over by the
/// split go to the last one
fn generate_installments(fee: &Fee, count: u32) -> Vec<Installment> {
    fee.amount
        .split(count)
        .into_iter()
        .enumerate()
        .map(|(i, amount)| Installment {
            id: new_id(),
            number: i as u32 + 1,
            amount,
            due_date: fee.due_date.checked_add_months(Months::new(i as u32)).unwrap_or(fee.due_date),
            status: InstallmentStatus::Pendente,
            paid_date: None,
        })
        .collect()
}

fn sync_fee_status(fee: &mut Fee) {
    fee.status = derive_fee_status(fee);
}

#[cfg(test)]
mod tests {
    use super::super::tests::{run, service};
    use super::super::CommandRequest;
    use serde_json::json;

    #[tokio::test]
    async fn add_fee_returns_fees_and_unchanged_expenses() {
        let service = service();
        run(&service, "financials", "addExpense", json!({"caseId": "1", "amount": 30, "date": "2024-07-01"})).await;

        let body = run(
            &service,
            "financials",
            "addFee",
            json!({"caseId": "1", "description": "Taxa", "amount": 100, "dueDate": "2024-08-01", "type": "Inicial", "status": "Pendente"}),
        )
        .await;

        let fee = body["fees"][0].clone();
        let id = fee["id"].as_str().unwrap().to_string();
        assert!(!id.is_empty());
        assert_eq!(
            fee,
            json!({"id": id, "caseId": "1", "description": "Taxa", "amount": 100, "dueDate": "2024-08-01", "type": "Inicial", "status": "Pendente"})
        );
        assert_eq!(body["expenses"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn installment_plan_is_generated_and_drives_status() {
        let service = service();
        let body = run(
            &service,
            "financials",
            "addFee",
            json!({"caseId": "1", "description": "Honorários", "amount": 1000, "dueDate": "2024-01-31",
                   "type": "Parcelado", "installmentCount": 3}),
        )
        .await;
        let fee = &body["fees"][0];
        assert!(fee.get("installmentCount").is_none());
        let installments = fee["installments"].as_array().unwrap();
        assert_eq!(installments.len(), 3);
        assert_eq!(installments[0]["amount"], 333.33);
        assert_eq!(installments[2]["amount"], 333.34);
        assert_eq!(installments[1]["dueDate"], "2024-02-29");
        assert_eq!(fee["status"], "Pendente");

        let fee_id = fee["id"].as_str().unwrap().to_string();
        let ids: Vec<String> = installments.iter().map(|i| i["id"].as_str().unwrap().to_string()).collect();

        let body = run(
            &service,
            "financials",
            "updateInstallmentStatus",
            json!({"feeId": fee_id, "installmentId": ids[0], "status": "Pago", "paidDate": "2024-02-01"}),
        )
        .await;
        assert_eq!(body["fees"][0]["status"], "Parcialmente Pago");
        assert_eq!(body["fees"][0]["installments"][0]["paidDate"], "2024-02-01");

        for id in &ids[1..] {
            run(
                &service,
                "financials",
                "updateInstallmentStatus",
                json!({"feeId": fee_id, "installmentId": id, "status": "Pago"}),
            )
            .await;
        }
        let body = run(
            &service,
            "financials",
            "updateInstallmentStatus",
            json!({"feeId": fee_id, "installmentId": ids[0], "status": "Pago"}),
        )
        .await;
        assert_eq!(body["fees"][0]["status"], "Pago");

        let body = run(
            &service,
            "financials",
            "updateInstallmentStatus",
            json!({"feeId": fee_id, "installmentId": ids[1], "status": "Pendente"}),
        )
        .await;
        assert_eq!(body["fees"][0]["status"], "Parcialmente Pago");
        assert!(body["fees"][0]["installments"][1].get("paidDate").is_none());
    }

    #[tokio::test]
    async fn invalid_installment_count_is_rejected() {
        let service = service();
        let err = service
            .execute(CommandRequest::new(
                "financials",
                "addFee",
                Some(json!({"caseId": "1", "amount": 10, "dueDate": "2024-01-01", "type": "Parcelado", "installmentCount": 0})),
            ))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "installmentCount inválido");
    }

    #[tokio::test]
    async fn update_delete_and_remove_by_case_ids() {
        let service = service();
        let body = run(
            &service,
            "financials",
            "addFee",
            json!({"caseId": "a", "amount": 10, "dueDate": "2024-01-01", "type": "Inicial"}),
        )
        .await;
        let fee_id = body["fees"][0]["id"].as_str().unwrap().to_string();
        run(&service, "financials", "addFee", json!({"caseId": "b", "amount": 20, "dueDate": "2024-01-01"})).await;
        let body = run(&service, "financials", "addExpense", json!({"caseId": "a", "amount": 5, "date": "2024-01-02"})).await;
        let expense_id = body["expenses"][0]["id"].as_str().unwrap().to_string();

        let body = run(&service, "financials", "updateFee", json!({"id": fee_id, "status": "Pago", "amount": "12,50"})).await;
        assert_eq!(body["fees"][0]["status"], "Pago");
        assert_eq!(body["fees"][0]["amount"], 12.5);

        let body =
            run(&service, "financials", "updateExpense", json!({"id": expense_id, "category": "Custas"})).await;
        assert_eq!(body["expenses"][0]["category"], "Custas");

        let body = run(&service, "financials", "removeByCaseIds", json!({"caseIds": ["a"]})).await;
        assert_eq!(body["fees"].as_array().unwrap().len(), 1);
        assert_eq!(body["fees"][0]["caseId"], "b");
        assert_eq!(body["expenses"], json!([]));

        let err = service
            .execute(CommandRequest::new("financials", "deleteFee", Some(json!({"id": fee_id}))))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Honorário não encontrado");

        let err = service
            .execute(CommandRequest::new("financials", "deleteExpense", Some(json!({}))))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "id não informado");
    }

    #[tokio::test]
    async fn reset_is_idempotent() {
        let service = service();
        run(&service, "financials", "addFee", json!({"caseId": "a", "amount": 10, "dueDate": "2024-01-01"})).await;
        let first = run(&service, "financials", "reset", json!({})).await;
        let second = run(&service, "financials", "reset", json!({})).await;
        assert_eq!(first, json!({"fees": [], "expenses": []}));
        assert_eq!(first, second);
    }
}
