use crate::database::models::{merge_patch, Client, ScopeData};
use crate::database::repository::ScopeSession;
use crate::types::Scope;

use super::{build_entity, find_mut, remove_by_id, remove_cases_where, CommandEffects, CommandError, Payload};

const IMMUTABLE: &[&str] = &["id", "createdAt"];

pub(super) async fn apply(
    session: &mut ScopeSession<'_>,
    action: &str,
    payload: &Payload,
) -> Result<CommandEffects, CommandError> {
    match action {
        "create" => {
            let fields = payload.fields("client", &["id"]);
            let client: Client = build_entity(fields, Some("createdAt"))?;
            let mut clients = session.clients().await?;
            clients.push(client);
            session.stage(ScopeData::Clients(clients));
            Ok(CommandEffects::none())
        }
        "update" => {
            let id = payload.require_str("id")?;
            let changes = payload.fields("updates", &["id"]);
            let mut clients = session.clients().await?;
            let client = find_mut(&mut clients, &id)?;
            *client = merge_patch(&*client, &changes, IMMUTABLE)?;
            session.stage(ScopeData::Clients(clients));
            Ok(CommandEffects::none())
        }
        "delete" => {
            let id = payload.require_str("id")?;
            let mut clients = session.clients().await?;
            remove_by_id(&mut clients, &id)?;
            session.stage(ScopeData::Clients(clients));
            let removed = remove_cases_where(session, |case| case.client_id == id).await?;
            Ok(CommandEffects::removed(removed))
        }
        "reset" => {
            session.stage(ScopeData::default_for(Scope::Clients));
            Ok(CommandEffects::none())
        }
        other => Err(CommandError::unknown_action(Scope::Clients, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{run, service};
    use super::super::CommandRequest;
    use serde_json::json;

    #[tokio::test]
    async fn create_assigns_id_and_created_at() {
        let service = service();
        let body = run(&service, "clients", "create", json!({"name": "Maria", "cpf": "123", "id": "forged"})).await;
        let client = &body[0];
        assert_ne!(client["id"], "forged");
        assert!(client["createdAt"].is_string());
        assert_eq!(client["cpf"], "123");
    }

    #[tokio::test]
    async fn update_merges_and_keeps_created_at() {
        let service = service();
        let body = run(&service, "clients", "create", json!({"name": "Maria"})).await;
        let id = body[0]["id"].as_str().unwrap().to_string();
        let created = body[0]["createdAt"].clone();

        let body = run(
            &service,
            "clients",
            "update",
            json!({"id": id, "phone": "555", "createdAt": "1999-01-01T00:00:00Z"}),
        )
        .await;
        assert_eq!(body[0]["name"], "Maria");
        assert_eq!(body[0]["phone"], "555");
        assert_eq!(body[0]["createdAt"], created);
    }

    #[tokio::test]
    async fn delete_cascades_to_cases_and_financials() {
        let service = service();
        let clients = run(&service, "clients", "create", json!({"name": "Maria"})).await;
        let maria = clients[0]["id"].as_str().unwrap().to_string();
        let clients = run(&service, "clients", "create", json!({"name": "João"})).await;
        let joao = clients[1]["id"].as_str().unwrap().to_string();

        let cases = run(&service, "cases", "create", json!({"clientId": maria, "title": "Aposentadoria"})).await;
        let maria_case = cases[0]["id"].as_str().unwrap().to_string();
        let cases = run(&service, "cases", "create", json!({"clientId": joao, "title": "BPC"})).await;
        let joao_case = cases[1]["id"].as_str().unwrap().to_string();

        for case_id in [&maria_case, &joao_case] {
            run(
                &service,
                "financials",
                "addFee",
                json!({"caseId": case_id, "amount": 100, "dueDate": "2024-08-01", "type": "Inicial"}),
            )
            .await;
            run(&service, "financials", "addExpense", json!({"caseId": case_id, "amount": 10, "date": "2024-08-01"}))
                .await;
        }

        let body = run(&service, "clients", "delete", json!({"id": maria})).await;
        assert_eq!(body["clients"].as_array().unwrap().len(), 1);
        assert_eq!(body["cases"].as_array().unwrap().len(), 1);
        assert_eq!(body["cases"][0]["id"], joao_case.as_str());
        for key in ["fees", "expenses"] {
            let entries = body[key].as_array().unwrap();
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0]["caseId"], joao_case.as_str());
        }
    }

    #[tokio::test]
    async fn delete_unknown_client_is_not_found() {
        let service = service();
        let err = service
            .execute(CommandRequest::new("clients", "delete", Some(json!({"id": "nope"}))))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Cliente não encontrado");

        let err = service.execute(CommandRequest::new("clients", "delete", None)).await.unwrap_err();
        assert_eq!(err.to_string(), "id não informado");
    }

    #[tokio::test]
    async fn reset_is_idempotent() {
        let service = service();
        run(&service, "clients", "create", json!({"name": "Maria"})).await;
        let first = run(&service, "clients", "reset", json!({})).await;
        let second = run(&service, "clients", "reset", json!({})).await;
        assert_eq!(first, json!([]));
        assert_eq!(first, second);
    }
}
