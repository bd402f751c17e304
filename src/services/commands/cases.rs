use serde_json::Value;

use crate::database::models::{merge_patch, Case, Entity, LegalDocument, ScopeData, Task};
use crate::database::repository::ScopeSession;
use crate::types::Scope;

use super::{build_entity, find_mut, remove_by_id, remove_cases_where, CommandEffects, CommandError, Payload};

/// `documents` only change through upload/delete
const IMMUTABLE: &[&str] = &["id", "createdAt", "documents"];
const CHILD_IMMUTABLE: &[&str] = &["id", "createdAt"];

pub(super) async fn apply(
    session: &mut ScopeSession<'_>,
    action: &str,
    payload: &Payload,
) -> Result<CommandEffects, CommandError> {
    match action {
        "create" => {
            let mut fields = payload.fields("case", &["id"]);
            if fields.get("clientId").map_or(true, Value::is_null) {
                return Err(CommandError::missing("clientId"));
            }
            fields.remove("documents");
            let mut case: Case = build_entity(fields, Some("createdAt"))?;
            case.touch();
            let mut cases = session.cases().await?;
            cases.push(case);
            session.stage(ScopeData::Cases(cases));
            Ok(CommandEffects::none())
        }
        "update" => {
            let id = payload.require_str("id")?;
            let changes = payload.fields("updates", &["id"]);
            edit_case(session, &id, |case| {
                *case = merge_patch(&*case, &changes, IMMUTABLE)?;
                Ok(())
            })
            .await?;
            Ok(CommandEffects::none())
        }
        "delete" => {
            let id = payload.require_str("id")?;
            let cases = session.cases().await?;
            if !cases.iter().any(|c| c.id == id) {
                return Err(CommandError::NotFound(Case::NOT_FOUND.into()));
            }
            let removed = remove_cases_where(session, |case| case.id == id).await?;
            Ok(CommandEffects::removed(removed))
        }
        "removeByClient" => {
            let client_id = payload.require_str("clientId")?;
            let removed = remove_cases_where(session, |case| case.client_id == client_id).await?;
            Ok(CommandEffects::removed(removed))
        }
        "reset" => {
            let removed = remove_cases_where(session, |_| true).await?;
            Ok(CommandEffects::removed(removed))
        }
        "addTask" => {
            let case_id = payload.require_str("caseId")?;
            let fields = payload.fields("task", &["caseId", "id"]);
            if !fields.contains_key("dueDate") {
                return Err(CommandError::missing("dueDate"));
            }
            let task: Task = build_entity(fields, None)?;
            edit_case(session, &case_id, |case| {
                case.tasks.push(task);
                Ok(())
            })
            .await?;
            Ok(CommandEffects::none())
        }
        "updateTask" => {
            let case_id = payload.require_str("caseId")?;
            let task_id = payload.require_str("taskId")?;
            let changes = payload.fields("updates", &["caseId", "taskId"]);
            edit_case(session, &case_id, |case| {
                let task = find_mut(&mut case.tasks, &task_id)?;
                *task = merge_patch(&*task, &changes, CHILD_IMMUTABLE)?;
                Ok(())
            })
            .await?;
            Ok(CommandEffects::none())
        }
        "toggleTask" => {
            let case_id = payload.require_str("caseId")?;
            let task_id = payload.require_str("taskId")?;
            edit_case(session, &case_id, |case| {
                let task = find_mut(&mut case.tasks, &task_id)?;
                task.completed = !task.completed;
                Ok(())
            })
            .await?;
            Ok(CommandEffects::none())
        }
        "deleteTask" => {
            let case_id = payload.require_str("caseId")?;
            let task_id = payload.require_str("taskId")?;
            edit_case(session, &case_id, |case| remove_by_id(&mut case.tasks, &task_id).map(|_| ())).await?;
            Ok(CommandEffects::none())
        }
        "addLegalDocument" => {
            let case_id = payload.require_str("caseId")?;
            let fields = payload.fields("document", &["caseId", "id"]);
            let document: LegalDocument = build_entity(fields, Some("createdAt"))?;
            edit_case(session, &case_id, |case| {
                case.legal_documents.push(document);
                Ok(())
            })
            .await?;
            Ok(CommandEffects::none())
        }
        "updateLegalDocument" => {
            let case_id = payload.require_str("caseId")?;
            let document_id = payload.require_str("documentId")?;
            let changes = payload.fields("updates", &["caseId", "documentId"]);
            edit_case(session, &case_id, |case| {
                let document = find_mut(&mut case.legal_documents, &document_id)?;
                *document = merge_patch(&*document, &changes, CHILD_IMMUTABLE)?;
                Ok(())
            })
            .await?;
            Ok(CommandEffects::none())
        }
        "deleteLegalDocument" => {
            let case_id = payload.require_str("caseId")?;
            let document_id = payload.require_str("documentId")?;
            edit_case(session, &case_id, |case| {
                remove_by_id(&mut case.legal_documents, &document_id).map(|_| ())
            })
            .await?;
            Ok(CommandEffects::none())
        }
        other => Err(CommandError::unknown_action(Scope::Cases, other)),
    }
}

/// Apply `edit` to one case, refresh its `lastUpdate` and stage the scope
async fn edit_case<F>(session: &mut ScopeSession<'_>, case_id: &str, edit: F) -> Result<(), CommandError>
where
    F: FnOnce(&mut Case) -> Result<(), CommandError>,
{
    let mut cases = session.cases().await?;
    let case = find_mut(&mut cases, case_id)?;
    edit(case)?;
    case.touch();
    session.stage(ScopeData::Cases(cases));
    Ok(())
}
