use crate::database::models::{merge_patch, DocumentTemplate, ScopeData, Settings};
use crate::database::repository::ScopeSession;
use crate::types::Scope;

use super::{build_entity, find_mut, remove_by_id, CommandEffects, CommandError, Payload};

pub(super) async fn apply(
    session: &mut ScopeSession<'_>,
    action: &str,
    payload: &Payload,
) -> Result<CommandEffects, CommandError> {
    match action {
        "update" => {
            let changes = payload.fields("settings", &[]);
            edit(session, |settings| {
                *settings = merge_patch(&*settings, &changes, &[])?;
                Ok(())
            })
            .await
        }
        "reset" => {
            session.stage(ScopeData::default_for(Scope::Settings));
            Ok(CommandEffects::none())
        }
        "addBenefitType" => {
            let name = payload.require_str("name")?;
            edit(session, |settings| {
                if !settings.benefit_types.contains(&name) {
                    settings.benefit_types.push(name.clone());
                }
                settings.document_checklist_config.entry(name).or_default();
                Ok(())
            })
            .await
        }
        "removeBenefitType" => {
            let name = payload.require_str("name")?;
            edit(session, |settings| {
                remove_name(&mut settings.benefit_types, &name, "Tipo de benefício não encontrado")?;
                settings.document_checklist_config.remove(&name);
                Ok(())
            })
            .await
        }
        "addCaseStatus" => {
            let name = payload.require_str("name")?;
            edit(session, |settings| {
                if !settings.case_statuses.contains(&name) {
                    settings.case_statuses.push(name);
                }
                Ok(())
            })
            .await
        }
        "removeCaseStatus" => {
            let name = payload.require_str("name")?;
            edit(session, |settings| {
                remove_name(&mut settings.case_statuses, &name, "Status não encontrado")
            })
            .await
        }
        "updateDocumentChecklist" => {
            let benefit_type = payload.require_str("benefitType")?;
            let documents: Vec<String> = payload.require("documents")?;
            edit(session, |settings| {
                if !settings.benefit_types.contains(&benefit_type) {
                    return Err(CommandError::NotFound("Tipo de benefício não encontrado".into()));
                }
                settings.document_checklist_config.insert(benefit_type, documents);
                Ok(())
            })
            .await
        }
        "addDocumentTemplate" => {
            let fields = payload.fields("template", &["id"]);
            let template: DocumentTemplate = build_entity(fields, None)?;
            edit(session, |settings| {
                settings.document_templates.push(template);
                Ok(())
            })
            .await
        }
        "updateDocumentTemplate" => {
            let id = payload.require_str("id")?;
            let changes = payload.fields("updates", &["id"]);
            edit(session, |settings| {
                let template = find_mut(&mut settings.document_templates, &id)?;
                *template = merge_patch(&*template, &changes, &["id"])?;
                Ok(())
            })
            .await
        }
        "deleteDocumentTemplate" => {
            let id = payload.require_str("id")?;
            edit(session, |settings| remove_by_id(&mut settings.document_templates, &id).map(|_| ())).await
        }
        "updateFirmInfo" => {
            let changes = payload.fields("firmInfo", &[]);
            edit(session, |settings| {
                settings.firm_info = merge_patch(&settings.firm_info, &changes, &[])?;
                Ok(())
            })
            .await
        }
        "updateBranding" => {
            let changes = payload.fields("brandingSettings", &[]);
            edit(session, |settings| {
                settings.branding_settings = merge_patch(&settings.branding_settings, &changes, &[])?;
                Ok(())
            })
            .await
        }
        "updateNotificationSettings" => {
            let changes = payload.fields("notificationSettings", &[]);
            edit(session, |settings| {
                settings.notification_settings = merge_patch(&settings.notification_settings, &changes, &[])?;
                Ok(())
            })
            .await
        }
        other => Err(CommandError::unknown_action(Scope::Settings, other)),
    }
}

async fn edit<F>(session: &mut ScopeSession<'_>, change: F) -> Result<CommandEffects, CommandError>
where
    F: FnOnce(&mut Settings) -> Result<(), CommandError>,
{
    let mut settings = session.settings().await?;
    change(&mut settings)?;
    session.stage(ScopeData::Settings(settings));
    Ok(CommandEffects::none())
}

fn remove_name(names: &mut Vec<String>, name: &str, not_found: &str) -> Result<(), CommandError> {
    let before = names.len();
    names.retain(|n| n != name);
    if names.len() == before {
        return Err(CommandError::NotFound(not_found.to_string()));
    }
    Ok(())
}
